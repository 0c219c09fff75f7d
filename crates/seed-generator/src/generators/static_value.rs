//! Static value generator and YAML to SeedValue conversion.

use seed_core::SeedValue;
use serde_yaml::Value as YamlValue;

/// Convert a YAML value to a SeedValue.
///
/// Sequences and mappings become JSON documents.
pub fn yaml_to_seed_value(yaml: &YamlValue) -> SeedValue {
    match yaml {
        YamlValue::Null => SeedValue::Null,
        YamlValue::Bool(b) => SeedValue::Bool(*b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                SeedValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                SeedValue::Float(f)
            } else {
                SeedValue::Text(n.to_string())
            }
        }
        YamlValue::String(s) => SeedValue::Text(s.clone()),
        YamlValue::Sequence(_) | YamlValue::Mapping(_) => serde_json::to_value(yaml)
            .map(SeedValue::Json)
            .unwrap_or(SeedValue::Null),
        YamlValue::Tagged(tagged) => yaml_to_seed_value(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_scalars() {
        assert_eq!(yaml_to_seed_value(&YamlValue::Null), SeedValue::Null);
        assert_eq!(
            yaml_to_seed_value(&YamlValue::Bool(true)),
            SeedValue::Bool(true)
        );

        let yaml: YamlValue = serde_yaml::from_str("42").unwrap();
        assert_eq!(yaml_to_seed_value(&yaml), SeedValue::Integer(42));

        let yaml = YamlValue::String("hello".to_string());
        assert_eq!(yaml_to_seed_value(&yaml), SeedValue::Text("hello".to_string()));
    }

    #[test]
    fn test_yaml_float() {
        let yaml: YamlValue = serde_yaml::from_str("1.234").unwrap();
        if let SeedValue::Float(f) = yaml_to_seed_value(&yaml) {
            assert!((f - 1.234).abs() < 0.001);
        } else {
            panic!("Expected Float");
        }
    }

    #[test]
    fn test_yaml_object_becomes_json() {
        let yaml: YamlValue = serde_yaml::from_str("{ version: 1, tags: [a, b] }").unwrap();
        assert_eq!(
            yaml_to_seed_value(&yaml),
            SeedValue::Json(serde_json::json!({"version": 1, "tags": ["a", "b"]}))
        );
    }
}
