//! Per-table outcomes and the run summary.

use crate::error::SeedError;
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Why a table was deliberately left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Table had rows before the run touched it
    AlreadyPopulated,
    /// Run was cancelled before the table was reached
    Cancelled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::AlreadyPopulated => write!(f, "already populated"),
            SkipReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Outcome of seeding one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedResult {
    pub table: String,
    /// Rows handed to the loader
    pub attempted: u64,
    /// Rows committed
    pub inserted: u64,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<SeedError>,
    pub skipped: Option<SkipReason>,
    #[serde(serialize_with = "serialize_duration_ms", rename = "duration_ms")]
    pub duration: Duration,
}

impl SeedResult {
    pub fn inserted(table: impl Into<String>, attempted: u64, inserted: u64) -> Self {
        Self {
            table: table.into(),
            attempted,
            inserted,
            error: None,
            skipped: None,
            duration: Duration::ZERO,
        }
    }

    pub fn skipped(table: impl Into<String>, reason: SkipReason) -> Self {
        Self {
            table: table.into(),
            attempted: 0,
            inserted: 0,
            error: None,
            skipped: Some(reason),
            duration: Duration::ZERO,
        }
    }

    pub fn failed(table: impl Into<String>, attempted: u64, error: SeedError) -> Self {
        Self {
            table: table.into(),
            attempted,
            inserted: 0,
            error: Some(error),
            skipped: None,
            duration: Duration::ZERO,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Counts towards a `Completed` run.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
            && (self.inserted > 0 || self.skipped == Some(SkipReason::AlreadyPopulated))
    }

    /// Left empty because a required reference had no rows.
    pub fn is_missing_dependency(&self) -> bool {
        matches!(self.error, Some(SeedError::UnresolvedForeignKey { .. }))
    }

    /// One-word outcome for reports.
    pub fn status(&self) -> &'static str {
        match (&self.error, self.skipped) {
            (Some(_), _) => "failed",
            (None, Some(_)) => "skipped",
            (None, None) if self.inserted > 0 => "inserted",
            (None, None) => "empty",
        }
    }
}

fn serialize_error<S: Serializer>(error: &Option<SeedError>, s: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => s.serialize_some(&ErrorView {
            kind: e.kind(),
            message: e.to_string(),
        }),
        None => s.serialize_none(),
    }
}

#[derive(Serialize)]
struct ErrorView {
    kind: &'static str,
    message: String,
}

fn serialize_duration_ms<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Pending,
    Running,
    Completed,
    PartiallyCompleted,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Pending => write!(f, "PENDING"),
            RunState::Running => write!(f, "RUNNING"),
            RunState::Completed => write!(f, "COMPLETED"),
            RunState::PartiallyCompleted => write!(f, "PARTIALLY_COMPLETED"),
        }
    }
}

/// Aggregated outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub state: RunState,
    pub results: Vec<SeedResult>,
    pub tables_processed: usize,
    pub rows_inserted: u64,
    pub tables_missing_dependencies: usize,
    #[serde(serialize_with = "serialize_duration_ms", rename = "duration_ms")]
    pub duration: Duration,
}

impl RunSummary {
    /// Summarize `results` and derive the terminal state.
    pub fn from_results(results: Vec<SeedResult>, duration: Duration) -> Self {
        let state = if results.iter().all(SeedResult::is_success) {
            RunState::Completed
        } else {
            RunState::PartiallyCompleted
        };
        Self {
            state,
            tables_processed: results.len(),
            rows_inserted: results.iter().map(|r| r.inserted).sum(),
            tables_missing_dependencies: results
                .iter()
                .filter(|r| r.is_missing_dependency())
                .count(),
            results,
            duration,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state == RunState::Completed
    }

    /// Tables that were neither filled nor already populated.
    pub fn failed_tables(&self) -> Vec<&SeedResult> {
        self.results.iter().filter(|r| !r.is_success()).collect()
    }

    pub fn result_for(&self, table: &str) -> Option<&SeedResult> {
        self.results.iter().find(|r| r.table == table)
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Seed run {}", self.state)?;
        for result in &self.results {
            write!(f, "  {:<40} {:<8}", result.table, result.status())?;
            match (&result.error, result.skipped) {
                (Some(err), _) => writeln!(f, " {err}")?,
                (None, Some(reason)) => writeln!(f, " {reason}")?,
                (None, None) => writeln!(f, " {}/{} rows", result.inserted, result.attempted)?,
            }
        }
        writeln!(
            f,
            "Tables processed: {}, rows inserted: {}, left empty (missing dependencies): {}",
            self.tables_processed, self.rows_inserted, self.tables_missing_dependencies
        )?;
        let failed = self.failed_tables();
        if !failed.is_empty() {
            let names: Vec<&str> = failed.iter().map(|r| r.table.as_str()).collect();
            writeln!(f, "Needs attention: {}", names.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_when_all_inserted_or_populated() {
        let summary = RunSummary::from_results(
            vec![
                SeedResult::inserted("users", 10, 10),
                SeedResult::skipped("organizations", SkipReason::AlreadyPopulated),
            ],
            Duration::from_millis(5),
        );
        assert_eq!(summary.state, RunState::Completed);
        assert_eq!(summary.rows_inserted, 10);
        assert!(summary.failed_tables().is_empty());
    }

    #[test]
    fn test_partial_when_any_table_fails() {
        let summary = RunSummary::from_results(
            vec![
                SeedResult::inserted("users", 10, 10),
                SeedResult::failed(
                    "students",
                    0,
                    SeedError::UnresolvedForeignKey {
                        table: "students".into(),
                        column: "organization_id".into(),
                        target: "organizations".into(),
                    },
                ),
                SeedResult::skipped("grades", SkipReason::Cancelled),
            ],
            Duration::ZERO,
        );
        assert_eq!(summary.state, RunState::PartiallyCompleted);
        assert_eq!(summary.tables_missing_dependencies, 1);
        let failed: Vec<_> = summary.failed_tables().iter().map(|r| r.table.clone()).collect();
        assert_eq!(failed, vec!["students", "grades"]);

        let text = summary.to_string();
        assert!(text.contains("PARTIALLY_COMPLETED"));
        assert!(text.contains("Needs attention: students, grades"));
    }

    #[test]
    fn test_zero_inserted_is_not_success() {
        assert!(!SeedResult::inserted("empty", 0, 0).is_success());
        assert_eq!(SeedResult::inserted("empty", 0, 0).status(), "empty");
    }

    #[test]
    fn test_json_shape() {
        let summary = RunSummary::from_results(
            vec![SeedResult::failed(
                "users",
                5,
                SeedError::InsertFailure {
                    table: "users".into(),
                    message: "null value in column \"email\"".into(),
                },
            )],
            Duration::from_millis(12),
        );
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["state"], "PARTIALLY_COMPLETED");
        assert_eq!(json["duration_ms"], 12);
        assert_eq!(json["results"][0]["error"]["kind"], "insert_failure");
        assert_eq!(json["results"][0]["skipped"], serde_json::Value::Null);
    }
}
