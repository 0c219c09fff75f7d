//! Dependency graph and seed plan.
//!
//! Nodes are table names. Edges point from a dependency to its dependent,
//! so a topological walk yields the tables that must be seeded first at
//! the front. Edges come from two sources:
//!
//! - foreign keys between two tables of the seedable set
//! - consecutive [`PhaseGroup`]s (every table of group N before every table
//!   of group N + 1)
//!
//! Ordering is Kahn's algorithm with a priority queue keyed by
//! (declaration position in the phase groups, table name). Tables not named
//! by any phase group sort after the declared ones, alphabetically.

use crate::config::PhaseGroup;
use crate::error::SeedError;
use crate::schema::ForeignKeyEdge;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

/// Tables with their "must be seeded before" relationships.
#[derive(Debug)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
    /// Position of each node in the flattened phase group declaration
    declared: HashMap<NodeIndex, usize>,
}

impl DependencyGraph {
    /// Build the graph for `tables`.
    ///
    /// Foreign keys whose target lies outside `tables` or in another schema,
    /// and self-references, contribute no edge. Phase group members outside `tables` are ignored.
    pub fn new(
        tables: &[String],
        fk_edges: &[ForeignKeyEdge],
        phase_groups: &[PhaseGroup],
    ) -> Self {
        let mut dag = Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
            declared: HashMap::new(),
        };

        for table in tables {
            dag.add_table(table);
        }

        let mut position = 0usize;
        for group in phase_groups {
            for table in &group.tables {
                if let Some(&idx) = dag.node_map.get(table) {
                    if let std::collections::hash_map::Entry::Vacant(e) = dag.declared.entry(idx) {
                        e.insert(position);
                        position += 1;
                    }
                }
            }
        }

        for edge in fk_edges {
            if edge.is_self_reference() || edge.is_cross_schema() {
                continue;
            }
            if dag.contains(&edge.table) && dag.contains(&edge.referenced_table) {
                dag.add_dependency(&edge.table, &edge.referenced_table);
            }
        }

        let groups: Vec<Vec<&String>> = phase_groups
            .iter()
            .map(|g| g.tables.iter().filter(|t| dag.contains(t)).collect::<Vec<_>>())
            .filter(|g| !g.is_empty())
            .collect();
        for pair in groups.windows(2) {
            for later in &pair[1] {
                for earlier in &pair[0] {
                    if later != earlier {
                        dag.add_dependency(later, earlier);
                    }
                }
            }
        }

        dag
    }

    /// Build the graph and order it into a [`SeedPlan`].
    ///
    /// Fails with [`SeedError::CyclicDependency`] naming one cycle when no
    /// valid order exists.
    pub fn build(
        tables: &[String],
        fk_edges: &[ForeignKeyEdge],
        phase_groups: &[PhaseGroup],
    ) -> Result<SeedPlan, SeedError> {
        let dag = Self::new(tables, fk_edges, phase_groups);
        Ok(SeedPlan::new(dag.seed_order()?))
    }

    fn add_table(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(name) {
            idx
        } else {
            let idx = self.graph.add_node(name.to_string());
            self.node_map.insert(name.to_string(), idx);
            idx
        }
    }

    /// `table` depends on `dependency`.
    fn add_dependency(&mut self, table: &str, dependency: &str) {
        let table_idx = self.add_table(table);
        let dep_idx = self.add_table(dependency);
        self.graph.update_edge(dep_idx, table_idx, ());
    }

    fn sort_key(&self, idx: NodeIndex) -> (usize, String) {
        (
            self.declared.get(&idx).copied().unwrap_or(usize::MAX),
            self.graph[idx].clone(),
        )
    }

    /// Tables in seeding order (dependencies first).
    pub fn seed_order(&self) -> Result<Vec<String>, SeedError> {
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                (
                    idx,
                    self.graph.neighbors_directed(idx, Direction::Incoming).count(),
                )
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<((usize, String), NodeIndex)>> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&idx, _)| Reverse((self.sort_key(idx), idx)))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse((_, idx))) = ready.pop() {
            order.push(self.graph[idx].clone());
            for dependent in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                if let Some(deg) = in_degree.get_mut(&dependent) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.push(Reverse((self.sort_key(dependent), dependent)));
                    }
                }
            }
        }

        if order.len() < self.graph.node_count() {
            return Err(SeedError::CyclicDependency {
                cycle: self.find_cycle(),
            });
        }
        Ok(order)
    }

    /// One concrete cycle, in "depends on" direction, closed on its start.
    fn find_cycle(&self) -> Vec<String> {
        let component = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .min_by_key(|scc| scc.iter().map(|&idx| self.sort_key(idx)).min());

        let Some(component) = component else {
            return Vec::new();
        };
        let members: HashSet<NodeIndex> = component.iter().copied().collect();
        let Some(start) = component.iter().copied().min_by_key(|&idx| self.sort_key(idx)) else {
            return Vec::new();
        };

        // BFS from start along dependency edges until we come back around.
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut visited: HashSet<NodeIndex> = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            let mut next: Vec<NodeIndex> = self
                .graph
                .neighbors_directed(current, Direction::Incoming)
                .filter(|n| members.contains(n))
                .collect();
            next.sort_by_key(|&idx| self.sort_key(idx));

            for neighbor in next {
                if neighbor == start {
                    let mut path = vec![self.graph[start].clone()];
                    let mut node = current;
                    let mut tail = Vec::new();
                    while node != start {
                        tail.push(self.graph[node].clone());
                        node = parent[&node];
                    }
                    tail.reverse();
                    path.extend(tail);
                    path.push(self.graph[start].clone());
                    return path;
                }
                if visited.insert(neighbor) {
                    parent.insert(neighbor, current);
                    queue.push_back(neighbor);
                }
            }
        }

        Vec::new()
    }

    /// Tables `table` must wait for.
    pub fn dependencies(&self, table: &str) -> Vec<String> {
        self.neighbors(table, Direction::Incoming)
    }

    /// Tables that wait for `table`.
    pub fn dependents(&self, table: &str) -> Vec<String> {
        self.neighbors(table, Direction::Outgoing)
    }

    fn neighbors(&self, table: &str, direction: Direction) -> Vec<String> {
        let Some(&idx) = self.node_map.get(table) else {
            return Vec::new();
        };
        let mut names: Vec<String> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].clone())
            .collect();
        names.sort();
        names
    }

    pub fn contains(&self, table: &str) -> bool {
        self.node_map.contains_key(table)
    }

    pub fn table_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

/// One table of a [`SeedPlan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedTable {
    pub name: String,
    /// Row count was above zero when the run started
    pub already_populated: bool,
}

/// Ordered tables for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPlan {
    tables: Vec<PlannedTable>,
}

impl SeedPlan {
    pub fn new(order: Vec<String>) -> Self {
        Self {
            tables: order
                .into_iter()
                .map(|name| PlannedTable {
                    name,
                    already_populated: false,
                })
                .collect(),
        }
    }

    pub fn tables(&self) -> &[PlannedTable] {
        &self.tables
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlannedTable> {
        self.tables.iter()
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn position(&self, table: &str) -> Option<usize> {
        self.tables.iter().position(|t| t.name == table)
    }

    /// Record whether `table` already had rows at run start.
    pub fn mark_populated(&mut self, table: &str, populated: bool) {
        if let Some(entry) = self.tables.iter_mut().find(|t| t.name == table) {
            entry.already_populated = populated;
        }
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl std::fmt::Display for SeedPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, table) in self.tables.iter().enumerate() {
            let marker = if table.already_populated {
                " (already populated)"
            } else {
                ""
            };
            writeln!(f, "{:>4}. {}{}", i + 1, table.name, marker)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn fk(table: &str, target: &str) -> ForeignKeyEdge {
        ForeignKeyEdge::new(table, format!("{target}_id"), target, "id")
    }

    #[test]
    fn test_fk_edges_order_dependencies_first() {
        let tables = names(&["students", "organizations", "users"]);
        let edges = vec![
            fk("organizations", "users"),
            fk("students", "users"),
            fk("students", "organizations"),
        ];

        let plan = DependencyGraph::build(&tables, &edges, &[]).unwrap();
        assert_eq!(plan.table_names(), vec!["users", "organizations", "students"]);
    }

    #[test]
    fn test_every_edge_respected() {
        let tables = names(&["a", "b", "c", "d", "e", "f"]);
        let edges = vec![fk("a", "d"), fk("b", "d"), fk("d", "f"), fk("c", "e"), fk("e", "f")];

        let plan = DependencyGraph::build(&tables, &edges, &[]).unwrap();
        for edge in &edges {
            let dependent = plan.position(&edge.table).unwrap();
            let dependency = plan.position(&edge.referenced_table).unwrap();
            assert!(
                dependency < dependent,
                "{} must come before {}",
                edge.referenced_table,
                edge.table
            );
        }
    }

    #[test]
    fn test_independent_tables_sorted_alphabetically() {
        let tables = names(&["zebra", "apple", "mango"]);
        let plan = DependencyGraph::build(&tables, &[], &[]).unwrap();
        assert_eq!(plan.table_names(), vec!["apple", "mango", "zebra"]);
    }

    #[test]
    fn test_declaration_order_breaks_ties_before_alphabetical() {
        let tables = names(&["alpha", "zulu", "yankee", "beta"]);
        let groups = vec![PhaseGroup::new("first", ["zulu", "yankee"])];

        let plan = DependencyGraph::build(&tables, &[], &groups).unwrap();
        assert_eq!(plan.table_names(), vec!["zulu", "yankee", "alpha", "beta"]);
    }

    #[test]
    fn test_phase_groups_add_ordering_without_fk() {
        let tables = names(&["fitness_goals", "health_assessments", "users"]);
        let groups = vec![
            PhaseGroup::new("health", ["health_assessments"]),
            PhaseGroup::new("goals", ["fitness_goals"]),
        ];
        let edges = vec![
            fk("health_assessments", "users"),
            fk("fitness_goals", "users"),
        ];

        let dag = DependencyGraph::new(&tables, &edges, &groups);
        assert_eq!(dag.dependencies("fitness_goals"), vec!["health_assessments", "users"]);

        let plan = DependencyGraph::build(&tables, &edges, &groups).unwrap();
        assert_eq!(
            plan.table_names(),
            vec!["users", "health_assessments", "fitness_goals"]
        );
    }

    #[test]
    fn test_three_node_cycle_is_reported() {
        let tables = names(&["a", "b", "c"]);
        let edges = vec![fk("a", "b"), fk("b", "c"), fk("c", "a")];

        let err = DependencyGraph::build(&tables, &edges, &[]).unwrap_err();
        assert_eq!(
            err,
            SeedError::CyclicDependency {
                cycle: names(&["a", "b", "c", "a"])
            }
        );
    }

    #[test]
    fn test_phase_group_contradicting_fk_is_a_cycle() {
        let tables = names(&["users", "profiles"]);
        let groups = vec![
            PhaseGroup::new("first", ["profiles"]),
            PhaseGroup::new("second", ["users"]),
        ];
        let edges = vec![fk("profiles", "users")];

        let err = DependencyGraph::build(&tables, &edges, &groups).unwrap_err();
        assert!(matches!(err, SeedError::CyclicDependency { .. }));
    }

    #[test]
    fn test_self_reference_and_external_targets_allowed() {
        let tables = names(&["employees", "badges"]);
        let edges = vec![
            ForeignKeyEdge::new("employees", "manager_id", "employees", "id"),
            fk("badges", "legacy_accounts"),
        ];

        let dag = DependencyGraph::new(&tables, &edges, &[]);
        assert_eq!(dag.edge_count(), 0);
        assert!(!dag.contains("legacy_accounts"));

        let plan = DependencyGraph::build(&tables, &edges, &[]).unwrap();
        assert_eq!(plan.table_names(), vec!["badges", "employees"]);
    }

    #[test]
    fn test_same_name_in_other_schema_adds_no_edge() {
        // posts.author_id -> auth.users, not the seeded users table
        let tables = names(&["users", "posts"]);
        let edges = vec![
            ForeignKeyEdge::new("users", "post_id", "posts", "id"),
            fk("posts", "users").with_referenced_schema("auth"),
        ];

        let plan = DependencyGraph::build(&tables, &edges, &[]).unwrap();
        assert_eq!(plan.table_names(), vec!["posts", "users"]);
    }

    #[test]
    fn test_duplicate_tables_and_edges_collapse() {
        let tables = names(&["users", "users", "posts"]);
        let edges = vec![fk("posts", "users"), fk("posts", "users")];

        let dag = DependencyGraph::new(&tables, &edges, &[]);
        assert_eq!(dag.table_count(), 2);
        assert_eq!(dag.edge_count(), 1);
        assert_eq!(dag.dependents("users"), vec!["posts"]);
    }

    #[test]
    fn test_plan_mark_populated_and_display() {
        let mut plan = SeedPlan::new(names(&["users", "posts"]));
        plan.mark_populated("users", true);
        assert!(plan.tables()[0].already_populated);
        assert!(!plan.tables()[1].already_populated);

        let text = plan.to_string();
        assert!(text.contains("1. users (already populated)"));
        assert!(text.contains("2. posts"));
    }
}
