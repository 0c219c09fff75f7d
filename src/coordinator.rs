//! Run coordination: plan, then seed table by table.

use crate::loader::BatchLoader;
use crate::resolver::{check_references, strip_unresolved, ReferenceResolver};
use seed_core::{
    DependencyGraph, PhaseGroup, RecordSynthesizer, RunState, RunSummary, SeedConfig, SeedError,
    SeedPlan, SeedResult, SeedTarget, SkipReason, DEFAULT_REFERENCE_SAMPLE_LIMIT,
    DEFAULT_ROW_COUNT,
};
use std::collections::HashMap;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

/// Settings for one run.
#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    pub phase_groups: Vec<PhaseGroup>,
    /// Per-table row counts; tables not listed use `default_row_count`
    pub row_counts: HashMap<String, u64>,
    pub default_row_count: u64,
    /// Fixed batch size; estimated per table when `None`
    pub batch_size: Option<usize>,
    pub reference_sample_limit: usize,
    /// Checked between tables
    pub cancel: CancellationToken,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            phase_groups: Vec::new(),
            row_counts: HashMap::new(),
            default_row_count: DEFAULT_ROW_COUNT,
            batch_size: None,
            reference_sample_limit: DEFAULT_REFERENCE_SAMPLE_LIMIT,
            cancel: CancellationToken::new(),
        }
    }
}

impl CoordinatorOptions {
    /// Options taken from a seed configuration.
    pub fn from_config(config: &SeedConfig) -> Self {
        Self {
            phase_groups: config.phase_groups.clone(),
            row_counts: config
                .tables
                .iter()
                .filter_map(|t| t.row_count.map(|count| (t.name.clone(), count)))
                .collect(),
            default_row_count: config.default_row_count,
            batch_size: config.batch_size,
            reference_sample_limit: config.reference_sample_limit,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn row_count_for(&self, table: &str) -> u64 {
        self.row_counts
            .get(table)
            .copied()
            .unwrap_or(self.default_row_count)
    }
}

/// Drives a seeding run against one target.
///
/// Tables are processed strictly one after another. A failure is recorded
/// against its table and the run moves on; only planning errors abort.
pub struct Coordinator<T: SeedTarget, S: RecordSynthesizer> {
    target: T,
    synthesizer: S,
    options: CoordinatorOptions,
    state: RunState,
}

impl<T: SeedTarget, S: RecordSynthesizer> Coordinator<T, S> {
    pub fn new(target: T, synthesizer: S, options: CoordinatorOptions) -> Self {
        Self {
            target,
            synthesizer,
            options,
            state: RunState::Pending,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn options(&self) -> &CoordinatorOptions {
        &self.options
    }

    /// Order `tables` and flag the ones that already hold rows.
    ///
    /// Performs reads only.
    pub async fn plan(&self, tables: &[String]) -> Result<SeedPlan, SeedError> {
        if tables.is_empty() {
            return Err(SeedError::Config("no tables to seed".into()));
        }

        let fk_edges = self.target.foreign_keys(tables).await?;
        let mut plan = DependencyGraph::build(tables, &fk_edges, &self.options.phase_groups)?;

        for name in plan.table_names().into_iter().map(str::to_string).collect::<Vec<_>>() {
            let populated = match self.target.row_count(&name).await {
                Ok(count) => count > 0,
                // reported when the table is reached
                Err(SeedError::SchemaNotFound(_)) => false,
                Err(e) => return Err(e),
            };
            plan.mark_populated(&name, populated);
        }

        info!(tables = plan.len(), edges = fk_edges.len(), "Seed plan ready");
        Ok(plan)
    }

    /// Seed `tables` and summarize the outcome.
    ///
    /// Returns `Err` only when no plan can be built, in which case nothing
    /// has been written.
    pub async fn run(&mut self, tables: &[String]) -> Result<RunSummary, SeedError> {
        let started = Instant::now();
        self.state = RunState::Pending;

        let plan = self.plan(tables).await?;
        self.state = RunState::Running;
        info!(order = ?plan.table_names(), "Starting seed run");

        let mut results = Vec::with_capacity(plan.len());
        for planned in plan.iter() {
            if self.options.cancel.is_cancelled() {
                info!(table = %planned.name, "Run cancelled, skipping table");
                results.push(SeedResult::skipped(&planned.name, SkipReason::Cancelled));
                continue;
            }

            if planned.already_populated {
                info!(table = %planned.name, "Table already populated, skipping");
                results.push(SeedResult::skipped(&planned.name, SkipReason::AlreadyPopulated));
                continue;
            }

            let span = info_span!("seed_table", table = %planned.name);
            let table_started = Instant::now();
            let result = self
                .seed_table(&planned.name)
                .instrument(span)
                .await
                .with_duration(table_started.elapsed());

            match &result.error {
                Some(e) => {
                    warn!(table = %result.table, kind = e.kind(), error = %e, "Table not seeded")
                }
                None => info!(
                    table = %result.table,
                    inserted = result.inserted,
                    status = result.status(),
                    "Table done"
                ),
            }
            results.push(result);
        }

        let summary = RunSummary::from_results(results, started.elapsed());
        self.state = summary.state;
        info!(
            state = %summary.state,
            tables = summary.tables_processed,
            rows = summary.rows_inserted,
            "Seed run finished"
        );
        Ok(summary)
    }

    /// One table pass; every failure ends up in the returned result.
    async fn seed_table(&mut self, table: &str) -> SeedResult {
        let count = self.options.row_count_for(table);
        info!(rows = count, "Seeding table");

        let descriptor = match self.target.describe(table).await {
            Ok(d) => d,
            Err(e) => return SeedResult::failed(table, 0, e),
        };

        let mut resolver =
            ReferenceResolver::for_table(&self.target, table, self.options.reference_sample_limit);
        let pool = match resolver.resolve(&descriptor).await {
            Ok(pool) => pool,
            Err(e) => return SeedResult::failed(table, 0, e),
        };

        let mut rows = match self.synthesizer.synthesize(&descriptor, &pool, count) {
            Ok(rows) => rows,
            Err(e) => return SeedResult::failed(table, 0, e),
        };
        strip_unresolved(&pool, &mut rows);
        if let Err(e) = check_references(&descriptor, &pool, &rows) {
            return SeedResult::failed(table, rows.len() as u64, e);
        }

        BatchLoader::new(&self.target, self.options.batch_size)
            .insert(&descriptor, &rows)
            .await
    }
}
