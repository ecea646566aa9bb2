//! Iterative key expansion to a fixpoint.
//!
//! Each pass takes the frontier of the [`KeySet`], searches every table
//! that can resolve a frontier kind (both stores, concurrently), hands the
//! rows to the [`RecordAggregator`] and harvests new keys from them. The
//! loop ends when a pass finds nothing new, or at the pass cap or deadline.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crossref_storage::{
    value_text, Key, KeyKind, KeyValue, NameColumns, Predicate, QueryOutcome, Record, Row,
    Source, StoreAdapter, StoreError, TableSchema,
};

use crate::aggregator::{EntityClosure, RecordAggregator, Termination};
use crate::context::{EngineContext, StoreHandle};
use crate::error::ClosureError;
use crate::graph::{KeyGraph, TableRef};
use crate::keyset::KeySet;
use crate::link::Link;
use crate::seed::Seed;
use crate::warning::ClosureWarning;

/// The outcome of one expansion run.
#[derive(Debug)]
pub struct Expansion {
    pub keys: KeySet,
    pub records: RecordAggregator,
    pub warnings: Vec<ClosureWarning>,
    pub passes: usize,
    pub termination: Termination,
}

impl Expansion {
    pub fn into_closure(self, seed: &str) -> EntityClosure {
        EntityClosure {
            seed: seed.to_string(),
            keys: self.keys,
            tables: self.records.into_tables(),
            warnings: self.warnings,
            passes: self.passes,
            termination: self.termination,
        }
    }
}

pub struct KeyExpander<'a> {
    ctx: &'a EngineContext,
    stores: [&'a StoreHandle; 2],
    graph: KeyGraph,
    schemas: BTreeMap<TableRef, TableSchema>,
}

/// State carried across passes.
struct Run {
    keys: KeySet,
    records: RecordAggregator,
    warnings: Vec<ClosureWarning>,
}

/// One unit of concurrent work within a pass.
enum Job {
    Search {
        adapter: Arc<dyn StoreAdapter>,
        table: TableRef,
        predicate: Predicate,
    },
    Link {
        adapter: Arc<dyn StoreAdapter>,
        link: Link,
        values: Vec<KeyValue>,
    },
}

/// Per-query timeout, capped by what is left of the expansion deadline.
#[derive(Debug, Clone, Copy)]
struct QueryLimit {
    timeout: Duration,
    until: Instant,
}

impl QueryLimit {
    fn next_timeout(&self) -> Duration {
        self.timeout
            .min(self.until.saturating_duration_since(Instant::now()))
    }
}

/// The result of one table query.
struct Fetched {
    table: TableRef,
    result: Result<QueryOutcome, StoreError>,
}

impl<'a> KeyExpander<'a> {
    /// Snapshot both stores' schemas. Fails if either store is missing.
    pub fn new(ctx: &'a EngineContext) -> Result<Self, ClosureError> {
        let stores = ctx.stores()?;
        let mut graph = KeyGraph::new();
        let mut schemas = BTreeMap::new();
        for store in stores {
            let source = store.source();
            for schema in store.adapter.tables() {
                graph.add_table(source, &schema);
                schemas.insert(TableRef::new(source, &schema.name), schema);
            }
        }
        Ok(KeyExpander {
            ctx,
            stores,
            graph,
            schemas,
        })
    }

    pub async fn expand(&self, seed: &Seed) -> Result<Expansion, ClosureError> {
        let budget = self.ctx.budget();
        let started = Instant::now();
        let mut run = Run {
            keys: seed.initial_keys(self.ctx.numeric_seed_kinds()),
            records: RecordAggregator::new(),
            warnings: Vec::new(),
        };

        if let Some(name) = seed.name() {
            let remaining = budget.deadline.saturating_sub(started.elapsed());
            let fetched = self.run_jobs(self.name_jobs(name), remaining, &mut run).await;
            let fetched = self.filter_by_name(fetched, name, &mut run);
            let found = self.absorb(fetched, &mut run)?;
            info!(seed = %name, new_keys = found, records = run.records.len(), "name search complete");
        }

        let mut passes = 0;
        let termination = loop {
            let unsearched = run.keys.frontier_len();
            if unsearched == 0 {
                break Termination::Fixpoint;
            }
            if passes >= budget.max_passes {
                warn!(passes, unsearched, "pass cap reached");
                run.warnings
                    .push(ClosureWarning::PassCapReached { passes, unsearched });
                break Termination::PassCap;
            }
            let elapsed = started.elapsed();
            if elapsed >= budget.deadline {
                let elapsed_ms = elapsed.as_millis() as u64;
                warn!(elapsed_ms, unsearched, "expansion deadline exceeded");
                run.warnings.push(ClosureWarning::DeadlineExceeded {
                    elapsed_ms,
                    unsearched,
                });
                break Termination::Deadline;
            }

            passes += 1;
            let frontier = run.keys.take_frontier();
            let jobs = self.pass_jobs(&frontier);
            let queries = jobs.len();
            let fetched = self
                .run_jobs(jobs, budget.deadline - elapsed, &mut run)
                .await;
            let new_keys = self.absorb(fetched, &mut run)?;
            info!(
                pass = passes,
                searched = unsearched,
                queries,
                new_keys,
                records = run.records.len(),
                "expansion pass complete"
            );
        };

        if run.records.is_empty() {
            run.warnings.push(ClosureWarning::NoRecords);
        }

        Ok(Expansion {
            keys: run.keys,
            records: run.records,
            warnings: run.warnings,
            passes,
            termination,
        })
    }

    // ──────────────────────────────────────────────
    // Planning
    // ──────────────────────────────────────────────

    fn handle(&self, source: Source) -> &StoreHandle {
        match source {
            Source::Legacy => self.stores[0],
            Source::Current => self.stores[1],
        }
    }

    fn name_jobs(&self, name: &str) -> Vec<Job> {
        self.stores
            .iter()
            .filter_map(|store| {
                let table = store.primary_table.as_deref()?;
                Some(Job::Search {
                    adapter: Arc::clone(&store.adapter),
                    table: TableRef::new(store.source(), table),
                    predicate: Predicate::name(name),
                })
            })
            .collect()
    }

    /// One query per (table, frontier kind) the graph says is searchable,
    /// ordered by store, table, kind; then one job per applicable link.
    fn pass_jobs(&self, frontier: &BTreeMap<KeyKind, Vec<KeyValue>>) -> Vec<Job> {
        for (kind, values) in frontier {
            debug!(
                kind = %kind,
                values = values.len(),
                feeds = ?self.graph.feeds(*kind),
                "planning searches"
            );
        }
        let mut searches: Vec<(&TableRef, KeyKind, &Vec<KeyValue>)> = frontier
            .iter()
            .flat_map(|(kind, values)| {
                self.graph
                    .tables_for(*kind)
                    .map(move |table| (table, *kind, values))
            })
            .collect();
        searches.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut jobs: Vec<Job> = searches
            .into_iter()
            .map(|(table, kind, values)| Job::Search {
                adapter: Arc::clone(&self.handle(table.source).adapter),
                table: table.clone(),
                predicate: Predicate::kind_in(kind, values.clone()),
            })
            .collect();

        for link in self.ctx.links() {
            if let Some(values) = frontier.get(&link.from_kind) {
                jobs.push(Job::Link {
                    adapter: Arc::clone(&self.handle(link.store).adapter),
                    link: link.clone(),
                    values: values.clone(),
                });
            }
        }
        jobs
    }

    // ──────────────────────────────────────────────
    // Execution
    // ──────────────────────────────────────────────

    /// Run jobs concurrently. Results come back in job order regardless of
    /// completion order.
    async fn run_jobs(&self, jobs: Vec<Job>, remaining: Duration, run: &mut Run) -> Vec<Fetched> {
        let limit = QueryLimit {
            timeout: self.ctx.budget().query_timeout,
            until: Instant::now() + remaining,
        };
        let mut set = JoinSet::new();
        for (order, job) in jobs.into_iter().enumerate() {
            set.spawn(async move { (order, job.execute(limit).await) });
        }

        let mut results = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(error = %e, "query task failed");
                    run.warnings.push(ClosureWarning::TaskFailed {
                        message: e.to_string(),
                    });
                }
            }
        }
        results.sort_by_key(|(order, _)| *order);
        results.into_iter().flat_map(|(_, fetched)| fetched).collect()
    }

    /// Feed query results into the run. Returns the number of new keys.
    fn absorb(&self, fetched: Vec<Fetched>, run: &mut Run) -> Result<usize, ClosureError> {
        let mut new_keys = 0;
        for Fetched { table, result } in fetched {
            match result {
                Ok(QueryOutcome::Rows(rows)) => {
                    debug!(table = %table, rows = rows.len(), "query returned");
                    new_keys += self.absorb_rows(&table, rows, run);
                }
                Ok(QueryOutcome::NotApplicable { detail }) => {
                    debug!(table = %table, %detail, "query not applicable");
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    warn!(table = %table, error = %e, "query failed; continuing without it");
                    run.warnings
                        .push(ClosureWarning::from_store_error(&table, &e));
                }
            }
        }
        Ok(new_keys)
    }

    /// Aggregate rows and harvest their keys.
    fn absorb_rows(&self, table: &TableRef, rows: Vec<Row>, run: &mut Run) -> usize {
        let schema = self.schemas.get(table);
        let mut new_keys = 0;
        if let Some(schema) = schema {
            for row in &rows {
                for (kind, column) in schema.resolver.entries() {
                    if !self.graph.is_live(kind, table) {
                        continue;
                    }
                    let key = row.get(column).and_then(|v| Key::from_value(kind, v));
                    if let Some(key) = key {
                        if run.keys.insert(key) {
                            new_keys += 1;
                        }
                    }
                }
            }
        }
        let primary_key = schema.map(|s| s.primary_key.as_str()).unwrap_or_default();
        run.records.collect(
            rows.into_iter()
                .map(|row| Record::new(table.source, &table.table, primary_key, row)),
        );
        new_keys
    }

    /// Keep name search rows whose full name equals a multi-word seed,
    /// judged across every store at once. Falls back to all rows only when
    /// no store has an exact match. Tables without name columns pass through.
    fn filter_by_name(&self, fetched: Vec<Fetched>, name: &str, run: &mut Run) -> Vec<Fetched> {
        let target = fold_name(name);
        if !target.contains(' ') {
            return fetched;
        }
        let exact = |table: &TableRef, row: &Row| match self.name_columns(table) {
            Some(columns) => full_name_matches(row, columns, &target),
            None => true,
        };

        let matched: usize = fetched
            .iter()
            .filter(|f| self.name_columns(&f.table).is_some())
            .filter_map(|f| match &f.result {
                Ok(QueryOutcome::Rows(rows)) => {
                    Some(rows.iter().filter(|r| exact(&f.table, *r)).count())
                }
                _ => None,
            })
            .sum();

        if matched > 0 {
            debug!(seed = %name, kept = matched, "name filter applied");
            return fetched
                .into_iter()
                .map(|Fetched { table, result }| {
                    let result = result.map(|outcome| match outcome {
                        QueryOutcome::Rows(rows) => QueryOutcome::Rows(
                            rows.into_iter().filter(|r| exact(&table, r)).collect(),
                        ),
                        other => other,
                    });
                    Fetched { table, result }
                })
                .collect();
        }

        let mut tables = Vec::new();
        let mut rows = 0;
        for f in &fetched {
            if let Ok(QueryOutcome::Rows(found)) = &f.result {
                if !found.is_empty() && self.name_columns(&f.table).is_some() {
                    tables.push(f.table.to_string());
                    rows += found.len();
                }
            }
        }
        if rows > 0 {
            warn!(seed = %name, rows, "no exact name match; keeping all rows");
            run.warnings.push(ClosureWarning::NameFilterFallback {
                tables,
                seed: name.to_string(),
                rows,
            });
        }
        fetched
    }

    fn name_columns(&self, table: &TableRef) -> Option<&NameColumns> {
        self.schemas.get(table).and_then(|s| s.name_columns.as_ref())
    }
}

impl Job {
    async fn execute(self, limit: QueryLimit) -> Vec<Fetched> {
        match self {
            Job::Search {
                adapter,
                table,
                predicate,
            } => {
                let result = timed_query(
                    adapter.as_ref(),
                    &table.table,
                    &predicate,
                    limit.next_timeout(),
                )
                .await;
                vec![Fetched { table, result }]
            }
            Job::Link {
                adapter,
                link,
                values,
            } => {
                let source = adapter.source();
                let lookup = TableRef::new(source, &link.lookup_table);
                let predicate = Predicate::kind_in(link.from_kind, values);
                let result = timed_query(
                    adapter.as_ref(),
                    &lookup.table,
                    &predicate,
                    limit.next_timeout(),
                )
                .await;

                let intermediate = match &result {
                    Ok(QueryOutcome::Rows(rows)) => link.intermediate_values(rows),
                    _ => Vec::new(),
                };
                let mut out = vec![Fetched {
                    table: lookup,
                    result,
                }];
                if intermediate.is_empty() {
                    return out;
                }

                debug!(link = %link, ids = intermediate.len(), "following link");
                let dependent = TableRef::new(source, &link.dependent_table);
                let predicate = Predicate::column_in(&link.dependent_column, intermediate);
                // The second hop only gets what the lookup left of the deadline.
                let result = timed_query(
                    adapter.as_ref(),
                    &dependent.table,
                    &predicate,
                    limit.next_timeout(),
                )
                .await;
                out.push(Fetched {
                    table: dependent,
                    result,
                });
                out
            }
        }
    }
}

async fn timed_query(
    adapter: &dyn StoreAdapter,
    table: &str,
    predicate: &Predicate,
    timeout: Duration,
) -> Result<QueryOutcome, StoreError> {
    debug!(store = %adapter.source(), table, predicate = %predicate, "query");
    match tokio::time::timeout(timeout, adapter.query(table, predicate)).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout {
            table: table.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

/// Lower-case and collapse whitespace.
fn fold_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// First + last (either order) equals the folded target.
fn full_name_matches(row: &Row, columns: &NameColumns, target: &str) -> bool {
    let first = row.get(&columns.first).and_then(value_text).unwrap_or_default();
    let last = row.get(&columns.last).and_then(value_text).unwrap_or_default();
    fold_name(&format!("{} {}", first, last)) == target
        || fold_name(&format!("{} {}", last, first)) == target
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        value.as_object().unwrap().clone()
    }

    fn columns() -> NameColumns {
        NameColumns {
            first: "First_Name".to_string(),
            last: "Last_Name".to_string(),
        }
    }

    #[test]
    fn full_name_matches_either_order() {
        let r = row(json!({"First_Name": " Jane ", "Last_Name": "SMITH"}));
        assert!(full_name_matches(&r, &columns(), "jane smith"));
        assert!(full_name_matches(&r, &columns(), "smith jane"));
        assert!(!full_name_matches(&r, &columns(), "jane smithson"));
    }

    #[test]
    fn fold_collapses_whitespace() {
        assert_eq!(fold_name("  Mary  Ann\tLee "), "mary ann lee");
    }
}
