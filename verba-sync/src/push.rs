//! Outbound path: queue flushes and the full local export push.
//!
//! Every row sent from here has been through
//! [`OwnershipFilter::prepare_outbound`](crate::filter::OwnershipFilter::prepare_outbound).

use crate::engine::EngineInner;
use crate::error::{SyncError, SyncResult};
use crate::filter::OWNER_COLUMN;
use crate::query::Filter;
use crate::remote::{RemoteStore, RowError, UpsertOutcome};
use crate::report::{FlushReport, PushReport, TablePush};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use verba_types::{ConflictKey, MutationOp, PendingMutation, Record, Table, UserId};

/// Collapses a drained batch to the last operation per `(table, key)`.
///
/// Mutations without a conflict key are removed. Returns the survivors in
/// queue order, the number superseded and the number removed as keyless.
pub(crate) fn collapse(batch: Vec<PendingMutation>) -> (Vec<PendingMutation>, usize, usize) {
    let mut seen: HashSet<(Table, String)> = HashSet::new();
    let mut kept = Vec::with_capacity(batch.len());
    let mut coalesced = 0;
    let mut keyless = 0;

    for mutation in batch.into_iter().rev() {
        let Some(key) = mutation.conflict_value() else {
            warn!(
                "Dropping {:?} on {} without a {} value",
                mutation.op,
                mutation.table,
                mutation.table.conflict_key().local_column()
            );
            keyless += 1;
            continue;
        };
        if seen.insert((mutation.table, key)) {
            kept.push(mutation);
        } else {
            coalesced += 1;
        }
    }
    kept.reverse();
    (kept, coalesced, keyless)
}

/// Filters identifying one remote row of `table`.
pub(crate) fn key_filters(table: Table, value: &str, user_id: &UserId) -> Vec<Filter> {
    match table.conflict_key() {
        ConflictKey::SyncId => vec![Filter::eq("sync_id", value)],
        ConflictKey::UserAndKey => vec![
            Filter::eq(OWNER_COLUMN, user_id.as_str()),
            Filter::eq("key", value),
        ],
    }
}

fn row_error(index: usize, error: &SyncError) -> RowError {
    let message = match error {
        SyncError::Remote { message, .. } => message.clone(),
        other => other.to_string(),
    };
    RowError { index, message }
}

/// A queued mutation with its position in the drained batch and the
/// filtered payload that goes on the wire.
struct Outbound {
    position: usize,
    mutation: PendingMutation,
    row: Record,
}

impl EngineInner {
    /// Upserts one chunk of `table` rows.
    ///
    /// When the store rejects the chunk as a whole, the rows are resent one
    /// at a time to find the bad ones. Every request gets its own deadline.
    /// A transient failure during the resend marks the remaining rows failed.
    pub(crate) async fn upsert_chunk(
        &self,
        remote: &Arc<dyn RemoteStore>,
        table: Table,
        rows: &[Record],
    ) -> SyncResult<UpsertOutcome> {
        let relation = table.as_str();
        let conflict_key = table.conflict_key();
        let rejection = match self
            .bounded(remote.upsert_batch(relation, rows.to_vec(), conflict_key))
            .await
        {
            Ok(outcome) => return Ok(outcome),
            Err(e @ SyncError::Remote { .. }) if !e.is_transient() => e,
            Err(e) => return Err(e),
        };
        if rows.len() == 1 {
            return Ok(UpsertOutcome {
                failed: vec![row_error(0, &rejection)],
            });
        }

        warn!(
            "{} rejected {} {} rows ({}); retrying row by row",
            remote.name(),
            rows.len(),
            table,
            rejection
        );
        let mut outcome = UpsertOutcome::ok();
        for (index, row) in rows.iter().enumerate() {
            match self
                .bounded(remote.upsert_batch(relation, vec![row.clone()], conflict_key))
                .await
            {
                Ok(single) => outcome
                    .failed
                    .extend(single.failed.into_iter().map(|e| RowError { index, ..e })),
                Err(e) if e.is_transient() => {
                    warn!("Row retry on {} stopped at {}/{}: {}", table, index, rows.len(), e);
                    outcome
                        .failed
                        .extend((index..rows.len()).map(|i| row_error(i, &e)));
                    break;
                }
                Err(e) => outcome.failed.push(row_error(index, &e)),
            }
        }
        Ok(outcome)
    }

    /// Drains the queue and sends it. Scheduler bookkeeping is the caller's.
    pub(crate) async fn flush_snapshot(&self) -> FlushReport {
        let (remote, user_id) = match self.remote_context() {
            Ok(ctx) => ctx,
            Err(reason) => {
                debug!("Skipping flush: {:?}", reason);
                return FlushReport::skipped(reason);
            }
        };

        let batch = self.queue.drain_snapshot();
        if batch.is_empty() {
            return FlushReport::default();
        }
        let drained = batch.len();
        let (batch, coalesced, keyless) = collapse(batch);
        let mut report = FlushReport {
            coalesced,
            dropped: keyless,
            ..Default::default()
        };

        let mut upserts: BTreeMap<Table, Vec<Outbound>> = BTreeMap::new();
        let mut deletes: Vec<Outbound> = Vec::new();
        for (position, mutation) in batch.into_iter().enumerate() {
            let Some(row) = self
                .filter
                .prepare_outbound(mutation.table, &mutation.payload, &user_id)
            else {
                debug!("Dropping excluded {} row from flush", mutation.table);
                report.dropped += 1;
                continue;
            };
            let item = Outbound {
                position,
                mutation,
                row,
            };
            match item.mutation.op {
                MutationOp::Upsert => upserts.entry(item.mutation.table).or_default().push(item),
                MutationOp::Delete => deletes.push(item),
            }
        }

        let mut failed: Vec<(usize, PendingMutation)> = Vec::new();

        for (table, items) in upserts {
            let mut items = items.into_iter().peekable();
            while items.peek().is_some() {
                let chunk: Vec<Outbound> = items.by_ref().take(self.config.effective_batch_size()).collect();
                let rows: Vec<Record> = chunk.iter().map(|o| o.row.clone()).collect();

                match self.upsert_chunk(&remote, table, &rows).await {
                    Ok(outcome) => {
                        let rejected = outcome.failed_indices();
                        for error in &outcome.failed {
                            warn!("{} rejected {} row: {}", remote.name(), table, error.message);
                        }
                        for (index, item) in chunk.into_iter().enumerate() {
                            if rejected.contains(&index) {
                                failed.push((item.position, item.mutation));
                            } else {
                                report.sent += 1;
                            }
                        }
                    }
                    Err(e) if e.is_transient() => {
                        warn!("Upsert of {} {} rows failed, retrying later: {}", chunk.len(), table, e);
                        failed.extend(chunk.into_iter().map(|o| (o.position, o.mutation)));
                    }
                    Err(e) => {
                        error!("Upsert of {} {} rows rejected: {}", chunk.len(), table, e);
                        failed.extend(chunk.into_iter().map(|o| (o.position, o.mutation)));
                    }
                }
            }
        }

        for item in deletes {
            let table = item.mutation.table;
            let Some(value) = item.row.conflict_value(table) else {
                report.dropped += 1;
                continue;
            };
            let key = key_filters(table, &value, &user_id);
            match self.bounded(remote.delete_by_key(table.as_str(), &key)).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    warn!("Delete of {} row {} failed: {}", table, value, e);
                    failed.push((item.position, item.mutation));
                }
            }
        }

        failed.sort_by_key(|(position, _)| *position);
        report.requeued = failed.len();
        self.queue
            .requeue(failed.into_iter().map(|(_, m)| m).collect());

        info!(
            "Flushed {} mutations: {} sent, {} requeued, {} coalesced, {} dropped",
            drained, report.sent, report.requeued, report.coalesced, report.dropped
        );
        report
    }

    /// Uploads every exportable local row of every configured table.
    ///
    /// Built-in rows and rows without a conflict key are not pushed.
    pub(crate) async fn push_all_local(&self) -> PushReport {
        let (remote, user_id) = match self.remote_context() {
            Ok(ctx) => ctx,
            Err(reason) => {
                debug!("Skipping local push: {:?}", reason);
                return PushReport {
                    skipped: Some(reason),
                    ..Default::default()
                };
            }
        };

        let mut report = PushReport::default();
        for &table in &self.config.tables {
            let mut entry = TablePush {
                table,
                pushed: 0,
                failed: 0,
                error: None,
            };

            let rows = match self.local.export_all(table).await {
                Ok(rows) => rows,
                Err(e) => {
                    warn!("Failed to export {}: {}", table, e);
                    entry.error = Some(e.to_string());
                    report.tables.push(entry);
                    continue;
                }
            };

            let outbound: Vec<Record> = rows
                .iter()
                .filter(|row| !row.is_builtin() && row.conflict_value(table).is_some())
                .filter_map(|row| self.filter.prepare_outbound(table, row, &user_id))
                .collect();

            for chunk in outbound.chunks(self.config.effective_batch_size()) {
                match self.upsert_chunk(&remote, table, chunk).await {
                    Ok(outcome) => {
                        entry.failed += outcome.failed.len();
                        entry.pushed += chunk.len() - outcome.failed.len();
                    }
                    Err(e) => {
                        warn!("Pushing {} {} rows failed: {}", chunk.len(), table, e);
                        entry.failed += chunk.len();
                        entry.error = Some(e.to_string());
                    }
                }
            }

            debug!("Pushed {}/{} {} rows", entry.pushed, rows.len(), table);
            report.tables.push(entry);
        }

        info!("Local push complete: {} rows", report.pushed());
        report
    }
}
