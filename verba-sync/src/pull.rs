//! Inbound path: pull each table and merge it locally with last-write-wins.

use crate::engine::EngineInner;
use crate::error::SyncResult;
use crate::query::{OrderBy, SelectQuery};
use crate::remote::RemoteStore;
use crate::report::{PullReport, TablePull};
use std::sync::Arc;
use tracing::{debug, info, warn};
use verba_types::{Table, UserId};

impl EngineInner {
    /// Pulls every configured table. Tables are independent: one failing
    /// does not stop the rest.
    pub(crate) async fn pull_remote_data(&self) -> PullReport {
        let (remote, user_id) = match self.remote_context() {
            Ok(ctx) => ctx,
            Err(reason) => {
                debug!("Skipping pull: {:?}", reason);
                return PullReport {
                    skipped: Some(reason),
                    ..Default::default()
                };
            }
        };

        let mut report = PullReport::default();
        for &table in &self.config.tables {
            match self.pull_table(&remote, table, &user_id).await {
                Ok(entry) => report.tables.push(entry),
                Err(e) => {
                    warn!("Pull of {} failed: {}", table, e);
                    report.tables.push(TablePull::failed(table, e.to_string()));
                }
            }
        }

        info!(
            "Pull complete: {} rows merged, {} tables failed",
            report.merged(),
            report.failed_tables().len()
        );
        report
    }

    async fn pull_table(
        &self,
        remote: &Arc<dyn RemoteStore>,
        table: Table,
        user_id: &UserId,
    ) -> SyncResult<TablePull> {
        let query = SelectQuery::new()
            .filter_opt(self.filter.scope_filter(table, user_id))
            .order(OrderBy::newest_first());
        let rows = self.bounded(remote.select(table.as_str(), &query)).await?;
        let fetched = rows.len();

        let admitted: Vec<_> = rows
            .into_iter()
            .filter_map(|row| self.filter.admit_inbound(table, row))
            .collect();
        let rejected = fetched - admitted.len();
        if rejected > 0 {
            debug!("Refused {} {} rows carrying secret values", rejected, table);
        }

        let merge = self.local.merge_rows(table, admitted).await?;
        debug!(
            "Merged {} of {} {} rows ({} kept local)",
            merge.merged, fetched, table, merge.skipped
        );

        Ok(TablePull {
            table,
            fetched,
            rejected,
            merged: merge.merged,
            skipped: merge.skipped,
            error: None,
        })
    }
}
