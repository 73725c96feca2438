//! Shared content import into the local read-only mirrors.
//!
//! Rows other users share arrive with their owner's `user_id`; locally they
//! are stored under `sharer_id` in a mirror table, never in the user's own
//! tables.

use crate::config::SharedSource;
use crate::engine::EngineInner;
use crate::error::SyncResult;
use crate::filter::OWNER_COLUMN;
use crate::local::SHARER_COLUMN;
use crate::query::{Filter, OrderBy, SelectQuery};
use crate::remote::RemoteStore;
use crate::report::{ImportReport, MirrorImport};
use std::sync::Arc;
use tracing::{debug, info, warn};
use verba_types::{Record, UserId};

/// Turns a row shared by someone else into a mirror row.
///
/// Returns `None` for the user's own rows and rows without a `sync_id`.
fn to_mirror_row(mut row: Record, me: &UserId) -> Option<Record> {
    let owner = row.user_id()?.to_string();
    if owner == me.as_str() || row.sync_id().is_none() {
        return None;
    }
    row.remove(OWNER_COLUMN);
    row.insert(SHARER_COLUMN, owner);
    Some(row)
}

impl EngineInner {
    pub(crate) async fn import_shared_content(&self) -> ImportReport {
        let (remote, user_id) = match self.remote_context() {
            Ok(ctx) => ctx,
            Err(reason) => {
                debug!("Skipping shared import: {:?}", reason);
                return ImportReport {
                    skipped: Some(reason),
                    ..Default::default()
                };
            }
        };

        let mut report = ImportReport::default();
        for source in &self.config.shared_sources {
            let entry = match self.import_source(&remote, source, &user_id).await {
                Ok((fetched, stored)) => MirrorImport {
                    mirror: source.mirror,
                    fetched,
                    stored,
                    error: None,
                },
                Err(e) => {
                    warn!("Import of {} from {} failed: {}", source.mirror, source.relation, e);
                    MirrorImport {
                        mirror: source.mirror,
                        fetched: 0,
                        stored: 0,
                        error: Some(e.to_string()),
                    }
                }
            };
            report.mirrors.push(entry);
        }

        info!("Shared import complete for {} mirrors", report.mirrors.len());
        report
    }

    async fn import_source(
        &self,
        remote: &Arc<dyn RemoteStore>,
        source: &SharedSource,
        user_id: &UserId,
    ) -> SyncResult<(usize, usize)> {
        let query = SelectQuery::new()
            .filter(Filter::neq(OWNER_COLUMN, user_id.as_str()))
            .order(OrderBy::newest_first());
        let rows = self.bounded(remote.select(&source.relation, &query)).await?;
        let fetched = rows.len();

        let table = source.mirror.source();
        let mirror_rows: Vec<Record> = rows
            .into_iter()
            .filter_map(|row| self.filter.admit_inbound(table, row))
            .filter_map(|row| to_mirror_row(row, user_id))
            .collect();

        let stored = self.local.replace_mirror(source.mirror, mirror_rows).await?;
        debug!("{}: {} shared rows fetched, {} stored", source.mirror, fetched, stored);
        Ok((fetched, stored))
    }
}
