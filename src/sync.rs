//! Bringing the table up to date with the published releases.

use crate::github::Release;
use crate::resolve::Resolve;
use crate::table::Table;
use tracing::{info, warn};

/// Outcome counts of one synchronization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Releases already in the table
    pub known: usize,
    pub added: usize,
    pub failed: usize,
}

/// Resolve every release whose tag isn't in `table` yet and append the
/// result.
///
/// Releases are handled one at a time, in the given order. A release that
/// fails to resolve is logged and skipped; it stays out of the table and is
/// retried on the next run.
pub async fn sync<R: Resolve>(table: &mut Table, releases: &[Release], resolver: &R) -> SyncSummary {
    let mut seen = table.versions();
    let mut summary = SyncSummary::default();

    for release in releases {
        if seen.contains(&release.tag_name) {
            summary.known += 1;
            continue;
        }

        info!("Checking {}", release.tag_name);
        match resolver.resolve(release).await {
            Ok(row) => {
                seen.insert(release.tag_name.clone());
                table.push(row);
                summary.added += 1;
            }
            Err(e) => {
                warn!("{}: {}", release.tag_name, e);
                summary.failed += 1;
            }
        }
    }

    summary
}
