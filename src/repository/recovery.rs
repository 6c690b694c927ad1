//! Rollback of files left at `processing` by an interrupted run.

use std::collections::BTreeSet;

use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::context::RunContext;
use super::ledger::FileLedger;
use super::models::BannerImpressionFileRecord;
use super::pool::{DieselError, SqliteConn};
use crate::models::EventKind;
use crate::schema::{
    banner_impression_files, banner_impressions, donatewiki_unique, landing_page_impressions_raw,
};

/// Cells whose count ends within this distance of zero are deleted.
pub const ZERO_COUNT_TOLERANCE: f64 = 1e-9;

/// Rows removed by a purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeStats {
    /// Cells that had a purged file's count subtracted.
    pub cells_updated: usize,
    /// Cells deleted because nothing else contributed to them.
    pub cells_deleted: usize,
    pub links_deleted: usize,
    pub raw_rows_deleted: usize,
    pub unique_rows_deleted: usize,
    pub files_deleted: usize,
}

/// Undo everything stored for `processing` files of `kind`, then delete
/// their ledger records. Runs in one transaction.
pub async fn purge_incomplete(
    ctx: &mut RunContext,
    kind: EventKind,
) -> Result<PurgeStats, DieselError> {
    let stats = ctx
        .conn()
        .transaction(|conn| {
            Box::pin(async move {
                let file_ids = FileLedger::processing_ids(conn, kind).await?;
                let mut stats = match kind {
                    EventKind::CentralNotice => purge_aggregates(conn, &file_ids).await?,
                    EventKind::LandingPage => purge_raw_rows(conn, &file_ids).await?,
                };
                stats.files_deleted = FileLedger::delete_processing(conn, kind).await?;
                Ok::<_, DieselError>(stats)
            })
        })
        .await?;

    ctx.forget_known_files();

    info!(
        "Purged {} incomplete {} files: {:?}",
        stats.files_deleted, kind, stats
    );
    Ok(stats)
}

async fn purge_aggregates(
    conn: &mut SqliteConn,
    file_ids: &[i32],
) -> Result<PurgeStats, DieselError> {
    let links: Vec<BannerImpressionFileRecord> = banner_impression_files::table
        .filter(banner_impression_files::file_id.eq_any(file_ids))
        .select(BannerImpressionFileRecord::as_select())
        .load(conn)
        .await?;

    let mut touched = BTreeSet::new();
    for link in &links {
        diesel::update(banner_impressions::table.find(link.banner_impression_id))
            .set(
                banner_impressions::event_count
                    .eq(banner_impressions::event_count - link.event_count),
            )
            .execute(conn)
            .await?;
        touched.insert(link.banner_impression_id);
    }
    let touched: Vec<i32> = touched.into_iter().collect();

    let cells_deleted = diesel::delete(
        banner_impressions::table
            .filter(banner_impressions::id.eq_any(&touched))
            .filter(
                banner_impressions::event_count
                    .between(-ZERO_COUNT_TOLERANCE, ZERO_COUNT_TOLERANCE),
            ),
    )
    .execute(conn)
    .await?;

    let links_deleted = diesel::delete(
        banner_impression_files::table.filter(banner_impression_files::file_id.eq_any(file_ids)),
    )
    .execute(conn)
    .await?;

    Ok(PurgeStats {
        cells_updated: touched.len(),
        cells_deleted,
        links_deleted,
        ..PurgeStats::default()
    })
}

async fn purge_raw_rows(
    conn: &mut SqliteConn,
    file_ids: &[i32],
) -> Result<PurgeStats, DieselError> {
    let raw_rows_deleted = diesel::delete(
        landing_page_impressions_raw::table
            .filter(landing_page_impressions_raw::file_id.eq_any(file_ids)),
    )
    .execute(conn)
    .await?;

    let unique_rows_deleted = diesel::delete(
        donatewiki_unique::table.filter(donatewiki_unique::file_id.eq_any(file_ids)),
    )
    .execute(conn)
    .await?;

    Ok(PurgeStats {
        raw_rows_deleted,
        unique_rows_deleted,
        ..PurgeStats::default()
    })
}
