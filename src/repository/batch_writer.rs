//! Batched writes of raw LandingPage impressions.

use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::debug;

use super::context::RunContext;
use super::ledger::LogFileHandle;
use super::models::{NewDonatewikiUnique, NewLandingPageImpression};
use super::pool::DieselError;
use super::util::format_timestamp;
use crate::error::ConsumerError;
use crate::models::{DimensionKind, LandingPageEvent};
use crate::schema::{donatewiki_unique, landing_page_impressions_raw};

/// Buffers one file's rows and writes them in batches.
///
/// Each flush writes every buffered raw row and, ignoring duplicates, the
/// matching `donatewiki_unique` rows in a single transaction.
pub struct BatchWriter {
    file_id: i32,
    max_batch: usize,
    raw: Vec<NewLandingPageImpression>,
    unique: Vec<NewDonatewikiUnique>,
    rows_written: usize,
    flushes: usize,
}

impl BatchWriter {
    pub fn new(handle: &LogFileHandle, max_batch: usize) -> Self {
        Self {
            file_id: handle.id(),
            max_batch,
            raw: Vec::new(),
            unique: Vec::new(),
            rows_written: 0,
            flushes: 0,
        }
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Buffer an event, flushing once the buffer holds more than `max_batch`
    /// rows. Returns whether a flush happened.
    pub async fn add_and_maybe_flush(
        &mut self,
        ctx: &mut RunContext,
        event: &LandingPageEvent,
    ) -> Result<bool, ConsumerError> {
        let project = ctx.dimension(DimensionKind::Project, &event.project).await?;
        let language = ctx.dimension(DimensionKind::Language, &event.language).await?;
        let country = ctx.dimension(DimensionKind::Country, &event.country).await?;
        let timestamp = format_timestamp(&event.time);

        self.raw.push(NewLandingPageImpression {
            timestamp: timestamp.clone(),
            utm_source: event.utm_source.clone(),
            utm_campaign: event.utm_campaign.clone(),
            utm_medium: event.utm_medium.clone(),
            utm_key: event.utm_key.clone(),
            landingpage: event.landingpage.clone(),
            project_id: project.id,
            language_id: language.id,
            country_id: country.id,
            file_id: self.file_id,
        });
        self.unique.push(NewDonatewikiUnique {
            timestamp,
            utm_source: event.utm_source.clone(),
            utm_campaign: event.utm_campaign.clone(),
            contact_id: event.contact_id.clone(),
            link_id: event.link_id.clone(),
            file_id: self.file_id,
        });

        if self.raw.len() > self.max_batch {
            self.flush(ctx).await?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Write whatever is still buffered. A no-op when the buffer is empty.
    pub async fn flush_remaining(&mut self, ctx: &mut RunContext) -> Result<usize, ConsumerError> {
        if self.raw.is_empty() {
            return Ok(0);
        }
        self.flush(ctx).await
    }

    async fn flush(&mut self, ctx: &mut RunContext) -> Result<usize, ConsumerError> {
        let raw = std::mem::take(&mut self.raw);
        let unique = std::mem::take(&mut self.unique);
        let count = raw.len();

        debug!("Writing {} landingpage events", count);

        ctx.conn()
            .transaction(|conn| {
                Box::pin(async move {
                    // SQLite can't take multi-row inserts here, one row per statement
                    for row in &raw {
                        diesel::insert_into(landing_page_impressions_raw::table)
                            .values(row)
                            .execute(conn)
                            .await?;
                    }
                    for row in &unique {
                        diesel::insert_or_ignore_into(donatewiki_unique::table)
                            .values(row)
                            .execute(conn)
                            .await?;
                    }
                    Ok::<_, DieselError>(())
                })
            })
            .await?;

        self.rows_written += count;
        self.flushes += 1;
        Ok(count)
    }
}
