//! Per-file aggregation of CentralNotice impressions.
//!
//! Events are folded into cells in memory. Saving merges the cells into the
//! `banner_impressions` table by adding to existing counts, and records each
//! file's contribution in `banner_impression_files` so it can be undone.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Timelike, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use regex::Regex;

use super::context::RunContext;
use super::ledger::LogFileHandle;
use super::models::{NewBannerImpression, NewBannerImpressionFile};
use super::pool::DieselError;
use super::util::format_timestamp;
use crate::error::ConsumerError;
use crate::models::{CentralNoticeEvent, DimensionKind, SampleRate};
use crate::schema::{banner_impression_files, banner_impressions};

/// Decides which projects and languages are aggregated individually.
#[derive(Debug, Clone)]
pub struct DetailFilter {
    projects: Regex,
    languages: HashSet<String>,
}

impl DetailFilter {
    /// `projects` is applied with `is_match`; compile it anchored at the start.
    pub fn new(projects: Regex, languages: impl IntoIterator<Item = String>) -> Self {
        Self {
            projects,
            languages: languages.into_iter().collect(),
        }
    }

    fn project(&self, code: &str) -> Folded {
        if self.projects.is_match(code) {
            Folded::Detail(code.to_string())
        } else {
            Folded::Other
        }
    }

    fn language(&self, code: &str) -> Folded {
        if self.languages.contains(code) {
            Folded::Detail(code.to_string())
        } else {
            Folded::Other
        }
    }
}

/// A project or language, either tracked individually or folded into the
/// shared sentinel row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Folded {
    Detail(String),
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct CellKey {
    minute: DateTime<Utc>,
    banner: String,
    campaign: String,
    project: Folded,
    language: Folded,
    country: String,
}

fn truncate_to_minute(time: DateTime<Utc>) -> DateTime<Utc> {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

/// Outcome of saving a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub cells_inserted: usize,
    pub cells_merged: usize,
}

/// Accumulates one file's events.
pub struct AggregationSession<'a> {
    file_id: i32,
    weight: f64,
    filter: &'a DetailFilter,
    cells: BTreeMap<CellKey, f64>,
}

impl<'a> AggregationSession<'a> {
    pub fn new(handle: &LogFileHandle, sample_rate: SampleRate, filter: &'a DetailFilter) -> Self {
        Self {
            file_id: handle.id(),
            weight: sample_rate.weight(),
            filter,
            cells: BTreeMap::new(),
        }
    }

    /// Add one event. Does not touch the store.
    pub fn add_event(&mut self, event: &CentralNoticeEvent) {
        let key = CellKey {
            minute: truncate_to_minute(event.time),
            banner: event.banner.clone().unwrap_or_default(),
            campaign: event.campaign.clone().unwrap_or_default(),
            project: self.filter.project(&event.project),
            language: self.filter.language(&event.language),
            country: event.country.clone(),
        };
        *self.cells.entry(key).or_insert(0.0) += self.weight;
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Write the session's cells in one transaction.
    ///
    /// Dimension rows are resolved first, outside the transaction. A stored
    /// cell with the same key gets this file's count added to it.
    pub async fn save(self, ctx: &mut RunContext) -> Result<SaveSummary, ConsumerError> {
        let mut project_ids: HashMap<Folded, i32> = HashMap::new();
        let mut language_ids: HashMap<Folded, i32> = HashMap::new();
        let mut country_ids: HashMap<String, i32> = HashMap::new();

        for key in self.cells.keys() {
            if !project_ids.contains_key(&key.project) {
                let row = match key.project {
                    Folded::Detail(ref code) => ctx.dimension(DimensionKind::Project, code).await?,
                    Folded::Other => ctx.other_project().await?,
                };
                project_ids.insert(key.project.clone(), row.id);
            }
            if !language_ids.contains_key(&key.language) {
                let row = match key.language {
                    Folded::Detail(ref code) => {
                        ctx.dimension(DimensionKind::Language, code).await?
                    }
                    Folded::Other => ctx.other_language().await?,
                };
                language_ids.insert(key.language.clone(), row.id);
            }
            if !country_ids.contains_key(&key.country) {
                let row = ctx.dimension(DimensionKind::Country, &key.country).await?;
                country_ids.insert(key.country.clone(), row.id);
            }
        }

        let cells: Vec<NewBannerImpression> = self
            .cells
            .into_iter()
            .map(|(key, count)| NewBannerImpression {
                timestamp: format_timestamp(&key.minute),
                project_id: project_ids[&key.project],
                language_id: language_ids[&key.language],
                country_id: country_ids[&key.country],
                banner: key.banner,
                campaign: key.campaign,
                event_count: count,
            })
            .collect();

        let file_id = self.file_id;
        let summary = ctx
            .conn()
            .transaction(|conn| {
                Box::pin(async move {
                    let mut summary = SaveSummary::default();

                    for cell in cells {
                        let existing: Option<i32> = banner_impressions::table
                            .filter(banner_impressions::timestamp.eq(&cell.timestamp))
                            .filter(banner_impressions::banner.eq(&cell.banner))
                            .filter(banner_impressions::campaign.eq(&cell.campaign))
                            .filter(banner_impressions::project_id.eq(cell.project_id))
                            .filter(banner_impressions::language_id.eq(cell.language_id))
                            .filter(banner_impressions::country_id.eq(cell.country_id))
                            .select(banner_impressions::id)
                            .first(conn)
                            .await
                            .optional()?;

                        let cell_id = match existing {
                            Some(id) => {
                                diesel::update(banner_impressions::table.find(id))
                                    .set(
                                        banner_impressions::event_count
                                            .eq(banner_impressions::event_count + cell.event_count),
                                    )
                                    .execute(conn)
                                    .await?;
                                summary.cells_merged += 1;
                                id
                            }
                            None => {
                                diesel::insert_into(banner_impressions::table)
                                    .values(&cell)
                                    .execute(conn)
                                    .await?;
                                summary.cells_inserted += 1;
                                banner_impressions::table
                                    .filter(banner_impressions::timestamp.eq(&cell.timestamp))
                                    .filter(banner_impressions::banner.eq(&cell.banner))
                                    .filter(banner_impressions::campaign.eq(&cell.campaign))
                                    .filter(banner_impressions::project_id.eq(cell.project_id))
                                    .filter(banner_impressions::language_id.eq(cell.language_id))
                                    .filter(banner_impressions::country_id.eq(cell.country_id))
                                    .select(banner_impressions::id)
                                    .first::<i32>(conn)
                                    .await?
                            }
                        };

                        diesel::insert_into(banner_impression_files::table)
                            .values(NewBannerImpressionFile {
                                file_id,
                                banner_impression_id: cell_id,
                                event_count: cell.event_count,
                            })
                            .execute(conn)
                            .await?;
                    }

                    Ok::<_, DieselError>(summary)
                })
            })
            .await?;

        Ok(summary)
    }
}
