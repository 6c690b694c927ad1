//! Diesel ORM models for database tables.

use diesel::prelude::*;

use crate::schema;

/// Ledger row from the `files` table.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::files)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FileRecord {
    pub id: i32,
    pub filename: String,
    pub impression_type: String,
    pub timestamp: String,
    pub directory: String,
    pub sample_rate: Option<i32>,
    pub status: String,
    pub consumed_events: Option<i32>,
    pub ignored_events: Option<i32>,
    pub invalid_events: Option<i32>,
}

/// New ledger row. Always inserted at `processing`.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::files)]
pub struct NewFile<'a> {
    pub filename: &'a str,
    pub impression_type: &'a str,
    pub timestamp: &'a str,
    pub directory: &'a str,
    pub sample_rate: Option<i32>,
    pub status: &'a str,
}

/// Aggregated CentralNotice cell.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = schema::banner_impressions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BannerImpressionRecord {
    pub id: i32,
    pub timestamp: String,
    pub banner: String,
    pub campaign: String,
    pub project_id: i32,
    pub language_id: i32,
    pub country_id: i32,
    pub event_count: f64,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = schema::banner_impressions)]
pub struct NewBannerImpression {
    pub timestamp: String,
    pub banner: String,
    pub campaign: String,
    pub project_id: i32,
    pub language_id: i32,
    pub country_id: i32,
    pub event_count: f64,
}

/// A file's contribution to one cell.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = schema::banner_impression_files)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BannerImpressionFileRecord {
    pub id: i32,
    pub file_id: i32,
    pub banner_impression_id: i32,
    pub event_count: f64,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::banner_impression_files)]
pub struct NewBannerImpressionFile {
    pub file_id: i32,
    pub banner_impression_id: i32,
    pub event_count: f64,
}

/// Raw LandingPage impression.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = schema::landing_page_impressions_raw)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LandingPageImpressionRecord {
    pub id: i32,
    pub timestamp: String,
    pub utm_source: String,
    pub utm_campaign: String,
    pub utm_medium: String,
    pub utm_key: String,
    pub landingpage: String,
    pub project_id: i32,
    pub language_id: i32,
    pub country_id: i32,
    pub file_id: i32,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = schema::landing_page_impressions_raw)]
pub struct NewLandingPageImpression {
    pub timestamp: String,
    pub utm_source: String,
    pub utm_campaign: String,
    pub utm_medium: String,
    pub utm_key: String,
    pub landingpage: String,
    pub project_id: i32,
    pub language_id: i32,
    pub country_id: i32,
    pub file_id: i32,
}

/// First impression seen for a (utm_source, contact_id) pair.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = schema::donatewiki_unique)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DonatewikiUniqueRecord {
    pub id: i32,
    pub timestamp: String,
    pub utm_source: String,
    pub utm_campaign: String,
    pub contact_id: String,
    pub link_id: String,
    pub file_id: i32,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = schema::donatewiki_unique)]
pub struct NewDonatewikiUnique {
    pub timestamp: String,
    pub utm_source: String,
    pub utm_campaign: String,
    pub contact_id: String,
    pub link_id: String,
    pub file_id: i32,
}
