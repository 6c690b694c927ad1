//! Dimension lookup with create-on-first-sight.
//!
//! Dimension rows are append-only: once a code has an id it never changes,
//! so ids are cached for the rest of the run.

use std::collections::HashMap;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use super::pool::SqliteConn;
use crate::error::ConsumerError;
use crate::models::{DimensionKind, DimensionRow};
use crate::schema::{countries, languages, projects};

/// Find a row by code, inserting it when absent.
macro_rules! find_or_insert {
    ($conn:expr, $table:ident, $kind:expr, $code:expr) => {{
        let existing: Option<i32> = $table::table
            .filter($table::code.eq($code))
            .select($table::id)
            .first($conn)
            .await
            .optional()?;

        match existing {
            Some(id) => id,
            None => {
                if !$kind.is_valid_code($code) {
                    return Err(ConsumerError::InvalidDimensionCode {
                        kind: $kind,
                        code: $code.to_string(),
                    });
                }
                diesel::insert_into($table::table)
                    .values($table::code.eq($code))
                    .execute($conn)
                    .await?;
                debug!("Created {} {}", $kind, $code);
                $table::table
                    .filter($table::code.eq($code))
                    .select($table::id)
                    .first::<i32>($conn)
                    .await?
            }
        }
    }};
}

/// Per-run cache of dimension ids, one map per dimension table.
#[derive(Debug, Default)]
pub struct DimensionCache {
    projects: HashMap<String, i32>,
    languages: HashMap<String, i32>,
    countries: HashMap<String, i32>,
}

impl DimensionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&mut self, kind: DimensionKind) -> &mut HashMap<String, i32> {
        match kind {
            DimensionKind::Project => &mut self.projects,
            DimensionKind::Language => &mut self.languages,
            DimensionKind::Country => &mut self.countries,
        }
    }

    /// Resolve a code to its row, creating the row if the store has none.
    ///
    /// A malformed code is only an error when the row would have to be
    /// created.
    pub async fn get_or_create(
        &mut self,
        conn: &mut SqliteConn,
        kind: DimensionKind,
        code: &str,
    ) -> Result<DimensionRow, ConsumerError> {
        if let Some(&id) = self.map(kind).get(code) {
            return Ok(DimensionRow {
                kind,
                id,
                code: code.to_string(),
            });
        }

        let id = match kind {
            DimensionKind::Project => find_or_insert!(conn, projects, kind, code),
            DimensionKind::Language => find_or_insert!(conn, languages, kind, code),
            DimensionKind::Country => find_or_insert!(conn, countries, kind, code),
        };

        self.map(kind).insert(code.to_string(), id);
        Ok(DimensionRow {
            kind,
            id,
            code: code.to_string(),
        })
    }
}
