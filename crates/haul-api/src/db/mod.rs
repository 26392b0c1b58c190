//! # Database Persistence Layer
//!
//! Optional Postgres persistence via SQLx.
//!
//! When `DATABASE_URL` is set, loads, trips, roster links, expenses, and
//! fleet records are written through on every change and read back on
//! startup. When absent, the API runs in-memory only.
//!
//! Each record is stored as a JSONB document next to the columns the
//! database needs to check it: owner, status (guarded by a CHECK
//! constraint), and foreign keys. Status transitions are enforced in
//! `haul-state`, not in SQL.

pub mod fleet;
pub mod loads;
pub mod trips;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set; running in-memory only mode. \
                 State will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// Serialize a record for a JSONB column.
fn to_document<T: Serialize>(kind: &str, value: &T) -> Result<serde_json::Value, sqlx::Error> {
    serde_json::to_value(value)
        .map_err(|e| sqlx::Error::Protocol(format!("failed to serialize {kind}: {e}")))
}

/// Serialize a unit enum to the bare string stored in a status column.
fn to_label<T: Serialize + std::fmt::Debug>(kind: &str, value: &T) -> Result<String, sqlx::Error> {
    Ok(to_document(kind, value)?
        .as_str()
        .map(String::from)
        .unwrap_or_else(|| format!("{value:?}")))
}

/// Row shape shared by every document table.
#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    document: serde_json::Value,
}

/// Decode document rows, skipping any that no longer match the record type.
fn from_documents<T: DeserializeOwned>(kind: &str, rows: Vec<DocumentRow>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row.document) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(id = %row.id, error = %e, "skipping undecodable {kind} row");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use haul_state::{LoadStatus, TripStatus};
    use serde_json::json;

    #[test]
    fn status_labels_match_check_constraints() {
        assert_eq!(to_label("load", &LoadStatus::InTransit).unwrap(), "in_transit");
        assert_eq!(
            to_label("load", &LoadStatus::StorageCompleted).unwrap(),
            "storage_completed"
        );
        assert_eq!(to_label("trip", &TripStatus::EnRoute).unwrap(), "en_route");
    }

    #[test]
    fn every_status_appears_in_the_migration() {
        let migration = include_str!("../../migrations/0001_init.sql");
        for status in LoadStatus::ALL {
            assert!(
                migration.contains(&format!("'{}'", status.as_str())),
                "load status {status} missing from CHECK constraint"
            );
        }
        for status in TripStatus::ALL {
            assert!(
                migration.contains(&format!("'{}'", status.as_str())),
                "trip status {status} missing from CHECK constraint"
            );
        }
    }

    #[test]
    fn undecodable_rows_are_skipped() {
        let rows = vec![
            DocumentRow {
                id: Uuid::new_v4(),
                document: json!({ "value": 1 }),
            },
            DocumentRow {
                id: Uuid::new_v4(),
                document: json!("not an object"),
            },
        ];
        #[derive(serde::Deserialize)]
        struct Sample {
            value: u32,
        }
        let decoded: Vec<Sample> = from_documents("sample", rows);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].value, 1);
    }
}
