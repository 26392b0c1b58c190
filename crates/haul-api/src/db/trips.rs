//! Trip persistence: `trips`, the `trip_loads` roster links, and
//! `trip_expenses`.

use sqlx::PgPool;
use uuid::Uuid;

use haul_core::{ExpenseId, LoadId, TripId};
use haul_fleet::{LoadRole, TripLoad};
use haul_settlement::TripExpense;
use haul_state::Trip;

use super::{from_documents, to_document, to_label, DocumentRow};

/// Insert or replace a trip.
pub async fn upsert(pool: &PgPool, trip: &Trip) -> Result<(), sqlx::Error> {
    let status = to_label("trip status", &trip.status)?;
    let document = to_document("trip", trip)?;

    sqlx::query(
        "INSERT INTO trips (id, owner_id, trip_number, status, document, updated_at)
         VALUES ($1, $2, $3, $4, $5, now())
         ON CONFLICT (id) DO UPDATE
         SET trip_number = EXCLUDED.trip_number,
             status = EXCLUDED.status,
             document = EXCLUDED.document,
             updated_at = now()",
    )
    .bind(*trip.id.as_uuid())
    .bind(*trip.owner_id.as_uuid())
    .bind(&trip.trip_number)
    .bind(&status)
    .bind(&document)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn load_all(pool: &PgPool) -> Result<Vec<Trip>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DocumentRow>(
        "SELECT id, document FROM trips ORDER BY updated_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(from_documents("trip", rows))
}

/// Replace a trip's roster with `links`.
///
/// Rows for the same loads on other trips are removed too, so a load moved
/// between trips never appears twice.
pub async fn replace_links(
    pool: &PgPool,
    trip_id: TripId,
    links: &[TripLoad],
) -> Result<(), sqlx::Error> {
    let load_ids: Vec<Uuid> = links.iter().map(|l| *l.load_id.as_uuid()).collect();
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM trip_loads WHERE trip_id = $1 OR load_id = ANY($2)")
        .bind(*trip_id.as_uuid())
        .bind(&load_ids)
        .execute(&mut *tx)
        .await?;

    for link in links {
        let role = to_label("load role", &link.role)?;
        let sequence = i32::try_from(link.sequence_index)
            .map_err(|e| sqlx::Error::Protocol(format!("sequence index out of range: {e}")))?;
        sqlx::query(
            "INSERT INTO trip_loads (trip_id, load_id, sequence_index, role)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(*link.trip_id.as_uuid())
        .bind(*link.load_id.as_uuid())
        .bind(sequence)
        .bind(&role)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

/// Every roster link, for rebuilding the in-memory roster.
pub async fn load_links(pool: &PgPool) -> Result<Vec<TripLoad>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TripLoadRow>(
        "SELECT trip_id, load_id, sequence_index, role FROM trip_loads
         ORDER BY trip_id, sequence_index",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(TripLoadRow::into_link).collect())
}

pub async fn upsert_expense(pool: &PgPool, expense: &TripExpense) -> Result<(), sqlx::Error> {
    let category = to_label("expense category", &expense.category)?;
    let document = to_document("expense", expense)?;

    sqlx::query(
        "INSERT INTO trip_expenses (id, trip_id, owner_id, category, amount, document)
         VALUES ($1, $2, $3, $4, $5::numeric, $6)
         ON CONFLICT (id) DO UPDATE
         SET category = EXCLUDED.category,
             amount = EXCLUDED.amount,
             document = EXCLUDED.document",
    )
    .bind(*expense.id.as_uuid())
    .bind(*expense.trip_id.as_uuid())
    .bind(*expense.owner_id.as_uuid())
    .bind(&category)
    .bind(expense.amount.to_string())
    .bind(&document)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn delete_expense(pool: &PgPool, expense_id: ExpenseId) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM trip_expenses WHERE id = $1")
        .bind(*expense_id.as_uuid())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn load_expenses(pool: &PgPool) -> Result<Vec<TripExpense>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DocumentRow>(
        "SELECT id, document FROM trip_expenses ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(from_documents("expense", rows))
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct TripLoadRow {
    trip_id: Uuid,
    load_id: Uuid,
    sequence_index: i32,
    role: String,
}

impl TripLoadRow {
    fn into_link(self) -> Option<TripLoad> {
        let role: LoadRole =
            match serde_json::from_value(serde_json::Value::String(self.role.clone())) {
                Ok(role) => role,
                Err(e) => {
                    tracing::warn!(
                        load_id = %self.load_id,
                        role = %self.role,
                        error = %e,
                        "unknown load role in database, defaulting to primary"
                    );
                    LoadRole::Primary
                }
            };
        let Ok(sequence_index) = u32::try_from(self.sequence_index) else {
            tracing::warn!(load_id = %self.load_id, "negative sequence index, skipping link");
            return None;
        };
        Some(TripLoad {
            trip_id: TripId::from_uuid(self.trip_id),
            load_id: LoadId::from_uuid(self.load_id),
            sequence_index,
            role,
        })
    }
}
