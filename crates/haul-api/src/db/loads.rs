//! Load persistence. Operates on the `loads` table.

use sqlx::PgPool;

use haul_state::Load;

use super::{from_documents, to_document, to_label, DocumentRow};

/// Insert or replace a load.
pub async fn upsert(pool: &PgPool, load: &Load) -> Result<(), sqlx::Error> {
    let status = to_label("load status", &load.status)?;
    let document = to_document("load", load)?;

    sqlx::query(
        "INSERT INTO loads (id, owner_id, load_number, status, document, updated_at)
         VALUES ($1, $2, $3, $4, $5, now())
         ON CONFLICT (id) DO UPDATE
         SET load_number = EXCLUDED.load_number,
             status = EXCLUDED.status,
             document = EXCLUDED.document,
             updated_at = now()",
    )
    .bind(*load.id.as_uuid())
    .bind(*load.owner_id.as_uuid())
    .bind(&load.load_number)
    .bind(&status)
    .bind(&document)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load every load on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Load>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DocumentRow>(
        "SELECT id, document FROM loads ORDER BY updated_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(from_documents("load", rows))
}
