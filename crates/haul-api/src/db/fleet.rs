//! Fleet record persistence: drivers, trucks, trailers, and partnership
//! documents.

use sqlx::PgPool;

use haul_dispatch::PartnerDocumentRecord;
use haul_fleet::{Driver, Trailer, Truck};

use super::{from_documents, to_document, to_label, DocumentRow};

pub async fn upsert_driver(pool: &PgPool, driver: &Driver) -> Result<(), sqlx::Error> {
    let document = to_document("driver", driver)?;
    sqlx::query(
        "INSERT INTO drivers (id, owner_id, document, updated_at)
         VALUES ($1, $2, $3, now())
         ON CONFLICT (id) DO UPDATE
         SET document = EXCLUDED.document, updated_at = now()",
    )
    .bind(*driver.id.as_uuid())
    .bind(*driver.owner_id.as_uuid())
    .bind(&document)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn upsert_truck(pool: &PgPool, truck: &Truck) -> Result<(), sqlx::Error> {
    let vehicle_type = to_label("vehicle type", &truck.vehicle_type)?;
    let document = to_document("truck", truck)?;
    sqlx::query(
        "INSERT INTO trucks (id, owner_id, vehicle_type, document, updated_at)
         VALUES ($1, $2, $3, $4, now())
         ON CONFLICT (id) DO UPDATE
         SET vehicle_type = EXCLUDED.vehicle_type,
             document = EXCLUDED.document,
             updated_at = now()",
    )
    .bind(*truck.id.as_uuid())
    .bind(*truck.owner_id.as_uuid())
    .bind(&vehicle_type)
    .bind(&document)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn upsert_trailer(pool: &PgPool, trailer: &Trailer) -> Result<(), sqlx::Error> {
    let document = to_document("trailer", trailer)?;
    sqlx::query(
        "INSERT INTO trailers (id, owner_id, document, updated_at)
         VALUES ($1, $2, $3, now())
         ON CONFLICT (id) DO UPDATE
         SET document = EXCLUDED.document, updated_at = now()",
    )
    .bind(*trailer.id.as_uuid())
    .bind(*trailer.owner_id.as_uuid())
    .bind(&document)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn upsert_partner_document(
    pool: &PgPool,
    record: &PartnerDocumentRecord,
) -> Result<(), sqlx::Error> {
    let document = to_document("partnership document", record)?;
    sqlx::query(
        "INSERT INTO partnership_documents (id, owner_id, company_id, document, updated_at)
         VALUES ($1, $2, $3, $4, now())
         ON CONFLICT (id) DO UPDATE
         SET company_id = EXCLUDED.company_id,
             document = EXCLUDED.document,
             updated_at = now()",
    )
    .bind(record.id)
    .bind(*record.owner_id.as_uuid())
    .bind(*record.document.company_id.as_uuid())
    .bind(&document)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn load_drivers(pool: &PgPool) -> Result<Vec<Driver>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DocumentRow>("SELECT id, document FROM drivers")
        .fetch_all(pool)
        .await?;
    Ok(from_documents("driver", rows))
}

pub async fn load_trucks(pool: &PgPool) -> Result<Vec<Truck>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DocumentRow>("SELECT id, document FROM trucks")
        .fetch_all(pool)
        .await?;
    Ok(from_documents("truck", rows))
}

pub async fn load_trailers(pool: &PgPool) -> Result<Vec<Trailer>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DocumentRow>("SELECT id, document FROM trailers")
        .fetch_all(pool)
        .await?;
    Ok(from_documents("trailer", rows))
}

pub async fn load_partner_documents(
    pool: &PgPool,
) -> Result<Vec<PartnerDocumentRecord>, sqlx::Error> {
    let rows =
        sqlx::query_as::<_, DocumentRow>("SELECT id, document FROM partnership_documents")
            .fetch_all(pool)
            .await?;
    Ok(from_documents("partnership document", rows))
}
