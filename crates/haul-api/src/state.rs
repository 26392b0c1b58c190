//! # Application State
//!
//! Shared state for the Axum application: the [`Dispatcher`] over the
//! in-memory ledger, the optional Postgres pool, and configuration.
//!
//! With a pool configured, every mutating handler writes the records it
//! touched through to the database before responding, and
//! [`AppState::hydrate_from_db`] rebuilds the ledger on startup.

use anyhow::Context;
use sqlx::PgPool;

use haul_compliance::{ComplianceGate, GateMode};
use haul_core::{ExpenseId, LoadId, TripId};
use haul_dispatch::{Dispatcher, Effects, Ledger};
use haul_fleet::TripRoster;

use crate::error::AppError;

/// Application configuration.
///
/// Custom `Debug` redacts the auth token.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer token. `None` disables authentication.
    pub auth_token: Option<String>,
    /// Gate mode applied to activation and departure when the request does
    /// not name one.
    pub compliance_mode: GateMode,
    /// Serve `/metrics` and record request metrics.
    pub metrics_enabled: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("compliance_mode", &self.compliance_mode)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            compliance_mode: GateMode::Advisory,
            metrics_enabled: true,
        }
    }
}

impl AppConfig {
    /// Read `PORT`, `AUTH_TOKEN`, `HAUL_COMPLIANCE_MODE`, and
    /// `HAUL_METRICS_ENABLED`. Absent variables keep their defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(port) = lookup("PORT") {
            config.port = port
                .parse()
                .with_context(|| format!("PORT must be a port number, got {port:?}"))?;
        }
        config.auth_token = lookup("AUTH_TOKEN").filter(|t| !t.is_empty());
        if let Some(mode) = lookup("HAUL_COMPLIANCE_MODE") {
            config.compliance_mode = mode.parse().context("HAUL_COMPLIANCE_MODE")?;
        }
        config.metrics_enabled = lookup("HAUL_METRICS_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);
        Ok(config)
    }
}

/// Shared application state passed to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub db_pool: Option<PgPool>,
    pub config: AppConfig,
}

impl AppState {
    /// In-memory state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        Self::with_effects(config, db_pool, Effects::tracing())
    }

    /// State whose side effects go to `effects` instead of the log.
    pub fn with_effects(config: AppConfig, db_pool: Option<PgPool>, effects: Effects) -> Self {
        let gate = ComplianceGate::new(config.compliance_mode);
        Self {
            dispatcher: Dispatcher::new(Ledger::new(), effects, gate),
            db_pool,
            config,
        }
    }

    fn ledger(&self) -> &Ledger {
        self.dispatcher.ledger()
    }

    /// The trip a load is attached to, if any.
    pub fn trip_for_load(&self, load_id: LoadId) -> Option<TripId> {
        self.ledger().roster.read().trip_for_load(load_id)
    }

    // ── Hydration ───────────────────────────────────────────────────

    /// Rebuild the in-memory ledger from the database.
    pub async fn hydrate_from_db(&self) -> Result<(), sqlx::Error> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };
        let ledger = self.ledger();

        let drivers = crate::db::fleet::load_drivers(pool).await?;
        let trucks = crate::db::fleet::load_trucks(pool).await?;
        let trailers = crate::db::fleet::load_trailers(pool).await?;
        let documents = crate::db::fleet::load_partner_documents(pool).await?;
        let loads = crate::db::loads::load_all(pool).await?;
        let trips = crate::db::trips::load_all(pool).await?;
        let links = crate::db::trips::load_links(pool).await?;
        let expenses = crate::db::trips::load_expenses(pool).await?;

        tracing::info!(
            drivers = drivers.len(),
            trucks = trucks.len(),
            trailers = trailers.len(),
            partnership_documents = documents.len(),
            loads = loads.len(),
            trips = trips.len(),
            trip_loads = links.len(),
            expenses = expenses.len(),
            "hydrating ledger from database"
        );

        for driver in drivers {
            ledger.drivers.insert(driver.id, driver);
        }
        for truck in trucks {
            ledger.trucks.insert(truck.id, truck);
        }
        for trailer in trailers {
            ledger.trailers.insert(trailer.id, trailer);
        }
        for document in documents {
            ledger.partner_documents.insert(document.id, document);
        }
        for load in loads {
            ledger.loads.insert(load.id, load);
        }
        for trip in trips {
            ledger.trips.insert(trip.id, trip);
        }
        for expense in expenses {
            ledger.expenses.insert(expense.id, expense);
        }
        *ledger.roster.write() = TripRoster::from_links(links);
        Ok(())
    }

    // ── Write-through ───────────────────────────────────────────────

    /// Persist a load, and its trip if it is attached to one.
    pub async fn persist_load(&self, load_id: LoadId) -> Result<(), AppError> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };
        if let Some(load) = self.ledger().loads.get(&load_id) {
            crate::db::loads::upsert(pool, &load)
                .await
                .map_err(|e| persist_failed("load", load_id, e))?;
        }
        if let Some(trip_id) = self.trip_for_load(load_id) {
            self.persist_trip(trip_id).await?;
        }
        Ok(())
    }

    /// Persist a trip, its roster links, and every attached load.
    pub async fn persist_trip(&self, trip_id: TripId) -> Result<(), AppError> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };
        let ledger = self.ledger();
        if let Some(trip) = ledger.trips.get(&trip_id) {
            crate::db::trips::upsert(pool, &trip)
                .await
                .map_err(|e| persist_failed("trip", trip_id, e))?;
        }
        let links = ledger.roster.read().loads_for_trip(trip_id);
        crate::db::trips::replace_links(pool, trip_id, &links)
            .await
            .map_err(|e| persist_failed("trip roster", trip_id, e))?;
        for link in &links {
            if let Some(load) = ledger.loads.get(&link.load_id) {
                crate::db::loads::upsert(pool, &load)
                    .await
                    .map_err(|e| persist_failed("load", link.load_id, e))?;
            }
        }
        Ok(())
    }

    /// Persist a load that just left a trip, then the trip itself.
    pub async fn persist_detached(&self, trip_id: TripId, load_id: LoadId) -> Result<(), AppError> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };
        if let Some(load) = self.ledger().loads.get(&load_id) {
            crate::db::loads::upsert(pool, &load)
                .await
                .map_err(|e| persist_failed("load", load_id, e))?;
        }
        self.persist_trip(trip_id).await
    }

    /// Persist an expense and the trip whose totals it changed.
    pub async fn persist_expense(&self, expense_id: ExpenseId, trip_id: TripId) -> Result<(), AppError> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };
        let written = match self.ledger().expenses.get(&expense_id) {
            Some(expense) => crate::db::trips::upsert_expense(pool, &expense).await,
            None => crate::db::trips::delete_expense(pool, expense_id).await,
        };
        written.map_err(|e| persist_failed("expense", expense_id, e))?;
        self.persist_trip(trip_id).await
    }

    pub async fn persist_driver(&self, driver: &haul_fleet::Driver) -> Result<(), AppError> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };
        crate::db::fleet::upsert_driver(pool, driver)
            .await
            .map_err(|e| persist_failed("driver", driver.id, e))
    }

    pub async fn persist_truck(&self, truck: &haul_fleet::Truck) -> Result<(), AppError> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };
        crate::db::fleet::upsert_truck(pool, truck)
            .await
            .map_err(|e| persist_failed("truck", truck.id, e))
    }

    pub async fn persist_trailer(&self, trailer: &haul_fleet::Trailer) -> Result<(), AppError> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };
        crate::db::fleet::upsert_trailer(pool, trailer)
            .await
            .map_err(|e| persist_failed("trailer", trailer.id, e))
    }

    pub async fn persist_partner_document(
        &self,
        record: &haul_dispatch::PartnerDocumentRecord,
    ) -> Result<(), AppError> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };
        crate::db::fleet::upsert_partner_document(pool, record)
            .await
            .map_err(|e| persist_failed("partnership document", record.id, e))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// The in-memory change stands but would be lost on restart; surface it.
fn persist_failed(kind: &str, id: impl std::fmt::Display, err: sqlx::Error) -> AppError {
    tracing::error!(%id, error = %err, "failed to persist {kind} to database");
    AppError::internal(format!("{kind} recorded in-memory but database persist failed"))
}
