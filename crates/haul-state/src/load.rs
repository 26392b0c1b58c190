//! # Load Status State Machine
//!
//! Drives a single shipment from creation through pickup, transit, and
//! delivery.
//!
//! ## States
//!
//! ```text
//! Pending ──▶ Accepted ──▶ Loading ──▶ Loaded ──▶ InTransit ──▶ Delivered
//!    │           │  │                   ▲  │          │
//!    │           │  └── mark_pickup ────┘  │          │
//!    ▼           ▼                         ▼          ▼
//! Cancelled  Cancelled              StorageCompleted (storage drop)
//! ```
//!
//! Every transition checks the source status first and the evidence second.
//! A wrong source status yields [`LoadError::StateMismatch`] carrying the
//! actual and the accepted statuses; missing evidence yields a validation
//! error naming the field. In both cases the load is left unchanged.
//!
//! Driver and equipment fields ([`LoadAssignment`]) are derived from the
//! trip the load is attached to. The state machine never writes them; the
//! inheritance component in `haul-fleet` does.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use haul_core::{
    check_limit, require_text, sum_cents, CompanyId, Decimal, DriverId, LoadId, OwnerId, Timestamp,
    TrailerId, TruckId, ValidationError,
};

use crate::transition::{join_states, TransitionRecord};

// ─── Status ──────────────────────────────────────────────────────────

/// Lifecycle status of a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    /// Created, not yet accepted by the carrier.
    #[default]
    Pending,
    /// Accepted; waiting for loading to begin.
    Accepted,
    /// Loading is under way at the origin.
    Loading,
    /// Loaded and ready to leave.
    Loaded,
    /// On the road to the destination.
    InTransit,
    /// Delivered to the consignee (terminal).
    Delivered,
    /// Dropped into storage instead of delivered (terminal).
    StorageCompleted,
    /// Cancelled before pickup (terminal).
    Cancelled,
}

impl LoadStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [LoadStatus; 8] = [
        Self::Pending,
        Self::Accepted,
        Self::Loading,
        Self::Loaded,
        Self::InTransit,
        Self::Delivered,
        Self::StorageCompleted,
        Self::Cancelled,
    ];

    /// Wire and database name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
            Self::StorageCompleted => "storage_completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Delivered | Self::StorageCompleted | Self::Cancelled
        )
    }

    /// Whether the load no longer blocks closing its trip.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Delivered | Self::StorageCompleted)
    }
}

impl std::fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LoadStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::invalid("status", format!("unknown load status {s:?}")))
    }
}

/// A `null` status in stored documents means the load was never accepted.
fn null_as_pending<'de, D>(deserializer: D) -> Result<LoadStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<LoadStatus>::deserialize(deserializer)?.unwrap_or_default())
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by load transitions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    /// The load is not in a status the transition accepts.
    #[error("load {load_id} is {current}; expected {}", join_states(.expected))]
    StateMismatch {
        /// The load.
        load_id: LoadId,
        /// Its actual status.
        current: LoadStatus,
        /// Statuses the transition accepts.
        expected: Vec<LoadStatus>,
    },

    /// Required evidence was missing or malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

// ─── Record types ────────────────────────────────────────────────────

/// How money collected on delivery was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Check,
    CreditCard,
    Ach,
    Other,
}

impl PaymentMethod {
    /// Whether the driver physically holds the money and owes it back.
    ///
    /// Card and bank payments settle directly with the company.
    pub fn counts_as_collection(&self) -> bool {
        matches!(self, Self::Cash | Self::Check)
    }
}

/// An accessorial charge line (stairs, long carry, packing, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessorialCharge {
    pub description: String,
    pub amount: Decimal,
}

/// Contract rate plus accessorial lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadPricing {
    #[serde(default)]
    pub contract_rate: Decimal,
    #[serde(default)]
    pub accessorials: Vec<AccessorialCharge>,
}

impl LoadPricing {
    /// Contract rate plus every accessorial, each rounded to cents.
    pub fn total_rate(&self) -> Decimal {
        sum_cents(
            std::iter::once(self.contract_rate)
                .chain(self.accessorials.iter().map(|line| line.amount)),
        )
    }
}

/// Driver and equipment fields denormalized from the owning trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadAssignment {
    pub driver_id: Option<DriverId>,
    /// `None` when the trip does not share driver details.
    pub driver_name: Option<String>,
    /// `None` when the trip does not share driver details.
    pub driver_phone: Option<String>,
    pub truck_id: Option<TruckId>,
    pub trailer_id: Option<TrailerId>,
    /// 1-based position within the trip.
    pub delivery_order: Option<u32>,
}

/// Evidence photo URLs, by phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadPhotos {
    pub loading_start: Option<String>,
    pub loading_end: Option<String>,
    #[serde(default)]
    pub pickup: Vec<String>,
    #[serde(default)]
    pub delivery: Vec<String>,
    #[serde(default)]
    pub proof_of_delivery: Vec<String>,
    #[serde(default)]
    pub storage: Vec<String>,
}

/// Where a load was dropped when it went to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDrop {
    pub location_name: String,
    pub location_address: Option<String>,
    pub unit_number: Option<String>,
    pub notes: Option<String>,
}

/// Per-transition timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadTimestamps {
    pub created_at: Option<Timestamp>,
    pub accepted_at: Option<Timestamp>,
    pub loading_started_at: Option<Timestamp>,
    pub loaded_at: Option<Timestamp>,
    pub delivery_started_at: Option<Timestamp>,
    pub delivered_at: Option<Timestamp>,
    pub storage_dropped_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
}

/// A single shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub id: LoadId,
    pub owner_id: OwnerId,
    /// Company the load is assigned to or shared with.
    #[serde(default)]
    pub company_id: Option<CompanyId>,
    pub load_number: String,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default, deserialize_with = "null_as_pending")]
    pub status: LoadStatus,
    #[serde(default)]
    pub starting_cuft: Option<Decimal>,
    #[serde(default)]
    pub ending_cuft: Option<Decimal>,
    #[serde(default)]
    pub actual_cuft_loaded: Option<Decimal>,
    #[serde(default)]
    pub pricing: LoadPricing,
    #[serde(default)]
    pub collected_amount: Option<Decimal>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub assignment: LoadAssignment,
    #[serde(default)]
    pub photos: LoadPhotos,
    #[serde(default)]
    pub storage: Option<StorageDrop>,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub timestamps: LoadTimestamps,
    #[serde(default)]
    pub transitions: Vec<TransitionRecord<LoadStatus>>,
}

// ─── Evidence ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartLoadingEvidence {
    pub starting_cuft: Option<Decimal>,
    pub photo_url: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinishLoadingEvidence {
    pub ending_cuft: Option<Decimal>,
    pub photo_url: Option<String>,
    /// Replaces `ending − starting` when present.
    #[serde(default)]
    pub actual_cuft_override: Option<Decimal>,
    #[serde(default)]
    pub actor: Option<String>,
}

/// Evidence for the combined pickup transition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PickupEvidence {
    pub actual_cuft_loaded: Option<Decimal>,
    #[serde(default)]
    pub photo_urls: Vec<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryEvidence {
    #[serde(default)]
    pub delivery_photos: Vec<String>,
    /// Signed proof-of-delivery pages.
    #[serde(default)]
    pub pod_photos: Vec<String>,
    #[serde(default)]
    pub collected_amount: Option<Decimal>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageDropEvidence {
    pub location_name: Option<String>,
    #[serde(default)]
    pub location_address: Option<String>,
    #[serde(default)]
    pub unit_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub photo_urls: Vec<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelEvidence {
    pub reason: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

// ─── Load ────────────────────────────────────────────────────────────

impl Load {
    /// Create a pending load.
    pub fn new(owner_id: OwnerId, load_number: impl Into<String>) -> Self {
        Self {
            id: LoadId::new(),
            owner_id,
            company_id: None,
            load_number: load_number.into(),
            destination: None,
            status: LoadStatus::Pending,
            starting_cuft: None,
            ending_cuft: None,
            actual_cuft_loaded: None,
            pricing: LoadPricing::default(),
            collected_amount: None,
            payment_method: None,
            assignment: LoadAssignment::default(),
            photos: LoadPhotos::default(),
            storage: None,
            cancellation_reason: None,
            timestamps: LoadTimestamps {
                created_at: Some(Timestamp::now()),
                ..LoadTimestamps::default()
            },
            transitions: Vec::new(),
        }
    }

    /// Contract rate plus accessorials, rounded to cents.
    pub fn total_rate(&self) -> Decimal {
        self.pricing.total_rate()
    }

    /// Cubic feet counted toward trip volume.
    pub fn volume(&self) -> Decimal {
        self.actual_cuft_loaded.unwrap_or(Decimal::ZERO)
    }

    /// Amount the driver collected in cash or check, if any.
    pub fn collection(&self) -> Decimal {
        match (self.collected_amount, self.payment_method) {
            (Some(amount), Some(method)) if method.counts_as_collection() => amount,
            _ => Decimal::ZERO,
        }
    }

    /// PENDING → ACCEPTED.
    pub fn accept(&mut self, actor: Option<String>) -> Result<(), LoadError> {
        self.require_state(&[LoadStatus::Pending])?;
        let now = Timestamp::now();
        self.timestamps.accepted_at = Some(now);
        self.do_transition(LoadStatus::Accepted, now, actor, None);
        Ok(())
    }

    /// ACCEPTED → LOADING. Requires the starting meter reading and photo.
    pub fn start_loading(&mut self, evidence: StartLoadingEvidence) -> Result<(), LoadError> {
        self.require_state(&[LoadStatus::Accepted])?;
        let starting = evidence
            .starting_cuft
            .ok_or(ValidationError::missing("starting_cuft"))?;
        if starting < Decimal::ZERO {
            return Err(ValidationError::invalid("starting_cuft", "must not be negative").into());
        }
        check_limit("starting_cuft", starting)?;
        let photo = require_text(evidence.photo_url.as_deref(), "loading_start_photo")?.to_string();

        let now = Timestamp::now();
        self.starting_cuft = Some(starting);
        self.photos.loading_start = Some(photo);
        self.timestamps.loading_started_at = Some(now);
        self.do_transition(LoadStatus::Loading, now, evidence.actor, None);
        Ok(())
    }

    /// LOADING → LOADED. Computes `actual_cuft_loaded = ending − starting`
    /// unless the caller overrides it.
    pub fn finish_loading(&mut self, evidence: FinishLoadingEvidence) -> Result<(), LoadError> {
        self.require_state(&[LoadStatus::Loading])?;
        let ending = evidence
            .ending_cuft
            .ok_or(ValidationError::missing("ending_cuft"))?;
        check_limit("ending_cuft", ending)?;
        let photo = require_text(evidence.photo_url.as_deref(), "loading_end_photo")?.to_string();

        let actual = match evidence.actual_cuft_override {
            Some(value) if value < Decimal::ZERO => {
                return Err(
                    ValidationError::invalid("actual_cuft_override", "must not be negative").into(),
                );
            }
            Some(value) => {
                check_limit("actual_cuft_override", value)?;
                value
            }
            None => {
                let starting = self
                    .starting_cuft
                    .ok_or(ValidationError::missing("starting_cuft"))?;
                if ending < starting {
                    return Err(ValidationError::invalid(
                        "ending_cuft",
                        format!("{ending} is below starting_cuft {starting}"),
                    )
                    .into());
                }
                ending - starting
            }
        };

        let now = Timestamp::now();
        self.ending_cuft = Some(ending);
        self.actual_cuft_loaded = Some(actual);
        self.photos.loading_end = Some(photo);
        self.timestamps.loaded_at = Some(now);
        self.do_transition(LoadStatus::Loaded, now, evidence.actor, None);
        Ok(())
    }

    /// ACCEPTED | LOADING → LOADED in one step, with the volume given directly.
    pub fn mark_pickup(&mut self, evidence: PickupEvidence) -> Result<(), LoadError> {
        self.require_state(&[LoadStatus::Accepted, LoadStatus::Loading])?;
        let actual = evidence
            .actual_cuft_loaded
            .ok_or(ValidationError::missing("actual_cuft_loaded"))?;
        if actual <= Decimal::ZERO {
            return Err(ValidationError::invalid("actual_cuft_loaded", "must be positive").into());
        }
        check_limit("actual_cuft_loaded", actual)?;

        let now = Timestamp::now();
        self.actual_cuft_loaded = Some(actual);
        self.photos.pickup.extend(evidence.photo_urls);
        self.timestamps.loaded_at = Some(now);
        self.do_transition(LoadStatus::Loaded, now, evidence.actor, None);
        Ok(())
    }

    /// LOADED → IN_TRANSIT.
    pub fn start_delivery(&mut self, actor: Option<String>) -> Result<(), LoadError> {
        self.require_state(&[LoadStatus::Loaded])?;
        let now = Timestamp::now();
        self.timestamps.delivery_started_at = Some(now);
        self.do_transition(LoadStatus::InTransit, now, actor, None);
        Ok(())
    }

    /// IN_TRANSIT → DELIVERED.
    ///
    /// At least one delivery or proof-of-delivery photo is required. A
    /// collected amount and its payment method come together or not at all.
    pub fn complete_delivery(&mut self, evidence: DeliveryEvidence) -> Result<(), LoadError> {
        self.require_state(&[LoadStatus::InTransit])?;
        let delivery = non_blank(evidence.delivery_photos);
        let pod = non_blank(evidence.pod_photos);
        if delivery.is_empty() && pod.is_empty() {
            return Err(ValidationError::missing("delivery_photos").into());
        }
        match (evidence.collected_amount, evidence.payment_method) {
            (Some(amount), Some(_)) if amount <= Decimal::ZERO => {
                return Err(
                    ValidationError::invalid("collected_amount", "must be positive").into(),
                );
            }
            (Some(amount), Some(_)) => check_limit("collected_amount", amount)?,
            (Some(_), None) => return Err(ValidationError::missing("payment_method").into()),
            (None, Some(_)) => return Err(ValidationError::missing("collected_amount").into()),
            _ => {}
        }

        let now = Timestamp::now();
        self.photos.delivery.extend(delivery);
        self.photos.proof_of_delivery.extend(pod);
        self.collected_amount = evidence.collected_amount;
        self.payment_method = evidence.payment_method;
        self.timestamps.delivered_at = Some(now);
        self.do_transition(LoadStatus::Delivered, now, evidence.actor, None);
        Ok(())
    }

    /// LOADED | IN_TRANSIT → STORAGE_COMPLETED.
    pub fn set_storage_drop(&mut self, evidence: StorageDropEvidence) -> Result<(), LoadError> {
        self.require_state(&[LoadStatus::Loaded, LoadStatus::InTransit])?;
        let location =
            require_text(evidence.location_name.as_deref(), "storage_location_name")?.to_string();

        let now = Timestamp::now();
        self.photos.storage.extend(non_blank(evidence.photo_urls));
        self.storage = Some(StorageDrop {
            location_name: location.clone(),
            location_address: evidence.location_address,
            unit_number: evidence.unit_number,
            notes: evidence.notes,
        });
        self.timestamps.storage_dropped_at = Some(now);
        self.do_transition(LoadStatus::StorageCompleted, now, evidence.actor, Some(location));
        Ok(())
    }

    /// PENDING | ACCEPTED → CANCELLED.
    pub fn cancel(&mut self, evidence: CancelEvidence) -> Result<(), LoadError> {
        self.require_state(&[LoadStatus::Pending, LoadStatus::Accepted])?;
        let reason = require_text(evidence.reason.as_deref(), "cancellation_reason")?.to_string();

        let now = Timestamp::now();
        self.cancellation_reason = Some(reason.clone());
        self.timestamps.cancelled_at = Some(now);
        self.do_transition(LoadStatus::Cancelled, now, evidence.actor, Some(reason));
        Ok(())
    }

    /// The load as the counterparty company sees it.
    pub fn view(&self) -> LoadView {
        LoadView::from(self)
    }

    /// Validate that the load is in one of the accepted statuses.
    fn require_state(&self, expected: &[LoadStatus]) -> Result<(), LoadError> {
        if expected.contains(&self.status) {
            Ok(())
        } else {
            Err(LoadError::StateMismatch {
                load_id: self.id,
                current: self.status,
                expected: expected.to_vec(),
            })
        }
    }

    /// Record a state transition.
    fn do_transition(
        &mut self,
        to: LoadStatus,
        at: Timestamp,
        actor: Option<String>,
        note: Option<String>,
    ) {
        self.transitions.push(TransitionRecord {
            from_state: self.status,
            to_state: to,
            timestamp: at,
            actor,
            note,
        });
        self.status = to;
    }
}

fn non_blank(urls: Vec<String>) -> Vec<String> {
    urls.into_iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect()
}

// ─── Counterparty view ───────────────────────────────────────────────

/// What the company a load is assigned to may see.
///
/// Omits the internal driver reference, pricing, and collections. Driver
/// name and phone are present only when the owning trip shares them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadView {
    pub id: LoadId,
    pub load_number: String,
    pub destination: Option<String>,
    pub status: LoadStatus,
    pub actual_cuft_loaded: Option<Decimal>,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub truck_id: Option<TruckId>,
    pub trailer_id: Option<TrailerId>,
    pub delivery_order: Option<u32>,
    pub storage: Option<StorageDrop>,
    pub proof_of_delivery: Vec<String>,
    pub accepted_at: Option<Timestamp>,
    pub loaded_at: Option<Timestamp>,
    pub delivered_at: Option<Timestamp>,
}

impl From<&Load> for LoadView {
    fn from(load: &Load) -> Self {
        Self {
            id: load.id,
            load_number: load.load_number.clone(),
            destination: load.destination.clone(),
            status: load.status,
            actual_cuft_loaded: load.actual_cuft_loaded,
            driver_name: load.assignment.driver_name.clone(),
            driver_phone: load.assignment.driver_phone.clone(),
            truck_id: load.assignment.truck_id,
            trailer_id: load.assignment.trailer_id,
            delivery_order: load.assignment.delivery_order,
            storage: load.storage.clone(),
            proof_of_delivery: load.photos.proof_of_delivery.clone(),
            accepted_at: load.timestamps.accepted_at,
            loaded_at: load.timestamps.loaded_at,
            delivered_at: load.timestamps.delivered_at,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
