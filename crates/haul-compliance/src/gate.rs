//! # Expiry Classification and Gate

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use haul_core::{days_until, CompanyId, DriverId, TrailerId, TruckId, ValidationError};
use haul_fleet::{Driver, Trailer, Truck};

// ─── Severity ────────────────────────────────────────────────────────

/// How close a credential is to expiry. Ordered most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Expired,
    Critical,
    Urgent,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::Critical => "critical",
            Self::Urgent => "urgent",
            Self::Warning => "warning",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity for a credential `days` away from expiry, `None` past 30.
pub fn classify(days: i64) -> Option<Severity> {
    match days {
        d if d <= 0 => Some(Severity::Expired),
        d if d <= 7 => Some(Severity::Critical),
        d if d <= 14 => Some(Severity::Urgent),
        d if d <= 30 => Some(Severity::Warning),
        _ => None,
    }
}

// ─── Items ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    DriverLicense,
    MedicalCard,
    TruckRegistration,
    TruckInspection,
    TrailerRegistration,
    TrailerInspection,
    PartnershipDocument,
}

/// Whose credential an item describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComplianceSubject {
    Driver { id: DriverId, name: String },
    Truck { id: TruckId, unit_number: String },
    Trailer { id: TrailerId, unit_number: String },
    Partner { company_id: CompanyId, company_name: String },
}

/// One flagged credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceItem {
    pub subject: ComplianceSubject,
    pub kind: CredentialKind,
    /// Document title, for partnership documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_name: Option<String>,
    pub expires_on: NaiveDate,
    pub days_until_expiration: i64,
    pub severity: Severity,
}

/// A document exchanged with a partner company (insurance certificate,
/// carrier agreement, W-9, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnershipDocument {
    pub company_id: CompanyId,
    pub company_name: String,
    pub document_name: String,
    #[serde(default)]
    pub expires_on: Option<NaiveDate>,
}

fn item(
    subject: &ComplianceSubject,
    kind: CredentialKind,
    expires_on: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<ComplianceItem> {
    let expires_on = expires_on?;
    let days = days_until(expires_on, today);
    classify(days).map(|severity| ComplianceItem {
        subject: subject.clone(),
        kind,
        document_name: None,
        expires_on,
        days_until_expiration: days,
        severity,
    })
}

pub fn evaluate_driver(driver: &Driver, today: NaiveDate) -> Vec<ComplianceItem> {
    let subject = ComplianceSubject::Driver {
        id: driver.id,
        name: driver.name.clone(),
    };
    [
        item(&subject, CredentialKind::DriverLicense, driver.license_expiry, today),
        item(&subject, CredentialKind::MedicalCard, driver.medical_card_expiry, today),
    ]
    .into_iter()
    .flatten()
    .collect()
}

pub fn evaluate_truck(truck: &Truck, today: NaiveDate) -> Vec<ComplianceItem> {
    let subject = ComplianceSubject::Truck {
        id: truck.id,
        unit_number: truck.unit_number.clone(),
    };
    [
        item(&subject, CredentialKind::TruckRegistration, truck.registration_expiry, today),
        item(&subject, CredentialKind::TruckInspection, truck.inspection_expiry, today),
    ]
    .into_iter()
    .flatten()
    .collect()
}

pub fn evaluate_trailer(trailer: &Trailer, today: NaiveDate) -> Vec<ComplianceItem> {
    let subject = ComplianceSubject::Trailer {
        id: trailer.id,
        unit_number: trailer.unit_number.clone(),
    };
    [
        item(&subject, CredentialKind::TrailerRegistration, trailer.registration_expiry, today),
        item(&subject, CredentialKind::TrailerInspection, trailer.inspection_expiry, today),
    ]
    .into_iter()
    .flatten()
    .collect()
}

pub fn evaluate_partnership_document(
    document: &PartnershipDocument,
    today: NaiveDate,
) -> Option<ComplianceItem> {
    let subject = ComplianceSubject::Partner {
        company_id: document.company_id,
        company_name: document.company_name.clone(),
    };
    item(&subject, CredentialKind::PartnershipDocument, document.expires_on, today).map(|mut i| {
        i.document_name = Some(document.document_name.clone());
        i
    })
}

// ─── Report ──────────────────────────────────────────────────────────

/// Flagged items, most severe and soonest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub generated_on: NaiveDate,
    pub items: Vec<ComplianceItem>,
    pub expired: usize,
    pub critical: usize,
    pub urgent: usize,
    pub warning: usize,
}

impl ComplianceReport {
    pub fn new(generated_on: NaiveDate, mut items: Vec<ComplianceItem>) -> Self {
        items.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then(a.days_until_expiration.cmp(&b.days_until_expiration))
        });
        let count = |s: Severity| items.iter().filter(|i| i.severity == s).count();
        Self {
            generated_on,
            expired: count(Severity::Expired),
            critical: count(Severity::Critical),
            urgent: count(Severity::Urgent),
            warning: count(Severity::Warning),
            items,
        }
    }

    pub fn has_expired(&self) -> bool {
        self.expired > 0
    }
}

// ─── Gate ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    /// Log issues and let the transition proceed.
    #[default]
    Advisory,
    /// Refuse the transition while anything is expired.
    Blocking,
}

impl std::str::FromStr for GateMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "advisory" => Ok(Self::Advisory),
            "blocking" => Ok(Self::Blocking),
            other => Err(ValidationError::invalid(
                "compliance_mode",
                format!("expected advisory or blocking, got {other:?}"),
            )),
        }
    }
}

/// An expired credential stopped a transition in blocking mode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} expired credential(s) block this transition", expired_count(.items))]
pub struct ComplianceBlocked {
    /// Every flagged item, not only the expired ones.
    pub items: Vec<ComplianceItem>,
}

fn expired_count(items: &[ComplianceItem]) -> usize {
    items
        .iter()
        .filter(|i| i.severity == Severity::Expired)
        .count()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComplianceGate {
    pub mode: GateMode,
}

impl ComplianceGate {
    pub fn new(mode: GateMode) -> Self {
        Self { mode }
    }

    /// Check `items` for the transition named by `action`.
    ///
    /// Returns the items unchanged when the transition may proceed.
    pub fn check(
        &self,
        action: &str,
        items: Vec<ComplianceItem>,
    ) -> Result<Vec<ComplianceItem>, ComplianceBlocked> {
        let expired = expired_count(&items);
        match self.mode {
            GateMode::Blocking if expired > 0 => {
                tracing::info!(action, expired, "compliance gate blocked transition");
                Err(ComplianceBlocked { items })
            }
            _ => {
                for flagged in items.iter().filter(|i| i.severity <= Severity::Critical) {
                    tracing::warn!(
                        action,
                        kind = ?flagged.kind,
                        severity = %flagged.severity,
                        days = flagged.days_until_expiration,
                        "credential expiring; proceeding in advisory mode"
                    );
                }
                Ok(items)
            }
        }
    }
}
