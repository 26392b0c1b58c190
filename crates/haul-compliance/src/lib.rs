//! # haul-compliance: Compliance Gate
//!
//! Classifies credential expiry dates into severity tiers and decides
//! whether a trip transition may proceed.
//!
//! | days until expiry | severity |
//! |---|---|
//! | ≤ 0 | expired |
//! | ≤ 7 | critical |
//! | ≤ 14 | urgent |
//! | ≤ 30 | warning |
//! | > 30 | not reported |
//!
//! The gate is advisory unless blocking mode is requested; in blocking mode
//! any expired item stops the transition and the whole item list is
//! returned so the caller can resolve it.

pub mod gate;

pub use gate::{
    classify, evaluate_driver, evaluate_partnership_document, evaluate_trailer, evaluate_truck,
    ComplianceBlocked, ComplianceGate, ComplianceItem, ComplianceReport, ComplianceSubject,
    CredentialKind, GateMode, PartnershipDocument, Severity,
};
