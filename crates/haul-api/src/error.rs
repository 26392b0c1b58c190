//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`DispatchError`] and its domain causes to HTTP status codes and a
//! JSON body of the form `{ "error": { "code", "message", "details" } }`.
//! Internal error messages are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use haul_compliance::ComplianceItem;
use haul_core::ValidationError;
use haul_dispatch::DispatchError;
use haul_fleet::RosterError;
use haul_settlement::ExpenseError;
use haul_state::{LoadError, PendingLoad, TripError};

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "STATE_MISMATCH").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Structured context for client errors: the offending field, the
    /// actual and expected statuses, pending loads, or flagged credentials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found, or owned by someone else (404).
    #[error("{0}")]
    NotFound(String),

    /// A field failed validation (422).
    #[error("{message}")]
    Validation {
        message: String,
        field: Option<&'static str>,
    },

    /// Request body could not be parsed (422).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The record is not in a status the operation accepts (409).
    #[error("{message}")]
    StateMismatch {
        message: String,
        current: &'static str,
        expected: Vec<&'static str>,
    },

    /// A trip cannot close while loads are unfinished (409).
    #[error("{message}")]
    LoadsPending {
        message: String,
        pending: Vec<PendingLoad>,
    },

    /// Blocking compliance gate refused the transition (409).
    #[error("{message}")]
    ComplianceBlocked {
        message: String,
        items: Vec<ComplianceItem>,
    },

    /// The trip is settled or cancelled (409).
    #[error("{0}")]
    TripClosed(String),

    /// Truck/trailer pairing rejected (422).
    #[error("{0}")]
    IncompatibleEquipment(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::StateMismatch { .. } => (StatusCode::CONFLICT, "STATE_MISMATCH"),
            Self::LoadsPending { .. } => (StatusCode::CONFLICT, "LOADS_PENDING"),
            Self::ComplianceBlocked { .. } => (StatusCode::CONFLICT, "COMPLIANCE_BLOCKED"),
            Self::TripClosed(_) => (StatusCode::CONFLICT, "TRIP_CLOSED"),
            Self::IncompatibleEquipment(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INCOMPATIBLE_EQUIPMENT")
            }
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Validation {
                field: Some(field), ..
            } => Some(json!({ "field": field })),
            Self::StateMismatch {
                current, expected, ..
            } => Some(json!({ "current": current, "expected": expected })),
            Self::LoadsPending { pending, .. } => Some(json!({ "pending": pending })),
            Self::ComplianceBlocked { items, .. } => Some(json!({ "items": items })),
            _ => None,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if let Self::Internal(_) = &self {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation {
            field: Some(err.field()),
            message: err.to_string(),
        }
    }
}

impl From<LoadError> for AppError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::StateMismatch {
                current,
                ref expected,
                ..
            } => Self::StateMismatch {
                message: err.to_string(),
                current: current.as_str(),
                expected: expected.iter().map(|s| s.as_str()).collect(),
            },
            LoadError::Validation(inner) => inner.into(),
        }
    }
}

impl From<TripError> for AppError {
    fn from(err: TripError) -> Self {
        match err {
            TripError::StateMismatch {
                current,
                ref expected,
                ..
            } => Self::StateMismatch {
                message: err.to_string(),
                current: current.as_str(),
                expected: expected.iter().map(|s| s.as_str()).collect(),
            },
            TripError::Validation(inner) => inner.into(),
            TripError::NonPositiveMileage { .. } => Self::Validation {
                message: err.to_string(),
                field: Some("odometer_end"),
            },
            TripError::LoadsPending { ref pending, .. } => Self::LoadsPending {
                message: err.to_string(),
                pending: pending.clone(),
            },
        }
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::NotFound { .. } => Self::NotFound(err.to_string()),
            DispatchError::Load(inner) => inner.into(),
            DispatchError::Trip(inner) => inner.into(),
            DispatchError::Compatibility(inner) => Self::IncompatibleEquipment(inner.to_string()),
            DispatchError::Roster(inner @ RosterError::NotAttached { .. }) => {
                Self::NotFound(inner.to_string())
            }
            DispatchError::Roster(inner @ RosterError::OrderMismatch { .. }) => Self::Validation {
                message: inner.to_string(),
                field: Some("order"),
            },
            DispatchError::Expense(ExpenseError::Validation(inner)) => inner.into(),
            DispatchError::Expense(inner @ ExpenseError::TripClosed { .. }) => {
                Self::TripClosed(inner.to_string())
            }
            DispatchError::Compliance(blocked) => Self::ComplianceBlocked {
                message: blocked.to_string(),
                items: blocked.items,
            },
            DispatchError::Validation(inner) => inner.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haul_core::{LoadId, TripId, TruckId};
    use haul_fleet::CompatibilityError;
    use haul_state::{LoadStatus, TripStatus};
    use http_body_util::BodyExt;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn not_found_status_code() {
        let err: AppError = DispatchError::not_found("trip").into();
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "NOT_FOUND");
        assert_eq!(err.to_string(), "trip not found");
    }

    #[test]
    fn unattached_load_is_not_found() {
        let err: AppError = DispatchError::Roster(RosterError::NotAttached {
            trip_id: TripId::new(),
            load_id: LoadId::new(),
        })
        .into();
        assert_eq!(err.status_and_code().0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn incompatible_equipment_is_unprocessable() {
        let err: AppError = DispatchError::Compatibility(CompatibilityError::TractorWithoutTrailer {
            truck_id: TruckId::new(),
            unit_number: "T-1".into(),
        })
        .into();
        assert_eq!(
            err.status_and_code(),
            (StatusCode::UNPROCESSABLE_ENTITY, "INCOMPATIBLE_EQUIPMENT")
        );
    }

    #[test]
    fn closed_trip_expense_is_conflict() {
        let err: AppError = DispatchError::Expense(ExpenseError::TripClosed {
            trip_id: TripId::new(),
            status: TripStatus::Settled,
        })
        .into();
        assert_eq!(err.status_and_code(), (StatusCode::CONFLICT, "TRIP_CLOSED"));
    }

    #[tokio::test]
    async fn state_mismatch_carries_current_and_expected() {
        let err: AppError = DispatchError::Load(LoadError::StateMismatch {
            load_id: LoadId::new(),
            current: LoadStatus::Pending,
            expected: vec![LoadStatus::Accepted],
        })
        .into();
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "STATE_MISMATCH");
        assert_eq!(body["error"]["details"]["current"], "pending");
        assert_eq!(body["error"]["details"]["expected"][0], "accepted");
    }

    #[tokio::test]
    async fn validation_names_the_field() {
        let err: AppError = ValidationError::missing("odometer_start").into();
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"]["field"], "odometer_start");
    }

    #[tokio::test]
    async fn non_positive_mileage_points_at_odometer_end() {
        let err: AppError = DispatchError::Trip(TripError::NonPositiveMileage {
            start: rust_decimal::Decimal::from(100),
            end: rust_decimal::Decimal::from(90),
        })
        .into();
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["details"]["field"], "odometer_end");
    }

    #[tokio::test]
    async fn internal_message_is_hidden() {
        let (status, body) = body_json(AppError::internal("pool exhausted")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], "An internal error occurred");
        assert!(body["error"].get("details").is_none());
    }
}
