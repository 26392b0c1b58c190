//! # haul-dispatch: Lifecycle Orchestration
//!
//! Ties the domain crates together behind one owner-scoped service:
//!
//! - **Store** (`store.rs`): the in-memory ledger of loads, trips, roster
//!   links, expenses, and fleet records. Status transitions are
//!   compare-and-swap under a single write lock.
//! - **Effects** (`effects.rs`): audit, thread-message, and notification
//!   collaborators. Fire-and-forget.
//! - **Service** (`service.rs`): [`Dispatcher`], the read-modify-write
//!   operations, with inheritance propagation, delivery-order upkeep,
//!   financial recomputation, and the compliance gate wired in.
//!
//! The HTTP layer and the CLI both drive this crate; neither touches the
//! stores directly except to hydrate and persist them.

pub mod effects;
pub mod error;
pub mod service;
pub mod store;

pub use effects::{
    AuditEvent, AuditSink, EffectError, Effects, MemoryEffects, MessageSink, Notification,
    NotificationKind, Notifier, SystemMessage, TracingEffects,
};
pub use error::{DispatchError, DispatchResult};
pub use service::{Dispatcher, GatedTrip, NewLoad, NewTrip, TripDetailsUpdate};
pub use store::{Ledger, Owned, PartnerDocumentRecord, Store};
