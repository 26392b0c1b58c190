//! # In-Memory Ledger
//!
//! Thread-safe, cloneable stores for every logical table the engine
//! touches: `loads`, `trips`, `trip_loads`, `trip_expenses`, `drivers`,
//! `trucks`, `trailers`, plus partnership documents.
//!
//! Locks are `parking_lot` and never held across `.await`. A status
//! transition runs inside [`Store::try_update`]: the closure sees the
//! current record, checks its status, and mutates it under one write lock.
//! That is the compare-and-swap on status; a caller that loses the race
//! sees the winner's status and gets a state-mismatch error.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use haul_compliance::PartnershipDocument;
use haul_core::{DriverId, ExpenseId, LoadId, OwnerId, TrailerId, TripId, TruckId};
use haul_fleet::{Driver, Trailer, Truck, TripRoster};
use haul_settlement::TripExpense;
use haul_state::{Load, Trip};

/// Records scoped to one owning account.
pub trait Owned {
    fn owner_id(&self) -> OwnerId;
}

macro_rules! owned_by_field {
    ($($ty:ty),* $(,)?) => {
        $(impl Owned for $ty {
            fn owner_id(&self) -> OwnerId {
                self.owner_id
            }
        })*
    };
}

owned_by_field!(Load, Trip, TripExpense, Driver, Truck, Trailer, PartnerDocumentRecord);

/// Thread-safe, cloneable in-memory key-value store.
#[derive(Debug)]
pub struct Store<K, T> {
    data: Arc<RwLock<HashMap<K, T>>>,
}

impl<K, T> Clone for Store<K, T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K, T> Default for Store<K, T> {
    fn default() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<K, T> Store<K, T>
where
    K: Copy + Eq + Hash,
    T: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: K, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    pub fn get(&self, id: &K) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Records matching `pred`.
    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.data
            .read()
            .values()
            .filter(|v| pred(v))
            .cloned()
            .collect()
    }

    /// Mutate a record in place and return what the closure returns.
    pub fn update_with<R>(&self, id: &K, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.data.write().get_mut(id).map(f)
    }

    /// Atomically read-validate-update a record.
    ///
    /// Returns `None` if the record doesn't exist, or `Some(result)` with the
    /// closure's `Result`. The closure must leave the record unchanged when it
    /// returns `Err`.
    pub fn try_update<R, E>(
        &self,
        id: &K,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    pub fn remove(&self, id: &K) -> Option<T> {
        self.data.write().remove(id)
    }

    pub fn contains(&self, id: &K) -> bool {
        self.data.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, T> Store<K, T>
where
    K: Copy + Eq + Hash,
    T: Clone + Owned,
{
    /// Fetch a record only if `owner` owns it.
    pub fn get_owned(&self, id: &K, owner: OwnerId) -> Option<T> {
        self.get(id).filter(|v| v.owner_id() == owner)
    }

    /// [`Store::try_update`] restricted to `owner`'s records. A record owned
    /// by someone else is treated as absent.
    pub fn try_update_owned<R, E>(
        &self,
        id: &K,
        owner: OwnerId,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data
            .write()
            .get_mut(id)
            .filter(|v| v.owner_id() == owner)
            .map(f)
    }

    pub fn list_owned(&self, owner: OwnerId) -> Vec<T> {
        self.filter(|v| v.owner_id() == owner)
    }
}

/// A partnership document filed by an owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerDocumentRecord {
    pub id: Uuid,
    pub owner_id: OwnerId,
    #[serde(flatten)]
    pub document: PartnershipDocument,
}

/// Every table, shared.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    pub loads: Store<LoadId, Load>,
    pub trips: Store<TripId, Trip>,
    pub roster: Arc<RwLock<TripRoster>>,
    pub expenses: Store<ExpenseId, TripExpense>,
    pub drivers: Store<DriverId, Driver>,
    pub trucks: Store<TruckId, Truck>,
    pub trailers: Store<TrailerId, Trailer>,
    pub partner_documents: Store<Uuid, PartnerDocumentRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haul_state::LoadStatus;

    #[test]
    fn insert_get_remove() {
        let store: Store<LoadId, Load> = Store::new();
        assert!(store.is_empty());
        let load = Load::new(OwnerId::new(), "L-1");
        assert!(store.insert(load.id, load.clone()).is_none());
        assert!(store.insert(load.id, load.clone()).is_some());
        assert_eq!(store.get(&load.id).unwrap().load_number, "L-1");
        assert_eq!(store.len(), 1);
        assert!(store.remove(&load.id).is_some());
        assert!(!store.contains(&load.id));
    }

    #[test]
    fn other_owners_records_are_invisible() {
        let store: Store<LoadId, Load> = Store::new();
        let owner = OwnerId::new();
        let load = Load::new(owner, "L-1");
        store.insert(load.id, load.clone());

        assert!(store.get_owned(&load.id, owner).is_some());
        assert!(store.get_owned(&load.id, OwnerId::new()).is_none());
        assert!(store
            .try_update_owned(&load.id, OwnerId::new(), |l| l.accept(None))
            .is_none());
        assert_eq!(store.list_owned(owner).len(), 1);
        assert!(store.list_owned(OwnerId::new()).is_empty());
    }

    #[test]
    fn try_update_is_compare_and_swap_on_status() {
        let store: Store<LoadId, Load> = Store::new();
        let owner = OwnerId::new();
        let load = Load::new(owner, "L-1");
        store.insert(load.id, load.clone());

        let first = store.try_update_owned(&load.id, owner, |l| l.accept(None));
        let second = store.try_update_owned(&load.id, owner, |l| l.accept(None));
        assert!(matches!(first, Some(Ok(()))));
        assert!(matches!(second, Some(Err(_))));
        assert_eq!(store.get(&load.id).unwrap().status, LoadStatus::Accepted);
        assert_eq!(store.get(&load.id).unwrap().transitions.len(), 1);
    }

    #[test]
    fn concurrent_accepts_have_one_winner() {
        let store: Store<LoadId, Load> = Store::new();
        let owner = OwnerId::new();
        let load = Load::new(owner, "L-1");
        let id = load.id;
        store.insert(id, load);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    matches!(store.try_update_owned(&id, owner, |l| l.accept(None)), Some(Ok(())))
                })
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
