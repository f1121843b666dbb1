//! In-memory implementation of [`EventStore`] for tests.
//!
//! Units of work are serialized: each one holds the table lock until it is
//! committed or dropped, and writes go to a staged copy that only replaces
//! the table on commit. Constraints mirror the SQLite schema.

use crate::models::{Event, EventInput, Sort, SortDirection, SortField};
use crate::store::{EventStore, StoreError, UnitOfWork};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex as SyncMutex;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Store operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Begin,
    FindById,
    FindByName,
    FindPage,
    Insert,
    Update,
    Delete,
    Commit,
}

type Table = BTreeMap<Uuid, Event>;

#[derive(Clone, Default)]
pub struct MemoryEventStore {
    table: Arc<Mutex<Table>>,
    faults: Arc<SyncMutex<HashSet<StoreOp>>>,
    writes: Arc<AtomicUsize>,
    skip_name_lookup: Arc<SyncMutex<bool>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent call of `op` fails with [`StoreError::Unavailable`].
    pub fn fail_on(&self, op: StoreOp) {
        self.faults.lock().insert(op);
    }

    pub fn heal(&self) {
        self.faults.lock().clear();
    }

    /// Makes `find_by_name` report no match, as a concurrent writer racing
    /// past the application-level check would observe.
    pub fn hide_names(&self, hide: bool) {
        *self.skip_name_lookup.lock() = hide;
    }

    /// Number of insert, update and delete calls, committed or not.
    pub fn write_count(&self) -> usize {
        self.writes.load(AtomicOrdering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.table.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        check(&self.faults, StoreOp::Begin)?;
        let committed = self.table.clone().lock_owned().await;
        let staged = (*committed).clone();
        Ok(Box::new(MemoryUnitOfWork {
            committed,
            staged,
            faults: self.faults.clone(),
            writes: self.writes.clone(),
            skip_name_lookup: *self.skip_name_lookup.lock(),
        }))
    }
}

struct MemoryUnitOfWork {
    committed: OwnedMutexGuard<Table>,
    staged: Table,
    faults: Arc<SyncMutex<HashSet<StoreOp>>>,
    writes: Arc<AtomicUsize>,
    skip_name_lookup: bool,
}

fn check(faults: &SyncMutex<HashSet<StoreOp>>, op: StoreOp) -> Result<(), StoreError> {
    if faults.lock().contains(&op) {
        return Err(StoreError::Unavailable(format!("{:?} failed", op)));
    }
    Ok(())
}

impl MemoryUnitOfWork {
    fn validate(&self, event: &Event) -> Result<(), StoreError> {
        let name_len = event.name.chars().count();
        if !(1..=100).contains(&name_len) {
            return Err(StoreError::Constraint("events.name length".to_string()));
        }
        if event.location.chars().count() > 100 {
            return Err(StoreError::Constraint("events.location length".to_string()));
        }
        if event.price.is_nan() || event.price <= 0.0 {
            return Err(StoreError::Constraint("events.price".to_string()));
        }
        let taken = self
            .staged
            .values()
            .any(|other| other.id != event.id && other.name == event.name);
        if taken {
            return Err(StoreError::UniqueViolation("events.name".to_string()));
        }
        Ok(())
    }
}

fn compare(a: &Event, b: &Event, field: SortField) -> Ordering {
    match field {
        SortField::Id => a.id.cmp(&b.id),
        SortField::Name => a.name.cmp(&b.name),
        SortField::Description => a.description.cmp(&b.description),
        SortField::Price => a.price.total_cmp(&b.price),
        SortField::Location => a.location.cmp(&b.location),
        SortField::StartDate => a.start_date.cmp(&b.start_date),
        SortField::EndDate => a.end_date.cmp(&b.end_date),
        SortField::OrganizerId => a.organizer_id.cmp(&b.organizer_id),
        SortField::CreatorId => a.creator_id.cmp(&b.creator_id),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_by_id(&mut self, id: Uuid) -> Result<Option<Event>, StoreError> {
        check(&self.faults, StoreOp::FindById)?;
        Ok(self.staged.get(&id).cloned())
    }

    async fn find_by_name(&mut self, name: &str) -> Result<Option<Event>, StoreError> {
        check(&self.faults, StoreOp::FindByName)?;
        if self.skip_name_lookup {
            return Ok(None);
        }
        Ok(self.staged.values().find(|e| e.name == name).cloned())
    }

    async fn find_page(
        &mut self,
        sort: Sort,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Event>, StoreError> {
        check(&self.faults, StoreOp::FindPage)?;
        let mut events: Vec<Event> = self.staged.values().cloned().collect();
        events.sort_by(|a, b| {
            let ord = compare(a, b, sort.field);
            let ord = match sort.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            };
            ord.then_with(|| a.id.cmp(&b.id))
        });
        Ok(events
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect())
    }

    async fn insert(&mut self, input: EventInput) -> Result<Event, StoreError> {
        self.writes.fetch_add(1, AtomicOrdering::SeqCst);
        check(&self.faults, StoreOp::Insert)?;
        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            price: input.price,
            location: input.location,
            start_date: input.start_date,
            end_date: input.end_date,
            organizer_id: input.organizer_id,
            creator_id: input.creator_id,
            created_at: now,
            updated_at: now,
        };
        self.validate(&event)?;
        self.staged.insert(event.id, event.clone());
        Ok(event)
    }

    async fn update(&mut self, event: &Event) -> Result<Event, StoreError> {
        self.writes.fetch_add(1, AtomicOrdering::SeqCst);
        check(&self.faults, StoreOp::Update)?;
        let Some(current) = self.staged.get(&event.id) else {
            return Err(StoreError::Unavailable(format!("row {} vanished", event.id)));
        };
        let merged = Event {
            creator_id: current.creator_id,
            created_at: current.created_at,
            updated_at: Utc::now(),
            ..event.clone()
        };
        self.validate(&merged)?;
        self.staged.insert(merged.id, merged.clone());
        Ok(merged)
    }

    async fn delete(&mut self, event: &Event) -> Result<(), StoreError> {
        self.writes.fetch_add(1, AtomicOrdering::SeqCst);
        check(&self.faults, StoreOp::Delete)?;
        self.staged.remove(&event.id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        check(&self.faults, StoreOp::Commit)?;
        let MemoryUnitOfWork {
            mut committed,
            staged,
            ..
        } = *self;
        *committed = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn input(name: &str, price: f64) -> EventInput {
        EventInput {
            id: None,
            name: name.to_string(),
            description: String::new(),
            price,
            location: String::new(),
            start_date: Utc.with_ymd_and_hms(2025, 7, 5, 10, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2025, 7, 6, 10, 0, 0).unwrap(),
            organizer_id: Uuid::new_v4(),
            creator_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn dropped_unit_of_work_rolls_back() {
        let store = MemoryEventStore::new();
        {
            let mut uow = store.begin().await.unwrap();
            uow.insert(input("A", 1.0)).await.unwrap();
        }
        assert!(store.is_empty().await);
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn commit_publishes_writes() {
        let store = MemoryEventStore::new();
        let mut uow = store.begin().await.unwrap();
        let event = uow.insert(input("A", 1.0)).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        assert_eq!(uow.find_by_id(event.id).await.unwrap(), Some(event));
    }

    #[tokio::test]
    async fn duplicate_name_is_a_unique_violation() {
        let store = MemoryEventStore::new();
        let mut uow = store.begin().await.unwrap();
        uow.insert(input("A", 1.0)).await.unwrap();
        let err = uow.insert(input("A", 2.0)).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn rejects_non_positive_price() {
        let store = MemoryEventStore::new();
        let mut uow = store.begin().await.unwrap();
        let err = uow.insert(input("A", 0.0)).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn rejects_nan_price() {
        let store = MemoryEventStore::new();
        let mut uow = store.begin().await.unwrap();
        let err = uow.insert(input("A", f64::NAN)).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn faults_fire_until_healed() {
        let store = MemoryEventStore::new();
        store.fail_on(StoreOp::Begin);
        assert!(store.begin().await.is_err());
        store.heal();
        assert!(store.begin().await.is_ok());
    }
}
