use crate::models::{Event, EventInput, Sort};
use async_trait::async_trait;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Sqlx(#[source] sqlx::Error),
}

/// Source of units of work. One is opened per service call.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;
}

/// Transactional context for a single service call. Dropping it without
/// calling [`UnitOfWork::commit`] discards every write made through it.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn find_by_id(&mut self, id: Uuid) -> Result<Option<Event>, StoreError>;

    async fn find_by_name(&mut self, name: &str) -> Result<Option<Event>, StoreError>;

    async fn find_page(
        &mut self,
        sort: Sort,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Event>, StoreError>;

    /// First persist. Assigns `id`, `created_at` and `updated_at`; any `id`
    /// carried by the input is ignored.
    async fn insert(&mut self, event: EventInput) -> Result<Event, StoreError>;

    /// Merge persist. Refreshes `updated_at`.
    async fn update(&mut self, event: &Event) -> Result<Event, StoreError>;

    async fn delete(&mut self, event: &Event) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
