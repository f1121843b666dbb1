//! Business rules for events: price validation, the name-uniqueness check,
//! partial-update merging, and classification of store failures.
//!
//! Each public operation runs inside one [`UnitOfWork`] and hands it
//! explicitly to the helpers below.

use crate::error::ServiceError;
use crate::models::{Event, EventInput, EventPatch, Page, Sort};
use crate::store::{EventStore, StoreError, UnitOfWork};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

const INVALID_PRICE: &str = "Price must be greater than 0";

/// NaN compares false against everything, so it is rejected here too.
fn is_valid_price(price: f64) -> bool {
    price > 0.0
}

/// Operation tag carried in log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    List,
    Details,
    Create,
    Update,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Method::List => "LIST",
            Method::Details => "DETAILS",
            Method::Create => "CREATE",
            Method::Update => "UPDATE",
            Method::Delete => "DELETE",
        };
        f.write_str(tag)
    }
}

fn database_error(method: Method, message: String, source: StoreError) -> ServiceError {
    tracing::error!(%method, error = %source, "{}", message);
    ServiceError::database(message, source)
}

#[derive(Clone)]
pub struct EventService {
    store: Arc<dyn EventStore>,
}

impl EventService {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    pub async fn list_events(&self, page: Page, sort: Sort) -> Result<Vec<Event>, ServiceError> {
        tracing::trace!(?page, ?sort, "listing events");
        let mut uow = self.begin(Method::List).await?;
        let events = uow
            .find_page(sort, page.offset(), i64::from(page.size))
            .await
            .map_err(|e| database_error(Method::List, "Failed to list events".to_string(), e))?;
        commit(uow, Method::List).await?;
        Ok(events)
    }

    pub async fn get_event_details(&self, id: Uuid) -> Result<Event, ServiceError> {
        tracing::trace!(%id, "getting event details");
        let mut uow = self.begin(Method::Details).await?;
        let event = find_event_or_fail(&mut *uow, id, Method::Details).await?;
        commit(uow, Method::Details).await?;
        Ok(event)
    }

    pub async fn create_event(&self, mut candidate: EventInput) -> Result<Uuid, ServiceError> {
        tracing::trace!(?candidate, "creating event");
        if !is_valid_price(candidate.price) {
            return Err(ServiceError::InvalidArgument(INVALID_PRICE.to_string()));
        }

        if let Some(supplied) = candidate.id.take() {
            tracing::debug!(method = %Method::Create, %supplied, "ignoring caller-supplied id");
        }

        let mut uow = self.begin(Method::Create).await?;
        check_name_conflict(&mut *uow, &candidate.name, None, Method::Create).await?;
        let created = insert_event_or_fail(&mut *uow, candidate, Method::Create).await?;
        commit(uow, Method::Create).await?;
        Ok(created.id)
    }

    /// Applies `patch` onto the stored event. The name check runs before the
    /// existence check, so a missing id with a taken name reports a conflict.
    pub async fn update_event(&self, patch: EventPatch) -> Result<Uuid, ServiceError> {
        tracing::trace!(?patch, "updating event");
        if patch.price.is_some_and(|price| !is_valid_price(price)) {
            return Err(ServiceError::InvalidArgument(INVALID_PRICE.to_string()));
        }

        let mut uow = self.begin(Method::Update).await?;
        if let Some(name) = patch.name.as_deref() {
            check_name_conflict(&mut *uow, name, Some(patch.id), Method::Update).await?;
        }
        let mut event = find_event_or_fail(&mut *uow, patch.id, Method::Update).await?;
        event.apply(patch);
        let merged = persist_event_or_fail(&mut *uow, &event, Method::Update).await?;
        commit(uow, Method::Update).await?;
        Ok(merged.id)
    }

    pub async fn delete_event(&self, id: Uuid) -> Result<(), ServiceError> {
        tracing::trace!(%id, "deleting event");
        let mut uow = self.begin(Method::Delete).await?;
        let event = find_event_or_fail(&mut *uow, id, Method::Delete).await?;
        uow.delete(&event).await.map_err(|e| {
            database_error(
                Method::Delete,
                format!("Failed to delete event with id {}", id),
                e,
            )
        })?;
        commit(uow, Method::Delete).await?;
        tracing::debug!(method = %Method::Delete, %id, "deleted event");
        Ok(())
    }

    async fn begin(&self, method: Method) -> Result<Box<dyn UnitOfWork>, ServiceError> {
        self.store
            .begin()
            .await
            .map_err(|e| database_error(method, "Failed to open transaction".to_string(), e))
    }
}

async fn commit(uow: Box<dyn UnitOfWork>, method: Method) -> Result<(), ServiceError> {
    uow.commit()
        .await
        .map_err(|e| database_error(method, "Failed to commit transaction".to_string(), e))
}

/// Fails with a conflict when another event already uses `name`. With no
/// `own_id` (a create) any match conflicts; otherwise only a match with a
/// different id does.
async fn check_name_conflict(
    uow: &mut dyn UnitOfWork,
    name: &str,
    own_id: Option<Uuid>,
    method: Method,
) -> Result<(), ServiceError> {
    let existing = uow.find_by_name(name).await.map_err(|e| {
        database_error(method, format!("Failed to get event with name {}", name), e)
    })?;

    match existing {
        Some(existing) if Some(existing.id) != own_id => {
            let message = format!("Event with name {} already exists", name);
            tracing::debug!(%method, "{}", message);
            Err(ServiceError::conflict(message))
        }
        _ => Ok(()),
    }
}

async fn find_event_or_fail(
    uow: &mut dyn UnitOfWork,
    id: Uuid,
    method: Method,
) -> Result<Event, ServiceError> {
    let found = uow
        .find_by_id(id)
        .await
        .map_err(|e| database_error(method, format!("Failed to get event with id {}", id), e))?;

    found.ok_or_else(|| {
        let message = format!("Event with id {} does not exist", id);
        tracing::debug!(%method, "{}", message);
        ServiceError::NotFound(message)
    })
}

async fn insert_event_or_fail(
    uow: &mut dyn UnitOfWork,
    candidate: EventInput,
    method: Method,
) -> Result<Event, ServiceError> {
    let name = candidate.name.clone();
    let created = uow
        .insert(candidate)
        .await
        .map_err(|e| classify_persist_error(method, &name, e))?;
    tracing::debug!(%method, id = %created.id, "persisted event");
    Ok(created)
}

async fn persist_event_or_fail(
    uow: &mut dyn UnitOfWork,
    event: &Event,
    method: Method,
) -> Result<Event, ServiceError> {
    let merged = uow
        .update(event)
        .await
        .map_err(|e| classify_persist_error(method, &event.name, e))?;
    tracing::debug!(%method, id = %merged.id, "persisted event");
    Ok(merged)
}

/// The unique index on `name` backs up the application-level check when two
/// writers race, and still reports as a conflict.
fn classify_persist_error(method: Method, name: &str, err: StoreError) -> ServiceError {
    match err {
        StoreError::UniqueViolation(_) => {
            let message = format!("Event with name {} already exists", name);
            tracing::debug!(%method, error = %err, "{}", message);
            ServiceError::Conflict {
                message,
                source: Some(err),
            }
        }
        other => database_error(
            method,
            format!("Failed to persist event with name {}", name),
            other,
        ),
    }
}
