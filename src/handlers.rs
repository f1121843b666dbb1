use crate::{
    error::{ErrorKind, ServiceError},
    models::{Event, EventInput, EventPatch, Page, Sort, SortDirection, SortField},
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    page: Option<u32>,
    size: Option<u32>,
    sort: Option<String>,
    order: Option<String>,
}

impl ListQuery {
    fn into_page_and_sort(self) -> Result<(Page, Sort), ServiceError> {
        let defaults = Page::default();
        let page = Page::new(
            self.page.unwrap_or(defaults.index),
            self.size.unwrap_or(defaults.size),
        );
        if page.size == 0 {
            return Err(ServiceError::InvalidArgument(
                "Page size must be greater than 0".to_string(),
            ));
        }

        let field = match self.sort.as_deref() {
            Some(raw) => raw
                .parse::<SortField>()
                .map_err(|e| ServiceError::InvalidArgument(e.to_string()))?,
            None => SortField::Name,
        };
        let direction = match self.order.as_deref() {
            Some(raw) => raw
                .parse::<SortDirection>()
                .map_err(ServiceError::InvalidArgument)?,
            None => SortDirection::Ascending,
        };
        Ok((page, Sort::by(field, direction)))
    }
}

/// Listing projection: no ownership or audit fields.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub location: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl From<Event> for EventSummary {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            name: event.name,
            description: event.description,
            price: event.price,
            location: event.location,
            start_date: event.start_date,
            end_date: event.end_date,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IdResponse {
    pub id: Uuid,
}

#[derive(Deserialize)]
pub struct CreateEventPayload {
    #[serde(default)]
    id: Option<Uuid>,
    name: String,
    #[serde(default)]
    description: String,
    price: f64,
    #[serde(default)]
    location: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    organizer_id: Uuid,
    #[serde(default)]
    creator_id: Option<Uuid>,
}

impl From<CreateEventPayload> for EventInput {
    fn from(payload: CreateEventPayload) -> Self {
        Self {
            id: payload.id,
            name: payload.name,
            description: payload.description,
            price: payload.price,
            location: payload.location,
            start_date: payload.start_date,
            end_date: payload.end_date,
            organizer_id: payload.organizer_id,
            creator_id: payload.creator_id.unwrap_or_else(Uuid::new_v4),
        }
    }
}

/// Absent and `null` both leave the stored value untouched.
#[derive(Deserialize)]
pub struct UpdateEventPayload {
    name: Option<String>,
    description: Option<String>,
    price: Option<f64>,
    location: Option<String>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    organizer_id: Option<Uuid>,
}

impl UpdateEventPayload {
    fn into_patch(self, id: Uuid) -> EventPatch {
        EventPatch {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            location: self.location,
            start_date: self.start_date,
            end_date: self.end_date,
            organizer_id: self.organizer_id,
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn list_events(
    State(app_state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<EventSummary>>, ServiceError> {
    let (page, sort) = query.into_page_and_sort()?;
    let events = app_state.service.list_events(page, sort).await?;
    Ok(Json(events.into_iter().map(EventSummary::from).collect()))
}

pub async fn get_event_details(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Event>, ServiceError> {
    app_state.service.get_event_details(id).await.map(Json)
}

pub async fn create_event_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateEventPayload>,
) -> Result<(StatusCode, Json<IdResponse>), ServiceError> {
    let id = app_state.service.create_event(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(IdResponse { id })))
}

pub async fn update_event_handler(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEventPayload>,
) -> Result<Json<IdResponse>, ServiceError> {
    let id = app_state.service.update_event(payload.into_patch(id)).await?;
    Ok(Json(IdResponse { id }))
}

pub async fn delete_event_handler(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    app_state.service.delete_event(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
