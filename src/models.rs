use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A persisted event. Every field is populated; `id`, `creator_id` and
/// `created_at` never change after the first persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub location: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub organizer_id: Uuid,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Overlays every field present in `patch`. Identity and audit fields are
    /// not part of the patch and stay as loaded.
    pub fn apply(&mut self, patch: EventPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = end_date;
        }
        if let Some(organizer_id) = patch.organizer_id {
            self.organizer_id = organizer_id;
        }
    }
}

/// Candidate for creation. A caller may send an `id`; it is discarded
/// before anything reaches the store.
#[derive(Debug, Clone, PartialEq)]
pub struct EventInput {
    pub id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub location: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub organizer_id: Uuid,
    pub creator_id: Uuid,
}

/// Sparse overlay targeting the event `id`. `None` means "not supplied";
/// `Some(String::new())` is a real value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub id: Uuid,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub location: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub organizer_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub index: u32,
    pub size: u32,
}

impl Page {
    pub fn new(index: u32, size: u32) -> Self {
        Self { index, size }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.index) * i64::from(self.size)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { index: 0, size: 10 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Name,
    Description,
    Price,
    Location,
    StartDate,
    EndDate,
    OrganizerId,
    CreatorId,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Name => "name",
            SortField::Description => "description",
            SortField::Price => "price",
            SortField::Location => "location",
            SortField::StartDate => "start_date",
            SortField::EndDate => "end_date",
            SortField::OrganizerId => "organizer_id",
            SortField::CreatorId => "creator_id",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSortField(pub String);

impl fmt::Display for UnknownSortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown sort field {}", self.0)
    }
}

impl FromStr for SortField {
    type Err = UnknownSortField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field = match s {
            "id" => SortField::Id,
            "name" => SortField::Name,
            "description" => SortField::Description,
            "price" => SortField::Price,
            "location" => SortField::Location,
            "start_date" | "startDate" => SortField::StartDate,
            "end_date" | "endDate" => SortField::EndDate,
            "organizer_id" | "organizerId" => SortField::OrganizerId,
            "creator_id" | "creatorId" => SortField::CreatorId,
            "created_at" | "createdAt" => SortField::CreatedAt,
            "updated_at" | "updatedAt" => SortField::UpdatedAt,
            other => return Err(UnknownSortField(other.to_string())),
        };
        Ok(field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            _ => Err(format!("Unknown sort order {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Sort {
    pub fn by(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }
}

impl Default for Sort {
    fn default() -> Self {
        Self::by(SortField::Name, SortDirection::Ascending)
    }
}
