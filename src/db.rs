use crate::config::Config;
use crate::models::{Event, EventInput, Sort};
use crate::store::{EventStore, StoreError, UnitOfWork};
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::str::FromStr;
use uuid::Uuid;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation(db_err.message().to_string());
            }
        }
        StoreError::Sqlx(err)
    }
}

pub async fn connect(config: &Config) -> anyhow::Result<SqlitePool> {
    let connect_options = SqliteConnectOptions::from_str(&config.database_url)
        .context("failed to parse DATABASE_URL")?
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(connect_options)
        .await
        .context("failed to connect to db")
}

pub async fn init_schema(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS events (
            id BLOB PRIMARY KEY NOT NULL,
            name TEXT NOT NULL UNIQUE CHECK (length(name) BETWEEN 1 AND 100),
            description TEXT NOT NULL DEFAULT '',
            price REAL NOT NULL CHECK (price > 0),
            location TEXT NOT NULL DEFAULT '' CHECK (length(location) <= 100),
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            organizer_id BLOB NOT NULL,
            creator_id BLOB NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[derive(Clone)]
pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteUnitOfWork { tx }))
    }
}

struct SqliteUnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl UnitOfWork for SqliteUnitOfWork {
    async fn find_by_id(&mut self, id: Uuid) -> Result<Option<Event>, StoreError> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(event)
    }

    async fn find_by_name(&mut self, name: &str) -> Result<Option<Event>, StoreError> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE name = ? LIMIT 1")
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(event)
    }

    async fn find_page(
        &mut self,
        sort: Sort,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Event>, StoreError> {
        // Column and keyword come from closed enums, never from caller text.
        let sql = format!(
            "SELECT * FROM events ORDER BY {} {}, id ASC LIMIT ? OFFSET ?",
            sort.field.column(),
            sort.direction.keyword()
        );
        let events = sqlx::query_as::<_, Event>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(events)
    }

    async fn insert(&mut self, input: EventInput) -> Result<Event, StoreError> {
        let now = Utc::now();
        let event = sqlx::query_as::<_, Event>(
            "INSERT INTO events (id, name, description, price, location, start_date, end_date, organizer_id, creator_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(&input.location)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.organizer_id)
        .bind(input.creator_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(event)
    }

    async fn update(&mut self, event: &Event) -> Result<Event, StoreError> {
        let updated = sqlx::query_as::<_, Event>(
            "UPDATE events
             SET name = ?, description = ?, price = ?, location = ?, start_date = ?, end_date = ?, organizer_id = ?, updated_at = ?
             WHERE id = ? RETURNING *",
        )
        .bind(&event.name)
        .bind(&event.description)
        .bind(event.price)
        .bind(&event.location)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.organizer_id)
        .bind(Utc::now())
        .bind(event.id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(updated)
    }

    async fn delete(&mut self, event: &Event) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(event.id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let SqliteUnitOfWork { tx } = *self;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SortDirection, SortField};
    use chrono::TimeZone;

    async fn store() -> SqliteEventStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_schema(&pool).await.unwrap();
        SqliteEventStore::new(pool)
    }

    fn input(name: &str, price: f64) -> EventInput {
        EventInput {
            id: None,
            name: name.to_string(),
            description: String::new(),
            price,
            location: "Gdansk".to_string(),
            start_date: Utc.with_ymd_and_hms(2025, 7, 5, 10, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2025, 7, 6, 10, 0, 0).unwrap(),
            organizer_id: Uuid::new_v4(),
            creator_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_identity_and_timestamps() {
        let store = store().await;
        let mut uow = store.begin().await.unwrap();
        let created = uow.insert(input("Grill", 10.0)).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(created.created_at, created.updated_at);

        let mut uow = store.begin().await.unwrap();
        let found = uow.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found, created);
        let by_name = uow.find_by_name("Grill").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
    }

    #[tokio::test]
    async fn unique_name_violation_is_classified() {
        let store = store().await;
        let mut uow = store.begin().await.unwrap();
        uow.insert(input("Grill", 10.0)).await.unwrap();
        let err = uow.insert(input("Grill", 5.0)).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)), "{err:?}");
    }

    #[tokio::test]
    async fn check_constraints_are_generic_errors() {
        let store = store().await;
        let mut uow = store.begin().await.unwrap();
        let err = uow.insert(input("Free", 0.0)).await.unwrap_err();
        assert!(matches!(err, StoreError::Sqlx(_)), "{err:?}");
        let err = uow.insert(input(&"x".repeat(101), 1.0)).await.unwrap_err();
        assert!(matches!(err, StoreError::Sqlx(_)), "{err:?}");
    }

    #[tokio::test]
    async fn uncommitted_work_is_rolled_back() {
        let store = store().await;
        let id = {
            let mut uow = store.begin().await.unwrap();
            uow.insert(input("Grill", 10.0)).await.unwrap().id
        };
        let mut uow = store.begin().await.unwrap();
        assert!(uow.find_by_id(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_keeps_creator_and_created_at() {
        let store = store().await;
        let mut uow = store.begin().await.unwrap();
        let created = uow.insert(input("Grill", 10.0)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let mut changed = created.clone();
        changed.price = 15.0;
        changed.creator_id = Uuid::new_v4();
        let updated = uow.update(&changed).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(updated.price, 15.0);
        assert_eq!(updated.creator_id, created.creator_id);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn page_is_ordered_and_bounded() {
        let store = store().await;
        let mut uow = store.begin().await.unwrap();
        for (name, price) in [("b", 3.0), ("a", 2.0), ("d", 1.0), ("c", 4.0)] {
            uow.insert(input(name, price)).await.unwrap();
        }

        let by_name = uow
            .find_page(Sort::default(), 1, 2)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect::<Vec<_>>();
        assert_eq!(by_name, vec!["b", "c"]);

        let by_price_desc = uow
            .find_page(Sort::by(SortField::Price, SortDirection::Descending), 0, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect::<Vec<_>>();
        assert_eq!(by_price_desc, vec!["c", "b", "a", "d"]);
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let store = store().await;
        let mut uow = store.begin().await.unwrap();
        let created = uow.insert(input("Grill", 10.0)).await.unwrap();
        uow.delete(&created).await.unwrap();
        assert!(uow.find_by_id(created.id).await.unwrap().is_none());
    }
}
