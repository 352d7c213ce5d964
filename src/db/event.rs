use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Postgres, QueryBuilder};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::changes::{ChangeBus, ChangeOp, TableChange, EVENTS_TABLE};
use super::store::EventStore;
use crate::dto::{EventFilters, NewEventDto};
use crate::errors::ServiceError;
use crate::models::{Event, EventStatus};
use crate::PGPool;

pub struct PgEventStore {
    pool: PGPool,
    bus: ChangeBus,
}

impl PgEventStore {
    pub fn new(pool: PGPool, bus: ChangeBus) -> Self {
        Self { pool, bus }
    }

    fn publish(&self, op: ChangeOp, id: Option<Uuid>) {
        self.bus.publish(TableChange {
            table: EVENTS_TABLE,
            op,
            id,
        });
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn list(&self, filters: &EventFilters) -> Result<Vec<Event>, ServiceError> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM events WHERE TRUE");
        if let Some(start) = filters.start_date {
            query.push(" AND start_date >= ");
            query.push_bind(start);
        }
        if let Some(end) = filters.end_date {
            query.push(" AND end_date <= ");
            query.push_bind(end);
        }
        if let Some(category) = filters.category {
            query.push(" AND category = ");
            query.push_bind(category);
        }
        if let Some(status) = filters.status {
            query.push(" AND status = ");
            query.push_bind(status);
        }
        if let Some(search) = &filters.search {
            let pattern = format!("%{}%", search);
            query.push(" AND (title ILIKE ");
            query.push_bind(pattern.clone());
            query.push(" OR description ILIKE ");
            query.push_bind(pattern.clone());
            query.push(" OR location ILIKE ");
            query.push_bind(pattern);
            query.push(")");
        }
        query.push(" ORDER BY start_date ASC");

        let res = query.build_query_as::<Event>().fetch_all(&self.pool).await;
        match res {
            Ok(events) => Ok(events),
            Err(err) => {
                log::error!("failed to list events: {:?}", err);
                Err(ServiceError::StoreFailure)
            }
        }
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Event, ServiceError> {
        let res = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        match res {
            Ok(Some(event)) => Ok(event),
            Ok(None) => Err(ServiceError::NotFound),
            Err(err) => {
                log::error!("failed to fetch event {}: {:?}", id, err);
                Err(ServiceError::StoreFailure)
            }
        }
    }

    async fn create(
        &self,
        data: NewEventDto,
        created_by: Option<Uuid>,
    ) -> Result<Event, ServiceError> {
        let res = sqlx::query_as::<_, Event>(
            "INSERT INTO events (id, title, description, location, start_date, end_date, \
             category, status, max_attendees, current_attendees, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 0, $10, $11, $11) \
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.location)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.category)
        .bind(EventStatus::Upcoming)
        .bind(data.max_attendees)
        .bind(created_by)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;
        match res {
            Ok(event) => {
                self.publish(ChangeOp::Insert, Some(event.id));
                Ok(event)
            }
            Err(err) => {
                log::error!("failed to create event: {:?}", err);
                Err(ServiceError::StoreFailure)
            }
        }
    }

    async fn update(&self, event: &Event) -> Result<(), ServiceError> {
        let res = sqlx::query(
            "UPDATE events SET title = $1, description = $2, location = $3, start_date = $4, \
             end_date = $5, category = $6, status = $7, max_attendees = $8, updated_at = now() \
             WHERE id = $9",
        )
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.category)
        .bind(event.status)
        .bind(event.max_attendees)
        .bind(event.id)
        .execute(&self.pool)
        .await;
        match res {
            Ok(done) if done.rows_affected() == 0 => Err(ServiceError::NotFound),
            Ok(_) => {
                self.publish(ChangeOp::Update, Some(event.id));
                Ok(())
            }
            Err(err) => {
                log::error!("failed to update event {}: {:?}", event.id, err);
                Err(ServiceError::StoreFailure)
            }
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let res = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        match res {
            Ok(done) if done.rows_affected() == 0 => Err(ServiceError::NotFound),
            Ok(_) => {
                self.publish(ChangeOp::Delete, Some(id));
                Ok(())
            }
            Err(err) => {
                log::error!("failed to delete event {}: {:?}", id, err);
                Err(ServiceError::StoreFailure)
            }
        }
    }

    async fn set_status_batch(
        &self,
        ids: &[Uuid],
        status: EventStatus,
    ) -> Result<u64, ServiceError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let res = sqlx::query("UPDATE events SET status = $1, updated_at = now() WHERE id = ANY($2)")
            .bind(status)
            .bind(ids)
            .execute(&self.pool)
            .await;
        match res {
            Ok(done) => {
                if done.rows_affected() > 0 {
                    self.publish(ChangeOp::Update, None);
                }
                Ok(done.rows_affected())
            }
            Err(err) => {
                log::error!("failed to batch-update event statuses: {:?}", err);
                Err(ServiceError::StoreFailure)
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<TableChange> {
        self.bus.subscribe()
    }
}
