use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::changes::TableChange;
use crate::dto::{EventFilters, NewEventDto};
use crate::errors::ServiceError;
use crate::models::{Event, EventStatus};

// Storage seam for event records. Writes publish onto the change bus after
// they succeed; no retries happen at this layer.
#[async_trait]
pub trait EventStore: Send + Sync + 'static {
    async fn list(&self, filters: &EventFilters) -> Result<Vec<Event>, ServiceError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Event, ServiceError>;

    async fn create(
        &self,
        data: NewEventDto,
        created_by: Option<Uuid>,
    ) -> Result<Event, ServiceError>;

    async fn update(&self, event: &Event) -> Result<(), ServiceError>;

    async fn delete(&self, id: Uuid) -> Result<(), ServiceError>;

    async fn set_status_batch(
        &self,
        ids: &[Uuid],
        status: EventStatus,
    ) -> Result<u64, ServiceError>;

    fn subscribe(&self) -> broadcast::Receiver<TableChange>;
}
