use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::changes::{ChangeBus, ChangeOp, TableChange, EVENTS_TABLE};
use super::store::EventStore;
use crate::dto::{EventFilters, NewEventDto};
use crate::errors::ServiceError;
use crate::models::{Event, EventStatus};

// Test double with the same observable behavior as the postgres adapter.
pub struct MemoryEventStore {
    events: Mutex<Vec<Event>>,
    bus: ChangeBus,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            bus: ChangeBus::default(),
        }
    }

    pub fn seed(&self, event: Event) {
        self.events.lock().push(event);
    }

    fn publish(&self, op: ChangeOp, id: Option<Uuid>) {
        self.bus.publish(TableChange {
            table: EVENTS_TABLE,
            op,
            id,
        });
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn list(&self, filters: &EventFilters) -> Result<Vec<Event>, ServiceError> {
        let mut matched: Vec<Event> = self
            .events
            .lock()
            .iter()
            .filter(|event| filters.matches(event))
            .cloned()
            .collect();
        matched.sort_by_key(|event| event.start_date);
        Ok(matched)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Event, ServiceError> {
        self.events
            .lock()
            .iter()
            .find(|event| event.id == id)
            .cloned()
            .ok_or(ServiceError::NotFound)
    }

    async fn create(
        &self,
        data: NewEventDto,
        created_by: Option<Uuid>,
    ) -> Result<Event, ServiceError> {
        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            location: data.location,
            start_date: data.start_date,
            end_date: data.end_date,
            category: data.category,
            status: EventStatus::Upcoming,
            max_attendees: data.max_attendees,
            current_attendees: 0,
            created_by,
            created_at: now,
            updated_at: now,
        };
        self.events.lock().push(event.clone());
        self.publish(ChangeOp::Insert, Some(event.id));
        Ok(event)
    }

    async fn update(&self, event: &Event) -> Result<(), ServiceError> {
        let mut events = self.events.lock();
        let slot = events
            .iter_mut()
            .find(|candidate| candidate.id == event.id)
            .ok_or(ServiceError::NotFound)?;
        *slot = Event {
            updated_at: Utc::now(),
            ..event.clone()
        };
        drop(events);
        self.publish(ChangeOp::Update, Some(event.id));
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let mut events = self.events.lock();
        let before = events.len();
        events.retain(|event| event.id != id);
        if events.len() == before {
            return Err(ServiceError::NotFound);
        }
        drop(events);
        self.publish(ChangeOp::Delete, Some(id));
        Ok(())
    }

    async fn set_status_batch(
        &self,
        ids: &[Uuid],
        status: EventStatus,
    ) -> Result<u64, ServiceError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut transitions = 0;
        {
            let mut events = self.events.lock();
            for event in events.iter_mut() {
                if ids.contains(&event.id) {
                    event.status = status;
                    event.updated_at = Utc::now();
                    transitions += 1;
                }
            }
        }
        if transitions > 0 {
            self.publish(ChangeOp::Update, None);
        }
        Ok(transitions)
    }

    fn subscribe(&self) -> broadcast::Receiver<TableChange> {
        self.bus.subscribe()
    }
}
