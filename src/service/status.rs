use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::clock::Clock;
use crate::db::store::EventStore;
use crate::dto::EventFilters;
use crate::errors::ServiceError;
use crate::models::{Event, EventStatus};

// Status is a cached projection of the date bounds; finished and cancelled
// are terminal and never recomputed.
pub fn derive_status(event: &Event, now: DateTime<Utc>) -> EventStatus {
   match event.status {
      EventStatus::Finished | EventStatus::Cancelled => event.status,
      _ => {
         if now >= event.end_date {
            EventStatus::Finished
         } else if now >= event.start_date {
            EventStatus::Ongoing
         } else {
            EventStatus::Upcoming
         }
      }
   }
}

// Partition into the two batched transitions of one reconciliation pass,
// skipping events already in their derived state.
pub fn partition_transitions(events: &[Event], now: DateTime<Utc>) -> (Vec<Uuid>, Vec<Uuid>) {
   let mut to_ongoing = Vec::new();
   let mut to_finished = Vec::new();
   for event in events {
      let derived = derive_status(event, now);
      if derived == event.status {
         continue;
      }
      match derived {
         EventStatus::Ongoing => to_ongoing.push(event.id),
         EventStatus::Finished => to_finished.push(event.id),
         _ => {}
      }
   }
   (to_ongoing, to_finished)
}

// One reconciliation pass: at most two batched updates, returning the number
// of transitioned events.
pub async fn reconcile<S>(store: &S, clock: &dyn Clock) -> Result<u64, ServiceError>
where
   S: EventStore + ?Sized,
{
   let events = store.list(&EventFilters::default()).await?;
   let (to_ongoing, to_finished) = partition_transitions(&events, clock.now());
   let mut transitions = 0;
   if !to_ongoing.is_empty() {
      transitions += store.set_status_batch(&to_ongoing, EventStatus::Ongoing).await?;
   }
   if !to_finished.is_empty() {
      transitions += store.set_status_batch(&to_finished, EventStatus::Finished).await?;
   }
   Ok(transitions)
}

#[cfg(test)]
mod tests {
   use chrono::Duration;

   use super::*;
   use crate::db::memory::MemoryEventStore;
   use crate::models::EventCategory;
   use crate::service::clock::ManualClock;

   fn event_at(start_offset: Duration, end_offset: Duration, status: EventStatus) -> Event {
      let now = Utc::now();
      Event {
         id: Uuid::new_v4(),
         title: "Feria".to_string(),
         description: String::new(),
         location: String::new(),
         start_date: now + start_offset,
         end_date: now + end_offset,
         category: EventCategory::Commercial,
         status,
         max_attendees: None,
         current_attendees: 0,
         created_by: None,
         created_at: now,
         updated_at: now,
      }
   }

   #[test]
   fn started_events_derive_to_ongoing() {
      let event = event_at(Duration::hours(-1), Duration::hours(1), EventStatus::Upcoming);
      assert_eq!(derive_status(&event, Utc::now()), EventStatus::Ongoing);
   }

   #[test]
   fn elapsed_events_derive_to_finished_from_any_live_state() {
      let upcoming = event_at(Duration::hours(-3), Duration::hours(-1), EventStatus::Upcoming);
      let ongoing = event_at(Duration::hours(-3), Duration::hours(-1), EventStatus::Ongoing);
      assert_eq!(derive_status(&upcoming, Utc::now()), EventStatus::Finished);
      assert_eq!(derive_status(&ongoing, Utc::now()), EventStatus::Finished);
   }

   #[test]
   fn terminal_states_never_move() {
      let finished = event_at(Duration::hours(1), Duration::hours(2), EventStatus::Finished);
      let cancelled = event_at(Duration::hours(-2), Duration::hours(-1), EventStatus::Cancelled);
      assert_eq!(derive_status(&finished, Utc::now()), EventStatus::Finished);
      assert_eq!(derive_status(&cancelled, Utc::now()), EventStatus::Cancelled);
   }

   #[test]
   fn inverted_date_bounds_do_not_panic() {
      // The form layer guards start < end; the core just derives something.
      let event = event_at(Duration::hours(2), Duration::hours(-2), EventStatus::Upcoming);
      assert_eq!(derive_status(&event, Utc::now()), EventStatus::Finished);
   }

   #[test]
   fn partition_splits_by_target_state() {
      let now = Utc::now();
      let starting = event_at(Duration::minutes(-5), Duration::hours(1), EventStatus::Upcoming);
      let elapsed = event_at(Duration::hours(-3), Duration::minutes(-1), EventStatus::Ongoing);
      let untouched = event_at(Duration::hours(5), Duration::hours(6), EventStatus::Upcoming);
      let events = vec![starting.clone(), elapsed.clone(), untouched];

      let (to_ongoing, to_finished) = partition_transitions(&events, now);
      assert_eq!(to_ongoing, vec![starting.id]);
      assert_eq!(to_finished, vec![elapsed.id]);
   }

   #[tokio::test]
   async fn reconcile_pass_is_idempotent_without_time_advance() {
      let store = MemoryEventStore::new();
      let clock = ManualClock::starting_at(Utc::now());
      store.seed(event_at(Duration::minutes(-30), Duration::hours(1), EventStatus::Upcoming));
      store.seed(event_at(Duration::hours(-4), Duration::hours(-2), EventStatus::Upcoming));
      store.seed(event_at(Duration::hours(-4), Duration::hours(-2), EventStatus::Ongoing));

      let first = reconcile(&store, &clock).await.unwrap();
      assert_eq!(first, 3);
      let second = reconcile(&store, &clock).await.unwrap();
      assert_eq!(second, 0);
   }
}
