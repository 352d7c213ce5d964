use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::clock::Clock;
use super::notify::{NotificationDispatcher, Toast};
use super::reminders::ReminderScheduler;
use super::status;
use crate::db::store::EventStore;
use crate::dto::{EventFilters, NewEventDto};
use crate::errors::ServiceError;
use crate::models::Event;

pub const RECONCILE_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const HORIZON_SCAN_INTERVAL: Duration = Duration::from_secs(60 * 60);

struct CoordinatorState {
   events: Vec<Event>,
   loading: bool,
}

// Root of the events subsystem: owns the in-memory snapshot the UI reads,
// drives reconciliation and the horizon scan, and reacts to the change feed.
// Nothing else writes the snapshot.
pub struct EventCoordinator<S: EventStore> {
   store: Arc<S>,
   clock: Arc<dyn Clock>,
   dispatcher: Arc<NotificationDispatcher>,
   scheduler: Arc<ReminderScheduler>,
   state: RwLock<CoordinatorState>,
   generation: AtomicU64,
   shutdown: CancellationToken,
   tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<S: EventStore> EventCoordinator<S> {
   pub fn new(
      store: Arc<S>,
      clock: Arc<dyn Clock>,
      dispatcher: Arc<NotificationDispatcher>,
      scheduler: Arc<ReminderScheduler>,
   ) -> Arc<Self> {
      Arc::new(Self {
         store,
         clock,
         dispatcher,
         scheduler,
         state: RwLock::new(CoordinatorState {
            events: Vec::new(),
            loading: true,
         }),
         generation: AtomicU64::new(0),
         shutdown: CancellationToken::new(),
         tasks: Mutex::new(Vec::new()),
      })
   }

   pub fn snapshot(&self) -> (Vec<Event>, bool) {
      let state = self.state.read();
      (state.events.clone(), state.loading)
   }

   pub fn event_by_id(&self, id: Uuid) -> Option<Event> {
      self.state.read().events.iter().find(|event| event.id == id).cloned()
   }

   // Fetch with a request-generation guard: concurrent triggers may race,
   // only the latest issued request commits its result to the snapshot.
   pub async fn fetch(&self, filters: EventFilters) -> Result<Vec<Event>, ServiceError> {
      let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
      self.state.write().loading = true;

      let res = self.store.list(&filters).await;
      let latest = generation == self.generation.load(Ordering::SeqCst);
      match res {
         Ok(events) => {
            if latest {
               let mut state = self.state.write();
               state.events = events.clone();
               state.loading = false;
            }
            self.scheduler.horizon_scan(&events);
            Ok(events)
         }
         Err(err) => {
            if latest {
               self.state.write().loading = false;
            }
            self.dispatcher.toast(Toast::error("Failed to load events"));
            Err(err)
         }
      }
   }

   pub async fn create(
      &self,
      data: NewEventDto,
      created_by: Option<Uuid>,
   ) -> Result<Event, ServiceError> {
      match self.store.create(data, created_by).await {
         Ok(event) => {
            self.scheduler.arm_event(&event);
            self.dispatcher.toast(Toast::success("Event created successfully"));
            let _ = self.refresh().await;
            Ok(event)
         }
         Err(err) => {
            self.dispatcher.toast(Toast::error("Failed to create the event"));
            Err(err)
         }
      }
   }

   pub async fn update(&self, event: Event) -> Result<(), ServiceError> {
      match self.store.update(&event).await {
         Ok(()) => {
            self.scheduler.arm_event(&event);
            self.dispatcher.notify_event_update(&event, "updated");
            self.dispatcher.toast(Toast::success("Event updated successfully"));
            let _ = self.refresh().await;
            Ok(())
         }
         Err(err) => {
            self.dispatcher.toast(Toast::error("Failed to update the event"));
            Err(err)
         }
      }
   }

   // The record is captured before the delete so the cancellation notice can
   // still name it afterwards.
   pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
      let captured = match self.event_by_id(id) {
         Some(event) => Some(event),
         None => self.store.get_by_id(id).await.ok(),
      };
      match self.store.delete(id).await {
         Ok(()) => {
            self.scheduler.cancel_event(id);
            if let Some(event) = captured {
               self.dispatcher.notify_event_update(&event, "cancelled");
            }
            self.dispatcher.toast(Toast::success("Event deleted successfully"));
            let _ = self.refresh().await;
            Ok(())
         }
         Err(err) => {
            self.dispatcher.toast(Toast::error("Failed to delete the event"));
            Err(err)
         }
      }
   }

   pub async fn reconcile_statuses(&self) -> Result<(), ServiceError> {
      status::reconcile(&*self.store, &*self.clock).await?;
      self.refresh().await?;
      Ok(())
   }

   async fn refresh(&self) -> Result<Vec<Event>, ServiceError> {
      self.fetch(EventFilters::default()).await
   }

   // Initial load, change-feed subscription and both recurring timers. Every
   // background failure is logged and dropped; the next tick self-corrects.
   pub fn run(self: Arc<Self>) {
      let mut tasks = self.tasks.lock();

      let coordinator = Arc::clone(&self);
      let shutdown = self.shutdown.clone();
      tasks.push(tokio::spawn(async move {
         let mut changes = coordinator.store.subscribe();
         if let Err(err) = coordinator.reconcile_statuses().await {
            log::warn!("initial reconciliation failed: {}", err);
         }
         loop {
            tokio::select! {
               _ = shutdown.cancelled() => break,
               received = changes.recv() => match received {
                  Ok(_) => {
                     if let Err(err) = coordinator.reconcile_statuses().await {
                        log::warn!("reconciliation after change failed: {}", err);
                     }
                  }
                  Err(RecvError::Lagged(skipped)) => {
                     log::warn!("change feed lagged, skipped {} notifications", skipped);
                  }
                  Err(RecvError::Closed) => break,
               }
            }
         }
      }));

      let coordinator = Arc::clone(&self);
      let shutdown = self.shutdown.clone();
      tasks.push(tokio::spawn(async move {
         let mut ticker = tokio::time::interval(RECONCILE_INTERVAL);
         ticker.tick().await;
         loop {
            tokio::select! {
               _ = shutdown.cancelled() => break,
               _ = ticker.tick() => {
                  if let Err(err) = coordinator.reconcile_statuses().await {
                     log::warn!("periodic reconciliation failed: {}", err);
                  }
               }
            }
         }
      }));

      let coordinator = Arc::clone(&self);
      let shutdown = self.shutdown.clone();
      tasks.push(tokio::spawn(async move {
         let mut ticker = tokio::time::interval(HORIZON_SCAN_INTERVAL);
         ticker.tick().await;
         loop {
            tokio::select! {
               _ = shutdown.cancelled() => break,
               _ = ticker.tick() => {
                  let (events, _) = coordinator.snapshot();
                  coordinator.scheduler.horizon_scan(&events);
               }
            }
         }
      }));
   }

   pub async fn teardown(&self) {
      self.shutdown.cancel();
      self.scheduler.teardown();
      let handles: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
      for handle in handles {
         handle.abort();
      }
   }
}
