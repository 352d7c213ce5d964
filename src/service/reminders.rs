use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::clock::Clock;
use super::notify::{NotificationDispatcher, NotificationKind};
use super::settings::SettingsRepository;
use crate::models::{Event, EventStatus};

pub const REMINDER_LEAD_HOURS: [i64; 2] = [24, 1];

// Tolerance bands around the reminder offsets, wide enough to absorb the
// scan interval granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HorizonBand {
   OneHour,
   OneDay,
   OneWeek,
}

impl HorizonBand {
   pub fn for_hours(hours_until_start: f64) -> Option<HorizonBand> {
      if hours_until_start > 0.9 && hours_until_start < 1.1 {
         Some(HorizonBand::OneHour)
      } else if hours_until_start > 23.5 && hours_until_start < 24.5 {
         Some(HorizonBand::OneDay)
      } else if hours_until_start > 167.0 && hours_until_start < 169.0 {
         Some(HorizonBand::OneWeek)
      } else {
         None
      }
   }

   pub fn label(&self) -> &'static str {
      match self {
         HorizonBand::OneHour => "in 1 hour",
         HorizonBand::OneDay => "tomorrow",
         HorizonBand::OneWeek => "in 1 week",
      }
   }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedReminder {
   pub lead_hours: i64,
   pub fire_at: DateTime<Utc>,
}

// One planned reminder per lead whose fire time is still ahead; elapsed
// windows are skipped, never fired late.
pub fn plan_reminders(event: &Event, now: DateTime<Utc>) -> Vec<PlannedReminder> {
   REMINDER_LEAD_HOURS
      .iter()
      .map(|&lead_hours| PlannedReminder {
         lead_hours,
         fire_at: event.start_date - Duration::hours(lead_hours),
      })
      .filter(|planned| planned.fire_at > now)
      .collect()
}

// Owns every deferred reminder task and the horizon-scan bookkeeping. All
// armed timers hang off one root token so teardown is a single cancel.
pub struct ReminderScheduler {
   clock: Arc<dyn Clock>,
   dispatcher: Arc<NotificationDispatcher>,
   settings: Arc<SettingsRepository>,
   armed: Mutex<HashMap<Uuid, CancellationToken>>,
   notified_bands: Mutex<HashSet<(Uuid, HorizonBand)>>,
   shutdown: CancellationToken,
}

impl ReminderScheduler {
   pub fn new(
      clock: Arc<dyn Clock>,
      dispatcher: Arc<NotificationDispatcher>,
      settings: Arc<SettingsRepository>,
   ) -> Self {
      Self {
         clock,
         dispatcher,
         settings,
         armed: Mutex::new(HashMap::new()),
         notified_bands: Mutex::new(HashSet::new()),
         shutdown: CancellationToken::new(),
      }
   }

   // Arms the deferred reminders for one event, replacing whatever was armed
   // for it before. Rescheduling an event therefore re-times its reminders.
   pub fn arm_event(&self, event: &Event) {
      if !self.settings.current().event_reminders {
         return;
      }
      self.cancel_event(event.id);
      let now = self.clock.now();
      let planned = plan_reminders(event, now);
      if planned.is_empty() {
         return;
      }
      let token = self.shutdown.child_token();
      self.armed.lock().insert(event.id, token.clone());
      for reminder in planned {
         let delay = match (reminder.fire_at - now).to_std() {
            Ok(delay) => delay,
            Err(_) => continue,
         };
         let dispatcher = self.dispatcher.clone();
         let settings = self.settings.clone();
         let token = token.clone();
         let title = event.title.clone();
         tokio::spawn(async move {
            tokio::select! {
               _ = token.cancelled() => {}
               _ = tokio::time::sleep(delay) => {
                  if settings.current().event_reminders {
                     dispatcher.notify(
                        &format!("Reminder: {}", title),
                        &format!("The event starts in {} hours", reminder.lead_hours),
                        NotificationKind::Reminder,
                     );
                  }
               }
            }
         });
      }
   }

   pub fn cancel_event(&self, event_id: Uuid) {
      if let Some(token) = self.armed.lock().remove(&event_id) {
         token.cancel();
      }
   }

   // Sweeps upcoming events against the tolerance bands. Each (event, band)
   // pair fires at most once per session.
   pub fn horizon_scan(&self, events: &[Event]) {
      if !self.settings.current().event_reminders {
         return;
      }
      let now = self.clock.now();
      for event in events {
         if event.status != EventStatus::Upcoming {
            continue;
         }
         let hours_until_start =
            (event.start_date - now).num_milliseconds() as f64 / 3_600_000.0;
         let band = match HorizonBand::for_hours(hours_until_start) {
            Some(band) => band,
            None => continue,
         };
         if !self.notified_bands.lock().insert((event.id, band)) {
            continue;
         }
         self.dispatcher.notify_reminder(event, band.label());
      }
   }

   pub fn teardown(&self) {
      self.shutdown.cancel();
      self.armed.lock().clear();
   }
}
