use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::RwLock;
use rodio::source::{SineWave, Source};
use rodio::{OutputStream, Sink};
use tokio::sync::broadcast;

use super::settings::SettingsRepository;
use crate::models::Event;

const NATIVE_ALERT_ID: u32 = 0x454153; // fixed id so repeats replace, not stack
const NATIVE_ALERT_TIMEOUT_MS: u32 = 5000;
const TOAST_DURATION_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
   Default,
   Granted,
   Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
   Reminder,
   Update,
   Success,
   Error,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Toast {
   pub message: String,
   pub kind: NotificationKind,
   pub duration_ms: u64,
}

impl Toast {
   pub fn success(message: impl Into<String>) -> Self {
      Self {
         message: message.into(),
         kind: NotificationKind::Success,
         duration_ms: TOAST_DURATION_MS,
      }
   }

   pub fn error(message: impl Into<String>) -> Self {
      Self {
         message: message.into(),
         kind: NotificationKind::Error,
         duration_ms: TOAST_DURATION_MS,
      }
   }
}

// Native alert seam. The desktop backend has no prompt of its own, so a
// request resolves to granted; embedders with a real prompt supply their own
// implementation.
pub trait AlertSink: Send + Sync {
   fn request_permission(&self) -> PermissionState;
   fn show(&self, title: &str, body: &str);
}

pub struct DesktopAlerts;

impl AlertSink for DesktopAlerts {
   fn request_permission(&self) -> PermissionState {
      PermissionState::Granted
   }

   fn show(&self, title: &str, body: &str) {
      let res = notify_rust::Notification::new()
         .summary(title)
         .body(body)
         .id(NATIVE_ALERT_ID)
         .timeout(notify_rust::Timeout::Milliseconds(NATIVE_ALERT_TIMEOUT_MS))
         .show();
      if let Err(err) = res {
         log::warn!("native alert failed: {:?}", err);
      }
   }
}

// Two-tone beep, 800Hz then 600Hz, 100ms each, fading out. Playback runs on
// a dedicated thread because the audio output stream cannot move across
// threads; a missing audio device degrades to a logged warning.
pub struct NotificationBeep {
   tx: mpsc::Sender<()>,
}

impl NotificationBeep {
   pub fn spawn() -> Self {
      let (tx, rx) = mpsc::channel::<()>();
      thread::spawn(move || {
         let (_stream, handle) = match OutputStream::try_default() {
            Ok(output) => output,
            Err(err) => {
               log::warn!("audio output unavailable: {}", err);
               return;
            }
         };
         while rx.recv().is_ok() {
            let sink = match Sink::try_new(&handle) {
               Ok(sink) => sink,
               Err(err) => {
                  log::warn!("failed to open audio sink: {}", err);
                  continue;
               }
            };
            let mut high = SineWave::new(800.0).take_duration(Duration::from_millis(100));
            high.set_filter_fadeout(true);
            let mut low = SineWave::new(600.0).take_duration(Duration::from_millis(100));
            low.set_filter_fadeout(true);
            sink.append(high.amplify(0.10));
            sink.append(low.amplify(0.06));
            sink.detach();
         }
      });
      Self { tx }
   }

   pub fn play(&self) {
      let _ = self.tx.send(());
   }
}

pub fn update_message(kind: &str, title: &str) -> String {
   match kind {
      "updated" => format!("The event \"{}\" has been updated", title),
      "cancelled" => format!("The event \"{}\" has been cancelled", title),
      "rescheduled" => format!("The event \"{}\" has been rescheduled", title),
      "starting" => format!("The event \"{}\" is starting", title),
      _ => format!("Update for the event \"{}\"", title),
   }
}

pub struct NotificationDispatcher {
   settings: Arc<SettingsRepository>,
   alerts: Box<dyn AlertSink>,
   beep: NotificationBeep,
   permission: RwLock<PermissionState>,
   toasts: broadcast::Sender<Toast>,
}

impl NotificationDispatcher {
   pub fn new(settings: Arc<SettingsRepository>, alerts: Box<dyn AlertSink>) -> Self {
      let (toasts, _) = broadcast::channel(64);
      Self {
         settings,
         alerts,
         beep: NotificationBeep::spawn(),
         permission: RwLock::new(PermissionState::Default),
         toasts,
      }
   }

   pub fn toasts(&self) -> broadcast::Receiver<Toast> {
      self.toasts.subscribe()
   }

   pub fn permission(&self) -> PermissionState {
      *self.permission.read()
   }

   // Idempotent; once denied the platform is never prompted again.
   pub async fn request_permission(&self) -> PermissionState {
      let current = *self.permission.read();
      if current != PermissionState::Default {
         return current;
      }
      let resolved = self.alerts.request_permission();
      *self.permission.write() = resolved;
      resolved
   }

   pub fn toast(&self, toast: Toast) {
      log::info!("toast: {}", toast.message);
      if self.toasts.send(toast).is_err() {
         log::debug!("toast emitted with no subscribers");
      }
   }

   pub fn notify(&self, title: &str, body: &str, kind: NotificationKind) {
      self.toast(Toast {
         message: format!("{}: {}", title, body),
         kind,
         duration_ms: TOAST_DURATION_MS,
      });
      let settings = self.settings.current();
      if settings.sound_enabled {
         self.beep.play();
      }
      if settings.push_notifications && *self.permission.read() == PermissionState::Granted {
         self.alerts.show(title, body);
      }
   }

   pub fn notify_reminder(&self, event: &Event, lead_text: &str) {
      self.notify(
         &format!("Reminder: {}", event.title),
         &format!("The event starts {}", lead_text),
         NotificationKind::Reminder,
      );
   }

   pub fn notify_event_update(&self, event: &Event, kind: &str) {
      if !self.settings.current().event_updates {
         return;
      }
      self.notify("Event update", &update_message(kind, &event.title), NotificationKind::Update);
   }

   pub async fn send_test(&self) -> PermissionState {
      let mut permission = self.permission();
      if permission != PermissionState::Granted {
         permission = self.request_permission().await;
      }
      if permission != PermissionState::Granted {
         return permission;
      }
      self.notify(
         "Test notification",
         "Notifications are working correctly",
         NotificationKind::Success,
      );
      self.toast(Toast::success("Test notification sent"));
      permission
   }
}

#[cfg(test)]
pub mod testing {
   use parking_lot::Mutex;

   use super::*;

   // Scriptable alert backend recording every native show.
   pub struct NullAlerts {
      pub grant: PermissionState,
      pub prompts: Mutex<u32>,
      pub shown: Mutex<Vec<(String, String)>>,
   }

   impl NullAlerts {
      pub fn granting() -> Self {
         Self::with(PermissionState::Granted)
      }

      pub fn denying() -> Self {
         Self::with(PermissionState::Denied)
      }

      fn with(grant: PermissionState) -> Self {
         Self {
            grant,
            prompts: Mutex::new(0),
            shown: Mutex::new(Vec::new()),
         }
      }
   }

   impl AlertSink for NullAlerts {
      fn request_permission(&self) -> PermissionState {
         *self.prompts.lock() += 1;
         self.grant
      }

      fn show(&self, title: &str, body: &str) {
         self.shown.lock().push((title.to_string(), body.to_string()));
      }
   }
}
