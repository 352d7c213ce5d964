use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::NotificationSettings;

// Plain string-keyed persistence, one JSON document per key.
pub trait SettingsStore: Send + Sync + 'static {
   fn read(&self, key: &str) -> Result<Option<String>, ServiceError>;
   fn write(&self, key: &str, value: &str) -> Result<(), ServiceError>;
}

pub struct FileSettingsStore {
   dir: PathBuf,
}

impl FileSettingsStore {
   pub fn new() -> Result<Self, ServiceError> {
      let dir = match dirs::config_dir() {
         Some(base) => base.join("event-agenda-service"),
         None => {
            log::error!("no config directory available on this platform");
            return Err(ServiceError::InternalError);
         }
      };
      match fs::create_dir_all(&dir) {
         Ok(()) => Ok(Self { dir }),
         Err(err) => {
            log::error!("failed to create settings dir {:?}: {:?}", dir, err);
            Err(ServiceError::InternalError)
         }
      }
   }

   fn path_for(&self, key: &str) -> PathBuf {
      self.dir.join(format!("{}.json", key))
   }
}

impl SettingsStore for FileSettingsStore {
   fn read(&self, key: &str) -> Result<Option<String>, ServiceError> {
      match fs::read_to_string(self.path_for(key)) {
         Ok(raw) => Ok(Some(raw)),
         Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
         Err(err) => {
            log::error!("failed to read settings key {}: {:?}", key, err);
            Err(ServiceError::InternalError)
         }
      }
   }

   fn write(&self, key: &str, value: &str) -> Result<(), ServiceError> {
      match fs::write(self.path_for(key), value) {
         Ok(()) => Ok(()),
         Err(err) => {
            log::error!("failed to write settings key {}: {:?}", key, err);
            Err(ServiceError::InternalError)
         }
      }
   }
}

pub struct MemorySettingsStore {
   entries: RwLock<HashMap<String, String>>,
}

impl MemorySettingsStore {
   pub fn new() -> Self {
      Self {
         entries: RwLock::new(HashMap::new()),
      }
   }
}

impl Default for MemorySettingsStore {
   fn default() -> Self {
      Self::new()
   }
}

impl SettingsStore for MemorySettingsStore {
   fn read(&self, key: &str) -> Result<Option<String>, ServiceError> {
      Ok(self.entries.read().get(key).cloned())
   }

   fn write(&self, key: &str, value: &str) -> Result<(), ServiceError> {
      self.entries.write().insert(key.to_string(), value.to_string());
      Ok(())
   }
}

// Per-user notification settings with an in-memory cache in front of the
// store. The active user is set once per session via identify().
pub struct SettingsRepository {
   store: Box<dyn SettingsStore>,
   cache: RwLock<HashMap<Uuid, NotificationSettings>>,
   active_user: RwLock<Option<Uuid>>,
}

impl SettingsRepository {
   pub fn new(store: Box<dyn SettingsStore>) -> Self {
      Self {
         store,
         cache: RwLock::new(HashMap::new()),
         active_user: RwLock::new(None),
      }
   }

   fn key_for(user_id: Uuid) -> String {
      format!("notification_settings_{}", user_id)
   }

   pub fn identify(&self, user_id: Uuid) -> NotificationSettings {
      *self.active_user.write() = Some(user_id);
      self.load(user_id)
   }

   pub fn load(&self, user_id: Uuid) -> NotificationSettings {
      if let Some(cached) = self.cache.read().get(&user_id) {
         return cached.clone();
      }
      let loaded = match self.store.read(&Self::key_for(user_id)) {
         Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(err) => {
               log::warn!("malformed notification settings for {}: {:?}", user_id, err);
               NotificationSettings::default()
            }
         },
         Ok(None) => NotificationSettings::default(),
         Err(_) => NotificationSettings::default(),
      };
      self.cache.write().insert(user_id, loaded.clone());
      loaded
   }

   pub fn save(&self, user_id: Uuid, settings: NotificationSettings) -> Result<(), ServiceError> {
      let raw = match serde_json::to_string(&settings) {
         Ok(raw) => raw,
         Err(err) => {
            log::error!("failed to serialize notification settings: {:?}", err);
            return Err(ServiceError::InternalError);
         }
      };
      self.store.write(&Self::key_for(user_id), &raw)?;
      self.cache.write().insert(user_id, settings);
      Ok(())
   }

   pub fn reset(&self, user_id: Uuid) -> Result<NotificationSettings, ServiceError> {
      let defaults = NotificationSettings::default();
      self.save(user_id, defaults.clone())?;
      Ok(defaults)
   }

   // Settings of the identified user; defaults while nobody is identified.
   pub fn current(&self) -> NotificationSettings {
      let active = *self.active_user.read();
      match active {
         Some(user_id) => self.load(user_id),
         None => NotificationSettings::default(),
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   fn repository() -> SettingsRepository {
      SettingsRepository::new(Box::new(MemorySettingsStore::new()))
   }

   #[test]
   fn load_returns_defaults_for_unknown_user() {
      let repo = repository();
      let settings = repo.load(Uuid::new_v4());
      assert_eq!(settings, NotificationSettings::default());
   }

   #[test]
   fn save_then_load_round_trips_through_the_store() {
      let repo = repository();
      let user = Uuid::new_v4();
      let mut settings = NotificationSettings::default();
      settings.event_reminders = false;
      settings.sound_enabled = false;
      repo.save(user, settings.clone()).unwrap();

      // Drop the cache entry to force a store read.
      repo.cache.write().clear();
      assert_eq!(repo.load(user), settings);
   }

   #[test]
   fn malformed_stored_json_falls_back_to_defaults() {
      let store = MemorySettingsStore::new();
      let user = Uuid::new_v4();
      store
         .write(&SettingsRepository::key_for(user), "{not json")
         .unwrap();
      let repo = SettingsRepository::new(Box::new(store));
      assert_eq!(repo.load(user), NotificationSettings::default());
   }

   #[test]
   fn current_follows_the_identified_user() {
      let repo = repository();
      let user = Uuid::new_v4();
      assert_eq!(repo.current(), NotificationSettings::default());

      let mut settings = NotificationSettings::default();
      settings.event_updates = false;
      repo.save(user, settings.clone()).unwrap();
      repo.identify(user);
      assert_eq!(repo.current(), settings);
   }

   #[test]
   fn reset_restores_defaults() {
      let repo = repository();
      let user = Uuid::new_v4();
      let mut settings = NotificationSettings::default();
      settings.push_notifications = false;
      repo.save(user, settings).unwrap();
      repo.reset(user).unwrap();
      assert_eq!(repo.load(user), NotificationSettings::default());
   }
}
