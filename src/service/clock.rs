use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync + 'static {
   fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
   fn now(&self) -> DateTime<Utc> {
      Utc::now()
   }
}

#[cfg(test)]
pub struct ManualClock {
   current: parking_lot::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
   pub fn starting_at(start: DateTime<Utc>) -> Self {
      Self {
         current: parking_lot::Mutex::new(start),
      }
   }

   pub fn advance(&self, by: chrono::Duration) {
      let mut current = self.current.lock();
      *current = *current + by;
   }

   pub fn set(&self, to: DateTime<Utc>) {
      *self.current.lock() = to;
   }
}

#[cfg(test)]
impl Clock for ManualClock {
   fn now(&self) -> DateTime<Utc> {
      *self.current.lock()
   }
}
