use tokio::sync::broadcast;
use uuid::Uuid;

pub const EVENTS_TABLE: &str = "events";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

// "Something changed" marker. Consumers must not rely on the id being set.
#[derive(Debug, Clone)]
pub struct TableChange {
    pub table: &'static str,
    pub op: ChangeOp,
    pub id: Option<Uuid>,
}

// Broadcast bus the store adapter publishes to after every successful write.
// Each subscriber gets its own independent stream; publishing with no
// subscribers is not an error.
#[derive(Debug, Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<TableChange>,
}

impl ChangeBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, change: TableChange) {
        if self.tx.send(change).is_err() {
            log::debug!("change published with no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TableChange> {
        self.tx.subscribe()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(64)
    }
}
