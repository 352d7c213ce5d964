use chrono::{DateTime, Utc};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Social,
    Academic,
    Cultural,
    Commercial,
    Workshop,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Upcoming,
    Ongoing,
    Finished,
    Cancelled,
}

#[derive(Debug, Clone, FromRow, serde::Serialize, serde::Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub category: EventCategory,
    pub status: EventStatus,
    pub max_attendees: Option<i32>,
    pub current_attendees: i32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Persisted per user as JSON under the local settings store. The inventory
// and email flags are written by the settings surface but never read here.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub push_notifications: bool,
    pub low_stock_alerts: bool,
    pub inventory_movements: bool,
    pub system_alerts: bool,
    pub email_notifications: bool,
    pub sound_enabled: bool,
    pub event_reminders: bool,
    pub event_updates: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            push_notifications: true,
            low_stock_alerts: true,
            inventory_movements: true,
            system_alerts: false,
            email_notifications: true,
            sound_enabled: true,
            event_reminders: true,
            event_updates: true,
        }
    }
}
