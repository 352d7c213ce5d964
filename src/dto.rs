use serde::Deserialize;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{Event, EventCategory, EventStatus};

#[derive(Debug, Deserialize, Clone)]
pub struct NewEventDto {
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub category: EventCategory,
    pub max_attendees: Option<i32>,
}

// Full-row patch, the shape the event form submits.
#[derive(Debug, Deserialize, Clone)]
pub struct UpdateEventDto {
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub category: EventCategory,
    pub status: EventStatus,
    pub max_attendees: Option<i32>,
}

impl UpdateEventDto {
    pub fn apply_to(self, current: &Event) -> Event {
        Event {
            id: current.id,
            title: self.title,
            description: self.description,
            location: self.location,
            start_date: self.start_date,
            end_date: self.end_date,
            category: self.category,
            status: self.status,
            max_attendees: self.max_attendees,
            current_attendees: current.current_attendees,
            created_by: current.created_by,
            created_at: current.created_at,
            updated_at: current.updated_at,
        }
    }
}

// None means "all" for category and status.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilters {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub category: Option<EventCategory>,
    pub status: Option<EventStatus>,
    pub search: Option<String>,
}

impl EventFilters {
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(start) = self.start_date {
            if event.start_date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if event.end_date > end {
                return false;
            }
        }
        if let Some(category) = self.category {
            if event.category != category {
                return false;
            }
        }
        if let Some(status) = self.status {
            if event.status != status {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = event.title.to_lowercase().contains(&needle)
                || event.description.to_lowercase().contains(&needle)
                || event.location.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        true
    }
}

// Query-string shape; "all" (or absence) widens category and status.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFiltersQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

impl EventFiltersQuery {
    pub fn into_filters(self) -> Result<EventFilters, ServiceError> {
        let category = match self.category.as_deref() {
            None | Some("all") => None,
            Some(raw) => Some(parse_category(raw).ok_or(ServiceError::BadClientData)?),
        };
        let status = match self.status.as_deref() {
            None | Some("all") => None,
            Some(raw) => Some(parse_status(raw).ok_or(ServiceError::BadClientData)?),
        };
        Ok(EventFilters {
            start_date: self.start_date,
            end_date: self.end_date,
            category,
            status,
            search: self.search.filter(|s| !s.is_empty()),
        })
    }
}

pub fn parse_category(raw: &str) -> Option<EventCategory> {
    match raw {
        "social" => Some(EventCategory::Social),
        "academic" => Some(EventCategory::Academic),
        "cultural" => Some(EventCategory::Cultural),
        "commercial" => Some(EventCategory::Commercial),
        "workshop" => Some(EventCategory::Workshop),
        "other" => Some(EventCategory::Other),
        _ => None,
    }
}

pub fn parse_status(raw: &str) -> Option<EventStatus> {
    match raw {
        "upcoming" => Some(EventStatus::Upcoming),
        "ongoing" => Some(EventStatus::Ongoing),
        "finished" => Some(EventStatus::Finished),
        "cancelled" => Some(EventStatus::Cancelled),
        _ => None,
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IdentifyDto {
    pub user_id: Uuid,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn sample(title: &str, category: EventCategory) -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: String::new(),
            location: String::new(),
            start_date: now + Duration::days(1),
            end_date: now + Duration::days(1) + Duration::hours(2),
            category,
            status: EventStatus::Upcoming,
            max_attendees: None,
            current_attendees: 0,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn search_matches_title_case_insensitively() {
        let a = sample("Taller de Rosas", EventCategory::Workshop);
        let b = sample("Reunión", EventCategory::Social);
        let filters = EventFilters {
            search: Some("rosas".to_string()),
            ..Default::default()
        };
        assert!(filters.matches(&a));
        assert!(!filters.matches(&b));
    }

    #[test]
    fn category_filter_is_exact() {
        let a = sample("Taller de Rosas", EventCategory::Workshop);
        let b = sample("Reunión", EventCategory::Social);
        let filters = EventFilters {
            category: Some(EventCategory::Social),
            ..Default::default()
        };
        assert!(!filters.matches(&a));
        assert!(filters.matches(&b));
    }

    #[test]
    fn combined_search_and_category_can_exclude_everything() {
        let a = sample("Taller de Rosas", EventCategory::Workshop);
        let b = sample("Reunión", EventCategory::Social);
        let filters = EventFilters {
            category: Some(EventCategory::Social),
            search: Some("rosas".to_string()),
            ..Default::default()
        };
        assert!(!filters.matches(&a));
        assert!(!filters.matches(&b));
    }

    #[test]
    fn search_spans_description_and_location() {
        let mut event = sample("Sin titulo", EventCategory::Other);
        event.description = "Entrega de pedidos".to_string();
        event.location = "Sala Norte".to_string();
        let by_description = EventFilters {
            search: Some("pedidos".to_string()),
            ..Default::default()
        };
        let by_location = EventFilters {
            search: Some("norte".to_string()),
            ..Default::default()
        };
        assert!(by_description.matches(&event));
        assert!(by_location.matches(&event));
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let event = sample("Inventario", EventCategory::Commercial);
        let filters = EventFilters {
            start_date: Some(event.start_date),
            end_date: Some(event.end_date),
            ..Default::default()
        };
        assert!(filters.matches(&event));
        let too_late = EventFilters {
            start_date: Some(event.start_date + Duration::seconds(1)),
            ..Default::default()
        };
        assert!(!too_late.matches(&event));
    }

    #[test]
    fn unknown_category_in_query_is_rejected() {
        let query = EventFiltersQuery {
            category: Some("birthday".to_string()),
            ..Default::default()
        };
        assert!(query.into_filters().is_err());
        let all = EventFiltersQuery {
            category: Some("all".to_string()),
            ..Default::default()
        };
        assert!(all.into_filters().unwrap().category.is_none());
    }
}
