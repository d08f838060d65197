use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single to-do entry. Serialized field names are the persisted wire
/// format, so renaming a field breaks decoding of existing data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub due_date: DateTime<Local>,
    pub reminder_time: DateTime<Local>,
    #[serde(default)]
    pub is_completed: bool,
}

impl Task {
    pub fn new(title: impl Into<String>, reminder_time: DateTime<Local>) -> Self {
        Task {
            id: Uuid::new_v4(),
            title: title.into(),
            due_date: Local::now(),
            reminder_time,
            is_completed: false,
        }
    }

    /// Reminder time on a 12-hour clock, e.g. "9:05 AM".
    pub fn reminder_label(&self) -> String {
        self.reminder_time.format("%-I:%M %p").to_string()
    }
}
