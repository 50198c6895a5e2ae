//! Data models for the Equipment store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Equipment row as stored in Postgres.
#[derive(Debug, sqlx::FromRow)]
pub struct EquipmentRow {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub temperature: f64,
    pub humidity: f64,
    pub status: String,
    pub command: String,
    pub alarm_active: bool,
    pub alarm_description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Schedule entry row as stored in Postgres.
///
/// `created_at` preserves insertion order; the conversational schedule
/// readout reports the oldest entry.
#[derive(Debug, sqlx::FromRow)]
pub struct ScheduleEntryRow {
    pub id: Uuid,
    pub equipment_id: Uuid,
    pub start_time: String,
    pub stop_time: String,
    pub frequency: String,
    pub created_at: DateTime<Utc>,
}

/// A schedule entry as serialized on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub id: String,
    pub start_time: String,
    pub stop_time: String,
    pub frequency: String,
}

impl From<ScheduleEntryRow> for ScheduleEntry {
    fn from(row: ScheduleEntryRow) -> Self {
        Self {
            id: row.id.to_string(),
            start_time: row.start_time,
            stop_time: row.stop_time,
            frequency: row.frequency,
        }
    }
}

/// An equipment document as serialized on the wire, schedule included.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub id: String,
    pub name: String,
    pub location: String,
    pub temperature: f64,
    pub humidity: f64,
    pub status: String,
    pub command: String,
    pub alarm_active: bool,
    pub alarm_description: String,
    pub schedule: Vec<ScheduleEntry>,
    pub created_at: String,
    pub updated_at: String,
}

impl Equipment {
    pub fn from_row(row: EquipmentRow, schedule: Vec<ScheduleEntry>) -> Self {
        Self {
            id: row.id.to_string(),
            name: row.name,
            location: row.location,
            temperature: row.temperature,
            humidity: row.humidity,
            status: row.status,
            command: row.command,
            alarm_active: row.alarm_active,
            alarm_description: row.alarm_description,
            schedule,
            created_at: row.created_at.to_rfc3339(),
            updated_at: row.updated_at.to_rfc3339(),
        }
    }
}

/// Field-level update request for `PUT /equipment/{id}`.
///
/// Only the fields present in the body are written.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentPatch {
    pub name: Option<String>,
    pub location: Option<String>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub status: Option<String>,
    pub command: Option<String>,
    pub alarm_active: Option<bool>,
    pub alarm_description: Option<String>,
}

impl EquipmentPatch {
    /// True when no field is present; such a request is a no-op merge.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.location.is_none()
            && self.temperature.is_none()
            && self.humidity.is_none()
            && self.status.is_none()
            && self.command.is_none()
            && self.alarm_active.is_none()
            && self.alarm_description.is_none()
    }
}

/// Body for `POST /equipment/{id}/schedule`, and the insert shape the
/// conversational scheduling path writes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScheduleEntry {
    pub start_time: String,
    pub stop_time: String,
    pub frequency: String,
}

/// Field-level update request for `PUT /equipment/{id}/schedule/{sid}`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntryPatch {
    pub start_time: Option<String>,
    pub stop_time: Option<String>,
    pub frequency: Option<String>,
}

/// Result body for delete operations.
#[derive(Debug, Serialize)]
pub struct DeleteResult {
    pub deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_row() -> EquipmentRow {
        EquipmentRow {
            id: Uuid::nil(),
            name: "FCU_L1_01".to_string(),
            location: "LA CALA".to_string(),
            temperature: 22.0,
            humidity: 55.0,
            status: "Running".to_string(),
            command: "Start".to_string(),
            alarm_active: false,
            alarm_description: String::new(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_equipment_serializes_camel_case() {
        let equipment = Equipment::from_row(
            sample_row(),
            vec![ScheduleEntry {
                id: Uuid::nil().to_string(),
                start_time: "08:30".to_string(),
                stop_time: "22:00".to_string(),
                frequency: "daily".to_string(),
            }],
        );

        let json = serde_json::to_value(&equipment).unwrap();
        assert_eq!(json["alarmActive"], false);
        assert_eq!(json["schedule"][0]["startTime"], "08:30");
        assert_eq!(json["schedule"][0]["stopTime"], "22:00");
        assert!(json.get("alarm_active").is_none());
    }

    #[test]
    fn test_patch_only_reads_present_fields() {
        let patch: EquipmentPatch = serde_json::from_str(r#"{"temperature": 21}"#).unwrap();
        assert_eq!(patch.temperature, Some(21.0));
        assert!(patch.name.is_none());
        assert!(!patch.is_empty());

        let empty: EquipmentPatch = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_schedule_entry_patch_accepts_subset() {
        let patch: ScheduleEntryPatch =
            serde_json::from_str(r#"{"startTime": "07:00"}"#).unwrap();
        assert_eq!(patch.start_time.as_deref(), Some("07:00"));
        assert!(patch.stop_time.is_none());
        assert!(patch.frequency.is_none());
    }
}
