//! Conversational command resolution.
//!
//! Maps a resolved intent name plus its parameter bag onto Equipment store
//! operations and produces an [`IntentOutcome`] for the reply formatter.
//! Targeting is name-first with location fallback: a non-empty `EqptName`
//! addresses exactly one unit, otherwise a non-empty `EqptLocation`
//! addresses every unit at that location.

use tracing::info;

use crate::models::{Equipment, NewScheduleEntry};
use crate::store::EquipmentStore;
use crate::webhook::IntentParameters;
use crate::Result;

/// The fixed set of recognized intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Welcome,
    StatusCheck,
    Control,
    Scheduling,
    HealthCheck,
    ThermostatAdjust,
}

impl Intent {
    /// Resolve a dialog-platform display name; unknown names are not handled.
    pub fn from_display_name(name: &str) -> Option<Self> {
        match name {
            "Default Welcome Intent" => Some(Self::Welcome),
            "EquipmentStatusCheck" => Some(Self::StatusCheck),
            "EquipmentControl" => Some(Self::Control),
            "EquipmentScheduling" => Some(Self::Scheduling),
            "SystemHealthCheck" => Some(Self::HealthCheck),
            "ThermostatAdjustment" => Some(Self::ThermostatAdjust),
            _ => None,
        }
    }
}

/// Which document set an operation addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Name(String),
    Location(String),
}

/// Name-first, location-fallback targeting. `None` when both slots are empty.
pub fn resolve_target(params: &IntentParameters) -> Option<Target> {
    if let Some(name) = params.name() {
        Some(Target::Name(name))
    } else {
        params.location().map(Target::Location)
    }
}

/// A reading reported by a by-name status check, carried alongside the reply
/// line so the formatter can emit a follow-up context.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub kind: String,
    pub value: String,
    pub unit: &'static str,
}

/// What an intent resolved to. Not-found and invalid-target are successful
/// resolutions with negative results, not errors.
#[derive(Debug)]
pub enum IntentOutcome {
    /// Welcome menu; the formatter owns its content.
    Welcome,
    /// A by-name status readout with its follow-up context payload.
    Report { line: String, reading: Reading },
    /// One or more confirmation/readout lines.
    Reply(Vec<String>),
    /// The targeted name/location matched nothing.
    NotFound(String),
    /// The request was missing the parameters needed to act.
    Invalid(String),
}

/// Dispatch a resolved intent. Returns `None` for unrecognized intent names,
/// which answer with an empty fulfillment body and touch nothing.
pub async fn dispatch(
    store: &EquipmentStore,
    intent_name: &str,
    params: &IntentParameters,
) -> Result<Option<IntentOutcome>> {
    let Some(intent) = Intent::from_display_name(intent_name) else {
        info!(intent = intent_name, "Unrecognized intent, no reply");
        return Ok(None);
    };

    let outcome = match intent {
        Intent::Welcome => IntentOutcome::Welcome,
        Intent::StatusCheck => check_status(store, params).await?,
        Intent::Control => control_equipment(store, params).await?,
        Intent::Scheduling => schedule_equipment(store, params).await?,
        Intent::HealthCheck => check_system_health(store, params).await?,
        Intent::ThermostatAdjust => adjust_thermostat(store, params).await?,
    };

    Ok(Some(outcome))
}

const NO_TARGET_MESSAGE: &str = "Please specify an equipment name or location";

// ---- status check ----

async fn check_status(store: &EquipmentStore, params: &IntentParameters) -> Result<IntentOutcome> {
    let param = params.param().to_string();

    match resolve_target(params) {
        Some(Target::Name(name)) => {
            info!(name = %name, param = %param, "Equipment status check by name");
            match store.find_by_name(&name).await? {
                Some(equipment) => {
                    let (value, unit) = reading_of(&equipment, &param);
                    Ok(IntentOutcome::Report {
                        line: status_line(&name, &param, &value, unit),
                        reading: Reading {
                            kind: param,
                            value,
                            unit,
                        },
                    })
                }
                None => Ok(IntentOutcome::NotFound(format!(
                    "Equipment {} is not found",
                    name
                ))),
            }
        }
        Some(Target::Location(location)) => {
            info!(location = %location, param = %param, "Equipment status check by location");
            let units = store.find_by_location(&location).await?;
            if units.is_empty() {
                return Ok(IntentOutcome::NotFound(format!(
                    "Location {} not found",
                    location
                )));
            }

            let lines = units
                .iter()
                .map(|unit| {
                    let (value, unit_suffix) = reading_of(unit, &param);
                    status_line(&unit.name, &param, &value, unit_suffix)
                })
                .collect();
            Ok(IntentOutcome::Reply(lines))
        }
        None => Ok(IntentOutcome::Invalid(NO_TARGET_MESSAGE.to_string())),
    }
}

/// Value and unit for one reported parameter kind. Unknown kinds report
/// blank value and unit.
fn reading_of(equipment: &Equipment, param: &str) -> (String, &'static str) {
    match param {
        "temperature" => (equipment.temperature.to_string(), "°C"),
        "humidity" => (equipment.humidity.to_string(), "%"),
        "status" => (equipment.status.clone(), ""),
        "schedule" => {
            // the readout reports the first entry only
            let value = equipment
                .schedule
                .first()
                .map(|entry| {
                    format!(
                        "from {}hrs to {}hrs {}",
                        entry.start_time, entry.stop_time, entry.frequency
                    )
                })
                .unwrap_or_default();
            (value, "")
        }
        _ => (String::new(), ""),
    }
}

fn status_line(name: &str, param: &str, value: &str, unit: &str) -> String {
    format!("{}'s {} is {}{}", name, param, value, unit)
}

// ---- control ----

/// Status implied by a command: "Start" runs the unit, anything else stops it.
pub fn status_for_command(command: &str) -> &'static str {
    if command == "Start" {
        "Running"
    } else {
        "Stopped"
    }
}

async fn control_equipment(
    store: &EquipmentStore,
    params: &IntentParameters,
) -> Result<IntentOutcome> {
    let Some(command) = params.command() else {
        return Ok(IntentOutcome::Invalid(
            "Please specify a command for the equipment".to_string(),
        ));
    };
    let status = status_for_command(command);

    match resolve_target(params) {
        Some(Target::Name(name)) => {
            info!(name = %name, command = %command, "Control equipment by name");
            if store.apply_command_by_name(&name, command, status).await? {
                Ok(IntentOutcome::Reply(vec![format!(
                    "{} command to {} is successful",
                    name, command
                )]))
            } else {
                Ok(IntentOutcome::NotFound(format!(
                    "Equipment {} not found",
                    name
                )))
            }
        }
        Some(Target::Location(location)) => {
            info!(location = %location, command = %command, "Control equipment by location");
            let updated = store
                .apply_command_by_location(&location, command, status)
                .await?;
            if updated > 0 {
                info!(location = %location, updated, "Equipment commanded");
                Ok(IntentOutcome::Reply(vec![format!(
                    "Equipment at {} commanded to {} successfully",
                    location, command
                )]))
            } else {
                Ok(IntentOutcome::NotFound(format!(
                    "Location {} not found",
                    location
                )))
            }
        }
        None => Ok(IntentOutcome::Invalid(NO_TARGET_MESSAGE.to_string())),
    }
}

// ---- scheduling ----

/// Splice `insertion` into `text` at `index`, removing `remove_count` bytes
/// first. Inputs are ASCII time strings; out-of-range indices degrade the
/// way a slice would, not by panicking.
pub fn insert_at(text: &str, index: usize, remove_count: usize, insertion: &str) -> String {
    let head = text.get(..index).unwrap_or(text);
    let tail = text.get(index + remove_count..).unwrap_or("");
    format!("{}{}{}", head, insertion, tail)
}

/// Extract the "HH:MM" portion of a platform date-time string: the substring
/// between the `T` separator and the timezone offset, truncated to minute
/// precision, with the colon normalized after the first two digits.
pub fn normalize_schedule_time(raw: &str) -> Option<String> {
    let time = raw.split('T').nth(1)?;
    let time = time
        .split(|c| c == '+' || c == '-')
        .next()
        .unwrap_or(time)
        .trim_end_matches('Z');

    if time.len() < 5 {
        return None;
    }
    let minutes = &time[..time.len() - 3];

    let normalized = insert_at(minutes, 2, 1, ":");
    if normalized.len() == 5 {
        Some(normalized)
    } else {
        None
    }
}

async fn schedule_equipment(
    store: &EquipmentStore,
    params: &IntentParameters,
) -> Result<IntentOutcome> {
    let window = match (
        params.start_time().and_then(normalize_schedule_time),
        params.stop_time().and_then(normalize_schedule_time),
        params.frequency(),
    ) {
        (Some(start), Some(stop), Some(frequency)) => NewScheduleEntry {
            start_time: start,
            stop_time: stop,
            frequency: frequency.to_string(),
        },
        _ => {
            return Ok(IntentOutcome::Invalid(
                "Please specify a start time, stop time and frequency".to_string(),
            ))
        }
    };

    match resolve_target(params) {
        Some(Target::Name(name)) => {
            info!(
                name = %name,
                start = %window.start_time,
                stop = %window.stop_time,
                frequency = %window.frequency,
                "Schedule equipment by name"
            );
            if store.replace_schedule_by_name(&name, &window).await? {
                Ok(IntentOutcome::Reply(vec![format!(
                    "{} scheduled to run from {} to {} {} is successful",
                    name, window.start_time, window.stop_time, window.frequency
                )]))
            } else {
                Ok(IntentOutcome::NotFound(format!(
                    "Equipment {} not found",
                    name
                )))
            }
        }
        Some(Target::Location(location)) => {
            info!(
                location = %location,
                start = %window.start_time,
                stop = %window.stop_time,
                frequency = %window.frequency,
                "Schedule equipment by location"
            );
            let updated = store
                .replace_schedule_by_location(&location, &window)
                .await?;
            if updated > 0 {
                Ok(IntentOutcome::Reply(vec![format!(
                    "Equipment at {} scheduled to run from {} to {} {} successfully",
                    location, window.start_time, window.stop_time, window.frequency
                )]))
            } else {
                Ok(IntentOutcome::NotFound(format!(
                    "Location {} not found",
                    location
                )))
            }
        }
        None => Ok(IntentOutcome::Invalid(NO_TARGET_MESSAGE.to_string())),
    }
}

// ---- system health ----

/// Alarm lines for the units with an active alarm; quiet units are omitted.
pub fn health_lines(units: &[Equipment]) -> Vec<String> {
    units
        .iter()
        .filter(|unit| unit.alarm_active)
        .map(|unit| format!("{}: {}", unit.name, unit.alarm_description))
        .collect()
}

async fn check_system_health(
    store: &EquipmentStore,
    params: &IntentParameters,
) -> Result<IntentOutcome> {
    match resolve_target(params) {
        Some(Target::Name(name)) => {
            info!(name = %name, "System health check by name");
            match store.find_by_name(&name).await? {
                Some(equipment) => {
                    let line = if equipment.alarm_active {
                        format!("{}: {}", name, equipment.alarm_description)
                    } else {
                        format!("{} has no current issues", name)
                    };
                    Ok(IntentOutcome::Reply(vec![line]))
                }
                None => Ok(IntentOutcome::NotFound(format!(
                    "Equipment {} is not found",
                    name
                ))),
            }
        }
        Some(Target::Location(location)) => {
            info!(location = %location, "System health check by location");
            let units = store.find_by_location(&location).await?;
            if units.is_empty() {
                return Ok(IntentOutcome::NotFound(format!(
                    "Location {} not found",
                    location
                )));
            }

            let lines = health_lines(&units);
            if lines.is_empty() {
                Ok(IntentOutcome::Reply(vec![format!(
                    "Location {} has no current issues",
                    location
                )]))
            } else {
                Ok(IntentOutcome::Reply(lines))
            }
        }
        None => Ok(IntentOutcome::Invalid(NO_TARGET_MESSAGE.to_string())),
    }
}

// ---- thermostat ----

async fn adjust_thermostat(
    store: &EquipmentStore,
    params: &IntentParameters,
) -> Result<IntentOutcome> {
    let Some(temperature) = params.set_temperature() else {
        return Ok(IntentOutcome::Invalid(
            "Please specify a target temperature".to_string(),
        ));
    };

    match resolve_target(params) {
        Some(Target::Name(name)) => {
            info!(name = %name, temperature, "Thermostat adjustment by name");
            if store.set_temperature_by_name(&name, temperature).await? {
                Ok(IntentOutcome::Reply(vec![format!(
                    "{}'s thermostat setting set to {}°C successfully",
                    name, temperature
                )]))
            } else {
                Ok(IntentOutcome::NotFound(format!(
                    "Equipment {} not found",
                    name
                )))
            }
        }
        Some(Target::Location(location)) => {
            info!(location = %location, temperature, "Thermostat adjustment by location");
            let updated = store
                .set_temperature_by_location(&location, temperature)
                .await?;
            if updated > 0 {
                Ok(IntentOutcome::Reply(vec![format!(
                    "Thermostat setting for Equipment at {} set to {}°C successfully",
                    location, temperature
                )]))
            } else {
                Ok(IntentOutcome::NotFound(format!(
                    "Location {} not found",
                    location
                )))
            }
        }
        None => Ok(IntentOutcome::Invalid(NO_TARGET_MESSAGE.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScheduleEntry;

    fn unit(name: &str, alarm: bool, description: &str) -> Equipment {
        Equipment {
            id: uuid::Uuid::nil().to_string(),
            name: name.to_string(),
            location: "LA CALA".to_string(),
            temperature: 22.0,
            humidity: 55.0,
            status: "Running".to_string(),
            command: "Start".to_string(),
            alarm_active: alarm,
            alarm_description: description.to_string(),
            schedule: Vec::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_intent_table() {
        assert_eq!(
            Intent::from_display_name("EquipmentStatusCheck"),
            Some(Intent::StatusCheck)
        );
        assert_eq!(
            Intent::from_display_name("Default Welcome Intent"),
            Some(Intent::Welcome)
        );
        assert_eq!(Intent::from_display_name("OrderPizza"), None);
        assert_eq!(Intent::from_display_name("equipmentstatuscheck"), None);
    }

    #[test]
    fn test_targeting_prefers_name() {
        let params: IntentParameters = serde_json::from_str(
            r#"{"EqptName": "fcu_l1_01", "EqptLocation": "la cala"}"#,
        )
        .unwrap();
        assert_eq!(
            resolve_target(&params),
            Some(Target::Name("FCU_L1_01".to_string()))
        );

        let params: IntentParameters =
            serde_json::from_str(r#"{"EqptLocation": "la cala"}"#).unwrap();
        assert_eq!(
            resolve_target(&params),
            Some(Target::Location("LA CALA".to_string()))
        );

        let params = IntentParameters::default();
        assert_eq!(resolve_target(&params), None);
    }

    #[test]
    fn test_insert_at_splices() {
        assert_eq!(insert_at("0830", 2, 0, ":"), "08:30");
        assert_eq!(insert_at("08:30", 2, 1, ":"), "08:30");
        assert_eq!(insert_at("08x30", 2, 1, ":"), "08:30");
        // out-of-range indices degrade like slicing, no panic
        assert_eq!(insert_at("08", 5, 1, ":"), "08:");
    }

    #[test]
    fn test_normalize_schedule_time() {
        assert_eq!(
            normalize_schedule_time("2024-01-01T08:30:00+00:00").as_deref(),
            Some("08:30")
        );
        assert_eq!(
            normalize_schedule_time("2024-01-01T22:00:00+08:00").as_deref(),
            Some("22:00")
        );
        assert_eq!(
            normalize_schedule_time("2024-01-01T06:15:00Z").as_deref(),
            Some("06:15")
        );
        assert_eq!(
            normalize_schedule_time("2024-01-01T23:45:00-05:00").as_deref(),
            Some("23:45")
        );
        assert_eq!(normalize_schedule_time("08:30"), None);
        assert_eq!(normalize_schedule_time("garbage"), None);
        assert_eq!(normalize_schedule_time(""), None);
    }

    #[test]
    fn test_status_for_command() {
        assert_eq!(status_for_command("Start"), "Running");
        assert_eq!(status_for_command("Stop"), "Stopped");
        assert_eq!(status_for_command("start"), "Stopped");
    }

    #[test]
    fn test_reading_of_units() {
        let mut equipment = unit("FCU_L1_01", false, "");
        assert_eq!(
            reading_of(&equipment, "temperature"),
            ("22".to_string(), "°C")
        );
        assert_eq!(reading_of(&equipment, "humidity"), ("55".to_string(), "%"));
        assert_eq!(
            reading_of(&equipment, "status"),
            ("Running".to_string(), "")
        );
        assert_eq!(reading_of(&equipment, "power"), (String::new(), ""));

        equipment.schedule.push(ScheduleEntry {
            id: uuid::Uuid::nil().to_string(),
            start_time: "08:30".to_string(),
            stop_time: "22:00".to_string(),
            frequency: "daily".to_string(),
        });
        assert_eq!(
            reading_of(&equipment, "schedule").0,
            "from 08:30hrs to 22:00hrs daily"
        );
    }

    #[test]
    fn test_reading_of_empty_schedule_is_blank() {
        let equipment = unit("FCU_L1_01", false, "");
        assert_eq!(reading_of(&equipment, "schedule"), (String::new(), ""));
    }

    #[test]
    fn test_status_line_format() {
        assert_eq!(
            status_line("FCU_L1_01", "temperature", "22", "°C"),
            "FCU_L1_01's temperature is 22°C"
        );
    }

    #[test]
    fn test_health_lines_report_only_alarmed_units() {
        let units = vec![
            unit("FCU_L1_01", false, ""),
            unit("FCU_L1_02", true, "Filter blocked"),
            unit("FCU_L1_03", true, "Fan failure"),
        ];
        assert_eq!(
            health_lines(&units),
            vec![
                "FCU_L1_02: Filter blocked".to_string(),
                "FCU_L1_03: Fan failure".to_string(),
            ]
        );
        assert!(health_lines(&[unit("FCU_L1_01", false, "")]).is_empty());
    }
}
