//! Equipment store access layer.
//!
//! Wraps the Postgres pool with the operations both request paths need: the
//! conversational resolver's name/location-targeted reads and mutations, and
//! the REST facade's id-addressed CRUD including schedule sub-resources.
//!
//! Location-wide mutations are single statements; the affected-row count
//! distinguishes "not found" (zero) from success. Schedule replacement runs
//! in one transaction, which is the store's unit of atomicity.

use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    Equipment, EquipmentPatch, EquipmentRow, NewScheduleEntry, ScheduleEntry, ScheduleEntryPatch,
    ScheduleEntryRow,
};
use crate::Result;

const EQUIPMENT_COLUMNS: &str =
    "id, name, location, temperature, humidity, status, command, alarm_active, \
     alarm_description, created_at, updated_at";

const ENTRY_COLUMNS: &str = "id, equipment_id, start_time, stop_time, frequency, created_at";

/// Outcome of an operation addressing a schedule entry by (equipment id, entry id).
///
/// The two not-found cases are distinct so the facade can report them with
/// different messages.
#[derive(Debug)]
pub enum ScheduleEntryResult<T> {
    Found(T),
    EquipmentNotFound,
    EntryNotFound,
}

/// Client for the equipment collection.
#[derive(Clone)]
pub struct EquipmentStore {
    pool: PgPool,
}

impl EquipmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---- hydration ----

    async fn schedule_for(&self, equipment_id: Uuid) -> Result<Vec<ScheduleEntry>> {
        let rows: Vec<ScheduleEntryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM schedule_entries WHERE equipment_id = $1 ORDER BY created_at, id",
            ENTRY_COLUMNS
        ))
        .bind(equipment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ScheduleEntry::from).collect())
    }

    async fn hydrate(&self, row: EquipmentRow) -> Result<Equipment> {
        let schedule = self.schedule_for(row.id).await?;
        Ok(Equipment::from_row(row, schedule))
    }

    async fn hydrate_all(&self, rows: Vec<EquipmentRow>) -> Result<Vec<Equipment>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let entries: Vec<ScheduleEntryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM schedule_entries WHERE equipment_id = ANY($1) ORDER BY created_at, id",
            ENTRY_COLUMNS
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<ScheduleEntry>> = HashMap::new();
        for entry in entries {
            grouped
                .entry(entry.equipment_id)
                .or_default()
                .push(entry.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let schedule = grouped.remove(&row.id).unwrap_or_default();
                Equipment::from_row(row, schedule)
            })
            .collect())
    }

    // ---- conversational path ----

    /// Look up a single unit by its exact (uppercased) name.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Equipment>> {
        let row: Option<EquipmentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM equipment WHERE name = $1",
            EQUIPMENT_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// Look up every unit at a location.
    pub async fn find_by_location(&self, location: &str) -> Result<Vec<Equipment>> {
        let rows: Vec<EquipmentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM equipment WHERE location = $1 ORDER BY name",
            EQUIPMENT_COLUMNS
        ))
        .bind(location)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_all(rows).await
    }

    /// Store a command and the status it implies on a named unit.
    pub async fn apply_command_by_name(
        &self,
        name: &str,
        command: &str,
        status: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE equipment SET command = $2, status = $3, updated_at = NOW() WHERE name = $1",
        )
        .bind(name)
        .bind(command)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Store a command and status on every unit at a location. Returns the
    /// number of units updated.
    pub async fn apply_command_by_location(
        &self,
        location: &str,
        command: &str,
        status: &str,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE equipment SET command = $2, status = $3, updated_at = NOW() WHERE location = $1",
        )
        .bind(location)
        .bind(command)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Set the thermostat of a named unit.
    pub async fn set_temperature_by_name(&self, name: &str, temperature: f64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE equipment SET temperature = $2, updated_at = NOW() WHERE name = $1",
        )
        .bind(name)
        .bind(temperature)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set the thermostat of every unit at a location.
    pub async fn set_temperature_by_location(
        &self,
        location: &str,
        temperature: f64,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE equipment SET temperature = $2, updated_at = NOW() WHERE location = $1",
        )
        .bind(location)
        .bind(temperature)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Replace the whole schedule of a named unit with one entry.
    pub async fn replace_schedule_by_name(
        &self,
        name: &str,
        entry: &NewScheduleEntry,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM equipment WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(id) = id else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM schedule_entries WHERE equipment_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO schedule_entries (id, equipment_id, start_time, stop_time, frequency) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(&entry.start_time)
        .bind(&entry.stop_time)
        .bind(&entry.frequency)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE equipment SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Replace the schedule of every unit at a location. Returns the number
    /// of units rescheduled.
    pub async fn replace_schedule_by_location(
        &self,
        location: &str,
        entry: &NewScheduleEntry,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM equipment WHERE location = $1")
            .bind(location)
            .fetch_all(&mut *tx)
            .await?;

        if ids.is_empty() {
            return Ok(0);
        }

        sqlx::query("DELETE FROM schedule_entries WHERE equipment_id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?;

        for id in &ids {
            sqlx::query(
                "INSERT INTO schedule_entries (id, equipment_id, start_time, stop_time, frequency) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(&entry.start_time)
            .bind(&entry.stop_time)
            .bind(&entry.frequency)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE equipment SET updated_at = NOW() WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(ids.len() as u64)
    }

    // ---- REST path ----

    /// Fetch the whole collection.
    pub async fn list_all(&self) -> Result<Vec<Equipment>> {
        let rows: Vec<EquipmentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM equipment ORDER BY name",
            EQUIPMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_all(rows).await
    }

    /// Fetch one document by id.
    pub async fn fetch(&self, id: Uuid) -> Result<Option<Equipment>> {
        let row: Option<EquipmentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM equipment WHERE id = $1",
            EQUIPMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// Merge the fields present in the patch into the document. Returns the
    /// updated document, or `None` when the id matches nothing.
    pub async fn update_fields(
        &self,
        id: Uuid,
        patch: &EquipmentPatch,
    ) -> Result<Option<Equipment>> {
        let row: Option<EquipmentRow> = sqlx::query_as(&format!(
            "UPDATE equipment SET \
                 name = COALESCE($2, name), \
                 location = COALESCE($3, location), \
                 temperature = COALESCE($4, temperature), \
                 humidity = COALESCE($5, humidity), \
                 status = COALESCE($6, status), \
                 command = COALESCE($7, command), \
                 alarm_active = COALESCE($8, alarm_active), \
                 alarm_description = COALESCE($9, alarm_description), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            EQUIPMENT_COLUMNS
        ))
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.location)
        .bind(patch.temperature)
        .bind(patch.humidity)
        .bind(&patch.status)
        .bind(&patch.command)
        .bind(patch.alarm_active)
        .bind(&patch.alarm_description)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// Remove one document. Returns the number of rows removed (0 or 1);
    /// the FK cascade takes the schedule entries with it.
    pub async fn delete(&self, id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Remove the whole collection.
    pub async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM equipment")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Append one schedule entry. Returns the parent with the new entry, or
    /// `None` when the equipment id matches nothing.
    pub async fn append_schedule_entry(
        &self,
        id: Uuid,
        entry: &NewScheduleEntry,
    ) -> Result<Option<Equipment>> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM equipment WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if !exists {
            return Ok(None);
        }

        sqlx::query(
            "INSERT INTO schedule_entries (id, equipment_id, start_time, stop_time, frequency) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(&entry.start_time)
        .bind(&entry.stop_time)
        .bind(&entry.frequency)
        .execute(&self.pool)
        .await?;

        self.fetch(id).await
    }

    /// Remove every schedule entry. Returns the parent with its schedule
    /// cleared, or `None` when the equipment id matches nothing.
    pub async fn clear_schedule(&self, id: Uuid) -> Result<Option<Equipment>> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM equipment WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if !exists {
            return Ok(None);
        }

        sqlx::query("DELETE FROM schedule_entries WHERE equipment_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.fetch(id).await
    }

    /// Fetch one schedule entry by (equipment id, entry id).
    pub async fn fetch_schedule_entry(
        &self,
        id: Uuid,
        entry_id: Uuid,
    ) -> Result<ScheduleEntryResult<ScheduleEntry>> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM equipment WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if !exists {
            return Ok(ScheduleEntryResult::EquipmentNotFound);
        }

        let row: Option<ScheduleEntryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM schedule_entries WHERE id = $2 AND equipment_id = $1",
            ENTRY_COLUMNS
        ))
        .bind(id)
        .bind(entry_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(ScheduleEntryResult::Found(row.into())),
            None => Ok(ScheduleEntryResult::EntryNotFound),
        }
    }

    /// Patch the fields present in the request onto one schedule entry.
    /// Returns the parent document after the update.
    pub async fn patch_schedule_entry(
        &self,
        id: Uuid,
        entry_id: Uuid,
        patch: &ScheduleEntryPatch,
    ) -> Result<ScheduleEntryResult<Equipment>> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM equipment WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if !exists {
            return Ok(ScheduleEntryResult::EquipmentNotFound);
        }

        let result = sqlx::query(
            "UPDATE schedule_entries SET \
                 start_time = COALESCE($3, start_time), \
                 stop_time = COALESCE($4, stop_time), \
                 frequency = COALESCE($5, frequency) \
             WHERE id = $2 AND equipment_id = $1",
        )
        .bind(id)
        .bind(entry_id)
        .bind(&patch.start_time)
        .bind(&patch.stop_time)
        .bind(&patch.frequency)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(ScheduleEntryResult::EntryNotFound);
        }

        match self.fetch(id).await? {
            Some(equipment) => Ok(ScheduleEntryResult::Found(equipment)),
            None => Ok(ScheduleEntryResult::EquipmentNotFound),
        }
    }

    /// Remove one schedule entry. Returns the parent document after the
    /// removal.
    pub async fn delete_schedule_entry(
        &self,
        id: Uuid,
        entry_id: Uuid,
    ) -> Result<ScheduleEntryResult<Equipment>> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM equipment WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if !exists {
            return Ok(ScheduleEntryResult::EquipmentNotFound);
        }

        let result =
            sqlx::query("DELETE FROM schedule_entries WHERE id = $2 AND equipment_id = $1")
                .bind(id)
                .bind(entry_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Ok(ScheduleEntryResult::EntryNotFound);
        }

        match self.fetch(id).await? {
            Some(equipment) => Ok(ScheduleEntryResult::Found(equipment)),
            None => Ok(ScheduleEntryResult::EquipmentNotFound),
        }
    }
}
