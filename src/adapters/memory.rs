use crate::domain::model::{
    Appointment, AppointmentFilter, AppointmentStatus, AppointmentWithDoctor, ConflictPolicy,
    Doctor, NewAppointment,
};
use crate::domain::ports::DirectoryStore;
use crate::utils::error::{BookingError, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Serialized form of the in-memory tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    #[serde(default)]
    pub doctors: Vec<Doctor>,
    #[serde(default)]
    pub appointments: Vec<Appointment>,
}

/// In-process directory store.
///
/// Inserts re-check the slot constraint while holding the table lock, so the
/// store itself refuses a second live appointment for a taken slot even when
/// two bookings race past the guard's read.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    tables: Arc<Mutex<DirectorySnapshot>>,
    constraint: ConflictPolicy,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: DirectorySnapshot) -> Self {
        Self {
            tables: Arc::new(Mutex::new(snapshot)),
            constraint: ConflictPolicy::default(),
        }
    }

    pub fn with_constraint(mut self, constraint: ConflictPolicy) -> Self {
        self.constraint = constraint;
        self
    }

    /// Loads a JSON data file; a missing file yields an empty directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("Data file {} not found, starting empty", path.display());
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)?;
        let snapshot: DirectorySnapshot = serde_json::from_str(&content)?;
        tracing::debug!(
            "Loaded {} doctors and {} appointments from {}",
            snapshot.doctors.len(),
            snapshot.appointments.len(),
            path.display()
        );
        Ok(Self::from_snapshot(snapshot))
    }

    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let snapshot = self.snapshot().await;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(path, serde_json::to_string_pretty(&snapshot)?)?;
        tracing::debug!("Saved data file {}", path.display());
        Ok(())
    }

    pub async fn snapshot(&self) -> DirectorySnapshot {
        self.tables.lock().await.clone()
    }

    pub async fn add_doctor(&self, doctor: Doctor) {
        let mut tables = self.tables.lock().await;
        tables.doctors.retain(|d| d.id != doctor.id);
        tables.doctors.push(doctor);
    }
}

fn select_appointments(tables: &DirectorySnapshot, filter: &AppointmentFilter) -> Vec<Appointment> {
    let mut found: Vec<Appointment> = tables
        .appointments
        .iter()
        .filter(|a| filter.matches(a))
        .cloned()
        .collect();
    found.sort_by_key(|a| a.starts_at);
    if let Some(limit) = filter.limit {
        found.truncate(limit);
    }
    found
}

#[async_trait]
impl DirectoryStore for MemoryDirectory {
    async fn find_doctor(&self, id: &str) -> Result<Option<Doctor>> {
        let tables = self.tables.lock().await;
        Ok(tables.doctors.iter().find(|d| d.id == id).cloned())
    }

    async fn list_doctors(&self, specialty: Option<&str>) -> Result<Vec<Doctor>> {
        let tables = self.tables.lock().await;
        let mut doctors: Vec<Doctor> = tables
            .doctors
            .iter()
            .filter(|d| specialty.map_or(true, |s| d.specialty == s))
            .cloned()
            .collect();
        doctors.sort_by_cached_key(Doctor::name_sort_key);
        Ok(doctors)
    }

    async fn find_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        let tables = self.tables.lock().await;
        Ok(select_appointments(&tables, filter))
    }

    async fn find_appointments_with_doctor(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<AppointmentWithDoctor>> {
        let tables = self.tables.lock().await;
        let joined = select_appointments(&tables, filter)
            .into_iter()
            .map(|appointment| {
                let doctor = tables
                    .doctors
                    .iter()
                    .find(|d| d.id == appointment.doctor_id)
                    .cloned();
                AppointmentWithDoctor {
                    appointment,
                    doctor,
                }
            })
            .collect();
        Ok(joined)
    }

    async fn insert_appointment(&self, record: NewAppointment) -> Result<Appointment> {
        if record.ends_at <= record.starts_at {
            return Err(BookingError::invalid_input(
                "ends_at",
                "end must be after start",
            ));
        }

        let mut tables = self.tables.lock().await;

        if record.status.holds_slot() {
            let taken = tables.appointments.iter().any(|existing| {
                existing.doctor_id == record.doctor_id
                    && self
                        .constraint
                        .clashes(existing, record.starts_at, record.ends_at)
            });
            if taken {
                return Err(BookingError::SlotConflict {
                    doctor_id: record.doctor_id,
                    starts_at: record.starts_at,
                });
            }
        }

        let appointment = record.into_appointment(Uuid::new_v4().to_string(), Utc::now());
        tables.appointments.push(appointment.clone());
        Ok(appointment)
    }

    async fn update_appointment_status(
        &self,
        id: &str,
        status: AppointmentStatus,
    ) -> Result<Option<Appointment>> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .appointments
            .iter_mut()
            .find(|a| a.id == id)
            .map(|a| {
                a.status = status;
                a.clone()
            }))
    }
}
