use crate::domain::model::{
    Appointment, AppointmentFilter, AppointmentStatus, AppointmentWithDoctor, Doctor,
    NewAppointment,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Record store holding the `doctors`, `profiles` and `appointments` collections.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn find_doctor(&self, id: &str) -> Result<Option<Doctor>>;

    /// Doctors with their joined profile, optionally restricted to one specialty.
    async fn list_doctors(&self, specialty: Option<&str>) -> Result<Vec<Doctor>>;

    /// Appointments matching `filter`, ordered by start ascending.
    async fn find_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>>;

    /// Like `find_appointments`, with each row's doctor and profile embedded.
    async fn find_appointments_with_doctor(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<AppointmentWithDoctor>>;

    /// Stores a new appointment. Implementations that enforce slot uniqueness
    /// report a violation as `BookingError::SlotConflict`.
    async fn insert_appointment(&self, record: NewAppointment) -> Result<Appointment>;

    async fn update_appointment_status(
        &self,
        id: &str,
        status: AppointmentStatus,
    ) -> Result<Option<Appointment>>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user's id, or `None` when there is no session.
    async fn current_user_id(&self) -> Result<Option<String>>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
