use crate::core::{
    Appointment, AppointmentStatus, BookingRules, Clock, DirectoryStore, IdentityProvider,
    NewAppointment, Result, SystemClock,
};
use crate::utils::error::BookingError;
use crate::utils::validation::normalize_notes;
use chrono::{DateTime, Duration, NaiveTime, Utc};

/// A patient's request for one slot with one doctor.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingRequest {
    pub doctor_id: String,
    pub starts_at: DateTime<Utc>,
    /// Falls back to the configured default duration when absent.
    pub duration_minutes: Option<i64>,
    pub notes: Option<String>,
}

impl BookingRequest {
    pub fn new(doctor_id: impl Into<String>, starts_at: DateTime<Utc>) -> Self {
        Self {
            doctor_id: doctor_id.into(),
            starts_at,
            duration_minutes: None,
            notes: None,
        }
    }

    pub fn with_duration(mut self, minutes: i64) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Returns the signed-in user's id or `Unauthenticated`.
pub(crate) async fn require_patient<I: IdentityProvider>(identity: &I) -> Result<String> {
    match identity.current_user_id().await? {
        Some(id) if !id.trim().is_empty() => Ok(id),
        _ => {
            tracing::info!("Rejected request without an authenticated session");
            Err(BookingError::Unauthenticated)
        }
    }
}

/// Validates and commits appointment requests without double-booking a slot.
pub struct SlotBookingGuard<S: DirectoryStore, I: IdentityProvider> {
    store: S,
    identity: I,
    rules: BookingRules,
    clock: Box<dyn Clock>,
}

impl<S: DirectoryStore, I: IdentityProvider> SlotBookingGuard<S, I> {
    pub fn new(store: S, identity: I, rules: BookingRules) -> Self {
        Self {
            store,
            identity,
            rules,
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Books `request` for the signed-in patient.
    ///
    /// Identity and input are checked before the store is touched. The store
    /// then sees one conflict query and, only when the slot is free, one
    /// insert of a `requested` appointment.
    pub async fn request_appointment(&self, request: BookingRequest) -> Result<Appointment> {
        let patient_id = require_patient(&self.identity).await?;
        let (starts_at, ends_at) = self.validate(&request)?;
        let doctor_id = request.doctor_id.trim();

        tracing::debug!(
            "Booking request: doctor={} patient={} start={} end={}",
            doctor_id,
            patient_id,
            starts_at,
            ends_at
        );

        if self.rules.verify_doctor && self.store.find_doctor(doctor_id).await?.is_none() {
            return Err(BookingError::invalid_input(
                "doctor_id",
                format!("unknown doctor {}", doctor_id),
            ));
        }

        let filter = self
            .rules
            .conflict_policy
            .conflict_filter(doctor_id, starts_at, ends_at);
        let existing = self.store.find_appointments(&filter).await?;
        if let Some(taken) = existing.first() {
            tracing::warn!(
                "Slot {} for doctor {} clashes with appointment {}",
                starts_at,
                doctor_id,
                taken.id
            );
            return Err(BookingError::SlotConflict {
                doctor_id: doctor_id.to_string(),
                starts_at,
            });
        }

        let record = NewAppointment {
            doctor_id: doctor_id.to_string(),
            patient_id,
            starts_at,
            ends_at,
            status: AppointmentStatus::Requested,
            notes: normalize_notes(request.notes.as_deref()),
        };
        let created = self.store.insert_appointment(record).await?;

        tracing::info!(
            "✅ Appointment {} requested with doctor {} at {}",
            created.id,
            created.doctor_id,
            created.starts_at
        );
        Ok(created)
    }

    fn validate(&self, request: &BookingRequest) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        if request.doctor_id.trim().is_empty() {
            return Err(BookingError::invalid_input("doctor_id", "doctor is required"));
        }

        let duration = request
            .duration_minutes
            .unwrap_or(self.rules.default_duration_minutes);
        if duration <= 0 {
            return Err(BookingError::invalid_input(
                "duration_minutes",
                format!("duration must be positive, got {}", duration),
            ));
        }
        if duration > self.rules.max_duration_minutes {
            return Err(BookingError::invalid_input(
                "duration_minutes",
                format!(
                    "duration must not exceed {} minutes, got {}",
                    self.rules.max_duration_minutes, duration
                ),
            ));
        }

        let now = self.clock.now();
        let earliest = if self.rules.allow_same_day {
            now.date_naive().and_time(NaiveTime::MIN).and_utc()
        } else {
            now
        };
        if request.starts_at < earliest {
            return Err(BookingError::invalid_input(
                "starts_at",
                format!("{} is in the past", request.starts_at),
            ));
        }

        let ends_at = request
            .starts_at
            .checked_add_signed(Duration::minutes(duration))
            .filter(|end| *end > request.starts_at)
            .ok_or_else(|| BookingError::invalid_input("ends_at", "end must be after start"))?;

        Ok((request.starts_at, ends_at))
    }
}
