use crate::core::guard::require_patient;
use crate::core::{
    Appointment, AppointmentFilter, AppointmentStatus, AppointmentWithDoctor, DirectoryStore,
    IdentityProvider, Result,
};
use crate::utils::error::BookingError;

/// The signed-in patient's own appointments.
pub struct AppointmentBook<S: DirectoryStore, I: IdentityProvider> {
    store: S,
    identity: I,
}

impl<S: DirectoryStore, I: IdentityProvider> AppointmentBook<S, I> {
    pub fn new(store: S, identity: I) -> Self {
        Self { store, identity }
    }

    /// The patient's appointments, soonest first, each with its doctor.
    pub async fn my_appointments(&self) -> Result<Vec<AppointmentWithDoctor>> {
        let patient_id = require_patient(&self.identity).await?;
        self.store
            .find_appointments_with_doctor(&AppointmentFilter::for_patient(&patient_id))
            .await
    }

    /// Cancels one of the patient's appointments. Cancelling twice is a no-op.
    pub async fn cancel(&self, appointment_id: &str) -> Result<Appointment> {
        let patient_id = require_patient(&self.identity).await?;
        if appointment_id.trim().is_empty() {
            return Err(BookingError::invalid_input(
                "appointment_id",
                "appointment is required",
            ));
        }

        let mut filter = AppointmentFilter::by_id(appointment_id.trim());
        filter.patient_id = Some(patient_id);
        let current = self
            .store
            .find_appointments(&filter)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BookingError::not_found("appointment", appointment_id))?;

        if current.status == AppointmentStatus::Cancelled {
            tracing::debug!("Appointment {} already cancelled", current.id);
            return Ok(current);
        }
        if !current.status.can_transition_to(AppointmentStatus::Cancelled) {
            return Err(BookingError::invalid_input(
                "status",
                format!("a {} appointment cannot be cancelled", current.status),
            ));
        }

        let cancelled = self
            .store
            .update_appointment_status(&current.id, AppointmentStatus::Cancelled)
            .await?
            .ok_or_else(|| BookingError::not_found("appointment", appointment_id))?;
        tracing::info!("Appointment {} cancelled", cancelled.id);
        Ok(cancelled)
    }
}
