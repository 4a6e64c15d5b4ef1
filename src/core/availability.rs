use crate::core::{
    AppointmentFilter, AppointmentStatus, BookingRules, Clock, DirectoryStore, Result,
    SlotAvailability, SystemClock,
};
use crate::utils::error::BookingError;
use chrono::{Duration, NaiveDate, NaiveTime};

/// Lists the standard slots of a day and marks the ones that cannot be booked.
pub struct SlotAvailabilityService<S: DirectoryStore> {
    store: S,
    rules: BookingRules,
    clock: Box<dyn Clock>,
}

impl<S: DirectoryStore> SlotAvailabilityService<S> {
    pub fn new(store: S, rules: BookingRules) -> Self {
        Self {
            store,
            rules,
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub async fn open_slots(&self, doctor_id: &str, date: NaiveDate) -> Result<Vec<SlotAvailability>> {
        if doctor_id.trim().is_empty() {
            return Err(BookingError::invalid_input("doctor_id", "doctor is required"));
        }

        let day_start = date.and_time(NaiveTime::MIN).and_utc();
        let day_end = day_start
            .checked_add_signed(Duration::days(1))
            .ok_or_else(|| out_of_range(date))?;
        let filter = AppointmentFilter::for_doctor(doctor_id.trim())
            .overlapping(day_start, day_end)
            .excluding_status(AppointmentStatus::Cancelled);
        let booked = self.store.find_appointments(&filter).await?;

        let now = self.clock.now();
        let length = Duration::minutes(self.rules.default_duration_minutes);
        let slots = self
            .rules
            .slot_times
            .iter()
            .map(|time| -> Result<SlotAvailability> {
                let starts_at = date.and_time(*time).and_utc();
                let ends_at = starts_at
                    .checked_add_signed(length)
                    .ok_or_else(|| out_of_range(date))?;
                let taken = booked
                    .iter()
                    .any(|a| self.rules.conflict_policy.clashes(a, starts_at, ends_at));
                Ok(SlotAvailability {
                    starts_at,
                    ends_at,
                    available: !taken && starts_at >= now,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            "Doctor {} on {}: {} of {} slots open",
            doctor_id,
            date,
            slots.iter().filter(|s| s.available).count(),
            slots.len()
        );
        Ok(slots)
    }
}

fn out_of_range(date: NaiveDate) -> BookingError {
    BookingError::invalid_input("date", format!("{} is out of range", date))
}
