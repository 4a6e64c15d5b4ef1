pub mod appointments;
pub mod availability;
pub mod directory;
pub mod guard;

pub use crate::domain::model::{
    Appointment, AppointmentFilter, AppointmentStatus, AppointmentWithDoctor, BookingRules,
    ConflictPolicy, Doctor, DoctorProfile, NewAppointment, SlotAvailability,
};
pub use crate::domain::ports::{Clock, DirectoryStore, IdentityProvider, SystemClock};
pub use crate::utils::error::Result;
