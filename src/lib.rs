pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::Command, CliConfig};

pub use adapters::{MemoryDirectory, PostgrestDirectory, SessionIdentity, StaticIdentity};
pub use config::BookingConfig;
pub use core::{
    appointments::AppointmentBook,
    availability::SlotAvailabilityService,
    directory::{DoctorDirectory, DoctorQuery, DoctorSort},
    guard::{BookingRequest, SlotBookingGuard},
};
pub use domain::model::{
    Appointment, AppointmentStatus, AppointmentWithDoctor, BookingRules, ConflictPolicy, Doctor,
    DoctorProfile,
};
pub use utils::error::{BookingError, Result};
