use crate::core::directory::DoctorSort;
use crate::utils::error::{BookingError, Result};
use crate::utils::validation::parse_slot_start;
use chrono::{DateTime, Utc};
use clap::Subcommand;

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Search the doctor directory
    Doctors {
        #[arg(long)]
        specialty: Option<String>,
        /// Matches full name or specialty, case-insensitive
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum, default_value_t = DoctorSort::Rating)]
        sort: DoctorSort,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Best rated doctors of a specialty
    Recommend { specialty: String },
    /// Show one doctor
    Profile { doctor_id: String },
    /// List a doctor's slots for a day (YYYY-MM-DD, UTC)
    Slots {
        doctor_id: String,
        #[arg(long)]
        date: String,
    },
    /// Request an appointment
    Book {
        doctor_id: String,
        /// RFC 3339 start, e.g. 2025-03-10T09:00:00Z
        #[arg(long, conflicts_with_all = ["date", "time"])]
        start: Option<String>,
        #[arg(long, requires = "time")]
        date: Option<String>,
        #[arg(long, requires = "date")]
        time: Option<String>,
        #[arg(long)]
        duration: Option<i64>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List your appointments
    Appointments,
    /// Cancel one of your appointments
    Cancel { appointment_id: String },
}

impl Command {
    /// Whether the command writes to the directory store.
    pub fn mutates(&self) -> bool {
        matches!(self, Command::Book { .. } | Command::Cancel { .. })
    }
}

/// Start instant from either `--start` or the `--date`/`--time` pair.
pub fn resolve_start(
    start: Option<&str>,
    date: Option<&str>,
    time: Option<&str>,
) -> Result<DateTime<Utc>> {
    match (start, date, time) {
        (Some(start), _, _) => DateTime::parse_from_rfc3339(start.trim())
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| {
                BookingError::invalid_input(
                    "start",
                    format!("'{}' is not an RFC 3339 timestamp: {}", start, e),
                )
            }),
        (None, Some(date), Some(time)) => parse_slot_start(date, time),
        _ => Err(BookingError::invalid_input(
            "start",
            "give --start or both --date and --time",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliConfig;
    use clap::Parser;

    #[test]
    fn test_resolve_start() {
        let from_rfc = resolve_start(Some("2025-03-10T09:00:00+01:00"), None, None);
        assert_eq!(from_rfc.unwrap().to_rfc3339(), "2025-03-10T08:00:00+00:00");

        let from_parts = resolve_start(None, Some("2025-03-10"), Some("09:30")).unwrap();
        assert_eq!(from_parts.to_rfc3339(), "2025-03-10T09:30:00+00:00");

        assert!(resolve_start(None, Some("2025-03-10"), None).is_err());
        assert!(resolve_start(Some("tomorrow"), None, None).is_err());
    }

    #[test]
    fn test_parse_book_command() {
        let cli = CliConfig::parse_from([
            "clinic-booking",
            "--as-user",
            "P1",
            "book",
            "D1",
            "--date",
            "2025-03-10",
            "--time",
            "09:00",
            "--notes",
            "first visit",
        ]);

        assert_eq!(cli.as_user.as_deref(), Some("P1"));
        assert!(cli.command.mutates());
        match cli.command {
            Command::Book {
                doctor_id,
                date,
                time,
                notes,
                ..
            } => {
                assert_eq!(doctor_id, "D1");
                assert_eq!(date.as_deref(), Some("2025-03-10"));
                assert_eq!(time.as_deref(), Some("09:00"));
                assert_eq!(notes.as_deref(), Some("first visit"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_start_conflicts_with_date() {
        let parsed = CliConfig::try_parse_from([
            "clinic-booking",
            "book",
            "D1",
            "--start",
            "2025-03-10T09:00:00Z",
            "--date",
            "2025-03-10",
            "--time",
            "09:00",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_doctors_sort_defaults_to_rating() {
        let cli = CliConfig::parse_from(["clinic-booking", "doctors", "--specialty", "Pediatría"]);
        assert!(!cli.command.mutates());
        match cli.command {
            Command::Doctors { sort, specialty, .. } => {
                assert_eq!(sort, DoctorSort::Rating);
                assert_eq!(specialty.as_deref(), Some("Pediatría"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
