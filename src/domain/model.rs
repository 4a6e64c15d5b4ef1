use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Public profile row joined onto a doctor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: String,
    #[serde(default)]
    pub specialty: String,
    pub years_experience: Option<u32>,
    #[serde(default)]
    pub rating_avg: f64,
    #[serde(default)]
    pub rating_count: u32,
    pub phone: Option<String>,
    #[serde(rename = "profiles", default)]
    pub profile: Option<Profile>,
}

impl Doctor {
    pub fn full_name(&self) -> Option<&str> {
        self.profile.as_ref().and_then(|p| p.full_name.as_deref())
    }

    pub fn display_name(&self) -> &str {
        self.full_name().unwrap_or("Doctor")
    }

    /// Key for alphabetical ordering: lowercase with Latin accents folded, so
    /// "Álvaro" sorts next to "alvaro" rather than after "Zoe".
    pub fn name_sort_key(&self) -> String {
        self.full_name().map(fold_name).unwrap_or_default()
    }
}

fn fold_name(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Requested,
    Confirmed,
    Completed,
    #[serde(alias = "canceled")]
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Requested => "requested",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// `requested -> confirmed | cancelled`, `confirmed -> completed | cancelled`.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (AppointmentStatus::Requested, AppointmentStatus::Confirmed)
                | (AppointmentStatus::Requested, AppointmentStatus::Cancelled)
                | (AppointmentStatus::Confirmed, AppointmentStatus::Completed)
                | (AppointmentStatus::Confirmed, AppointmentStatus::Cancelled)
        )
    }

    /// Whether an appointment in this status still occupies its slot.
    pub fn holds_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub doctor_id: String,
    pub patient_id: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// Half-open interval overlap: back-to-back appointments do not clash.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.starts_at < end && start < self.ends_at
    }
}

/// Insert payload; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAppointment {
    pub doctor_id: String,
    pub patient_id: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

impl NewAppointment {
    pub fn into_appointment(self, id: String, created_at: DateTime<Utc>) -> Appointment {
        Appointment {
            id,
            doctor_id: self.doctor_id,
            patient_id: self.patient_id,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            status: self.status,
            notes: self.notes,
            created_at,
        }
    }
}

/// How two appointments of the same doctor are judged to clash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Only identical start timestamps clash.
    Exact,
    /// Any interval overlap clashes.
    #[default]
    Overlap,
}

impl ConflictPolicy {
    /// Store query returning the live appointments that would clash with `[start, end)`.
    pub fn conflict_filter(
        &self,
        doctor_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppointmentFilter {
        let filter = AppointmentFilter::for_doctor(doctor_id)
            .excluding_status(AppointmentStatus::Cancelled);
        match self {
            ConflictPolicy::Exact => filter.starting_at(start),
            ConflictPolicy::Overlap => filter.overlapping(start, end),
        }
    }

    pub fn clashes(&self, existing: &Appointment, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if !existing.status.holds_slot() {
            return false;
        }
        match self {
            ConflictPolicy::Exact => existing.starts_at == start,
            ConflictPolicy::Overlap => existing.overlaps(start, end),
        }
    }
}

/// Conjunction of optional predicates over the appointments collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentFilter {
    pub id: Option<String>,
    pub doctor_id: Option<String>,
    pub patient_id: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    /// `starts_at < t`
    pub starts_before: Option<DateTime<Utc>>,
    /// `ends_at > t`
    pub ends_after: Option<DateTime<Utc>>,
    /// `starts_at >= t`
    pub starts_from: Option<DateTime<Utc>>,
    pub status: Option<AppointmentStatus>,
    pub status_not: Option<AppointmentStatus>,
    /// Applied by the store after ordering by start.
    pub limit: Option<usize>,
}

impl AppointmentFilter {
    pub fn by_id(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    pub fn for_doctor(doctor_id: &str) -> Self {
        Self {
            doctor_id: Some(doctor_id.to_string()),
            ..Default::default()
        }
    }

    pub fn for_patient(patient_id: &str) -> Self {
        Self {
            patient_id: Some(patient_id.to_string()),
            ..Default::default()
        }
    }

    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.starts_at = Some(start);
        self
    }

    pub fn overlapping(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.starts_before = Some(end);
        self.ends_after = Some(start);
        self
    }

    pub fn excluding_status(mut self, status: AppointmentStatus) -> Self {
        self.status_not = Some(status);
        self
    }

    pub fn with_status(mut self, status: AppointmentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn starting_from(mut self, from: DateTime<Utc>) -> Self {
        self.starts_from = Some(from);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.id.as_ref().map_or(true, |id| *id == appointment.id)
            && self
                .doctor_id
                .as_ref()
                .map_or(true, |d| *d == appointment.doctor_id)
            && self
                .patient_id
                .as_ref()
                .map_or(true, |p| *p == appointment.patient_id)
            && self.starts_at.map_or(true, |t| appointment.starts_at == t)
            && self.starts_before.map_or(true, |t| appointment.starts_at < t)
            && self.ends_after.map_or(true, |t| appointment.ends_at > t)
            && self.starts_from.map_or(true, |t| appointment.starts_at >= t)
            && self.status.map_or(true, |s| appointment.status == s)
            && self.status_not.map_or(true, |s| appointment.status != s)
    }
}

/// An appointment with its doctor (and the doctor's profile) embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentWithDoctor {
    #[serde(flatten)]
    pub appointment: Appointment,
    #[serde(rename = "doctors", default)]
    pub doctor: Option<Doctor>,
}

/// A doctor together with their next confirmed appointments.
#[derive(Debug, Clone, PartialEq)]
pub struct DoctorProfile {
    pub doctor: Doctor,
    pub upcoming: Vec<Appointment>,
}

/// A bookable slot on a given day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotAvailability {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub available: bool,
}

pub const DEFAULT_DURATION_MINUTES: i64 = 30;
pub const DEFAULT_MAX_DURATION_MINUTES: i64 = 240;
pub const STANDARD_SLOT_TIMES: [&str; 12] = [
    "09:00", "09:30", "10:00", "10:30", "11:00", "11:30", "14:00", "14:30", "15:00", "15:30",
    "16:00", "16:30",
];

/// Booking rules applied by the guard and the availability listing.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingRules {
    pub default_duration_minutes: i64,
    pub max_duration_minutes: i64,
    pub conflict_policy: ConflictPolicy,
    /// Accept start times earlier today (UTC) instead of only future ones.
    pub allow_same_day: bool,
    /// Look the doctor up before checking the slot.
    pub verify_doctor: bool,
    pub slot_times: Vec<NaiveTime>,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
            max_duration_minutes: DEFAULT_MAX_DURATION_MINUTES,
            conflict_policy: ConflictPolicy::default(),
            allow_same_day: false,
            verify_doctor: false,
            slot_times: STANDARD_SLOT_TIMES
                .iter()
                .filter_map(|t| NaiveTime::parse_from_str(t, "%H:%M").ok())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn appointment(start: &str, end: &str, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: "A1".to_string(),
            doctor_id: "D1".to_string(),
            patient_id: "P1".to_string(),
            starts_at: at(start),
            ends_at: at(end),
            status,
            notes: None,
            created_at: at("2025-03-01T00:00:00Z"),
        }
    }

    #[test]
    fn test_default_rules_carry_standard_slots() {
        let rules = BookingRules::default();
        assert_eq!(rules.default_duration_minutes, 30);
        assert_eq!(rules.slot_times.len(), 12);
        assert_eq!(rules.slot_times[6], NaiveTime::from_hms_opt(14, 0, 0).unwrap());
    }

    #[test]
    fn test_status_transitions() {
        use AppointmentStatus::*;
        assert!(Requested.can_transition_to(Confirmed));
        assert!(Requested.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(!Requested.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Requested));
    }

    #[test]
    fn test_status_accepts_american_spelling() {
        let status: AppointmentStatus = serde_json::from_str("\"canceled\"").unwrap();
        assert_eq!(status, AppointmentStatus::Cancelled);
        assert_eq!(
            serde_json::to_string(&AppointmentStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }

    #[test]
    fn test_overlap_is_half_open() {
        let apt = appointment(
            "2025-03-10T09:00:00Z",
            "2025-03-10T09:30:00Z",
            AppointmentStatus::Requested,
        );
        assert!(apt.overlaps(at("2025-03-10T09:15:00Z"), at("2025-03-10T09:45:00Z")));
        assert!(!apt.overlaps(at("2025-03-10T09:30:00Z"), at("2025-03-10T10:00:00Z")));
        assert!(!apt.overlaps(at("2025-03-10T08:30:00Z"), at("2025-03-10T09:00:00Z")));
    }

    #[test]
    fn test_policy_clashes() {
        let apt = appointment(
            "2025-03-10T09:00:00Z",
            "2025-03-10T09:30:00Z",
            AppointmentStatus::Confirmed,
        );
        let start = at("2025-03-10T09:15:00Z");
        let end = at("2025-03-10T09:45:00Z");
        assert!(ConflictPolicy::Overlap.clashes(&apt, start, end));
        assert!(!ConflictPolicy::Exact.clashes(&apt, start, end));

        let cancelled = appointment(
            "2025-03-10T09:00:00Z",
            "2025-03-10T09:30:00Z",
            AppointmentStatus::Cancelled,
        );
        assert!(!ConflictPolicy::Exact.clashes(&cancelled, at("2025-03-10T09:00:00Z"), end));
    }

    #[test]
    fn test_conflict_filter_matches_like_clashes() {
        let apt = appointment(
            "2025-03-10T09:00:00Z",
            "2025-03-10T09:30:00Z",
            AppointmentStatus::Requested,
        );
        let start = at("2025-03-10T09:00:00Z");
        let end = at("2025-03-10T09:30:00Z");

        for policy in [ConflictPolicy::Exact, ConflictPolicy::Overlap] {
            let filter = policy.conflict_filter("D1", start, end);
            assert!(filter.matches(&apt));
            assert!(!policy.conflict_filter("D2", start, end).matches(&apt));
        }

        let cancelled = Appointment {
            status: AppointmentStatus::Cancelled,
            ..apt
        };
        assert!(!ConflictPolicy::Exact
            .conflict_filter("D1", start, end)
            .matches(&cancelled));
    }

    #[test]
    fn test_doctor_deserializes_joined_profile() {
        let doctor: Doctor = serde_json::from_value(serde_json::json!({
            "id": "D1",
            "specialty": "Cardiología",
            "years_experience": 12,
            "rating_avg": 4.6,
            "rating_count": 31,
            "phone": null,
            "profiles": { "full_name": "Ana Ruiz", "avatar_url": null }
        }))
        .unwrap();

        assert_eq!(doctor.display_name(), "Ana Ruiz");
        assert_eq!(doctor.years_experience, Some(12));

        let bare: Doctor = serde_json::from_value(serde_json::json!({ "id": "D2" })).unwrap();
        assert_eq!(bare.display_name(), "Doctor");
        assert_eq!(bare.rating_count, 0);
    }

    #[test]
    fn test_upcoming_confirmed_filter() {
        let confirmed = appointment(
            "2025-03-10T09:00:00Z",
            "2025-03-10T09:30:00Z",
            AppointmentStatus::Confirmed,
        );
        let filter = AppointmentFilter::for_doctor("D1")
            .with_status(AppointmentStatus::Confirmed)
            .starting_from(at("2025-03-10T09:00:00Z"));
        assert!(filter.matches(&confirmed));

        let later = filter.clone().starting_from(at("2025-03-10T09:00:01Z"));
        assert!(!later.matches(&confirmed));

        let requested = Appointment {
            status: AppointmentStatus::Requested,
            ..confirmed
        };
        assert!(!filter.matches(&requested));
    }

    #[test]
    fn test_appointment_with_embedded_doctor() {
        let row: AppointmentWithDoctor = serde_json::from_value(serde_json::json!({
            "id": "A1",
            "doctor_id": "D1",
            "patient_id": "P1",
            "starts_at": "2025-03-10T09:00:00.500Z",
            "ends_at": "2025-03-10T09:30:00Z",
            "status": "confirmed",
            "notes": "fever",
            "created_at": "2025-03-01T00:00:00Z",
            "doctors": {
                "id": "D1",
                "specialty": "Cardiología",
                "profiles": { "full_name": "Ana Ruiz" }
            }
        }))
        .unwrap();

        assert_eq!(row.appointment.starts_at, at("2025-03-10T09:00:00.500Z"));
        assert_eq!(row.appointment.notes.as_deref(), Some("fever"));
        assert_eq!(
            row.doctor.as_ref().map(|d| d.display_name()),
            Some("Ana Ruiz")
        );
    }

    #[test]
    fn test_name_sort_key_folds_case_and_accents() {
        let named = |name: &str| Doctor {
            id: "D".to_string(),
            specialty: String::new(),
            years_experience: None,
            rating_avg: 0.0,
            rating_count: 0,
            phone: None,
            profile: Some(Profile {
                full_name: Some(name.to_string()),
                avatar_url: None,
            }),
        };

        assert_eq!(named("Álvaro Núñez").name_sort_key(), "alvaro nunez");
        assert!(named("Álvaro").name_sort_key() < named("Zoe").name_sort_key());
        assert!(named("beatriz").name_sort_key() > named("Álvaro").name_sort_key());
    }
}
