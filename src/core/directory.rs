use crate::core::{
    AppointmentFilter, AppointmentStatus, Clock, DirectoryStore, Doctor, DoctorProfile, Result,
    SystemClock,
};
use crate::utils::error::BookingError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const RECOMMENDATION_LIMIT: usize = 10;
/// Confirmed appointments shown on a doctor's profile.
pub const UPCOMING_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum DoctorSort {
    /// Highest rating first.
    #[default]
    Rating,
    /// Alphabetical by full name.
    Name,
    /// Most years of experience first.
    Experience,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoctorQuery {
    pub specialty: Option<String>,
    /// Case-insensitive substring over full name and specialty.
    pub search: Option<String>,
    pub sort: DoctorSort,
    pub limit: Option<usize>,
}

pub struct DoctorDirectory<S: DirectoryStore> {
    store: S,
    clock: Box<dyn Clock>,
}

impl<S: DirectoryStore> DoctorDirectory<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub async fn search(&self, query: &DoctorQuery) -> Result<Vec<Doctor>> {
        let specialty = query
            .specialty
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let mut doctors = self.store.list_doctors(specialty).await?;
        tracing::debug!("Loaded {} doctors (specialty={:?})", doctors.len(), specialty);

        if let Some(term) = query
            .search
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
        {
            doctors.retain(|d| {
                d.full_name()
                    .map_or(false, |n| n.to_lowercase().contains(&term))
                    || d.specialty.to_lowercase().contains(&term)
            });
        }

        sort_doctors(&mut doctors, query.sort);
        if let Some(limit) = query.limit {
            doctors.truncate(limit);
        }
        Ok(doctors)
    }

    /// Best rated doctors of one specialty.
    pub async fn recommend(&self, specialty: &str) -> Result<Vec<Doctor>> {
        if specialty.trim().is_empty() {
            return Err(BookingError::invalid_input("specialty", "specialty is required"));
        }
        self.search(&DoctorQuery {
            specialty: Some(specialty.to_string()),
            sort: DoctorSort::Rating,
            limit: Some(RECOMMENDATION_LIMIT),
            ..Default::default()
        })
        .await
    }

    /// One doctor plus their next confirmed appointments, soonest first.
    pub async fn profile(&self, doctor_id: &str) -> Result<DoctorProfile> {
        let doctor = self
            .store
            .find_doctor(doctor_id)
            .await?
            .ok_or_else(|| BookingError::not_found("doctor", doctor_id))?;

        let filter = AppointmentFilter::for_doctor(&doctor.id)
            .with_status(AppointmentStatus::Confirmed)
            .starting_from(self.clock.now())
            .limit(UPCOMING_LIMIT);
        let upcoming = self.store.find_appointments(&filter).await?;
        tracing::debug!("Doctor {} has {} upcoming appointments", doctor.id, upcoming.len());

        Ok(DoctorProfile { doctor, upcoming })
    }
}

fn sort_doctors(doctors: &mut [Doctor], sort: DoctorSort) {
    match sort {
        DoctorSort::Rating => doctors.sort_by(|a, b| {
            b.rating_avg
                .partial_cmp(&a.rating_avg)
                .unwrap_or(Ordering::Equal)
        }),
        DoctorSort::Name => doctors.sort_by_cached_key(Doctor::name_sort_key),
        DoctorSort::Experience => doctors.sort_by(|a, b| {
            b.years_experience
                .unwrap_or(0)
                .cmp(&a.years_experience.unwrap_or(0))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryDirectory;
    use crate::core::NewAppointment;
    use crate::domain::model::Profile;
    use crate::domain::ports::FixedClock;
    use chrono::{DateTime, Duration, Utc};

    fn doctor(id: &str, name: Option<&str>, specialty: &str, rating: f64, years: Option<u32>) -> Doctor {
        Doctor {
            id: id.to_string(),
            specialty: specialty.to_string(),
            years_experience: years,
            rating_avg: rating,
            rating_count: 3,
            phone: None,
            profile: Some(Profile {
                full_name: name.map(str::to_string),
                avatar_url: None,
            }),
        }
    }

    async fn directory() -> DoctorDirectory<MemoryDirectory> {
        let store = MemoryDirectory::new();
        store
            .add_doctor(doctor("D1", Some("Ana Ruiz"), "Cardiología", 4.2, Some(12)))
            .await;
        store
            .add_doctor(doctor("D2", Some("Bruno Díaz"), "Cardiología", 4.9, Some(3)))
            .await;
        store
            .add_doctor(doctor("D3", Some("Carla Soto"), "Pediatría", 3.8, None))
            .await;
        store
            .add_doctor(doctor("D4", None, "Dermatología", 4.5, Some(20)))
            .await;
        DoctorDirectory::new(store)
    }

    fn ids(doctors: &[Doctor]) -> Vec<&str> {
        doctors.iter().map(|d| d.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_search_sorts_by_rating_by_default() {
        let directory = directory().await;
        let found = directory.search(&DoctorQuery::default()).await.unwrap();
        assert_eq!(ids(&found), vec!["D2", "D4", "D1", "D3"]);
    }

    #[tokio::test]
    async fn test_search_by_name_and_experience() {
        let directory = directory().await;

        let by_name = directory
            .search(&DoctorQuery {
                sort: DoctorSort::Name,
                ..Default::default()
            })
            .await
            .unwrap();
        // Missing names sort first, as empty strings.
        assert_eq!(ids(&by_name), vec!["D4", "D1", "D2", "D3"]);

        let by_experience = directory
            .search(&DoctorQuery {
                sort: DoctorSort::Experience,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ids(&by_experience), vec!["D4", "D1", "D2", "D3"]);
    }

    #[tokio::test]
    async fn test_search_term_matches_name_or_specialty() {
        let directory = directory().await;

        let by_name = directory
            .search(&DoctorQuery {
                search: Some("  carla ".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ids(&by_name), vec!["D3"]);

        let by_specialty = directory
            .search(&DoctorQuery {
                search: Some("CARDIO".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ids(&by_specialty), vec!["D2", "D1"]);
    }

    #[tokio::test]
    async fn test_specialty_filter_and_limit() {
        let directory = directory().await;
        let found = directory
            .search(&DoctorQuery {
                specialty: Some("Cardiología".to_string()),
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ids(&found), vec!["D2"]);
    }

    #[tokio::test]
    async fn test_recommend_requires_specialty() {
        let directory = directory().await;
        assert!(matches!(
            directory.recommend(" ").await,
            Err(BookingError::InvalidInput { .. })
        ));
        let top = directory.recommend("Pediatría").await.unwrap();
        assert_eq!(ids(&top), vec!["D3"]);
    }

    #[tokio::test]
    async fn test_profile_not_found() {
        let directory = directory().await;
        let profile = directory.profile("D1").await.unwrap();
        assert_eq!(profile.doctor.display_name(), "Ana Ruiz");
        assert!(profile.upcoming.is_empty());
        assert!(matches!(
            directory.profile("D9").await,
            Err(BookingError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_profile_lists_next_confirmed_appointments() {
        let store = MemoryDirectory::new();
        store
            .add_doctor(doctor("D1", Some("Ana Ruiz"), "Cardiología", 4.2, Some(12)))
            .await;

        let mut confirmed = Vec::new();
        for hour in 8..16 {
            let starts_at: DateTime<Utc> = format!("2025-03-10T{:02}:00:00Z", hour).parse().unwrap();
            let created = store
                .insert_appointment(NewAppointment {
                    doctor_id: "D1".to_string(),
                    patient_id: format!("P{}", hour),
                    starts_at,
                    ends_at: starts_at + Duration::minutes(30),
                    status: AppointmentStatus::Requested,
                    notes: None,
                })
                .await
                .unwrap();
            // Even hours are confirmed, the rest stay requested.
            if hour % 2 == 0 {
                store
                    .update_appointment_status(&created.id, AppointmentStatus::Confirmed)
                    .await
                    .unwrap();
                confirmed.push(starts_at);
            }
        }

        let directory =
            DoctorDirectory::new(store).with_clock(FixedClock("2025-03-10T09:00:00Z".parse().unwrap()));
        let profile = directory.profile("D1").await.unwrap();

        let starts: Vec<DateTime<Utc>> = profile.upcoming.iter().map(|a| a.starts_at).collect();
        // 08:00 is already past; 10, 12, 14 are confirmed and ahead.
        assert_eq!(starts, confirmed[1..].to_vec());
        assert!(profile
            .upcoming
            .iter()
            .all(|a| a.status == AppointmentStatus::Confirmed));
    }

    #[tokio::test]
    async fn test_profile_upcoming_is_capped() {
        let store = MemoryDirectory::new();
        store
            .add_doctor(doctor("D1", Some("Ana Ruiz"), "Cardiología", 4.2, Some(12)))
            .await;
        for day in 11..19 {
            let starts_at: DateTime<Utc> = format!("2025-03-{}T09:00:00Z", day).parse().unwrap();
            let created = store
                .insert_appointment(NewAppointment {
                    doctor_id: "D1".to_string(),
                    patient_id: "P1".to_string(),
                    starts_at,
                    ends_at: starts_at + Duration::minutes(30),
                    status: AppointmentStatus::Requested,
                    notes: None,
                })
                .await
                .unwrap();
            store
                .update_appointment_status(&created.id, AppointmentStatus::Confirmed)
                .await
                .unwrap();
        }

        let directory =
            DoctorDirectory::new(store).with_clock(FixedClock("2025-03-10T09:00:00Z".parse().unwrap()));
        let profile = directory.profile("D1").await.unwrap();

        assert_eq!(profile.upcoming.len(), UPCOMING_LIMIT);
        assert_eq!(
            profile.upcoming[0].starts_at,
            "2025-03-11T09:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[tokio::test]
    async fn test_name_sort_folds_accents() {
        let store = MemoryDirectory::new();
        store
            .add_doctor(doctor("D1", Some("Zoe Park"), "Pediatría", 4.0, None))
            .await;
        store
            .add_doctor(doctor("D2", Some("Álvaro Núñez"), "Pediatría", 4.0, None))
            .await;
        let found = DoctorDirectory::new(store)
            .search(&DoctorQuery {
                sort: DoctorSort::Name,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ids(&found), vec!["D2", "D1"]);
    }
}
