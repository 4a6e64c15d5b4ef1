use crate::domain::model::{
    Appointment, AppointmentFilter, AppointmentStatus, AppointmentWithDoctor, Doctor,
    NewAppointment,
};
use crate::domain::ports::DirectoryStore;
use crate::utils::error::{BookingError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

const DOCTOR_COLUMNS: &str =
    "id,specialty,years_experience,rating_avg,rating_count,phone,profiles(full_name,avatar_url)";

/// Directory store backed by a hosted PostgREST API (`/rest/v1/<table>`).
#[derive(Debug, Clone)]
pub struct PostgrestDirectory {
    client: Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl PostgrestDirectory {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, api_key)
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            access_token: None,
        }
    }

    /// Row-level security on the backend sees the signed-in user when a
    /// session token is attached; otherwise requests run as the anon role.
    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let token = self.access_token.as_deref().unwrap_or(&self.api_key);
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(token)
    }

    async fn send(&self, builder: RequestBuilder, operation: &str) -> Result<Response> {
        tracing::debug!("PostgREST {}", operation);
        builder
            .send()
            .await
            .map_err(|e| BookingError::store_unavailable(format!("{} failed: {}", operation, e)))
    }

    async fn rows<T: DeserializeOwned>(&self, response: Response) -> Result<Vec<T>> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<Vec<T>>().await?);
        }
        let body = response.text().await.unwrap_or_default();
        Err(error_for_status(status, body))
    }
}

/// Same rendering as the serde form of `DateTime<Utc>`, so filter values
/// compare equal to the timestamps we insert.
pub(crate) fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Maps a non-success HTTP status from the backend onto the booking taxonomy.
pub(crate) fn error_for_status(status: StatusCode, body: String) -> BookingError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BookingError::Unauthenticated,
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            BookingError::store_unavailable(format!("HTTP {}: {}", status.as_u16(), body))
        }
        s if s.is_server_error() => {
            BookingError::store_unavailable(format!("HTTP {}: {}", s.as_u16(), body))
        }
        s => BookingError::StoreRejected {
            status: s.as_u16(),
            message: body,
        },
    }
}

fn appointment_query(filter: &AppointmentFilter, select: String) -> Vec<(&'static str, String)> {
    let mut query = vec![("select", select)];
    if let Some(id) = &filter.id {
        query.push(("id", format!("eq.{}", id)));
    }
    if let Some(doctor_id) = &filter.doctor_id {
        query.push(("doctor_id", format!("eq.{}", doctor_id)));
    }
    if let Some(patient_id) = &filter.patient_id {
        query.push(("patient_id", format!("eq.{}", patient_id)));
    }
    if let Some(start) = filter.starts_at {
        query.push(("starts_at", format!("eq.{}", timestamp(start))));
    }
    if let Some(before) = filter.starts_before {
        query.push(("starts_at", format!("lt.{}", timestamp(before))));
    }
    if let Some(after) = filter.ends_after {
        query.push(("ends_at", format!("gt.{}", timestamp(after))));
    }
    if let Some(from) = filter.starts_from {
        query.push(("starts_at", format!("gte.{}", timestamp(from))));
    }
    if let Some(status) = filter.status {
        query.push(("status", format!("eq.{}", status)));
    }
    if let Some(status) = filter.status_not {
        query.push(("status", format!("neq.{}", status)));
    }
    query.push(("order", "starts_at.asc".to_string()));
    if let Some(limit) = filter.limit {
        query.push(("limit", limit.to_string()));
    }
    query
}

#[async_trait]
impl DirectoryStore for PostgrestDirectory {
    async fn find_doctor(&self, id: &str) -> Result<Option<Doctor>> {
        let builder = self
            .request(Method::GET, "doctors")
            .query(&[("select", DOCTOR_COLUMNS.to_string()), ("id", format!("eq.{}", id))]);
        let response = self.send(builder, "find_doctor").await?;
        let doctors: Vec<Doctor> = self.rows(response).await?;
        Ok(doctors.into_iter().next())
    }

    async fn list_doctors(&self, specialty: Option<&str>) -> Result<Vec<Doctor>> {
        let mut query = vec![("select", DOCTOR_COLUMNS.to_string())];
        if let Some(specialty) = specialty {
            query.push(("specialty", format!("eq.{}", specialty)));
        }
        let builder = self.request(Method::GET, "doctors").query(&query);
        let response = self.send(builder, "list_doctors").await?;
        self.rows(response).await
    }

    async fn find_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        let builder = self
            .request(Method::GET, "appointments")
            .query(&appointment_query(filter, "*".to_string()));
        let response = self.send(builder, "find_appointments").await?;
        self.rows(response).await
    }

    async fn find_appointments_with_doctor(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<AppointmentWithDoctor>> {
        let select = format!("*,doctors({})", DOCTOR_COLUMNS);
        let builder = self
            .request(Method::GET, "appointments")
            .query(&appointment_query(filter, select));
        let response = self.send(builder, "find_appointments_with_doctor").await?;
        self.rows(response).await
    }

    async fn insert_appointment(&self, record: NewAppointment) -> Result<Appointment> {
        let builder = self
            .request(Method::POST, "appointments")
            .header("Prefer", "return=representation")
            .json(&record);
        let response = self.send(builder, "insert_appointment").await?;

        // A unique/exclusion constraint on live slots surfaces as 409.
        if response.status() == StatusCode::CONFLICT {
            tracing::warn!(
                "Backend refused duplicate slot for doctor {} at {}",
                record.doctor_id,
                record.starts_at
            );
            return Err(BookingError::SlotConflict {
                doctor_id: record.doctor_id,
                starts_at: record.starts_at,
            });
        }

        let created: Vec<Appointment> = self.rows(response).await?;
        created
            .into_iter()
            .next()
            .ok_or_else(|| BookingError::StoreRejected {
                status: StatusCode::CREATED.as_u16(),
                message: "insert returned no representation".to_string(),
            })
    }

    async fn update_appointment_status(
        &self,
        id: &str,
        status: AppointmentStatus,
    ) -> Result<Option<Appointment>> {
        let builder = self
            .request(Method::PATCH, "appointments")
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "status": status }));
        let response = self.send(builder, "update_appointment_status").await?;
        let updated: Vec<Appointment> = self.rows(response).await?;
        Ok(updated.into_iter().next())
    }
}
