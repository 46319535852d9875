//! [`AttendanceService`] over the attendance service's REST API.

use chrono::NaiveDate;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::error::{Error, Result};
use crate::models::{
    AttendanceRecord, Batch, DailyOverviewRow, Department, Id, Section, SlotSession, Student,
    StudentForm, WeekGridRow,
};
use crate::service::AttendanceService;

/// The JSON body the service sends alongside error statuses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Picks the most useful explanation for a rejected request.
fn rejection_message(reason: Option<&str>, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error.or(b.message))
        .or_else(|| {
            let body = body.trim();
            (!body.is_empty() && body.len() <= 200).then(|| body.to_string())
        })
        .unwrap_or_else(|| reason.unwrap_or("unknown error").to_string())
}

pub struct HttpService {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpService {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        // `Url::join` drops the last path segment unless the base ends with a slash.
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| Error::Url(format!("{base}: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|source| Error::Fetch {
                endpoint: base_url.to_string(),
                source,
            })?;

        Ok(Self {
            client,
            base_url,
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| Error::Url(format!("{path}: {e}")))?;

        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<Response> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().map_err(|source| Error::Fetch {
            endpoint: endpoint.to_string(),
            source,
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        let message = rejection_message(status.canonical_reason(), &body);
        tracing::warn!(endpoint, status = status.as_u16(), %message, "request rejected");

        Err(Error::Rejected {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        let url = self.url(path, params)?;
        tracing::debug!(%url, "GET");

        self.send(path, self.client.get(url))?
            .json()
            .map_err(|source| Error::Fetch {
                endpoint: path.to_string(),
                source,
            })
    }
}

impl AttendanceService for HttpService {
    fn departments(&mut self) -> Result<Vec<Department>> {
        self.get("admin/depts", &[])
    }

    fn batches(&mut self) -> Result<Vec<Batch>> {
        self.get("admin/batches", &[])
    }

    fn sections(&mut self) -> Result<Vec<Section>> {
        self.get("admin/sections", &[])
    }

    fn week_grid(
        &mut self,
        section_id: Id,
        week_start: NaiveDate,
        semester: u8,
    ) -> Result<Vec<WeekGridRow>> {
        self.get(
            "common/week-grid",
            &[
                ("section_id", section_id.to_string()),
                ("start_date", week_start.format("%Y-%m-%d").to_string()),
                ("semester", semester.to_string()),
            ],
        )
    }

    fn session_records(&mut self, session_id: Id) -> Result<Vec<AttendanceRecord>> {
        self.get(&format!("admin/records-by-session/{session_id}"), &[])
    }

    fn sessions_by_timetable(&mut self, timetable_id: Id) -> Result<Vec<SlotSession>> {
        let mut sessions: Vec<SlotSession> =
            self.get(&format!("admin/sessions-by-timetable/{timetable_id}"), &[])?;
        sessions.sort_by(|a, b| b.session_date.cmp(&a.session_date));
        Ok(sessions)
    }

    fn daily_overview(
        &mut self,
        section_id: Id,
        date: NaiveDate,
        semester: u8,
    ) -> Result<Vec<DailyOverviewRow>> {
        self.get(
            "admin/daily-attendance-overview",
            &[
                ("section_id", section_id.to_string()),
                ("date", date.format("%Y-%m-%d").to_string()),
                ("semester", semester.to_string()),
            ],
        )
    }

    fn students_in_section(&mut self, section_id: Id) -> Result<Vec<Student>> {
        self.get(
            "admin/students-by-filter",
            &[("section_id", section_id.to_string())],
        )
    }

    fn add_student(&mut self, form: &StudentForm) -> Result<()> {
        let url = self.url("admin/students", &[])?;
        tracing::debug!(%url, roll = %form.roll, "POST");
        self.send("admin/students", self.client.post(url).json(form))?;
        Ok(())
    }

    fn update_student(&mut self, student_id: Id, form: &StudentForm) -> Result<()> {
        let path = format!("admin/students/{student_id}");
        let url = self.url(&path, &[])?;
        tracing::debug!(%url, "PUT");
        self.send(&path, self.client.put(url).json(form))?;
        Ok(())
    }

    fn delete_student(&mut self, student_id: Id) -> Result<()> {
        let path = format!("admin/students/{student_id}");
        let url = self.url(&path, &[])?;
        tracing::debug!(%url, "DELETE");
        self.send(&path, self.client.delete(url))?;
        Ok(())
    }
}
