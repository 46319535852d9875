pub mod aggregate;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod filter;
pub mod http;
pub mod mailer;
pub mod models;
pub mod roster;
pub mod schedule;
pub mod schema;
pub mod service;
pub mod store;
pub mod view;

pub use error::{Error, Result};

use crate::config::{BackendKind, Settings};
use crate::http::HttpService;
use crate::service::AttendanceService;
use crate::store::SqliteStore;

/// Connects to the backend selected in `settings`.
pub fn create_backend(settings: &Settings) -> Result<Box<dyn AttendanceService>> {
    match settings.backend.kind {
        BackendKind::Http => {
            tracing::debug!(base_url = %settings.http.base_url, "using the attendance service");
            Ok(Box::new(HttpService::new(&settings.http)?))
        }
        BackendKind::Sqlite => {
            tracing::debug!(database = %settings.database.url, "using the local database");
            Ok(Box::new(SqliteStore::open(&settings.database.url)?))
        }
    }
}
