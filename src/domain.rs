use std::io::Error;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

/// Filter value meaning "no restriction on this field".
pub const ALL: &str = "All";

pub const DEFAULT_PAGE_SIZE: usize = 5;
pub const DEFAULT_EVENT_POLL_TIME: u64 = 100;

pub const HELP_TEXT: &str = "\
Tables
  /          edit search text (Enter to apply, Esc to cancel)
  b t s      cycle batch / track / status filter (students)
  r p t      cycle review / project / track filter (submissions)
  c          clear all filters
  o          cycle sort order
  <- ->      previous / next page
  Home End   first / last page
  Up Down    move row cursor
  Enter      open details drawer
  Esc        close drawer / popup
  y          copy selected row

Workspace
  Enter      launch workspace / try again
  x          cancel provisioning
  y          copy workspace url

General
  Tab        next tab
  ?          this help
  q          quit";

/// Programmer errors raised by the table controller and the schema builder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("unknown filter field \"{0}\"")]
    InvalidField(String),
    #[error("value \"{value}\" is not allowed for filter \"{field}\"")]
    InvalidFilterValue { field: String, value: String },
    #[error("unknown sort key \"{0}\"")]
    InvalidSortKey(String),
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    #[error("page size must be positive")]
    InvalidPageSize,
}

/// Failures talking to the backend. Always recoverable by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("backend returned status {status}: {message}")]
    Backend { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Message suitable for an inline error panel.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Backend { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    IoError(#[from] Error),
    #[error(transparent)]
    PolarsError(#[from] PolarsError),
    #[error("loading failed: {0}")]
    LoadingFailed(String),
    #[error("file not found")]
    FileNotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("unknown file type")]
    UnknownFileType,
    #[error("missing column \"{0}\"")]
    MissingColumn(String),
    #[error("row {row}: invalid value \"{value}\" in column \"{column}\"")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },
    #[error(transparent)]
    View(#[from] ViewError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Students,
    Submissions,
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct AppConfig {
    pub event_poll_time: u64,
    pub page_size: usize,
    #[setters(strip_option, into)]
    pub api_url: Option<String>,
    #[setters(strip_option, into)]
    pub access_token: Option<String>,
    #[setters(strip_option, into)]
    pub refresh_token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            event_poll_time: DEFAULT_EVENT_POLL_TIME,
            page_size: DEFAULT_PAGE_SIZE,
            api_url: None,
            access_token: None,
            refresh_token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    PrevPage,
    NextPage,
    FirstPage,
    LastPage,
    Search,
    CycleFilter(&'static str),
    ClearFilters,
    CycleSort,
    Enter,
    Exit,
    Copy,
    CancelWorkspace,
    NextTab,
    Help,
    RawKey(KeyEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_setters_chain() {
        let cfg = AppConfig::default()
            .with_page_size(10)
            .with_api_url("http://localhost:8000");
        assert_eq!(cfg.page_size, 10);
        assert_eq!(cfg.api_url.as_deref(), Some("http://localhost:8000"));
        assert_eq!(cfg.event_poll_time, DEFAULT_EVENT_POLL_TIME);
        assert!(cfg.refresh_token.is_none());
    }

    #[test]
    fn backend_error_shows_plain_message() {
        let err = ApiError::Backend {
            status: 503,
            message: "Workspace feature not available".into(),
        };
        assert_eq!(err.user_message(), "Workspace feature not available");
        assert!(ApiError::Network("timeout".into()).user_message().contains("timeout"));
    }
}
