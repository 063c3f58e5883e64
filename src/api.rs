//! Backend collaborator: profile lookup, workspace provisioning and logout.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::domain::ApiError;

/// Requests block the event loop, so keep this short.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Trainer {
    pub name: Option<String>,
    #[serde(default)]
    pub email: String,
}

impl Trainer {
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.email,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Profile {
    pub name: Option<String>,
    pub username: Option<String>,
    pub assigned_trainer: Option<Trainer>,
}

impl Profile {
    /// Name for the greeting, falling back to the username and then "Student".
    pub fn display_name(&self) -> &str {
        [self.name.as_deref(), self.username.as_deref()]
            .into_iter()
            .flatten()
            .find(|n| !n.is_empty())
            .unwrap_or("Student")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkspaceInfo {
    #[serde(default)]
    pub url: String,
}

pub trait Backend {
    fn profile(&self) -> Result<Profile, ApiError>;

    fn create_workspace(&self) -> Result<WorkspaceInfo, ApiError>;

    /// Invalidates the session's refresh token on the server.
    fn logout(&self, refresh_token: &str) -> Result<(), ApiError>;
}

/// Error text of a failed response body: `message`, then `error`, else empty.
pub fn backend_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return String::new();
    };
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: &str, access_token: Option<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let request = match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request
            .send()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        trace!("Backend answered {status}");
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().unwrap_or_default();
            Err(ApiError::Backend {
                status: status.as_u16(),
                message: backend_message(&body),
            })
        }
    }
}

impl Backend for HttpBackend {
    fn profile(&self) -> Result<Profile, ApiError> {
        debug!("GET /users/profile");
        self.send(self.client.get(self.url("users/profile")))?
            .json()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn create_workspace(&self) -> Result<WorkspaceInfo, ApiError> {
        debug!("POST /users/workspace/create/");
        self.send(self.client.post(self.url("users/workspace/create/")))?
            .json()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn logout(&self, refresh_token: &str) -> Result<(), ApiError> {
        debug!("POST /auth/logout");
        let body = json!({ "refresh": refresh_token });
        self.send(self.client.post(self.url("auth/logout")).json(&body))?;
        Ok(())
    }
}

/// Offline stand-in used when no backend url is configured.
#[derive(Debug, Default)]
pub struct DemoBackend;

impl Backend for DemoBackend {
    fn profile(&self) -> Result<Profile, ApiError> {
        Ok(Profile {
            name: Some("Demo Student".to_string()),
            username: Some("demo".to_string()),
            assigned_trainer: Some(Trainer {
                name: Some("Priya".to_string()),
                email: "priya@example.com".to_string(),
            }),
        })
    }

    fn create_workspace(&self) -> Result<WorkspaceInfo, ApiError> {
        Ok(WorkspaceInfo {
            url: "http://localhost:8080".to_string(),
        })
    }

    fn logout(&self, _refresh_token: &str) -> Result<(), ApiError> {
        Ok(())
    }
}
