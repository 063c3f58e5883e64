use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::api::Backend;
use crate::domain::ApiError;

pub const TICK_INTERVAL: Duration = Duration::from_millis(1200);
pub const PROGRESS_STEP: u8 = 10;
pub const READY_DELAY: Duration = Duration::from_millis(600);
pub const PROVISION_FAILED: &str = "Failed to provision workspace";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceState {
    Inactive,
    Provisioning { progress: u8 },
    Ready { url: String },
    Error { message: String },
}

/// Repeating timer, driven by the event loop through [`Workspace::tick`].
#[derive(Debug)]
struct Ticker {
    interval: Duration,
    next: Instant,
}

impl Ticker {
    fn start(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next: now + interval,
        }
    }

    // Number of intervals that elapsed since the last call.
    fn fire(&mut self, now: Instant) -> u32 {
        let mut fired = 0;
        while now >= self.next {
            self.next += self.interval;
            fired += 1;
        }
        fired
    }
}

/// Provisioning panel of the student workspace. Progress is simulated: the
/// backend answers right away, the panel counts up before showing the url.
#[derive(Debug)]
pub struct Workspace {
    state: WorkspaceState,
    url: String,
    ticker: Option<Ticker>,
    ready_at: Option<Instant>,
}

impl Default for Workspace {
    fn default() -> Self {
        Self {
            state: WorkspaceState::Inactive,
            url: String::new(),
            ticker: None,
            ready_at: None,
        }
    }
}

impl Workspace {
    pub fn state(&self) -> &WorkspaceState {
        &self.state
    }

    pub fn url(&self) -> Option<&str> {
        match &self.state {
            WorkspaceState::Ready { url } if !url.is_empty() => Some(url),
            _ => None,
        }
    }

    /// True while a timer is armed.
    pub fn has_timers(&self) -> bool {
        self.ticker.is_some() || self.ready_at.is_some()
    }

    pub fn launch(&mut self, backend: &dyn Backend, now: Instant) {
        self.start_provisioning(now);
        match backend.create_workspace() {
            Ok(ws) => {
                info!("Workspace created at {}", ws.url);
                self.url = ws.url;
            }
            Err(e) => {
                warn!("Workspace provisioning failed: {e}");
                self.stop_timers();
                // Only a backend answer carries a message worth showing
                let message = match e {
                    ApiError::Backend { message, .. } if !message.is_empty() => message,
                    _ => PROVISION_FAILED.to_string(),
                };
                self.state = WorkspaceState::Error { message };
            }
        }
    }

    pub fn retry(&mut self, backend: &dyn Backend, now: Instant) {
        if matches!(self.state, WorkspaceState::Error { .. }) {
            self.launch(backend, now);
        }
    }

    pub fn cancel(&mut self) {
        if matches!(self.state, WorkspaceState::Provisioning { .. }) {
            debug!("Provisioning canceled");
            self.stop_timers();
            self.state = WorkspaceState::Inactive;
        }
    }

    /// Advances the timers. Returns true when the state changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;

        if let (WorkspaceState::Provisioning { progress }, Some(ticker)) =
            (&mut self.state, self.ticker.as_mut())
        {
            let fired = ticker.fire(now);
            if fired > 0 {
                let step = u32::from(PROGRESS_STEP) * fired;
                *progress = std::cmp::min(100, u32::from(*progress) + step) as u8;
                changed = true;
                if *progress == 100 {
                    self.ticker = None;
                    self.ready_at = Some(now + READY_DELAY);
                }
            }
        }

        if let Some(due) = self.ready_at
            && now >= due
        {
            self.ready_at = None;
            self.state = WorkspaceState::Ready {
                url: self.url.clone(),
            };
            changed = true;
        }
        changed
    }

    fn start_provisioning(&mut self, now: Instant) {
        self.url.clear();
        self.ready_at = None;
        self.ticker = Some(Ticker::start(TICK_INTERVAL, now));
        self.state = WorkspaceState::Provisioning { progress: 0 };
    }

    fn stop_timers(&mut self) {
        self.ticker = None;
        self.ready_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Profile, WorkspaceInfo};

    struct Stub(Result<WorkspaceInfo, ApiError>);

    impl Backend for Stub {
        fn profile(&self) -> Result<Profile, ApiError> {
            Ok(Profile::default())
        }

        fn create_workspace(&self) -> Result<WorkspaceInfo, ApiError> {
            self.0.clone()
        }

        fn logout(&self, _refresh_token: &str) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn ok() -> Stub {
        Stub(Ok(WorkspaceInfo {
            url: "http://localhost:8080".into(),
        }))
    }

    #[test]
    fn progress_runs_to_ready() {
        let t0 = Instant::now();
        let mut ws = Workspace::default();
        ws.launch(&ok(), t0);
        assert_eq!(ws.state(), &WorkspaceState::Provisioning { progress: 0 });

        assert!(!ws.tick(t0 + Duration::from_millis(1000)));
        for n in 1..=10u32 {
            assert!(ws.tick(t0 + TICK_INTERVAL * n));
            assert_eq!(
                ws.state(),
                &WorkspaceState::Provisioning {
                    progress: (n * 10) as u8
                }
            );
        }

        // Repeating timer is gone, only the one-shot follow-up is left
        let full = t0 + TICK_INTERVAL * 10;
        assert!(ws.has_timers());
        assert!(!ws.tick(full + READY_DELAY / 2));
        assert!(ws.tick(full + READY_DELAY));
        assert_eq!(ws.url(), Some("http://localhost:8080"));
        assert!(!ws.has_timers());
    }

    #[test]
    fn late_tick_catches_up_and_caps_at_hundred() {
        let t0 = Instant::now();
        let mut ws = Workspace::default();
        ws.launch(&ok(), t0);
        let late = t0 + TICK_INTERVAL * 15;
        assert!(ws.tick(late));
        assert_eq!(ws.state(), &WorkspaceState::Provisioning { progress: 100 });
        assert!(ws.tick(late + READY_DELAY));
        assert!(matches!(ws.state(), WorkspaceState::Ready { .. }));
    }

    #[test]
    fn cancel_drops_timers() {
        let t0 = Instant::now();
        let mut ws = Workspace::default();
        ws.launch(&ok(), t0);
        ws.tick(t0 + TICK_INTERVAL * 3);
        ws.cancel();
        assert_eq!(ws.state(), &WorkspaceState::Inactive);
        assert!(!ws.has_timers());
        assert!(!ws.tick(t0 + TICK_INTERVAL * 20));
        assert_eq!(ws.state(), &WorkspaceState::Inactive);
    }

    #[test]
    fn relaunch_resets_progress() {
        let t0 = Instant::now();
        let mut ws = Workspace::default();
        ws.launch(&ok(), t0);
        ws.tick(t0 + TICK_INTERVAL * 4);
        ws.cancel();

        let t1 = t0 + TICK_INTERVAL * 5;
        ws.launch(&ok(), t1);
        assert_eq!(ws.state(), &WorkspaceState::Provisioning { progress: 0 });
        // The fresh ticker counts from the new launch
        assert!(!ws.tick(t1 + TICK_INTERVAL / 2));
        assert!(ws.tick(t1 + TICK_INTERVAL));
        assert_eq!(ws.state(), &WorkspaceState::Provisioning { progress: 10 });
    }

    #[test]
    fn backend_failure_shows_message_and_retry_starts_over() {
        let t0 = Instant::now();
        let mut ws = Workspace::default();
        let failing = Stub(Err(ApiError::Backend {
            status: 503,
            message: "Workspace feature not available".into(),
        }));
        ws.launch(&failing, t0);
        assert_eq!(
            ws.state(),
            &WorkspaceState::Error {
                message: "Workspace feature not available".into()
            }
        );
        assert!(!ws.has_timers());

        ws.retry(&ok(), t0);
        assert_eq!(ws.state(), &WorkspaceState::Provisioning { progress: 0 });
        assert!(ws.has_timers());
    }

    #[test]
    fn empty_url_still_becomes_ready() {
        let t0 = Instant::now();
        let mut ws = Workspace::default();
        ws.launch(&Stub(Ok(WorkspaceInfo { url: String::new() })), t0);
        ws.tick(t0 + TICK_INTERVAL * 10);
        ws.tick(t0 + TICK_INTERVAL * 10 + READY_DELAY);
        assert_eq!(ws.state(), &WorkspaceState::Ready { url: String::new() });
        assert_eq!(ws.url(), None);
    }

    #[test]
    fn transport_failure_uses_fallback() {
        let mut ws = Workspace::default();
        ws.launch(
            &Stub(Err(ApiError::Network("connection refused".into()))),
            Instant::now(),
        );
        assert_eq!(
            ws.state(),
            &WorkspaceState::Error {
                message: PROVISION_FAILED.into()
            }
        );

        ws.retry(&Stub(Err(ApiError::Decode("expected value".into()))), Instant::now());
        assert_eq!(
            ws.state(),
            &WorkspaceState::Error {
                message: PROVISION_FAILED.into()
            }
        );
    }

    #[test]
    fn empty_backend_message_uses_fallback() {
        let mut ws = Workspace::default();
        let failing = Stub(Err(ApiError::Backend {
            status: 500,
            message: String::new(),
        }));
        ws.launch(&failing, Instant::now());
        assert_eq!(
            ws.state(),
            &WorkspaceState::Error {
                message: PROVISION_FAILED.into()
            }
        );
    }
}
