//! UI intents and the handlers they dispatch to.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info};

use super::controller::{render, StatusView};
use crate::client::{ActionSuccess, ApiClient, IdentityInput, LoadingIndicator};
use crate::models::{Action, StatusSnapshot};

/// How long a notification stays visible.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

/// A transient, auto-dismissing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub text: String,
    pub ttl: Duration,
}

impl Notification {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Info,
            text: text.into(),
            ttl: NOTIFICATION_TTL,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            text: text.into(),
            ttl: NOTIFICATION_TTL,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            text: text.into(),
            ttl: NOTIFICATION_TTL,
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

pub trait StatusDisplay: Send + Sync {
    fn show(&self, view: &StatusView);
}

/// Everything the controller writes to or reads from, built once at startup.
#[derive(Clone)]
pub struct ViewBindings {
    pub identity: Arc<dyn IdentityInput>,
    pub loading: Arc<dyn LoadingIndicator>,
    pub notifier: Arc<dyn Notifier>,
    pub display: Arc<dyn StatusDisplay>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Startup,
    IdentityChanged,
    ClockIn,
    ClockOut,
    Complete,
}

/// Handler selected for an intent.
#[derive(Clone, Copy)]
pub enum Command {
    /// Restore the stored identity, then refresh if one is set.
    Restore,
    /// Re-fetch and render the status.
    Refresh,
    /// Send an action; on success announce it and refresh once.
    Perform {
        action: Action,
        announce: fn(&ActionSuccess) -> String,
    },
}

impl Intent {
    pub fn command(self) -> Command {
        match self {
            Intent::Startup => Command::Restore,
            Intent::IdentityChanged => Command::Refresh,
            Intent::ClockIn => Command::Perform {
                action: Action::ClockIn,
                announce: announce_message,
            },
            Intent::ClockOut => Command::Perform {
                action: Action::ClockOut,
                announce: announce_message,
            },
            Intent::Complete => Command::Perform {
                action: Action::Complete,
                announce: announce_judgment,
            },
        }
    }
}

fn announce_message(success: &ActionSuccess) -> String {
    success.message.clone()
}

fn announce_judgment(success: &ActionSuccess) -> String {
    let judgment = match success.data.as_ref().map(|data| &data["judgment"]) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    };
    format!("{} (judgment: {})", success.message, judgment)
}

pub struct Dispatcher {
    client: ApiClient,
    bindings: ViewBindings,
}

impl Dispatcher {
    pub fn new(client: ApiClient, bindings: ViewBindings) -> Self {
        Self { client, bindings }
    }

    pub async fn dispatch(&self, intent: Intent) {
        debug!(?intent, "Dispatching intent");
        match intent.command() {
            Command::Restore => self.restore().await,
            Command::Refresh => self.refresh().await,
            Command::Perform { action, announce } => self.perform(action, announce).await,
        }
    }

    async fn restore(&self) {
        if let Some(name) = self.client.stored_identity().await {
            if self.bindings.identity.value().trim().is_empty() {
                self.bindings.identity.set_value(&name);
            }
        }

        if !self.bindings.identity.value().trim().is_empty() {
            self.refresh().await;
        }
    }

    async fn perform(&self, action: Action, announce: fn(&ActionSuccess) -> String) {
        match self.client.call(action, Map::new()).await {
            Ok(success) => {
                info!(%action, "Action succeeded");
                self.bindings
                    .notifier
                    .notify(Notification::success(announce(&success)));
                self.refresh().await;
            }
            Err(e) => self.bindings.notifier.notify(Notification::error(e.message())),
        }
    }

    async fn refresh(&self) {
        match self.client.call(Action::GetStatus, Map::new()).await {
            Ok(success) => {
                let view = render(&StatusSnapshot::from_data(success.data.as_ref()));
                debug!(state = ?view.state, "Rendering status");
                self.bindings.display.show(&view);
            }
            Err(e) => self.bindings.notifier.notify(Notification::error(e.message())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::client::MSG_NAME_REQUIRED;
    use crate::db::{init_database, Repository};
    use crate::shell::stub::StubNetwork;
    use crate::view::ViewState;

    const ENDPOINT: &str = "https://script.google.com/macros/s/abc/exec";

    #[derive(Default)]
    struct Recorder {
        name: Mutex<String>,
        notifications: Mutex<Vec<Notification>>,
        views: Mutex<Vec<StatusView>>,
        loading: Mutex<Vec<bool>>,
    }

    impl IdentityInput for Recorder {
        fn value(&self) -> String {
            self.name.lock().unwrap().clone()
        }

        fn set_value(&self, value: &str) {
            *self.name.lock().unwrap() = value.to_string();
        }
    }

    impl LoadingIndicator for Recorder {
        fn set_loading(&self, loading: bool) {
            self.loading.lock().unwrap().push(loading);
        }
    }

    impl Notifier for Recorder {
        fn notify(&self, notification: Notification) {
            self.notifications.lock().unwrap().push(notification);
        }
    }

    impl StatusDisplay for Recorder {
        fn show(&self, view: &StatusView) {
            self.views.lock().unwrap().push(view.clone());
        }
    }

    impl Recorder {
        fn last_view(&self) -> Option<StatusView> {
            self.views.lock().unwrap().last().cloned()
        }

        fn notifications(&self) -> Vec<Notification> {
            self.notifications.lock().unwrap().clone()
        }
    }

    struct Fixture {
        dispatcher: Dispatcher,
        recorder: Arc<Recorder>,
        network: Arc<StubNetwork>,
        repo: Arc<Repository>,
        _dir: TempDir,
    }

    async fn fixture(name: &str) -> Fixture {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("test.sqlite")).await.unwrap();
        let repo = Arc::new(Repository::new(pool));
        let network = Arc::new(StubNetwork::new());
        let recorder = Arc::new(Recorder::default());
        recorder.set_value(name);

        let bindings = ViewBindings {
            identity: recorder.clone(),
            loading: recorder.clone(),
            notifier: recorder.clone(),
            display: recorder.clone(),
        };
        let client = ApiClient::new(
            Some(ENDPOINT.to_string()),
            "user01",
            network.clone(),
            repo.clone(),
            bindings.identity.clone(),
            bindings.loading.clone(),
        );

        Fixture {
            dispatcher: Dispatcher::new(client, bindings),
            recorder,
            network,
            repo,
            _dir: dir,
        }
    }

    fn actions_sent(network: &StubNetwork) -> Vec<String> {
        network
            .json_bodies(ENDPOINT)
            .iter()
            .filter_map(|body| body["action"].as_str().map(str::to_string))
            .collect()
    }

    #[tokio::test]
    async fn test_clock_in_scenario() {
        let f = fixture("Taro").await;
        f.network.route_action(
            ENDPOINT,
            "clockin",
            json!({
                "ok": true,
                "message": "Clocked in",
                "data": { "status": "clocked_in", "clockInTime": "09:00" }
            }),
        );
        f.network.route_action(
            ENDPOINT,
            "getstatus",
            json!({
                "ok": true,
                "data": { "status": "clocked_in", "clockInTime": "09:00", "weeklyMinutes": 125 }
            }),
        );

        f.dispatcher.dispatch(Intent::ClockIn).await;

        assert_eq!(actions_sent(&f.network), vec!["clockin", "getstatus"]);
        let view = f.recorder.last_view().unwrap();
        assert_eq!(view.state, ViewState::ClockedIn);
        assert!(!view.affordances.clock_in);
        assert!(view.affordances.clock_out);
        assert_eq!(view.weekly, "2 hours 5 minutes");
        assert_eq!(
            f.recorder.notifications(),
            vec![Notification::success("Clocked in")]
        );
    }

    #[tokio::test]
    async fn test_each_success_triggers_exactly_one_refresh() {
        let f = fixture("Taro").await;
        for action in ["clockin", "clockout", "complete"] {
            f.network
                .route_action(ENDPOINT, action, json!({ "ok": true, "message": "done" }));
        }
        f.network.route_action(
            ENDPOINT,
            "getstatus",
            json!({ "ok": true, "data": { "status": "not_clocked_in" } }),
        );

        for intent in [Intent::ClockIn, Intent::ClockOut, Intent::Complete] {
            f.dispatcher.dispatch(intent).await;
        }

        let sent = actions_sent(&f.network);
        assert_eq!(
            sent,
            vec!["clockin", "getstatus", "clockout", "getstatus", "complete", "getstatus"]
        );
        assert_eq!(f.recorder.views.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_action_does_not_refresh() {
        let f = fixture("Taro").await;
        f.network.route_action(
            ENDPOINT,
            "clockout",
            json!({ "ok": false, "message": "Not clocked in yet" }),
        );

        f.dispatcher.dispatch(Intent::ClockOut).await;

        assert_eq!(actions_sent(&f.network), vec!["clockout"]);
        assert!(f.recorder.last_view().is_none());
        assert_eq!(
            f.recorder.notifications(),
            vec![Notification::error("Not clocked in yet")]
        );
    }

    #[tokio::test]
    async fn test_empty_identity_surfaces_validation_without_requests() {
        let f = fixture("").await;

        f.dispatcher.dispatch(Intent::ClockIn).await;

        assert!(f.network.requests().is_empty());
        assert_eq!(
            f.recorder.notifications(),
            vec![Notification::error(MSG_NAME_REQUIRED)]
        );
        assert!(f.recorder.loading.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_complete_announces_judgment() {
        let f = fixture("Taro").await;
        f.network.route_action(
            ENDPOINT,
            "complete",
            json!({ "ok": true, "message": "Task completed", "data": { "judgment": "A" } }),
        );
        f.network.route_action(
            ENDPOINT,
            "getstatus",
            json!({
                "ok": true,
                "data": {
                    "status": "clocked_out",
                    "clockInTime": "09:00",
                    "clockOutTime": "18:00",
                    "workingTime": "8h 0m"
                }
            }),
        );

        f.dispatcher.dispatch(Intent::Complete).await;

        assert_eq!(
            f.recorder.notifications()[0].text,
            "Task completed (judgment: A)"
        );
        assert_eq!(f.recorder.last_view().unwrap().state, ViewState::ClockedOut);
    }

    #[tokio::test]
    async fn test_complete_announces_numeric_judgment() {
        let f = fixture("Taro").await;
        f.network.route_action(
            ENDPOINT,
            "complete",
            json!({ "ok": true, "message": "Task completed", "data": { "judgment": 80 } }),
        );
        f.network.route_action(
            ENDPOINT,
            "getstatus",
            json!({
                "ok": true,
                "data": {
                    "status": "clocked_out",
                    "clockInTime": "09:00",
                    "clockOutTime": "18:00",
                    "workingTime": "8h 0m",
                    "judgment": 80,
                    "weeklyMinutes": 480.0
                }
            }),
        );

        f.dispatcher.dispatch(Intent::Complete).await;

        assert_eq!(
            f.recorder.notifications()[0].text,
            "Task completed (judgment: 80)"
        );
        let view = f.recorder.last_view().unwrap();
        assert_eq!(view.state, ViewState::ClockedOut);
        assert_eq!(view.weekly, "8 hours 0 minutes");
    }

    #[tokio::test]
    async fn test_complete_without_judgment_shows_placeholder() {
        let f = fixture("Taro").await;
        f.network.route_action(
            ENDPOINT,
            "complete",
            json!({ "ok": true, "message": "Task completed" }),
        );
        f.network.route_action(
            ENDPOINT,
            "getstatus",
            json!({ "ok": true, "data": { "status": "not_clocked_in" } }),
        );

        f.dispatcher.dispatch(Intent::Complete).await;

        assert_eq!(
            f.recorder.notifications()[0].text,
            "Task completed (judgment: -)"
        );
    }

    #[tokio::test]
    async fn test_unknown_status_renders_error_view() {
        let f = fixture("Taro").await;
        f.network.route_action(
            ENDPOINT,
            "getstatus",
            json!({ "ok": true, "data": { "status": "on_break" } }),
        );

        f.dispatcher.dispatch(Intent::IdentityChanged).await;

        assert_eq!(f.recorder.last_view().unwrap().state, ViewState::Error);
    }

    #[tokio::test]
    async fn test_startup_restores_identity_and_refreshes() {
        let f = fixture("").await;
        f.repo.set_item("userName", "Hanako").await.unwrap();
        f.network.route_action(
            ENDPOINT,
            "getstatus",
            json!({ "ok": true, "data": { "status": "not_clocked_in" } }),
        );

        f.dispatcher.dispatch(Intent::Startup).await;

        assert_eq!(f.recorder.value(), "Hanako");
        assert_eq!(f.network.json_bodies(ENDPOINT)[0]["name"], "Hanako");
        assert_eq!(
            f.recorder.last_view().unwrap().state,
            ViewState::NotClockedIn
        );
    }

    #[tokio::test]
    async fn test_startup_without_identity_stays_idle() {
        let f = fixture("").await;

        f.dispatcher.dispatch(Intent::Startup).await;

        assert!(f.network.requests().is_empty());
        assert!(f.recorder.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_loading_cleared_after_every_call() {
        let f = fixture("Taro").await;
        f.network.set_offline(true);

        f.dispatcher.dispatch(Intent::ClockIn).await;

        assert_eq!(*f.recorder.loading.lock().unwrap(), vec![true, false]);
        assert_eq!(
            f.recorder.notifications()[0].kind,
            NotificationKind::Error
        );
    }
}
