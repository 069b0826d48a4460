//! Terminal implementation of the view bindings.

use std::sync::Mutex;

use crate::client::{IdentityInput, LoadingIndicator};
use crate::view::{Notification, NotificationKind, Notifier, StatusDisplay, StatusView};

pub struct Terminal {
    name: Mutex<String>,
}

impl Terminal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Mutex::new(name.into()),
        }
    }
}

impl IdentityInput for Terminal {
    fn value(&self) -> String {
        self.name
            .lock()
            .map(|name| name.clone())
            .unwrap_or_default()
    }

    fn set_value(&self, value: &str) {
        if let Ok(mut name) = self.name.lock() {
            *name = value.to_string();
        }
    }
}

impl LoadingIndicator for Terminal {
    fn set_loading(&self, loading: bool) {
        tracing::debug!(loading, "loading indicator");
    }
}

impl Notifier for Terminal {
    fn notify(&self, notification: Notification) {
        tracing::debug!(kind = ?notification.kind, ttl = ?notification.ttl, "notification");
        match notification.kind {
            NotificationKind::Info => println!("{}", notification.text),
            NotificationKind::Success => println!("✔ {}", notification.text),
            NotificationKind::Error => eprintln!("✘ {}", notification.text),
        }
    }
}

impl StatusDisplay for Terminal {
    fn show(&self, view: &StatusView) {
        println!("{}", view);

        let enabled: Vec<&str> = [
            (view.affordances.clock_in, "clock-in"),
            (view.affordances.clock_out, "clock-out"),
            (view.affordances.complete, "complete"),
        ]
        .into_iter()
        .filter(|(on, _)| *on)
        .map(|(_, name)| name)
        .collect();

        if enabled.is_empty() {
            println!("Available: none");
        } else {
            println!("Available: {}", enabled.join(", "));
        }
    }
}
