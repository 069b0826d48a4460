//! Maps a fetched status to the rendered view and its enabled actions.
//!
//! Nothing is remembered between renders; every view is rebuilt from the
//! latest fetch.

use std::fmt;

use super::format::format_minutes;
use crate::models::{AttendanceStatus, StatusError, StatusSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    NotClockedIn,
    ClockedIn,
    ClockedOut,
    /// The payload could not be interpreted.
    Error,
}

/// Which action buttons are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affordances {
    pub clock_in: bool,
    pub clock_out: bool,
    pub complete: bool,
}

impl Affordances {
    pub fn for_state(state: ViewState) -> Self {
        match state {
            ViewState::NotClockedIn => Self {
                clock_in: true,
                clock_out: false,
                complete: false,
            },
            ViewState::ClockedIn => Self {
                clock_in: false,
                clock_out: true,
                complete: false,
            },
            ViewState::ClockedOut => Self {
                clock_in: false,
                clock_out: false,
                complete: true,
            },
            ViewState::Error => Self {
                clock_in: false,
                clock_out: false,
                complete: false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub state: ViewState,
    pub label: String,
    pub details: Vec<String>,
    pub motivation: Option<String>,
    pub affordances: Affordances,
    pub weekly: String,
    pub monthly: String,
}

/// Build the view for a decoded (or undecodable) status.
pub fn render(status: &Result<StatusSnapshot, StatusError>) -> StatusView {
    let snapshot = match status {
        Ok(snapshot) => snapshot,
        Err(e) => return render_error(e),
    };

    let (state, label, details, motivation) = match &snapshot.status {
        AttendanceStatus::NotClockedIn { motivation_message } => (
            ViewState::NotClockedIn,
            "Not clocked in",
            vec!["You have not clocked in yet".to_string()],
            motivation_message.clone().filter(|m| !m.is_empty()),
        ),
        AttendanceStatus::ClockedIn { clock_in_time } => (
            ViewState::ClockedIn,
            "Clocked in",
            vec![
                format!("Clock-in time: {}", clock_in_time),
                "Good work today!".to_string(),
            ],
            None,
        ),
        AttendanceStatus::ClockedOut {
            clock_in_time,
            clock_out_time,
            working_time,
        } => (
            ViewState::ClockedOut,
            "Clocked out",
            vec![
                format!("Clock-in: {}", clock_in_time),
                format!("Clock-out: {}", clock_out_time),
                format!("Working time: {}", working_time),
            ],
            None,
        ),
    };

    StatusView {
        state,
        label: label.to_string(),
        details,
        motivation,
        affordances: Affordances::for_state(state),
        weekly: format_minutes(snapshot.weekly_minutes),
        monthly: format_minutes(snapshot.monthly_minutes),
    }
}

fn render_error(error: &StatusError) -> StatusView {
    tracing::error!("Cannot render status: {}", error);
    StatusView {
        state: ViewState::Error,
        label: "Status unavailable".to_string(),
        details: vec![format!("Unexpected status data: {}", error)],
        motivation: None,
        affordances: Affordances::for_state(ViewState::Error),
        weekly: format_minutes(None),
        monthly: format_minutes(None),
    }
}

impl fmt::Display for StatusView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.label)?;
        for detail in &self.details {
            writeln!(f, "  {}", detail)?;
        }
        if let Some(motivation) = &self.motivation {
            writeln!(f, "  {}", motivation)?;
        }
        writeln!(f, "This week:  {}", self.weekly)?;
        write!(f, "This month: {}", self.monthly)
    }
}
