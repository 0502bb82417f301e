//! Connection status indicator - maps connection state to a colored icon and label.

use crate::stores::{ConnectionState, ConnectionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorColor {
    Green,
    Amber,
    Gray,
    Red,
}

impl IndicatorColor {
    pub fn css_class(&self) -> &'static str {
        match self {
            IndicatorColor::Green => "bg-green-500",
            IndicatorColor::Amber => "bg-amber-500",
            IndicatorColor::Gray => "bg-gray-500",
            IndicatorColor::Red => "bg-red-500",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorIcon {
    Online,
    Spinner,
    Offline,
    Error,
}

/// What the always-visible status badge should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusIndicator {
    pub color: IndicatorColor,
    pub icon: IndicatorIcon,
    pub label: &'static str,
    /// Tooltip text, if there is anything beyond the label to say.
    pub detail: Option<String>,
}

impl StatusIndicator {
    /// `max_attempts` is the retry budget, used in the "attempt n of m" detail.
    pub fn for_state(state: &ConnectionState, max_attempts: u32) -> Self {
        let (color, icon, label) = match state.status {
            ConnectionStatus::Connected => {
                (IndicatorColor::Green, IndicatorIcon::Online, "Connected")
            }
            ConnectionStatus::Connecting => {
                (IndicatorColor::Amber, IndicatorIcon::Spinner, "Connecting…")
            }
            ConnectionStatus::Disconnected => {
                (IndicatorColor::Gray, IndicatorIcon::Offline, "Disconnected")
            }
            ConnectionStatus::Error => {
                (IndicatorColor::Red, IndicatorIcon::Error, "Connection error")
            }
        };

        let detail = match state.status {
            ConnectionStatus::Error => state.error.clone(),
            ConnectionStatus::Connecting if state.reconnect_attempts > 0 => {
                Some(if max_attempts > 0 {
                    format!(
                        "Reconnecting (attempt {} of {})",
                        state.reconnect_attempts, max_attempts
                    )
                } else {
                    format!("Reconnecting (attempt {})", state.reconnect_attempts)
                })
            }
            ConnectionStatus::Connected => state
                .last_event_at
                .map(|at| format!("Last update at {}", at.format("%H:%M:%S UTC"))),
            _ => None,
        };

        Self {
            color,
            icon,
            label,
            detail,
        }
    }
}
