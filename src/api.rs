use serde::{Deserialize, Serialize};
use viral_monitor::report::RunSummary;
use viral_monitor::runner::RunOutcome;
use viral_monitor::status::{ControlCommand, MonitorStatus};

#[derive(Debug, Default, Deserialize)]
pub struct StatusRequest {
    pub command: Option<String>,
    pub enabled: Option<bool>,
}

impl StatusRequest {
    /// `enabled` takes precedence; otherwise `command` must name a control command.
    pub fn into_command(self) -> Result<ControlCommand, String> {
        if let Some(enabled) = self.enabled {
            return Ok(if enabled {
                ControlCommand::Enable
            } else {
                ControlCommand::Disable
            });
        }
        let command = self
            .command
            .unwrap_or_default()
            .trim()
            .to_string();
        if command.is_empty() {
            return Err("command or enabled is required".to_string());
        }
        ControlCommand::parse(&command).ok_or_else(|| format!("unknown command: {}", command))
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: MonitorStatus,
    pub enabled: bool,
}

impl From<MonitorStatus> for StatusResponse {
    fn from(status: MonitorStatus) -> Self {
        Self {
            status,
            enabled: status.is_enabled(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RunRequest {
    pub dry_run: Option<bool>,
    pub force: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub outcome: &'static str,
    pub utc_hour: Option<u8>,
    pub summary: Option<RunSummary>,
}

impl From<RunOutcome> for RunResponse {
    fn from(outcome: RunOutcome) -> Self {
        let label = outcome.label();
        match outcome {
            RunOutcome::OutsideActiveHours { utc_hour } => Self {
                outcome: label,
                utc_hour: Some(utc_hour),
                summary: None,
            },
            RunOutcome::Reported(summary) => Self {
                outcome: label,
                utc_hour: None,
                summary: Some(summary),
            },
            RunOutcome::Disabled | RunOutcome::NoQualifyingPosts => Self {
                outcome: label,
                utc_hour: None,
                summary: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_flag_wins_over_command() {
        let request = StatusRequest {
            command: Some("toggle".to_string()),
            enabled: Some(false),
        };
        assert_eq!(request.into_command(), Ok(ControlCommand::Disable));
    }

    #[test]
    fn rejects_empty_and_unknown_commands() {
        assert!(StatusRequest::default().into_command().is_err());
        let request = StatusRequest {
            command: Some("restart".to_string()),
            enabled: None,
        };
        assert_eq!(request.into_command(), Err("unknown command: restart".to_string()));
    }
}
