use serde::{Deserialize, Serialize};

/// Container health probe.
///
/// The probe itself runs inside the orchestrator; these are the parameters it is configured with.
/// Bounds follow what the container platform accepts and are enforced by declaration validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Probe command, e.g. `["CMD-SHELL", "redis-cli ping"]`.
    pub command: Vec<String>,
    /// Consecutive failures before the unit is considered unhealthy.
    #[serde(default = "HealthCheck::default_retries")]
    pub retries: u32,
    /// Seconds between probes.
    #[serde(default = "HealthCheck::default_interval")]
    pub interval_secs: u32,
    /// Seconds a single probe may take.
    #[serde(default = "HealthCheck::default_timeout")]
    pub timeout_secs: u32,
    /// Grace period before failures start counting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_period_secs: Option<u32>,
}

impl HealthCheck {
    pub const RETRIES_RANGE: (u32, u32) = (1, 10);
    pub const INTERVAL_RANGE: (u32, u32) = (5, 300);
    pub const TIMEOUT_RANGE: (u32, u32) = (2, 60);
    pub const START_PERIOD_MAX: u32 = 300;

    fn default_retries() -> u32 {
        3
    }

    fn default_interval() -> u32 {
        30
    }

    fn default_timeout() -> u32 {
        5
    }

    /// Probe run through the container shell (`CMD-SHELL <line>`).
    pub fn shell(line: impl Into<String>) -> Self {
        Self {
            command: vec!["CMD-SHELL".to_string(), line.into()],
            retries: Self::default_retries(),
            interval_secs: Self::default_interval(),
            timeout_secs: Self::default_timeout(),
            start_period_secs: None,
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_interval(mut self, secs: u32) -> Self {
        self.interval_secs = secs;
        self
    }

    pub fn with_timeout(mut self, secs: u32) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_start_period(mut self, secs: u32) -> Self {
        self.start_period_secs = Some(secs);
        self
    }

    /// `true` when the command has no non-blank element.
    pub fn is_command_empty(&self) -> bool {
        self.command.iter().all(|c| c.trim().is_empty())
    }
}
