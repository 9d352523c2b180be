use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::types::{FanoutError, FanoutResult};

/// How the runner schedules work items
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyMode {
    /// One item at a time, in submission order
    Serial,
    /// Every item dispatched concurrently, optionally bounded by a limit
    #[default]
    Parallel,
}

impl FromStr for ConcurrencyMode {
    type Err = FanoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serial" => Ok(ConcurrencyMode::Serial),
            "parallel" => Ok(ConcurrencyMode::Parallel),
            other => Err(FanoutError::Config(format!(
                "Unknown concurrency mode '{}' (expected: serial|parallel)",
                other
            ))),
        }
    }
}

impl fmt::Display for ConcurrencyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcurrencyMode::Serial => write!(f, "serial"),
            ConcurrencyMode::Parallel => write!(f, "parallel"),
        }
    }
}

/// Execution policy for a single run.
///
/// Durations are stored in milliseconds so the same struct can be read
/// straight out of a task file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub mode: ConcurrencyMode,
    /// Maximum number of items in flight at once (parallel mode only)
    pub concurrency_limit: Option<usize>,
    /// Upper bound on a single item's execution time
    pub item_timeout_ms: Option<u64>,
    /// Upper bound on the whole run
    pub deadline_ms: Option<u64>,
    /// Stop dispatching and cancel running items after the first failure
    #[serde(default)]
    pub fail_fast: bool,
}

impl RunConfig {
    pub fn serial() -> Self {
        Self {
            mode: ConcurrencyMode::Serial,
            ..Self::default()
        }
    }

    pub fn parallel() -> Self {
        Self {
            mode: ConcurrencyMode::Parallel,
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: ConcurrencyMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = Some(limit);
        self
    }

    pub fn with_item_timeout(mut self, timeout: Duration) -> Self {
        self.item_timeout_ms = Some(whole_millis(timeout));
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline_ms = Some(whole_millis(deadline));
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn item_timeout(&self) -> Option<Duration> {
        self.item_timeout_ms.map(Duration::from_millis)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    /// Check the policy before any item is dispatched
    pub fn validate(&self) -> FanoutResult<()> {
        match self.concurrency_limit {
            Some(0) => {
                return Err(FanoutError::Config(
                    "concurrency limit must be at least 1".to_string(),
                ))
            }
            Some(limit) if limit > Semaphore::MAX_PERMITS => {
                return Err(FanoutError::Config(format!(
                    "concurrency limit must be at most {}",
                    Semaphore::MAX_PERMITS
                )))
            }
            _ => {}
        }
        if self.item_timeout_ms == Some(0) {
            return Err(FanoutError::Config(
                "item timeout must be greater than zero".to_string(),
            ));
        }
        if self.deadline_ms == Some(0) {
            return Err(FanoutError::Config(
                "run deadline must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Overlay the values set in `other` on top of this config
    pub fn merge(mut self, other: RunConfigOverrides) -> Self {
        if let Some(mode) = other.mode {
            self.mode = mode;
        }
        if other.concurrency_limit.is_some() {
            self.concurrency_limit = other.concurrency_limit;
        }
        if other.item_timeout_ms.is_some() {
            self.item_timeout_ms = other.item_timeout_ms;
        }
        if other.deadline_ms.is_some() {
            self.deadline_ms = other.deadline_ms;
        }
        if other.fail_fast {
            self.fail_fast = true;
        }
        self
    }
}

/// Milliseconds in `duration`, rounded up and saturating at `u64::MAX`
fn whole_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
}

/// Partial run policy, typically collected from command-line flags
#[derive(Debug, Clone, Default)]
pub struct RunConfigOverrides {
    pub mode: Option<ConcurrencyMode>,
    pub concurrency_limit: Option<usize>,
    pub item_timeout_ms: Option<u64>,
    pub deadline_ms: Option<u64>,
    pub fail_fast: bool,
}

pub fn parse_run_config(yaml_str: &str) -> FanoutResult<RunConfig> {
    let config: RunConfig = serde_yaml::from_str(yaml_str)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_parallel_without_limits() {
        let config = RunConfig::default();
        assert_eq!(config.mode, ConcurrencyMode::Parallel);
        assert!(config.concurrency_limit.is_none());
        assert!(config.item_timeout().is_none());
        assert!(config.deadline().is_none());
        assert!(!config.fail_fast);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let err = RunConfig::parallel()
            .with_concurrency_limit(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, FanoutError::Config(_)));
    }

    #[test]
    fn test_zero_durations_are_rejected() {
        assert!(RunConfig::serial()
            .with_item_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(RunConfig::serial()
            .with_deadline(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_sub_millisecond_durations_round_up() {
        let config = RunConfig::parallel()
            .with_item_timeout(Duration::from_micros(500))
            .with_deadline(Duration::from_micros(1_900));
        assert!(config.validate().is_ok());
        assert_eq!(config.item_timeout(), Some(Duration::from_millis(1)));
        assert_eq!(config.deadline(), Some(Duration::from_millis(2)));

        let config = RunConfig::serial().with_deadline(Duration::MAX);
        assert_eq!(config.deadline_ms, Some(u64::MAX));
    }

    #[test]
    fn test_limit_above_semaphore_capacity_is_rejected() {
        let err = RunConfig::parallel()
            .with_concurrency_limit(usize::MAX)
            .validate()
            .unwrap_err();
        assert!(matches!(err, FanoutError::Config(_)));
        assert!(RunConfig::parallel()
            .with_concurrency_limit(Semaphore::MAX_PERMITS)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_parse_camel_case_yaml() {
        let config = parse_run_config(
            "mode: serial\nconcurrencyLimit: 3\nitemTimeoutMs: 250\nfailFast: true\n",
        )
        .unwrap();
        assert_eq!(config.mode, ConcurrencyMode::Serial);
        assert_eq!(config.concurrency_limit, Some(3));
        assert_eq!(config.item_timeout(), Some(Duration::from_millis(250)));
        assert!(config.fail_fast);
    }

    #[test]
    fn test_parse_rejects_unknown_fields_and_bad_limits() {
        assert!(matches!(
            parse_run_config("workers: 4\n"),
            Err(FanoutError::Yaml(_))
        ));
        assert!(matches!(
            parse_run_config("concurrencyLimit: 0\n"),
            Err(FanoutError::Config(_))
        ));
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!(
            "Serial".parse::<ConcurrencyMode>().unwrap(),
            ConcurrencyMode::Serial
        );
        assert_eq!(
            " parallel ".parse::<ConcurrencyMode>().unwrap(),
            ConcurrencyMode::Parallel
        );
        assert!("sideways".parse::<ConcurrencyMode>().is_err());
    }

    #[test]
    fn test_merge_overrides_only_set_values() {
        let base = RunConfig::parallel()
            .with_concurrency_limit(8)
            .with_item_timeout(Duration::from_secs(1));
        let merged = base.merge(RunConfigOverrides {
            mode: Some(ConcurrencyMode::Serial),
            fail_fast: true,
            ..RunConfigOverrides::default()
        });
        assert_eq!(merged.mode, ConcurrencyMode::Serial);
        assert_eq!(merged.concurrency_limit, Some(8));
        assert_eq!(merged.item_timeout_ms, Some(1000));
        assert!(merged.fail_fast);
    }
}
