use std::{net::SocketAddr, num::NonZeroUsize, path::PathBuf, str::FromStr};

use crate::directions::{DEFAULT_BASE_URL, DEFAULT_PROFILE};
use crate::graph_strategy::DEFAULT_TOLERANCE;
use crate::models::StrategyKind;
use crate::session::DEFAULT_SESSION_CAPACITY;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;
pub const DEFAULT_SHARE_LINK_BASE: &str = "https://www.google.com/maps/dir";
pub const DEFAULT_MAX_SHARE_WAYPOINTS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} has invalid value {value:?}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Tuning shared by every synthesis request.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerSettings {
    pub max_attempts: usize,
    pub candidate_tolerance: f64,
    pub share_link_base: String,
    pub max_share_waypoints: usize,
    pub default_strategy: StrategyKind,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            candidate_tolerance: DEFAULT_TOLERANCE,
            share_link_base: DEFAULT_SHARE_LINK_BASE.to_string(),
            max_share_waypoints: DEFAULT_MAX_SHARE_WAYPOINTS,
            default_strategy: StrategyKind::Remote,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectionsConfig {
    pub api_key: String,
    pub base_url: String,
    pub profile: String,
}

/// Server configuration, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub bind_addr: SocketAddr,
    pub graph_path: Option<PathBuf>,
    /// `None` disables the remote strategy.
    pub directions: Option<DirectionsConfig>,
    pub session_capacity: NonZeroUsize,
    pub planner: PlannerSettings,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] over an arbitrary key lookup. Blank
    /// values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let bind_addr: SocketAddr = parse_or(&get, "BIND_ADDR", DEFAULT_BIND_ADDR.parse().ok())?;
        let graph_path = get("GRAPH_JSON").map(PathBuf::from);
        let directions = get("ORS_API_KEY").map(|api_key| DirectionsConfig {
            api_key,
            base_url: get("ORS_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            profile: get("ORS_PROFILE").unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
        });

        let max_attempts: usize = parse_or(&get, "MAX_ATTEMPTS", Some(DEFAULT_MAX_ATTEMPTS))?;
        if max_attempts == 0 {
            return Err(invalid("MAX_ATTEMPTS", "0", "must be at least 1"));
        }

        let candidate_tolerance: f64 =
            parse_or(&get, "CANDIDATE_TOLERANCE", Some(DEFAULT_TOLERANCE))?;
        if !(0.0..1.0).contains(&candidate_tolerance) {
            return Err(invalid(
                "CANDIDATE_TOLERANCE",
                &candidate_tolerance.to_string(),
                "must lie in [0, 1)",
            ));
        }

        let max_share_waypoints: usize =
            parse_or(&get, "MAX_SHARE_WAYPOINTS", Some(DEFAULT_MAX_SHARE_WAYPOINTS))?;
        if max_share_waypoints < 2 {
            return Err(invalid(
                "MAX_SHARE_WAYPOINTS",
                &max_share_waypoints.to_string(),
                "must keep at least the start and turnaround",
            ));
        }

        let session_capacity: NonZeroUsize = parse_or(
            &get,
            "SESSION_CAPACITY",
            NonZeroUsize::new(DEFAULT_SESSION_CAPACITY),
        )?;

        let default_strategy = match get("DEFAULT_STRATEGY") {
            None => StrategyKind::Remote,
            Some(value) => parse_strategy(&value)
                .ok_or_else(|| invalid("DEFAULT_STRATEGY", &value, "expected remote or local"))?,
        };

        Ok(Self {
            bind_addr,
            graph_path,
            directions,
            session_capacity,
            planner: PlannerSettings {
                max_attempts,
                candidate_tolerance,
                share_link_base: get("SHARE_LINK_BASE")
                    .unwrap_or_else(|| DEFAULT_SHARE_LINK_BASE.to_string()),
                max_share_waypoints,
                default_strategy,
            },
        })
    }
}

pub fn parse_strategy(value: &str) -> Option<StrategyKind> {
    match value.trim().to_ascii_lowercase().as_str() {
        "remote" => Some(StrategyKind::Remote),
        "local" => Some(StrategyKind::Local),
        _ => None,
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: Option<T>,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|err: T::Err| invalid(key, &raw, &err.to_string())),
        None => default.ok_or_else(|| invalid(key, "", "no default available")),
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
