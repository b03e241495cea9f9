//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the lobby host.
//!
//! Config is used in three places:
//! 1. **Supervisor creation**: bus capacity and shutdown grace
//! 2. **GameStarter construction**: `GameStarter::from_config(&config)`
//! 3. **Transport scoping**: `topic_root` prefixes every topic
//!
//! ## Environment overrides
//! [`Config::from_env`] reads:
//! - `SH_TOPIC_PREFIX_OVERRIDE` → topic root (sanitized, default `spacehack`)
//! - `SH_GAME_START_DELAY`, `SH_JOIN_GAME_DELAY`, `SH_LEAVE_GAME_DELAY` → seconds (float)
//!
//! ## Sentinel values
//! - `join_delay = 0s` / `leave_delay = 0s` → no debounce, transitions apply immediately
//! - `grace = 0s` → `wait_all` waits without a deadline

use std::time::Duration;

use crate::error::ConfigError;
use crate::transport::topic;

/// Environment variable overriding the topic root.
pub const TOPIC_PREFIX_ENV: &str = "SH_TOPIC_PREFIX_OVERRIDE";
/// Topic root used when no override is set.
pub const DEFAULT_TOPIC_PREFIX: &str = "spacehack";

const GAME_START_DELAY_ENV: &str = "SH_GAME_START_DELAY";
const JOIN_GAME_DELAY_ENV: &str = "SH_JOIN_GAME_DELAY";
const LEAVE_GAME_DELAY_ENV: &str = "SH_LEAVE_GAME_DELAY";

/// Configuration for the lobby host.
///
/// ## Field semantics
/// - `game_start_delay`: roster must stay stable (≥ 2 players) this long before a start
/// - `join_delay`: a push must hold this long before the player counts as joined
/// - `leave_delay`: a release must hold this long before the player is dropped
/// - `poll_interval`: lobby clock tick
/// - `grace`: maximum wait for services on shutdown (`0s` = unbounded)
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `splash_delay` / `round_delay`: pauses of the game runner between splash texts
/// - `topic_root`: sanitized prefix ending in `/`
#[derive(Clone, Debug)]
pub struct Config {
    /// Start countdown length.
    pub game_start_delay: Duration,
    /// Join debounce.
    pub join_delay: Duration,
    /// Leave debounce.
    pub leave_delay: Duration,
    /// Lobby poll loop cadence; also the `step_time` increment.
    pub poll_interval: Duration,
    /// Shutdown grace used by [`Host::stop`](crate::Host::stop).
    pub grace: Duration,
    /// Capacity of the event bus broadcast channel.
    pub bus_capacity: usize,
    /// Pause after the first splash text of a round.
    pub splash_delay: Duration,
    /// Pause after the last splash text before the round completes.
    pub round_delay: Duration,
    /// Topic root, e.g. `spacehack/`.
    pub topic_root: String,
}

impl Config {
    /// Builds the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Unset keys keep their default; set keys must parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(prefix) = lookup(TOPIC_PREFIX_ENV).filter(|p| !p.is_empty()) {
            cfg.topic_root = topic::root_topic(&prefix);
        }
        if let Some(v) = lookup(GAME_START_DELAY_ENV) {
            cfg.game_start_delay = parse_seconds(GAME_START_DELAY_ENV, &v)?;
        }
        if let Some(v) = lookup(JOIN_GAME_DELAY_ENV) {
            cfg.join_delay = parse_seconds(JOIN_GAME_DELAY_ENV, &v)?;
        }
        if let Some(v) = lookup(LEAVE_GAME_DELAY_ENV) {
            cfg.leave_delay = parse_seconds(LEAVE_GAME_DELAY_ENV, &v)?;
        }
        Ok(cfg)
    }

    /// Returns the shutdown grace as an `Option`.
    ///
    /// - `None` → wait until every service exits
    /// - `Some(d)` → give up after `d`
    #[inline]
    pub fn shutdown_grace(&self) -> Option<Duration> {
        if self.grace == Duration::ZERO {
            None
        } else {
            Some(self.grace)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `game_start_delay = 5s`, `join_delay = 1s`, `leave_delay = 500ms`
    /// - `poll_interval = 50ms`
    /// - `grace = 5s`, `bus_capacity = 1024`
    /// - `splash_delay = 4s`, `round_delay = 10s`
    /// - `topic_root = "spacehack/"`
    fn default() -> Self {
        Self {
            game_start_delay: Duration::from_secs(5),
            join_delay: Duration::from_secs(1),
            leave_delay: Duration::from_millis(500),
            poll_interval: Duration::from_millis(50),
            grace: Duration::from_secs(5),
            bus_capacity: 1024,
            splash_delay: Duration::from_secs(4),
            round_delay: Duration::from_secs(10),
            topic_root: topic::root_topic(DEFAULT_TOPIC_PREFIX),
        }
    }
}

fn parse_seconds(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration {
        key,
        value: raw.to_string(),
    };
    let secs: f64 = raw.trim().parse().map_err(|_| invalid())?;
    Duration::try_from_secs_f64(secs).map_err(|_| invalid())
}
