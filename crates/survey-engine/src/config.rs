//! Engine configuration from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::backoff::RetryPolicy;
use survey_core::{CrosshatchMode, PlannerConfig, SimulationRules};

#[derive(Debug, Clone)]
pub struct Config {
    pub rules: SimulationRules,
    pub planner: PlannerConfig,
    pub retry: RetryPolicy,
    /// Upper bound on simultaneously running simulation workers
    pub max_concurrent_workers: usize,
    /// Buffered telemetry messages per subscriber before lagging
    pub telemetry_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rules: SimulationRules::default(),
            planner: PlannerConfig::default(),
            retry: RetryPolicy::default(),
            max_concurrent_workers: 32,
            telemetry_capacity: 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parse = |key: &str| lookup(key).and_then(|s| s.trim().parse::<f64>().ok());

        let rules = SimulationRules {
            tick_ms: parse_or(&lookup, "SURVEY_TICK_MS", defaults.rules.tick_ms),
            battery_drain_per_tick: parse("SURVEY_BATTERY_DRAIN_PER_TICK")
                .unwrap_or(defaults.rules.battery_drain_per_tick),
            low_battery_threshold: parse("SURVEY_LOW_BATTERY_THRESHOLD")
                .unwrap_or(defaults.rules.low_battery_threshold),
        };

        let planner = PlannerConfig {
            perimeter_margin_m: parse("SURVEY_PERIMETER_MARGIN_M")
                .unwrap_or(defaults.planner.perimeter_margin_m),
            crosshatch: parse_or::<CrosshatchMode>(
                &lookup,
                "SURVEY_CROSSHATCH_MODE",
                defaults.planner.crosshatch,
            ),
        };

        let retry = RetryPolicy::new(
            parse_or(&lookup, "SURVEY_RETRY_ATTEMPTS", defaults.retry.max_attempts),
            lookup("SURVEY_RETRY_BASE_MS")
                .and_then(|s| s.trim().parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.base_delay),
            lookup("SURVEY_RETRY_MAX_MS")
                .and_then(|s| s.trim().parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.max_delay),
        );

        Self {
            rules,
            planner,
            retry,
            max_concurrent_workers: parse_or(
                &lookup,
                "SURVEY_MAX_WORKERS",
                defaults.max_concurrent_workers,
            )
            .max(1),
            telemetry_capacity: parse_or(
                &lookup,
                "SURVEY_TELEMETRY_CAPACITY",
                defaults.telemetry_capacity,
            )
            .max(1),
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_from(&[]);
        assert_eq!(config.rules.tick_ms, 1000);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay, Duration::from_secs(2));
        assert_eq!(config.planner.crosshatch, CrosshatchMode::Rotated);
        assert_eq!(config.max_concurrent_workers, 32);
    }

    #[test]
    fn reads_overrides_and_ignores_garbage() {
        let config = config_from(&[
            ("SURVEY_TICK_MS", "250"),
            ("SURVEY_LOW_BATTERY_THRESHOLD", "35.5"),
            ("SURVEY_CROSSHATCH_MODE", "repeated"),
            ("SURVEY_RETRY_BASE_MS", "500"),
            ("SURVEY_MAX_WORKERS", "0"),
            ("SURVEY_BATTERY_DRAIN_PER_TICK", "lots"),
        ]);
        assert_eq!(config.rules.tick_ms, 250);
        assert!((config.rules.low_battery_threshold - 35.5).abs() < 1e-12);
        assert_eq!(config.planner.crosshatch, CrosshatchMode::Repeated);
        assert_eq!(config.retry.base_delay, Duration::from_millis(500));
        assert_eq!(config.max_concurrent_workers, 1);
        assert!((config.rules.battery_drain_per_tick - 0.1).abs() < 1e-12);
    }
}
