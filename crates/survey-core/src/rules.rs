//! Simulation rules and thresholds.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Simulated seconds covered by one step. Motion is budgeted in whole
/// seconds regardless of the wall-clock tick length.
pub const STEP_SECS: f64 = 1.0;

/// Configuration for the simulated flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRules {
    /// Wall-clock length of one simulation step in milliseconds
    pub tick_ms: u64,
    /// Battery percentage drained per step
    pub battery_drain_per_tick: f64,
    /// Battery percentage below which the engine aborts the mission
    pub low_battery_threshold: f64,
}

impl Default for SimulationRules {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            battery_drain_per_tick: 0.1,
            low_battery_threshold: 20.0,
        }
    }
}

impl SimulationRules {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    /// Battery after one more step, clamped to `[0, 100]`.
    pub fn drain(&self, battery: f64) -> f64 {
        (battery - self.battery_drain_per_tick.max(0.0)).clamp(0.0, 100.0)
    }

    pub fn is_low(&self, battery: f64) -> bool {
        battery < self.low_battery_threshold
    }

    /// Whole-second steps needed to fly `distance_m` at `speed_mps`; at least one.
    pub fn segment_steps(&self, distance_m: f64, speed_mps: f64) -> u32 {
        if !distance_m.is_finite() || !speed_mps.is_finite() || speed_mps <= 0.0 {
            return 1;
        }
        let secs = distance_m / (speed_mps * STEP_SECS);
        (secs.ceil() as u32).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_stays_within_bounds() {
        let rules = SimulationRules {
            battery_drain_per_tick: 5.0,
            ..SimulationRules::default()
        };
        assert_eq!(rules.drain(3.0), 0.0);
        assert_eq!(rules.drain(150.0), 100.0);
        assert!((rules.drain(50.0) - 45.0).abs() < 1e-12);
    }

    #[test]
    fn segment_steps_round_up() {
        let rules = SimulationRules::default();
        assert_eq!(rules.segment_steps(55.0, 10.0), 6);
        assert_eq!(rules.segment_steps(50.0, 10.0), 5);
        assert_eq!(rules.segment_steps(0.0, 10.0), 1);
        assert_eq!(rules.segment_steps(10.0, 0.0), 1);
    }

    #[test]
    fn low_battery_is_strictly_below_threshold() {
        let rules = SimulationRules::default();
        assert!(!rules.is_low(20.0));
        assert!(rules.is_low(19.99));
    }
}
