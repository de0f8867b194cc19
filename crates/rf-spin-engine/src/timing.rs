//! Timing profiles for the staged reveal

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing profile for stage events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingProfile {
    /// Normal gameplay timing
    Normal,
    /// Fast/Turbo mode
    Turbo,
    /// No delays at all (tests, simulations, headless hosts)
    Instant,
}

impl Default for TimingProfile {
    fn default() -> Self {
        Self::Normal
    }
}

/// Detailed timing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Profile type
    pub profile: TimingProfile,

    /// Time before the first reel stops (ms)
    pub reel_spin_duration_ms: f64,

    /// Delay between reel stops (ms)
    pub reel_stop_interval_ms: f64,

    /// Delay between the last reel stop and evaluation (ms)
    pub evaluate_delay_ms: f64,

    /// Delay before win presentation (ms)
    pub win_reveal_delay_ms: f64,

    /// Free-spin unlock presentation (ms)
    pub feature_enter_duration_ms: f64,

    /// Delay before the spin is marked complete (ms)
    pub spin_end_delay_ms: f64,

    /// Wait after the last free spin before leaving free-spin mode (ms)
    pub free_spin_exit_grace_ms: f64,

    /// Minimum time between stage events (ms)
    pub min_event_interval_ms: f64,
}

impl TimingConfig {
    /// Normal gameplay timing
    pub fn normal() -> Self {
        Self {
            profile: TimingProfile::Normal,
            reel_spin_duration_ms: 800.0,
            reel_stop_interval_ms: 300.0,
            evaluate_delay_ms: 50.0,
            win_reveal_delay_ms: 200.0,
            feature_enter_duration_ms: 2000.0,
            spin_end_delay_ms: 100.0,
            free_spin_exit_grace_ms: 1200.0,
            min_event_interval_ms: 50.0,
        }
    }

    /// Turbo mode
    pub fn turbo() -> Self {
        Self {
            profile: TimingProfile::Turbo,
            reel_spin_duration_ms: 400.0,
            reel_stop_interval_ms: 100.0,
            evaluate_delay_ms: 25.0,
            win_reveal_delay_ms: 100.0,
            feature_enter_duration_ms: 1000.0,
            spin_end_delay_ms: 50.0,
            free_spin_exit_grace_ms: 600.0,
            min_event_interval_ms: 25.0,
        }
    }

    /// Instant mode, every event at t=0
    pub fn instant() -> Self {
        Self {
            profile: TimingProfile::Instant,
            reel_spin_duration_ms: 0.0,
            reel_stop_interval_ms: 0.0,
            evaluate_delay_ms: 0.0,
            win_reveal_delay_ms: 0.0,
            feature_enter_duration_ms: 0.0,
            spin_end_delay_ms: 0.0,
            free_spin_exit_grace_ms: 0.0,
            min_event_interval_ms: 0.0,
        }
    }

    /// Get config for profile
    pub fn from_profile(profile: TimingProfile) -> Self {
        match profile {
            TimingProfile::Normal => Self::normal(),
            TimingProfile::Turbo => Self::turbo(),
            TimingProfile::Instant => Self::instant(),
        }
    }

    /// Grace period as a sleepable duration
    pub fn free_spin_exit_grace(&self) -> Duration {
        duration_from_ms(self.free_spin_exit_grace_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::normal()
    }
}

/// Convert a non-negative millisecond offset to a [`Duration`]
pub fn duration_from_ms(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::from_micros((ms * 1000.0).round() as u64)
    } else {
        Duration::ZERO
    }
}

/// Timestamp generator for sequential events
#[derive(Debug, Clone)]
pub struct TimestampGenerator {
    current_ms: f64,
    config: TimingConfig,
}

impl TimestampGenerator {
    /// Create new generator
    pub fn new(config: TimingConfig) -> Self {
        Self {
            current_ms: 0.0,
            config,
        }
    }

    /// Get current timestamp
    pub fn current(&self) -> f64 {
        self.current_ms
    }

    /// Advance by duration and return new timestamp
    pub fn advance(&mut self, duration_ms: f64) -> f64 {
        self.current_ms += duration_ms.max(self.config.min_event_interval_ms);
        self.current_ms
    }

    /// Advance for reel stop
    pub fn reel_stop(&mut self, reel_index: u8) -> f64 {
        if reel_index == 0 {
            self.advance(self.config.reel_spin_duration_ms)
        } else {
            self.advance(self.config.reel_stop_interval_ms)
        }
    }

    /// Advance for evaluation
    pub fn evaluate(&mut self) -> f64 {
        self.advance(self.config.evaluate_delay_ms)
    }

    /// Advance for win reveal
    pub fn win_reveal(&mut self) -> f64 {
        self.advance(self.config.win_reveal_delay_ms)
    }

    /// Advance for free-spin unlock
    pub fn feature_enter(&mut self) -> f64 {
        self.advance(self.config.feature_enter_duration_ms)
    }

    /// Advance for spin end
    pub fn spin_end(&mut self) -> f64 {
        self.advance(self.config.spin_end_delay_ms)
    }

    /// Get timing config reference
    pub fn config(&self) -> &TimingConfig {
        &self.config
    }
}
