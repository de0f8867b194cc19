//! Session statistics

use serde::{Deserialize, Serialize};

use crate::progression::LockedBet;
use crate::resolver::SpinResult;

/// Per-session counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_spins: u64,
    /// Real money wagered; free spins stake nothing
    pub total_staked: u64,
    pub total_paid: u64,
    pub wins: u64,
    pub losses: u64,
    pub pity_wins: u64,
    pub near_misses: u64,
    pub jackpots: u64,
    pub event_multipliers: u64,
    pub free_spins_played: u64,
    pub free_spin_unlocks: u64,
    /// Settlements that fell back to local arithmetic
    pub fallbacks: u64,
    pub max_win_ratio: f64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed spin
    pub fn record(&mut self, locked_bet: LockedBet, result: &SpinResult) {
        self.total_spins += 1;
        if locked_bet.is_free_spin() {
            self.free_spins_played += 1;
        } else {
            self.total_staked = self.total_staked.saturating_add(locked_bet.amount());
        }

        if !result.win {
            self.losses += 1;
            return;
        }

        self.total_paid = self.total_paid.saturating_add(result.amount);
        if result.is_pity_win {
            self.pity_wins += 1;
        } else {
            self.wins += 1;
        }
        if result.near_miss {
            self.near_misses += 1;
        }
        if result.is_jackpot {
            self.jackpots += 1;
        }
        if result.event_factor.is_some() {
            self.event_multipliers += 1;
        }
        if locked_bet.amount() > 0 {
            let ratio = result.amount as f64 / locked_bet.amount() as f64;
            self.max_win_ratio = self.max_win_ratio.max(ratio);
        }
    }

    pub fn record_unlock(&mut self) {
        self.free_spin_unlocks += 1;
    }

    pub fn record_fallbacks(&mut self, count: usize) {
        self.fallbacks += count as u64;
    }

    /// Calculate RTP (percent of real money staked paid back)
    pub fn rtp(&self) -> f64 {
        if self.total_staked > 0 {
            (self.total_paid as f64 / self.total_staked as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Calculate hit rate (genuine and pity wins)
    pub fn hit_rate(&self) -> f64 {
        if self.total_spins > 0 {
            ((self.wins + self.pity_wins) as f64 / self.total_spins as f64) * 100.0
        } else {
            0.0
        }
    }
}
