//! Per-session progression: bet lock, win streak and free spins
//!
//! [`ProgressionState`] is only ever changed through [`BetLockManager`],
//! [`StreakTracker`] and the free-spin counters below.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::ProgressionConfig;
use crate::resolver::SpinResult;

/// Wager frozen at spin start
///
/// Has no mutators; every payout in the spin reads from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedBet {
    amount: u64,
    free_spin: bool,
}

impl LockedBet {
    /// Real-money stake
    pub fn paid(amount: u64) -> Self {
        Self {
            amount,
            free_spin: false,
        }
    }

    /// Free spin at the streak-averaged stake
    pub fn free_spin(amount: u64) -> Self {
        Self {
            amount,
            free_spin: true,
        }
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn is_free_spin(&self) -> bool {
        self.free_spin
    }
}

/// Streak and free-spin state carried across spins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionState {
    win_streak: u8,
    free_spins_remaining: u32,
    /// Zero outside free-spin mode
    free_spin_locked_bet: u64,
    recent_stakes: VecDeque<u64>,
}

impl ProgressionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn win_streak(&self) -> u8 {
        self.win_streak
    }

    pub fn free_spins_remaining(&self) -> u32 {
        self.free_spins_remaining
    }

    pub fn free_spin_locked_bet(&self) -> u64 {
        self.free_spin_locked_bet
    }

    pub fn recent_stakes(&self) -> impl Iterator<Item = u64> + '_ {
        self.recent_stakes.iter().copied()
    }

    /// Next spin will be a free spin
    pub fn has_free_spins(&self) -> bool {
        self.free_spins_remaining > 0
    }

    /// Free-spin mode is active (including the grace after the last spin)
    pub fn in_free_spin_mode(&self) -> bool {
        self.free_spins_remaining > 0 || self.free_spin_locked_bet > 0
    }

    /// Consume one free spin at spin start; returns how many are left
    pub fn consume_free_spin(&mut self) -> u32 {
        self.free_spins_remaining = self.free_spins_remaining.saturating_sub(1);
        self.free_spins_remaining
    }

    /// Leave free-spin mode once every granted spin is played
    pub fn end_free_spins(&mut self) -> bool {
        if self.free_spins_remaining > 0 || self.free_spin_locked_bet == 0 {
            return false;
        }
        self.free_spin_locked_bet = 0;
        true
    }

    fn reset_streak(&mut self) {
        self.win_streak = 0;
        self.recent_stakes.clear();
    }
}

/// Freezes the effective wager at spin start
#[derive(Debug, Clone)]
pub struct BetLockManager {
    bet_max: u64,
    window: usize,
}

impl BetLockManager {
    pub fn new(bet_max: u64, config: &ProgressionConfig) -> Self {
        Self {
            bet_max,
            window: config.recent_stakes_window.max(1),
        }
    }

    /// Lock the wager for this spin
    ///
    /// While free spins remain the requested wager is ignored.
    pub fn lock_bet(&self, state: &mut ProgressionState, requested: u64) -> LockedBet {
        if state.has_free_spins() {
            return LockedBet::free_spin(state.free_spin_locked_bet);
        }

        let amount = requested.min(self.bet_max);
        state.recent_stakes.push_back(amount);
        while state.recent_stakes.len() > self.window {
            state.recent_stakes.pop_front();
        }
        LockedBet::paid(amount)
    }
}

/// Free spins granted by a completed streak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSpinUnlock {
    pub spins: u32,
    pub locked_bet: u64,
}

/// Counts consecutive genuine wins outside free-spin mode
#[derive(Debug, Clone)]
pub struct StreakTracker {
    target: u8,
    grant: u32,
}

impl StreakTracker {
    pub fn new(config: &ProgressionConfig) -> Self {
        Self {
            target: config.streak_target.max(1),
            grant: config.free_spin_grant,
        }
    }

    /// Record the final result of a spin
    pub fn record(
        &self,
        state: &mut ProgressionState,
        result: &SpinResult,
        locked_bet: LockedBet,
    ) -> Option<FreeSpinUnlock> {
        if locked_bet.is_free_spin() {
            return None;
        }
        if !result.is_genuine_win() {
            state.reset_streak();
            return None;
        }

        state.win_streak = state.win_streak.saturating_add(1);
        if state.win_streak < self.target {
            return None;
        }

        let stakes = state.recent_stakes.len() as u64;
        let stake_bet = if stakes > 0 {
            state.recent_stakes.iter().sum::<u64>() / stakes
        } else {
            locked_bet.amount()
        };

        state.free_spin_locked_bet = stake_bet;
        state.free_spins_remaining = state.free_spins_remaining.saturating_add(self.grant);
        state.reset_streak();

        log::info!(
            "[StreakTracker] Streak complete: {} free spins at {}",
            self.grant,
            stake_bet
        );

        Some(FreeSpinUnlock {
            spins: self.grant,
            locked_bet: stake_bet,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::LineType;

    fn managers() -> (BetLockManager, StreakTracker) {
        let config = ProgressionConfig::default();
        (BetLockManager::new(100_000, &config), StreakTracker::new(&config))
    }

    fn win() -> SpinResult {
        SpinResult::line_win(100, LineType::TwoLeft)
    }

    #[test]
    fn test_three_wins_unlock_free_spins() {
        let (lock, streak) = managers();
        let mut state = ProgressionState::new();

        let mut unlock = None;
        for stake in [100, 200, 300] {
            let bet = lock.lock_bet(&mut state, stake);
            unlock = streak.record(&mut state, &win(), bet);
        }

        assert_eq!(
            unlock,
            Some(FreeSpinUnlock {
                spins: 3,
                locked_bet: 200
            })
        );
        assert_eq!(state.free_spins_remaining(), 3);
        assert_eq!(state.free_spin_locked_bet(), 200);
        assert_eq!(state.win_streak(), 0);
        assert_eq!(state.recent_stakes().count(), 0);
    }

    #[test]
    fn test_mean_is_floored() {
        let (lock, streak) = managers();
        let mut state = ProgressionState::new();
        for stake in [100, 100, 101] {
            let bet = lock.lock_bet(&mut state, stake);
            streak.record(&mut state, &win(), bet);
        }
        assert_eq!(state.free_spin_locked_bet(), 100);
    }

    #[test]
    fn test_loss_and_pity_reset_streak() {
        let (lock, streak) = managers();
        let mut state = ProgressionState::new();

        let bet = lock.lock_bet(&mut state, 100);
        streak.record(&mut state, &win(), bet);
        assert_eq!(state.win_streak(), 1);
        assert_eq!(state.recent_stakes().collect::<Vec<_>>(), vec![100]);

        let bet = lock.lock_bet(&mut state, 200);
        streak.record(&mut state, &SpinResult::pity(200), bet);
        assert_eq!(state.win_streak(), 0);
        assert_eq!(state.recent_stakes().count(), 0);

        let bet = lock.lock_bet(&mut state, 300);
        streak.record(&mut state, &win(), bet);
        let bet = lock.lock_bet(&mut state, 300);
        streak.record(&mut state, &SpinResult::loss(), bet);
        assert_eq!(state.win_streak(), 0);
        assert_eq!(state.recent_stakes().count(), 0);
    }

    #[test]
    fn test_genuine_win_keeps_stakes() {
        let (lock, streak) = managers();
        let mut state = ProgressionState::new();
        for stake in [10, 20] {
            let bet = lock.lock_bet(&mut state, stake);
            streak.record(&mut state, &win(), bet);
        }
        assert_eq!(state.recent_stakes().collect::<Vec<_>>(), vec![10, 20]);
    }

    #[test]
    fn test_recent_stakes_window() {
        let (lock, _) = managers();
        let mut state = ProgressionState::new();
        for stake in [1, 2, 3, 4] {
            lock.lock_bet(&mut state, stake);
        }
        assert_eq!(state.recent_stakes().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn test_lock_clamps_to_max() {
        let (lock, _) = managers();
        let mut state = ProgressionState::new();
        let bet = lock.lock_bet(&mut state, 250_000);
        assert_eq!(bet.amount(), 100_000);
        assert!(!bet.is_free_spin());
    }

    #[test]
    fn test_free_spin_lock_ignores_request() {
        let (lock, streak) = managers();
        let mut state = ProgressionState::new();
        for stake in [100, 200, 300] {
            let bet = lock.lock_bet(&mut state, stake);
            streak.record(&mut state, &win(), bet);
        }

        let bet = lock.lock_bet(&mut state, 99_999);
        assert_eq!(bet, LockedBet::free_spin(200));
        assert_eq!(state.consume_free_spin(), 2);
        assert_eq!(state.recent_stakes().count(), 0);

        // Results during free spins leave the streak alone
        assert!(streak.record(&mut state, &win(), bet).is_none());
        assert_eq!(state.win_streak(), 0);
    }

    #[test]
    fn test_free_spin_mode_ends_after_last_spin() {
        let (lock, streak) = managers();
        let mut state = ProgressionState::new();
        for stake in [100, 200, 300] {
            let bet = lock.lock_bet(&mut state, stake);
            streak.record(&mut state, &win(), bet);
        }

        for _ in 0..3 {
            assert!(!state.end_free_spins());
            lock.lock_bet(&mut state, 1);
            state.consume_free_spin();
        }
        assert!(state.in_free_spin_mode());
        assert!(state.end_free_spins());
        assert!(!state.in_free_spin_mode());
        assert_eq!(state.free_spin_locked_bet(), 0);
        assert!(!lock.lock_bet(&mut state, 50).is_free_spin());
    }

    #[test]
    fn test_state_serializes() {
        let mut state = ProgressionState::new();
        BetLockManager::new(100_000, &ProgressionConfig::default()).lock_bet(&mut state, 500);
        let json = serde_json::to_string(&state).unwrap();
        let back: ProgressionState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
        assert_eq!(serde_json::from_str::<ProgressionState>("{}").unwrap(), ProgressionState::new());
    }
}
