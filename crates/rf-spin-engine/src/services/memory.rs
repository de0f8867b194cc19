//! In-process ledger implementing every collaborator contract
//!
//! Used by tests, simulations and offline hosts. Any operation can be made
//! to fail with [`InMemoryLedger::fail_on`].

use std::collections::{HashMap, HashSet};
use std::fmt;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{
    BalanceUpdate, CurrencyService, JackpotAmount, JackpotService, JackpotUpdate,
    LeaderboardService, ProgressionService, XpUpdate,
};
use crate::config::JACKPOT_BASE_AMOUNT;
use crate::error::{ServiceError, ServiceResult};

/// XP needed per level
pub const XP_PER_LEVEL: u64 = 1_000;

/// Ledger operation, for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerOp {
    Debit,
    Credit,
    JackpotRead,
    JackpotIncrease,
    JackpotReset,
    AddXp,
    RecordWin,
}

impl LedgerOp {
    pub fn name(self) -> &'static str {
        match self {
            LedgerOp::Debit => "debit",
            LedgerOp::Credit => "credit",
            LedgerOp::JackpotRead => "jackpot_read",
            LedgerOp::JackpotIncrease => "jackpot_increase",
            LedgerOp::JackpotReset => "jackpot_reset",
            LedgerOp::AddXp => "add_xp",
            LedgerOp::RecordWin => "record_win",
        }
    }
}

impl fmt::Display for LedgerOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Win reported to the leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedWin {
    pub username: String,
    pub amount: u64,
    pub is_jackpot: bool,
}

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<String, u64>,
    xp: HashMap<String, u64>,
    jackpot: u64,
    wins: Vec<RecordedWin>,
    failing: HashSet<LedgerOp>,
    calls: HashMap<LedgerOp, u64>,
}

/// Thread-safe in-memory ledger
#[derive(Debug)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
    jackpot_base: u64,
}

impl InMemoryLedger {
    /// Empty ledger with the jackpot at `jackpot_base`
    pub fn new(jackpot_base: u64) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                jackpot: jackpot_base,
                ..Default::default()
            }),
            jackpot_base,
        }
    }

    /// Builder: seed a player balance
    pub fn with_balance(self, player_id: impl Into<String>, balance: u64) -> Self {
        self.state.lock().balances.insert(player_id.into(), balance);
        self
    }

    /// Builder: seed the jackpot pool
    pub fn with_jackpot(self, amount: u64) -> Self {
        self.state.lock().jackpot = amount;
        self
    }

    pub fn balance(&self, player_id: &str) -> u64 {
        self.state.lock().balances.get(player_id).copied().unwrap_or(0)
    }

    pub fn jackpot(&self) -> u64 {
        self.state.lock().jackpot
    }

    pub fn xp(&self, player_id: &str) -> u64 {
        self.state.lock().xp.get(player_id).copied().unwrap_or(0)
    }

    pub fn wins(&self) -> Vec<RecordedWin> {
        self.state.lock().wins.clone()
    }

    /// Number of calls made to an operation, failed ones included
    pub fn calls(&self, op: LedgerOp) -> u64 {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Make an operation fail until [`recover`](Self::recover)
    pub fn fail_on(&self, op: LedgerOp) {
        self.state.lock().failing.insert(op);
    }

    pub fn recover(&self, op: LedgerOp) {
        self.state.lock().failing.remove(&op);
    }

    pub fn recover_all(&self) {
        self.state.lock().failing.clear();
    }

    /// Run `f` on the state unless `op` is failing
    fn with_state<T>(
        &self,
        op: LedgerOp,
        f: impl FnOnce(&mut LedgerState) -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        let mut state = self.state.lock();
        *state.calls.entry(op).or_insert(0) += 1;
        if state.failing.contains(&op) {
            return Err(ServiceError::Unavailable(format!("{op} is failing")));
        }
        f(&mut *state)
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(JACKPOT_BASE_AMOUNT)
    }
}

#[async_trait]
impl CurrencyService for InMemoryLedger {
    async fn debit(&self, player_id: &str, amount: u64) -> ServiceResult<BalanceUpdate> {
        self.with_state(LedgerOp::Debit, |state| {
            let balance = state.balances.entry(player_id.to_string()).or_insert(0);
            if *balance < amount {
                return Err(ServiceError::Status {
                    code: 400,
                    body: format!("insufficient balance: {} < {}", balance, amount),
                });
            }
            *balance -= amount;
            Ok(BalanceUpdate {
                new_balance: *balance,
            })
        })
    }

    async fn credit(&self, player_id: &str, amount: u64) -> ServiceResult<BalanceUpdate> {
        self.with_state(LedgerOp::Credit, |state| {
            let balance = state.balances.entry(player_id.to_string()).or_insert(0);
            *balance = balance.saturating_add(amount);
            Ok(BalanceUpdate {
                new_balance: *balance,
            })
        })
    }
}

#[async_trait]
impl JackpotService for InMemoryLedger {
    async fn read(&self) -> ServiceResult<JackpotAmount> {
        self.with_state(LedgerOp::JackpotRead, |state| {
            Ok(JackpotAmount {
                amount: state.jackpot,
            })
        })
    }

    async fn increase(&self, amount: u64) -> ServiceResult<JackpotUpdate> {
        self.with_state(LedgerOp::JackpotIncrease, |state| {
            state.jackpot = state.jackpot.saturating_add(amount);
            Ok(JackpotUpdate {
                new_amount: state.jackpot,
            })
        })
    }

    async fn reset(&self, winner_id: &str, win_amount: u64) -> ServiceResult<JackpotUpdate> {
        let base = self.jackpot_base;
        self.with_state(LedgerOp::JackpotReset, |state| {
            log::info!("[InMemoryLedger] Jackpot of {} won by {}", win_amount, winner_id);
            state.jackpot = base;
            Ok(JackpotUpdate { new_amount: base })
        })
    }
}

#[async_trait]
impl ProgressionService for InMemoryLedger {
    async fn add_xp(&self, player_id: &str, amount: u64) -> ServiceResult<XpUpdate> {
        self.with_state(LedgerOp::AddXp, |state| {
            let xp = state.xp.entry(player_id.to_string()).or_insert(0);
            let before = *xp / XP_PER_LEVEL + 1;
            *xp = xp.saturating_add(amount);
            let level = *xp / XP_PER_LEVEL + 1;
            Ok(XpUpdate {
                level: level.min(u32::MAX as u64) as u32,
                xp: *xp,
                xp_for_next_level: level.saturating_mul(XP_PER_LEVEL),
                leveled_up: level > before,
            })
        })
    }
}

#[async_trait]
impl LeaderboardService for InMemoryLedger {
    async fn record_win(&self, username: &str, amount: u64, is_jackpot: bool) -> ServiceResult<()> {
        self.with_state(LedgerOp::RecordWin, |state| {
            state.wins.push(RecordedWin {
                username: username.to_string(),
                amount,
                is_jackpot,
            });
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_debit_and_credit() {
        let ledger = InMemoryLedger::default().with_balance("p1", 1000);

        assert_eq!(ledger.debit("p1", 300).await.unwrap().new_balance, 700);
        assert_eq!(ledger.credit("p1", 50).await.unwrap().new_balance, 750);
        assert!(matches!(
            ledger.debit("p1", 10_000).await,
            Err(ServiceError::Status { code: 400, .. })
        ));
        assert_eq!(ledger.balance("p1"), 750);
    }

    #[tokio::test]
    async fn test_jackpot_lifecycle() {
        let ledger = InMemoryLedger::new(5000);
        assert_eq!(ledger.read().await.unwrap().amount, 5000);
        assert_eq!(ledger.increase(500).await.unwrap().new_amount, 5500);
        assert_eq!(ledger.reset("p1", 50_000).await.unwrap().new_amount, 5000);
    }

    #[tokio::test]
    async fn test_xp_levels() {
        let ledger = InMemoryLedger::default();
        let update = ledger.add_xp("p1", 900).await.unwrap();
        assert_eq!(update.level, 1);
        assert!(!update.leveled_up);

        let update = ledger.add_xp("p1", 150).await.unwrap();
        assert_eq!(update.level, 2);
        assert_eq!(update.xp, 1050);
        assert_eq!(update.xp_for_next_level, 2000);
        assert!(update.leveled_up);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let ledger = InMemoryLedger::default().with_balance("p1", 100);
        ledger.fail_on(LedgerOp::Debit);

        assert!(matches!(
            ledger.debit("p1", 10).await,
            Err(ServiceError::Unavailable(_))
        ));
        assert_eq!(ledger.balance("p1"), 100);
        assert_eq!(ledger.calls(LedgerOp::Debit), 1);

        ledger.recover(LedgerOp::Debit);
        assert_eq!(ledger.debit("p1", 10).await.unwrap().new_balance, 90);
    }

    #[tokio::test]
    async fn test_leaderboard_feed() {
        let ledger = InMemoryLedger::default();
        ledger.record_win("alice", 9500, false).await.unwrap();
        assert_eq!(
            ledger.wins(),
            vec![RecordedWin {
                username: "alice".into(),
                amount: 9500,
                is_jackpot: false
            }]
        );
    }
}
