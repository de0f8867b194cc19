//! External collaborator contracts
//!
//! Balance, jackpot pool, XP and leaderboard are owned by an external
//! service. The engine only sees these traits; `rf-ledger` implements them
//! over HTTP and [`memory::InMemoryLedger`] implements them in-process.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceResult;

pub use memory::{InMemoryLedger, LedgerOp, RecordedWin};

/// Balance after a debit or credit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceUpdate {
    pub new_balance: u64,
}

/// Current jackpot pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JackpotAmount {
    pub amount: u64,
}

/// Jackpot pool after an increase or reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JackpotUpdate {
    pub new_amount: u64,
}

/// Progression after XP was granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XpUpdate {
    pub level: u32,
    pub xp: u64,
    pub xp_for_next_level: u64,
    pub leveled_up: bool,
}

#[async_trait]
pub trait CurrencyService: Send + Sync {
    async fn debit(&self, player_id: &str, amount: u64) -> ServiceResult<BalanceUpdate>;

    async fn credit(&self, player_id: &str, amount: u64) -> ServiceResult<BalanceUpdate>;
}

#[async_trait]
pub trait JackpotService: Send + Sync {
    async fn read(&self) -> ServiceResult<JackpotAmount>;

    async fn increase(&self, amount: u64) -> ServiceResult<JackpotUpdate>;

    /// Pay out the pool and reseed it
    async fn reset(&self, winner_id: &str, win_amount: u64) -> ServiceResult<JackpotUpdate>;
}

#[async_trait]
pub trait ProgressionService: Send + Sync {
    async fn add_xp(&self, player_id: &str, amount: u64) -> ServiceResult<XpUpdate>;
}

/// Fire-and-forget win feed
#[async_trait]
pub trait LeaderboardService: Send + Sync {
    async fn record_win(&self, username: &str, amount: u64, is_jackpot: bool) -> ServiceResult<()>;
}

/// Every collaborator the orchestrator talks to
#[derive(Clone)]
pub struct Collaborators {
    pub currency: Arc<dyn CurrencyService>,
    pub jackpot: Arc<dyn JackpotService>,
    pub progression: Arc<dyn ProgressionService>,
    pub leaderboard: Arc<dyn LeaderboardService>,
}

impl Collaborators {
    /// One value implementing every contract
    pub fn from_shared<S>(service: Arc<S>) -> Self
    where
        S: CurrencyService + JackpotService + ProgressionService + LeaderboardService + 'static,
    {
        Self {
            currency: service.clone(),
            jackpot: service.clone(),
            progression: service.clone(),
            leaderboard: service,
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
