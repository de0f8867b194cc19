//! Spin orchestrator — one spin end to end
//!
//! ```text
//! validate wager → draw event → lock bet → (free spin: consume)
//!     → debit + stake XP → read jackpot → compute → streak
//!     → credit + win XP → jackpot reset | increase → leaderboard
//!     → reveal timeline → (last free spin: grace, FreeSpinsEnd)
//! ```
//!
//! Only one spin may be in flight per session. The session lives behind a
//! `tokio::sync::Mutex`; a request that finds it locked is ignored.

use parking_lot::Mutex;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rf_stage::{Stage, StageEvent, StagePayload};

use crate::config::EngineConfig;
use crate::engine::{RevealContext, SpinEngine, SpinInput};
use crate::error::{ConfigResult, WagerError};
use crate::policy::OverrideKind;
use crate::progression::{FreeSpinUnlock, LockedBet, ProgressionState};
use crate::reels::{REEL_COUNT, Reel};
use crate::resolver::SpinResult;
use crate::services::Collaborators;
use crate::settlement::{ReconciliationLog, SettlementKind, SettlementRecord};
use crate::stats::SessionStats;
use crate::symbols::{Symbol, SymbolMode};
use crate::timing::{TimestampGenerator, duration_from_ms};

// ═══════════════════════════════════════════════════════════════════════════
// REVEAL SINK
// ═══════════════════════════════════════════════════════════════════════════

/// Receives stage events as the reveal plays out
pub trait RevealSink: Send + Sync {
    fn reveal(&self, event: &StageEvent);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl RevealSink for NullSink {
    fn reveal(&self, _event: &StageEvent) {}
}

/// Keeps every revealed event
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<StageEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StageEvent> {
        self.events.lock().clone()
    }

    pub fn type_names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|e| e.type_name()).collect()
    }
}

impl RevealSink for CollectingSink {
    fn reveal(&self, event: &StageEvent) {
        self.events.lock().push(event.clone());
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SESSION
// ═══════════════════════════════════════════════════════════════════════════

/// Per-player state held for the session
///
/// Balance, jackpot and XP are local copies of service-owned values.
#[derive(Debug, Clone)]
pub struct SpinSession {
    player_id: String,
    username: String,
    balance: u64,
    jackpot: u64,
    xp: u64,
    progression: ProgressionState,
    stats: SessionStats,
    rng: ChaCha8Rng,
}

impl SpinSession {
    /// New session with an entropy-seeded RNG
    pub fn new(player_id: impl Into<String>, username: impl Into<String>, balance: u64) -> Self {
        Self {
            player_id: player_id.into(),
            username: username.into(),
            balance,
            jackpot: 0,
            xp: 0,
            progression: ProgressionState::new(),
            stats: SessionStats::new(),
            rng: ChaCha8Rng::from_os_rng(),
        }
    }

    /// Builder: reproducible RNG
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    /// Builder: progression loaded from the external service
    pub fn with_progression(mut self, progression: ProgressionState) -> Self {
        self.progression = progression;
        self
    }

    /// Builder: last known jackpot pool
    pub fn with_jackpot(mut self, jackpot: u64) -> Self {
        self.jackpot = jackpot;
        self
    }

    pub fn with_xp(mut self, xp: u64) -> Self {
        self.xp = xp;
        self
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn jackpot(&self) -> u64 {
        self.jackpot
    }

    pub fn xp(&self) -> u64 {
        self.xp
    }

    pub fn progression(&self) -> &ProgressionState {
        &self.progression
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// REPORT
// ═══════════════════════════════════════════════════════════════════════════

/// Everything a completed spin decided and settled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinReport {
    pub spin_id: String,
    pub locked_bet: LockedBet,
    pub mode: SymbolMode,
    pub reels: [Reel; REEL_COUNT],
    pub symbols: [Symbol; REEL_COUNT],
    pub result: SpinResult,
    /// Override rules that changed the result, in order
    pub overrides: Vec<OverrideKind>,
    pub settlements: Vec<SettlementRecord>,
    pub unlock: Option<FreeSpinUnlock>,
    pub free_spins_remaining: u32,
    /// This spin was the last free spin and free-spin mode has ended
    pub free_spins_ended: bool,
    pub balance_after: u64,
    pub jackpot_after: u64,
    pub xp_after: u64,
    pub timeline: Vec<StageEvent>,
}

impl SpinReport {
    pub fn settlement(&self, kind: SettlementKind) -> Option<&SettlementRecord> {
        self.settlements.iter().find(|s| s.kind == kind)
    }

    pub fn has_fallbacks(&self) -> bool {
        self.settlements.iter().any(|s| s.settlement.is_fallback())
    }
}

/// Outcome of a spin request
#[derive(Debug, Clone, PartialEq)]
pub enum SpinOutcome {
    Completed(Box<SpinReport>),
    /// Another spin was in flight
    Ignored,
}

impl SpinOutcome {
    pub fn is_ignored(&self) -> bool {
        matches!(self, SpinOutcome::Ignored)
    }

    pub fn report(&self) -> Option<&SpinReport> {
        match self {
            SpinOutcome::Completed(report) => Some(report),
            SpinOutcome::Ignored => None,
        }
    }

    pub fn into_report(self) -> Option<SpinReport> {
        match self {
            SpinOutcome::Completed(report) => Some(*report),
            SpinOutcome::Ignored => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ORCHESTRATOR
// ═══════════════════════════════════════════════════════════════════════════

/// Async driver for one player session
pub struct SpinOrchestrator {
    engine: SpinEngine,
    collaborators: Collaborators,
    session: tokio::sync::Mutex<SpinSession>,
    reconciliation: ReconciliationLog,
}

impl SpinOrchestrator {
    pub fn new(
        config: EngineConfig,
        collaborators: Collaborators,
        session: SpinSession,
    ) -> ConfigResult<Self> {
        Ok(Self::with_engine(SpinEngine::new(config)?, collaborators, session))
    }

    /// Use a prepared engine (custom override chain)
    pub fn with_engine(engine: SpinEngine, collaborators: Collaborators, session: SpinSession) -> Self {
        log::info!(
            "[SpinOrchestrator] Session opened for {} ({:?} timing)",
            session.player_id,
            engine.config().timing
        );
        Self {
            engine,
            collaborators,
            session: tokio::sync::Mutex::new(session),
            reconciliation: ReconciliationLog::new(),
        }
    }

    pub fn engine(&self) -> &SpinEngine {
        &self.engine
    }

    pub fn reconciliation(&self) -> &ReconciliationLog {
        &self.reconciliation
    }

    pub async fn balance(&self) -> u64 {
        self.session.lock().await.balance
    }

    pub async fn jackpot(&self) -> u64 {
        self.session.lock().await.jackpot
    }

    pub async fn progression(&self) -> ProgressionState {
        self.session.lock().await.progression.clone()
    }

    pub async fn stats(&self) -> SessionStats {
        self.session.lock().await.stats.clone()
    }

    /// Reseed the session RNG
    pub async fn seed(&self, seed: u64) {
        self.session.lock().await.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Run one spin to completion, revealing stages into `sink`
    ///
    /// Paid wagers are validated before anything changes. While free spins
    /// remain the requested wager is ignored.
    pub async fn spin(&self, requested_bet: u64, sink: &dyn RevealSink) -> Result<SpinOutcome, WagerError> {
        let Ok(mut guard) = self.session.try_lock() else {
            log::debug!("[SpinOrchestrator] Spin already in flight, ignoring request");
            return Ok(SpinOutcome::Ignored);
        };
        let session = &mut *guard;
        let config = self.engine.config();

        if !session.progression.has_free_spins() {
            self.engine.validate_wager(requested_bet, session.balance)?;
        }

        let spin_id = Uuid::new_v4().to_string();
        let event_factor = self.engine.draw_event_factor(&mut session.rng);
        let locked_bet = self
            .engine
            .bet_lock()
            .lock_bet(&mut session.progression, requested_bet);
        let bet = locked_bet.amount();
        let free_spins_remaining = locked_bet
            .is_free_spin()
            .then(|| session.progression.consume_free_spin());

        let mut settlements = Vec::new();
        let balance_before_wager = session.balance;

        // ═══ WAGER ═══
        if !locked_bet.is_free_spin() {
            let record = SettlementRecord::from_outcome(
                SettlementKind::Debit,
                bet,
                self.collaborators.currency.debit(&session.player_id, bet).await,
                |u| u.new_balance,
                session.balance.saturating_sub(bet),
            );
            session.balance = record.value();
            settlements.push(record);

            let stake_xp = config.progression.stake_xp(bet);
            let record = SettlementRecord::from_outcome(
                SettlementKind::StakeXp,
                stake_xp,
                self.collaborators.progression.add_xp(&session.player_id, stake_xp).await,
                |u| u.xp,
                session.xp.saturating_add(stake_xp),
            );
            session.xp = record.value();
            settlements.push(record);
        }

        let record = SettlementRecord::from_outcome(
            SettlementKind::JackpotRead,
            0,
            self.collaborators.jackpot.read().await,
            |j| j.amount,
            session.jackpot,
        );
        session.jackpot = record.value();
        settlements.push(record);

        // ═══ COMPUTE ═══
        let input = SpinInput {
            locked_bet,
            balance_before_wager,
            balance_after_wager: session.balance,
            current_jackpot: session.jackpot,
            event_factor,
        };
        let computed = self.engine.compute_spin(&input, &mut session.rng);
        let result = &computed.result;

        let unlock = self
            .engine
            .streak()
            .record(&mut session.progression, result, locked_bet);

        // ═══ SETTLE ═══
        if result.win && result.amount > 0 {
            let record = SettlementRecord::from_outcome(
                SettlementKind::Credit,
                result.amount,
                self.collaborators
                    .currency
                    .credit(&session.player_id, result.amount)
                    .await,
                |u| u.new_balance,
                session.balance.saturating_add(result.amount),
            );
            session.balance = record.value();
            settlements.push(record);

            let win_xp = config.progression.win_xp(result.amount, result.bonus_xp);
            if win_xp > 0 {
                let record = SettlementRecord::from_outcome(
                    SettlementKind::WinXp,
                    win_xp,
                    self.collaborators.progression.add_xp(&session.player_id, win_xp).await,
                    |u| u.xp,
                    session.xp.saturating_add(win_xp),
                );
                session.xp = record.value();
                settlements.push(record);
            }
        }

        if result.is_jackpot {
            let record = SettlementRecord::from_outcome(
                SettlementKind::JackpotReset,
                result.amount,
                self.collaborators
                    .jackpot
                    .reset(&session.player_id, result.amount)
                    .await,
                |j| j.new_amount,
                config.jackpot.base_amount,
            );
            session.jackpot = record.value();
            settlements.push(record);
        } else if !result.win && !locked_bet.is_free_spin() {
            let contribution = config.jackpot.contribution_for(bet);
            if contribution > 0 {
                let record = SettlementRecord::from_outcome(
                    SettlementKind::JackpotIncrease,
                    contribution,
                    self.collaborators.jackpot.increase(contribution).await,
                    |j| j.new_amount,
                    session.jackpot.saturating_add(contribution),
                );
                session.jackpot = record.value();
                settlements.push(record);
            }
        }

        if result.is_genuine_win() {
            let leaderboard = self.collaborators.leaderboard.clone();
            let username = session.username.clone();
            let (amount, is_jackpot) = (result.amount, result.is_jackpot);
            tokio::spawn(async move {
                if let Err(e) = leaderboard.record_win(&username, amount, is_jackpot).await {
                    log::warn!("[SpinOrchestrator] Leaderboard update for {} failed: {}", username, e);
                }
            });
        }

        session.stats.record(locked_bet, result);
        if unlock.is_some() {
            session.stats.record_unlock();
        }
        let fallbacks =
            self.reconciliation
                .record_all(&spin_id, &session.player_id, &settlements);
        session.stats.record_fallbacks(fallbacks);

        log::debug!(
            "[SpinOrchestrator] Spin {} settled: bet {} → {:?} {} (overrides {:?})",
            spin_id,
            bet,
            result.line_type,
            result.amount,
            computed.overrides
        );

        // ═══ REVEAL ═══
        let mut timing = TimestampGenerator::new(self.engine.timing_config());
        let ctx = RevealContext {
            spin_id: spin_id.clone(),
            unlock,
            free_spins_remaining,
        };
        let mut timeline = computed.generate_stages(&mut timing, &ctx);

        let mut elapsed_ms = 0.0;
        for event in &timeline {
            let wait = event.timestamp_ms - elapsed_ms;
            if wait > 0.0 {
                tokio::time::sleep(duration_from_ms(wait)).await;
                elapsed_ms = event.timestamp_ms;
            }
            sink.reveal(event);
        }

        let mut free_spins_ended = false;
        if locked_bet.is_free_spin() && !session.progression.has_free_spins() {
            let grace = timing.config().free_spin_exit_grace();
            if !grace.is_zero() {
                tokio::time::sleep(grace).await;
            }
            free_spins_ended = session.progression.end_free_spins();
            if free_spins_ended {
                let event = StageEvent::with_payload(
                    Stage::FreeSpinsEnd,
                    elapsed_ms + timing.config().free_spin_exit_grace_ms,
                    StagePayload::new().spin_id(spin_id.clone()),
                );
                sink.reveal(&event);
                timeline.push(event);
                log::info!("[SpinOrchestrator] Free spins finished for {}", session.player_id);
            }
        }

        Ok(SpinOutcome::Completed(Box::new(SpinReport {
            spin_id,
            locked_bet,
            mode: computed.mode,
            reels: computed.reels,
            symbols: computed.symbols,
            result: computed.result,
            overrides: computed.overrides,
            settlements,
            unlock,
            free_spins_remaining: session.progression.free_spins_remaining(),
            free_spins_ended,
            balance_after: session.balance,
            jackpot_after: session.jackpot,
            xp_after: session.xp,
            timeline,
        })))
    }
}

impl std::fmt::Debug for SpinOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpinOrchestrator")
            .field("engine", &self.engine)
            .field("reconciliation", &self.reconciliation.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryLedger, LedgerOp};
    use crate::timing::TimingProfile;
    use std::sync::Arc;

    fn orchestrator(balance: u64, seed: u64) -> (Arc<InMemoryLedger>, SpinOrchestrator) {
        let ledger = Arc::new(InMemoryLedger::default().with_balance("p1", balance));
        let session = SpinSession::new("p1", "alice", balance).with_seed(seed);
        let orchestrator =
            SpinOrchestrator::new(EngineConfig::instant(), Collaborators::from_shared(ledger.clone()), session)
                .unwrap();
        (ledger, orchestrator)
    }

    #[tokio::test]
    async fn test_invalid_wager_touches_nothing() {
        let (ledger, orchestrator) = orchestrator(1000, 1);

        assert_eq!(
            orchestrator.spin(0, &NullSink).await,
            Err(WagerError::NonPositive)
        );
        assert!(matches!(
            orchestrator.spin(2000, &NullSink).await,
            Err(WagerError::ExceedsBalance { .. })
        ));
        assert_eq!(orchestrator.balance().await, 1000);
        assert_eq!(ledger.calls(LedgerOp::Debit), 0);
        assert_eq!(orchestrator.stats().await.total_spins, 0);
    }

    #[tokio::test]
    async fn test_paid_spin_settles_with_service() {
        let (ledger, orchestrator) = orchestrator(10_000, 3);

        let report = orchestrator
            .spin(100, &NullSink)
            .await
            .unwrap()
            .into_report()
            .unwrap();

        assert_eq!(report.locked_bet, LockedBet::paid(100));
        assert!(!report.has_fallbacks());
        assert_eq!(report.balance_after, ledger.balance("p1"));
        assert_eq!(orchestrator.balance().await, ledger.balance("p1"));
        assert_eq!(report.jackpot_after, ledger.jackpot());

        let debit = report.settlement(SettlementKind::Debit).unwrap();
        assert_eq!(debit.requested, 100);
        let expected = 10_000 - 100 + if report.result.win { report.result.amount } else { 0 };
        assert_eq!(report.balance_after, expected);
    }

    #[tokio::test]
    async fn test_failing_debit_falls_back() {
        let (ledger, orchestrator) = orchestrator(10_000, 5);
        ledger.fail_on(LedgerOp::Debit);
        ledger.fail_on(LedgerOp::Credit);

        let sink = CollectingSink::new();
        let report = orchestrator
            .spin(100, &sink)
            .await
            .unwrap()
            .into_report()
            .unwrap();

        let debit = report.settlement(SettlementKind::Debit).unwrap();
        assert!(debit.settlement.is_fallback());
        let credited = if report.result.win { report.result.amount } else { 0 };
        assert_eq!(report.balance_after, 10_000 - 100 + credited);
        assert!(!orchestrator.reconciliation().is_empty());
        assert_eq!(sink.type_names().last(), Some(&"spin_end"));
    }

    #[tokio::test]
    async fn test_concurrent_spin_is_ignored() {
        let ledger = Arc::new(InMemoryLedger::default().with_balance("p1", 10_000));
        let session = SpinSession::new("p1", "alice", 10_000).with_seed(9);
        let config = EngineConfig::default().with_timing(TimingProfile::Turbo);
        let orchestrator = SpinOrchestrator::new(config, Collaborators::from_shared(ledger), session).unwrap();

        let (first, second) = tokio::join!(orchestrator.spin(100, &NullSink), orchestrator.spin(100, &NullSink));
        assert!(!first.unwrap().is_ignored());
        assert!(second.unwrap().is_ignored());
        assert_eq!(orchestrator.stats().await.total_spins, 1);
    }

    #[tokio::test]
    async fn test_timeline_is_revealed_in_order() {
        let (_, orchestrator) = orchestrator(10_000, 12);
        let sink = CollectingSink::new();
        let report = orchestrator
            .spin(100, &sink)
            .await
            .unwrap()
            .into_report()
            .unwrap();

        assert_eq!(sink.events(), report.timeline);
        assert_eq!(report.timeline[0].stage, Stage::SpinStart);
        assert_eq!(
            report.timeline.iter().filter(|e| e.type_name() == "reel_stop").count(),
            3
        );
    }
}
