//! Pure spin computation and reveal timeline
//!
//! [`SpinEngine`] decides the whole outcome of a spin synchronously, without
//! I/O or timers. [`ComputedSpin::generate_stages`] turns the decided outcome
//! into timed [`StageEvent`]s for presentation.

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use rf_stage::{Stage, StageEvent, StagePayload};

use crate::config::EngineConfig;
use crate::error::{ConfigResult, WagerError};
use crate::policy::{EventMultiplier, OverrideChain, OverrideContext, OverrideKind};
use crate::progression::{BetLockManager, FreeSpinUnlock, LockedBet, StreakTracker};
use crate::reels::{REEL_COUNT, Reel, ReelGenerator};
use crate::resolver::{OutcomeResolver, SpinResult};
use crate::symbols::{Symbol, SymbolMode};
use crate::timing::{TimestampGenerator, TimingConfig};

/// Inputs to one spin computation, captured after the bet lock and debit
#[derive(Debug, Clone, Copy)]
pub struct SpinInput {
    pub locked_bet: LockedBet,
    pub balance_before_wager: u64,
    pub balance_after_wager: u64,
    /// Only consulted on three wilds
    pub current_jackpot: u64,
    /// Event multiplier drawn at spin start
    pub event_factor: Option<u8>,
}

impl SpinInput {
    /// Paid spin with no jackpot pool and no event
    pub fn paid(bet: u64, balance_before_wager: u64) -> Self {
        Self {
            locked_bet: LockedBet::paid(bet),
            balance_before_wager,
            balance_after_wager: balance_before_wager.saturating_sub(bet),
            current_jackpot: 0,
            event_factor: None,
        }
    }

    pub fn with_jackpot(mut self, current_jackpot: u64) -> Self {
        self.current_jackpot = current_jackpot;
        self
    }

    pub fn with_event_factor(mut self, factor: Option<u8>) -> Self {
        self.event_factor = factor;
        self
    }
}

/// Fully decided spin, before any settlement or reveal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedSpin {
    pub locked_bet: LockedBet,
    pub mode: SymbolMode,
    pub reels: [Reel; REEL_COUNT],
    pub symbols: [Symbol; REEL_COUNT],
    /// Resolver output before any override
    pub primary: SpinResult,
    /// Final result after the override chain
    pub result: SpinResult,
    /// Override rules that changed the result, in order
    pub overrides: Vec<OverrideKind>,
    /// Factor drawn at spin start, announced even when the spin loses
    pub event_factor: Option<u8>,
    pub jackpot_pool: u64,
}

/// Extra reveal data known only after settlement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RevealContext {
    pub spin_id: String,
    pub unlock: Option<FreeSpinUnlock>,
    /// Free spins left after this one, for free spins
    pub free_spins_remaining: Option<u32>,
}

impl ComputedSpin {
    /// Rule that granted a pity win, if any
    pub fn pity_reason(&self) -> Option<OverrideKind> {
        if !self.result.is_pity_win {
            return None;
        }
        self.overrides
            .iter()
            .copied()
            .find(|kind| matches!(kind, OverrideKind::NearMiss | OverrideKind::AntiRuin))
    }

    /// Generate stage events for the reveal, sorted by timestamp
    pub fn generate_stages(
        &self,
        timing: &mut TimestampGenerator,
        ctx: &RevealContext,
    ) -> Vec<StageEvent> {
        let mut events = Vec::new();
        let bet = self.locked_bet.amount();
        let result = &self.result;

        // 1. Spin start
        let start_payload = StagePayload::new()
            .bet_amount(bet)
            .symbol_mode(self.mode.name())
            .jackpot_pool(self.jackpot_pool)
            .spin_id(ctx.spin_id.clone());
        events.push(StageEvent::with_payload(Stage::SpinStart, timing.current(), start_payload));

        if self.locked_bet.is_free_spin() {
            let remaining = ctx.free_spins_remaining.unwrap_or(0);
            events.push(
                StageEvent::with_payload(
                    Stage::FreeSpinStart { remaining },
                    timing.current(),
                    StagePayload::new().bet_amount(bet).spins_remaining(remaining),
                )
                .with_tag("free_spin"),
            );
        }

        if let Some(factor) = self.event_factor {
            events.push(StageEvent::with_payload(
                Stage::EventMultiplier { factor },
                timing.current(),
                StagePayload::new().multiplier(factor),
            ));
        }

        // 2. Reels stop left to right
        for (index, symbol) in self.symbols.iter().enumerate() {
            let reel_index = index as u8;
            events.push(StageEvent::new(
                Stage::ReelStop {
                    reel_index,
                    symbol: symbol.glyph().to_string(),
                },
                timing.reel_stop(reel_index),
            ));
        }

        // 3. Evaluate
        events.push(StageEvent::new(Stage::EvaluateWins, timing.evaluate()));

        if result.near_miss {
            events.push(StageEvent::new(
                Stage::NearMiss {
                    bonus_xp: result.bonus_xp,
                },
                timing.current(),
            ));
        }

        // 4. Win presentation
        if result.win {
            let mut payload = StagePayload::with_win(result.amount, Some(bet));
            if let Some(factor) = result.event_factor {
                payload = payload.multiplier(factor);
            }
            let at = timing.win_reveal();

            let stage = if result.is_jackpot {
                Stage::JackpotTrigger {
                    amount: result.amount,
                }
            } else if result.is_pity_win {
                let reason = self.pity_reason().unwrap_or(OverrideKind::AntiRuin);
                Stage::PityWin {
                    amount: result.amount,
                    reason: reason.name().to_string(),
                }
            } else {
                Stage::WinPresent {
                    win_amount: result.amount,
                    line_type: result.line_type.name().to_string(),
                }
            };
            events.push(StageEvent::with_payload(stage, at, payload));
        }

        // 5. Free-spin unlock
        if let Some(unlock) = ctx.unlock {
            events.push(StageEvent::with_payload(
                Stage::FreeSpinsUnlocked {
                    spins: unlock.spins,
                    locked_bet: unlock.locked_bet,
                },
                timing.feature_enter(),
                StagePayload::new()
                    .bet_amount(unlock.locked_bet)
                    .spins_remaining(unlock.spins),
            ));
        }

        // 6. Spin end
        events.push(StageEvent::new(Stage::SpinEnd, timing.spin_end()));

        events.sort_by(|a, b| a.timestamp_ms.total_cmp(&b.timestamp_ms));
        events
    }
}

/// Synchronous spin pipeline
///
/// Holds every stateless component built from one [`EngineConfig`].
#[derive(Debug)]
pub struct SpinEngine {
    config: EngineConfig,
    generator: ReelGenerator,
    resolver: OutcomeResolver,
    chain: OverrideChain,
    event: EventMultiplier,
    bet_lock: BetLockManager,
    streak: StreakTracker,
}

impl SpinEngine {
    /// Validate the configuration and prepare every component
    pub fn new(config: EngineConfig) -> ConfigResult<Self> {
        config.validate()?;
        let generator = ReelGenerator::new(&config.reels)?;
        Ok(Self {
            resolver: OutcomeResolver::new(&config.payouts),
            chain: OverrideChain::standard(&config.pity, &config.event_multiplier),
            event: EventMultiplier::new(&config.event_multiplier),
            bet_lock: BetLockManager::new(config.wager.bet_max, &config.progression),
            streak: StreakTracker::new(&config.progression),
            generator,
            config,
        })
    }

    /// Builder: replace the override chain
    pub fn with_chain(mut self, chain: OverrideChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn generator(&self) -> &ReelGenerator {
        &self.generator
    }

    pub fn resolver(&self) -> &OutcomeResolver {
        &self.resolver
    }

    pub fn chain(&self) -> &OverrideChain {
        &self.chain
    }

    pub fn bet_lock(&self) -> &BetLockManager {
        &self.bet_lock
    }

    pub fn streak(&self) -> &StreakTracker {
        &self.streak
    }

    /// Timing for the configured profile
    pub fn timing_config(&self) -> TimingConfig {
        TimingConfig::from_profile(self.config.timing)
    }

    /// Reject a paid wager before any state is touched
    pub fn validate_wager(&self, requested: u64, balance: u64) -> Result<(), WagerError> {
        if requested == 0 {
            return Err(WagerError::NonPositive);
        }
        let max = self.config.wager.bet_max;
        if requested > max {
            return Err(WagerError::ExceedsMax { requested, max });
        }
        if requested > balance {
            return Err(WagerError::ExceedsBalance { requested, balance });
        }
        Ok(())
    }

    /// Draw the event multiplier for a spin
    pub fn draw_event_factor<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<u8> {
        self.event.draw(rng)
    }

    /// Symbol set for a locked bet
    pub fn mode_for(&self, locked_bet: LockedBet) -> SymbolMode {
        SymbolMode::for_bet(locked_bet.amount(), self.config.wager.devil_mode_threshold)
    }

    /// Generate three reels and decide the outcome
    pub fn compute_spin<R: Rng>(&self, input: &SpinInput, rng: &mut R) -> ComputedSpin {
        let mode = self.mode_for(input.locked_bet);
        let reels = self.generator.generate_spin(mode, rng);
        self.compute_from_reels(input, reels, rng)
    }

    /// Decide the outcome for already generated reels
    ///
    /// Short reels are padded before their result symbol is read.
    pub fn compute_from_reels<R: Rng + ?Sized>(
        &self,
        input: &SpinInput,
        mut reels: [Reel; REEL_COUNT],
        rng: &mut R,
    ) -> ComputedSpin {
        let mode = self.mode_for(input.locked_bet);
        let symbols: [Symbol; REEL_COUNT] =
            std::array::from_fn(|i| self.generator.result_symbol(&mut reels[i], mode, rng));

        let (primary, result, overrides) = self.resolve_symbols(symbols, input);
        ComputedSpin {
            locked_bet: input.locked_bet,
            mode,
            reels,
            symbols,
            primary,
            result,
            overrides,
            event_factor: input.event_factor,
            jackpot_pool: input.current_jackpot,
        }
    }

    /// Resolver plus override chain for fixed result symbols
    pub fn resolve_symbols(
        &self,
        symbols: [Symbol; REEL_COUNT],
        input: &SpinInput,
    ) -> (SpinResult, SpinResult, Vec<OverrideKind>) {
        let primary = self.resolver.resolve(
            symbols,
            input.locked_bet.amount(),
            input.current_jackpot,
        );
        let ctx = OverrideContext {
            symbols,
            locked_bet: input.locked_bet,
            balance_before_wager: input.balance_before_wager,
            balance_after_wager: input.balance_after_wager,
            event_factor: input.event_factor,
        };
        let (result, overrides) = self.chain.apply(primary.clone(), &ctx);
        (primary, result, overrides)
    }
}
