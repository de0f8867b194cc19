//! Override chain applied after the resolver
//!
//! Rules run in a fixed order: near-miss → anti-ruin → event multiplier.
//! Each rule sees the result produced by the rules before it.

use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{EventMultiplierConfig, PityConfig};
use crate::progression::LockedBet;
use crate::resolver::SpinResult;
use crate::symbols::Symbol;

/// Which override rule changed a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideKind {
    NearMiss,
    AntiRuin,
    EventMultiplier,
}

impl OverrideKind {
    pub fn name(self) -> &'static str {
        match self {
            OverrideKind::NearMiss => "near_miss",
            OverrideKind::AntiRuin => "anti_ruin",
            OverrideKind::EventMultiplier => "event_multiplier",
        }
    }
}

/// Everything an override rule may look at
#[derive(Debug, Clone, Copy)]
pub struct OverrideContext {
    pub symbols: [Symbol; 3],
    pub locked_bet: LockedBet,
    /// Balance before the wager was debited
    pub balance_before_wager: u64,
    pub balance_after_wager: u64,
    /// Factor drawn at spin start, if any
    pub event_factor: Option<u8>,
}

/// A post-resolution rule
pub trait OverrideRule: Send + Sync {
    fn kind(&self) -> OverrideKind;

    /// Return the replacement result, or `None` to leave it alone
    fn apply(&self, result: &SpinResult, ctx: &OverrideContext) -> Option<SpinResult>;
}

// ═══════════════════════════════════════════════════════════════════════════
// NEAR MISS
// ═══════════════════════════════════════════════════════════════════════════

/// Two wilds followed by a non-wild on an otherwise losing spin
#[derive(Debug, Clone)]
pub struct NearMissRule {
    payout: crate::paytable::Ratio,
    bonus_xp: u64,
}

impl NearMissRule {
    pub fn new(config: &PityConfig) -> Self {
        Self {
            payout: config.near_miss_payout,
            bonus_xp: config.near_miss_bonus_xp,
        }
    }

    pub fn matches(symbols: &[Symbol; 3]) -> bool {
        symbols[0].is_wild() && symbols[1].is_wild() && !symbols[2].is_wild()
    }
}

impl OverrideRule for NearMissRule {
    fn kind(&self) -> OverrideKind {
        OverrideKind::NearMiss
    }

    fn apply(&self, result: &SpinResult, ctx: &OverrideContext) -> Option<SpinResult> {
        if result.win || !Self::matches(&ctx.symbols) {
            return None;
        }
        Some(SpinResult {
            near_miss: true,
            bonus_xp: self.bonus_xp,
            ..SpinResult::pity(self.payout.apply(ctx.locked_bet.amount()))
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ANTI-RUIN
// ═══════════════════════════════════════════════════════════════════════════

/// Refund the stake of a losing paid spin when the player is close to broke
#[derive(Debug, Clone)]
pub struct AntiRuinPolicy {
    balance_stakes: u64,
    max_stake_share: crate::paytable::Ratio,
    max_bet: u64,
}

impl AntiRuinPolicy {
    pub fn new(config: &PityConfig) -> Self {
        Self {
            balance_stakes: config.balance_stakes,
            max_stake_share: config.max_stake_share,
            max_bet: config.max_bet,
        }
    }

    /// All three thresholds hold
    pub fn is_eligible(&self, locked_bet: u64, balance_before: u64, balance_after: u64) -> bool {
        let nearly_broke = balance_after < locked_bet.saturating_mul(self.balance_stakes);
        // bet < balance × share, compared in basis points
        let stake_bps = (locked_bet as u128) * (crate::paytable::BPS_SCALE as u128);
        let share_bps = (balance_before as u128) * (self.max_stake_share.bps() as u128);
        let modest_stake = stake_bps < share_bps;
        nearly_broke && modest_stake && locked_bet <= self.max_bet
    }
}

impl OverrideRule for AntiRuinPolicy {
    fn kind(&self) -> OverrideKind {
        OverrideKind::AntiRuin
    }

    fn apply(&self, result: &SpinResult, ctx: &OverrideContext) -> Option<SpinResult> {
        let bet = ctx.locked_bet;
        if result.win || result.near_miss || bet.is_free_spin() {
            return None;
        }
        if !self.is_eligible(bet.amount(), ctx.balance_before_wager, ctx.balance_after_wager) {
            return None;
        }
        Some(SpinResult::pity(bet.amount()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// EVENT MULTIPLIER
// ═══════════════════════════════════════════════════════════════════════════

/// Low-probability ×N modifier drawn at spin start
#[derive(Debug, Clone)]
pub struct EventMultiplier {
    probability: f64,
    factors: Vec<u8>,
    weights: Option<WeightedIndex<u32>>,
}

impl EventMultiplier {
    pub fn new(config: &EventMultiplierConfig) -> Self {
        let weights = WeightedIndex::new(config.factors.iter().map(|f| f.weight)).ok();
        Self {
            probability: config.probability,
            factors: config.factors.iter().map(|f| f.factor).collect(),
            weights,
        }
    }

    /// Draw the factor for this spin, if the event fires
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<u8> {
        let weights = self.weights.as_ref()?;
        if rng.random::<f64>() >= self.probability {
            return None;
        }
        self.factors.get(weights.sample(rng)).copied()
    }
}

impl OverrideRule for EventMultiplier {
    fn kind(&self) -> OverrideKind {
        OverrideKind::EventMultiplier
    }

    fn apply(&self, result: &SpinResult, ctx: &OverrideContext) -> Option<SpinResult> {
        let factor = ctx.event_factor?;
        if !result.win {
            return None;
        }
        Some(SpinResult {
            amount: result.amount.saturating_mul(factor as u64),
            event_factor: Some(factor),
            ..result.clone()
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CHAIN
// ═══════════════════════════════════════════════════════════════════════════

/// Ordered list of override rules
pub struct OverrideChain {
    rules: Vec<Box<dyn OverrideRule>>,
}

impl OverrideChain {
    /// Near-miss → anti-ruin → event multiplier
    pub fn standard(pity: &PityConfig, event: &EventMultiplierConfig) -> Self {
        Self {
            rules: vec![
                Box::new(NearMissRule::new(pity)),
                Box::new(AntiRuinPolicy::new(pity)),
                Box::new(EventMultiplier::new(event)),
            ],
        }
    }

    /// Chain with custom rules, applied in the given order
    pub fn with_rules(rules: Vec<Box<dyn OverrideRule>>) -> Self {
        Self { rules }
    }

    /// Rule kinds in application order
    pub fn kinds(&self) -> Vec<OverrideKind> {
        self.rules.iter().map(|r| r.kind()).collect()
    }

    /// Run every rule; returns the final result and the rules that fired
    pub fn apply(&self, primary: SpinResult, ctx: &OverrideContext) -> (SpinResult, Vec<OverrideKind>) {
        let mut fired = Vec::new();
        let result = self.rules.iter().fold(primary, |current, rule| {
            match rule.apply(&current, ctx) {
                Some(next) => {
                    fired.push(rule.kind());
                    next
                }
                None => current,
            }
        });
        (result, fired)
    }
}

impl std::fmt::Debug for OverrideChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverrideChain")
            .field("rules", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::LineType;
    use Symbol::*;
    use rand_chacha::ChaCha8Rng;

    fn ctx(symbols: [Symbol; 3], bet: LockedBet, before: u64, factor: Option<u8>) -> OverrideContext {
        OverrideContext {
            symbols,
            locked_bet: bet,
            balance_before_wager: before,
            balance_after_wager: before.saturating_sub(if bet.is_free_spin() { 0 } else { bet.amount() }),
            event_factor: factor,
        }
    }

    fn chain() -> OverrideChain {
        OverrideChain::standard(&PityConfig::default(), &EventMultiplierConfig::default())
    }

    #[test]
    fn test_anti_ruin_fires_near_broke() {
        let bet = LockedBet::paid(100_000);
        let (result, fired) = chain().apply(SpinResult::loss(), &ctx([Lemon, Bell, Star], bet, 500_000, None));
        assert_eq!(fired, vec![OverrideKind::AntiRuin]);
        assert!(result.is_pity_win);
        assert_eq!(result.amount, 100_000);
        assert_eq!(result.line_type, LineType::None);
    }

    #[test]
    fn test_anti_ruin_never_fires_above_max_bet() {
        let bet = LockedBet::paid(100_001);
        let policy = AntiRuinPolicy::new(&PityConfig::default());
        let context = ctx([Lemon, Bell, Star], bet, 500_000, None);
        assert!(context.balance_after_wager < 100_001 * 5);
        assert!(policy.apply(&SpinResult::loss(), &context).is_none());
    }

    #[test]
    fn test_anti_ruin_thresholds() {
        let policy = AntiRuinPolicy::new(&PityConfig::default());
        // Plenty of balance left
        assert!(!policy.is_eligible(100, 10_000, 9_900));
        // Stake too large a share of the balance
        assert!(!policy.is_eligible(500, 1_000, 500));
        // Exactly 30% is not below the share
        assert!(!policy.is_eligible(300, 1_000, 700));
        assert!(policy.is_eligible(299, 1_000, 701));
    }

    #[test]
    fn test_anti_ruin_share_at_extreme_balances() {
        let policy = AntiRuinPolicy::new(&PityConfig::default());
        // Products exceed u64 and must still compare correctly
        assert!(policy.is_eligible(100_000, u64::MAX, 0));
        assert!(!policy.is_eligible(100_000, u64::MAX, u64::MAX));
        assert!(policy.is_eligible(100_000, 400_000, 300_000));
        assert!(!policy.is_eligible(100_000, 300_000, 200_000));
    }

    #[test]
    fn test_custom_chain_runs_given_rules_only() {
        let chain = OverrideChain::with_rules(vec![Box::new(AntiRuinPolicy::new(&PityConfig::default()))]);
        assert_eq!(chain.kinds(), vec![OverrideKind::AntiRuin]);

        // Near-miss symbols, but only anti-ruin is in the chain
        let bet = LockedBet::paid(1000);
        let (result, fired) = chain.apply(SpinResult::loss(), &ctx([Seven, Seven, Cherry], bet, 4000, None));
        assert_eq!(fired, vec![OverrideKind::AntiRuin]);
        assert!(!result.near_miss);
        assert_eq!(result.amount, 1000);
    }

    #[test]
    fn test_anti_ruin_skips_free_spins_and_wins() {
        let policy = AntiRuinPolicy::new(&PityConfig::default());
        let free = ctx([Lemon, Bell, Star], LockedBet::free_spin(100), 200, None);
        assert!(policy.apply(&SpinResult::loss(), &free).is_none());

        let paid = ctx([Cherry, Cherry, Star], LockedBet::paid(100), 200, None);
        assert!(policy.apply(&SpinResult::line_win(171, LineType::TwoLeft), &paid).is_none());
    }

    #[test]
    fn test_near_miss_precedes_anti_ruin() {
        let bet = LockedBet::paid(1000);
        let (result, fired) = chain().apply(SpinResult::loss(), &ctx([Seven, Seven, Cherry], bet, 2000, None));
        assert_eq!(fired, vec![OverrideKind::NearMiss]);
        assert!(result.near_miss);
        assert!(result.is_pity_win);
        assert_eq!(result.amount, 500);
        assert_eq!(result.bonus_xp, 25);
    }

    #[test]
    fn test_event_multiplier_only_on_wins() {
        let bet = LockedBet::paid(1000);
        let rich = 1_000_000;

        let (loss, fired) = chain().apply(SpinResult::loss(), &ctx([Lemon, Bell, Star], bet, rich, Some(3)));
        assert!(fired.is_empty());
        assert_eq!(loss.amount, 0);

        let (win, fired) = chain().apply(
            SpinResult::line_win(1710, LineType::TwoLeft),
            &ctx([Cherry, Cherry, Lemon], bet, rich, Some(3)),
        );
        assert_eq!(fired, vec![OverrideKind::EventMultiplier]);
        assert_eq!(win.amount, 5130);
        assert_eq!(win.event_factor, Some(3));
    }

    #[test]
    fn test_event_multiplier_stacks_on_pity() {
        let bet = LockedBet::paid(1000);
        let (result, fired) = chain().apply(SpinResult::loss(), &ctx([Seven, Seven, Lemon], bet, 1_000_000, Some(2)));
        assert_eq!(fired, vec![OverrideKind::NearMiss, OverrideKind::EventMultiplier]);
        assert_eq!(result.amount, 1000);
    }

    #[test]
    fn test_event_draw_distribution() {
        let event = EventMultiplier::new(&EventMultiplierConfig {
            probability: 1.0,
            ..Default::default()
        });
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let draws: Vec<u8> = (0..5_000).filter_map(|_| event.draw(&mut rng)).collect();
        assert_eq!(draws.len(), 5_000);
        let doubles = draws.iter().filter(|f| **f == 2).count() as f64 / 5_000.0;
        assert!((0.66..0.74).contains(&doubles), "×2 share {doubles}");
        assert!(draws.iter().all(|f| *f == 2 || *f == 3));

        let disabled = EventMultiplier::new(&EventMultiplierConfig::disabled());
        assert!((0..1_000).all(|_| disabled.draw(&mut rng).is_none()));
    }

    #[test]
    fn test_chain_order() {
        assert_eq!(
            chain().kinds(),
            vec![OverrideKind::NearMiss, OverrideKind::AntiRuin, OverrideKind::EventMultiplier]
        );
    }
}
