//! Engine configuration
//!
//! Every tunable is a named constant with an overridable field in
//! [`EngineConfig`]. Hosts load overrides from JSON or YAML.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::paytable::{BPS_SCALE, PayoutTable, Ratio};
use crate::symbols::{Symbol, SymbolMode};
use crate::timing::TimingProfile;

// ═══════════════════════════════════════════════════════════════════════════
// DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════

/// Haircut on raw multiplier payouts (5%)
pub const HOUSE_EDGE: Ratio = Ratio::from_bps(500);
/// Largest wager a paid spin may lock
pub const BET_MAX: u64 = 100_000;
/// Locked bets at or above this play the Devil symbol set
pub const DEVIL_MODE_THRESHOLD: u64 = 10_000;
/// Base probability that a reel position draws from the losing subset
pub const GLOBAL_LOSS_RATE: f64 = 0.55;
/// Extra loss bias added on top of [`GLOBAL_LOSS_RATE`]
pub const LOSS_RATE_EPSILON: f64 = 0.05;
/// Symbols per generated reel
pub const REEL_LENGTH: usize = 50;
/// Distance of the result position from the end of the reel
pub const RESULT_OFFSET: usize = 13;

/// Three-of-a-kind floor, in multiples of the locked bet
pub const THREE_OF_A_KIND_FLOOR: u64 = 2;
/// Three-of-a-kind cap, in multiples of the locked bet
pub const THREE_OF_A_KIND_CAP: u64 = 40;
/// Two-of-a-kind floor (1.1×)
pub const PAIR_FLOOR: Ratio = Ratio::from_bps(11_000);
/// Two-of-a-kind multiplier for symbols missing from the table (1.5×)
pub const PAIR_FALLBACK: Ratio = Ratio::from_bps(15_000);

/// Anti-ruin: remaining balance must be below this many stakes
pub const PITY_BALANCE_STAKES: u64 = 5;
/// Anti-ruin: stake must be below this share of the pre-wager balance
pub const PITY_MAX_STAKE_SHARE: Ratio = Ratio::from_bps(3_000);
/// Anti-ruin: stakes above this never qualify
pub const PITY_MAX_BET: u64 = 100_000;
/// Near-miss consolation as a share of the locked bet
pub const NEAR_MISS_PAYOUT: Ratio = Ratio::from_bps(5_000);
/// Progression credit granted with a near-miss consolation
pub const NEAR_MISS_BONUS_XP: u64 = 25;

/// Chance a spin carries an event multiplier
pub const EVENT_MULTIPLIER_PROBABILITY: f64 = 0.02;
/// Event multiplier factors and their relative weights
pub const EVENT_MULTIPLIER_FACTORS: [(u8, u32); 2] = [(2, 70), (3, 30)];

/// Share of a losing stake fed into the jackpot
pub const JACKPOT_CONTRIBUTION: Ratio = Ratio::from_bps(5_000);
/// Stake-to-jackpot currency conversion
pub const JACKPOT_CONVERSION_RATE: Ratio = Ratio::ONE;
/// Pool assumed after a reset when the jackpot service is unreachable
pub const JACKPOT_BASE_AMOUNT: u64 = 5_000;

/// Consecutive genuine wins that unlock free spins
pub const STREAK_TARGET: u8 = 3;
/// Free spins granted per unlock
pub const FREE_SPIN_GRANT: u32 = 3;
/// Stakes remembered for the free-spin average
pub const RECENT_STAKES_WINDOW: usize = 3;
/// Staking XP per credit wagered
pub const XP_PER_STAKE: Ratio = Ratio::from_bps(100);
/// Win XP per credit won
pub const XP_PER_WIN: Ratio = Ratio::from_bps(500);

// ═══════════════════════════════════════════════════════════════════════════
// SECTIONS
// ═══════════════════════════════════════════════════════════════════════════

/// Wager bounds and mode selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WagerConfig {
    pub bet_max: u64,
    pub devil_mode_threshold: u64,
}

impl Default for WagerConfig {
    fn default() -> Self {
        Self {
            bet_max: BET_MAX,
            devil_mode_threshold: DEVIL_MODE_THRESHOLD,
        }
    }
}

/// Symbol with an integer draw weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedSymbol {
    pub symbol: Symbol,
    pub weight: u32,
}

impl WeightedSymbol {
    pub const fn new(symbol: Symbol, weight: u32) -> Self {
        Self { symbol, weight }
    }
}

/// Losing subset and profitable pool for one symbol mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolTable {
    /// Drawn uniformly in the loss bucket
    pub losing: Vec<Symbol>,
    /// Drawn by weight in the profit bucket
    pub profitable: Vec<WeightedSymbol>,
}

impl SymbolTable {
    pub fn normal() -> Self {
        Self {
            losing: vec![Symbol::Lemon, Symbol::Orange, Symbol::Grape],
            profitable: vec![
                WeightedSymbol::new(Symbol::Cherry, 30),
                WeightedSymbol::new(Symbol::Bell, 20),
                WeightedSymbol::new(Symbol::Star, 15),
                WeightedSymbol::new(Symbol::Diamond, 8),
                WeightedSymbol::new(Symbol::Seven, 2),
            ],
        }
    }

    pub fn devil() -> Self {
        Self {
            losing: vec![Symbol::Skull, Symbol::Fire, Symbol::Bolt],
            profitable: vec![
                WeightedSymbol::new(Symbol::Cherry, 25),
                WeightedSymbol::new(Symbol::Bell, 20),
                WeightedSymbol::new(Symbol::Devil, 12),
                WeightedSymbol::new(Symbol::Diamond, 8),
                WeightedSymbol::new(Symbol::Seven, 3),
            ],
        }
    }

    fn validate(&self, mode: SymbolMode) -> ConfigResult<()> {
        if self.losing.is_empty() {
            return Err(ConfigError::Weights {
                mode,
                reason: "losing subset is empty".into(),
            });
        }
        if self.profitable.iter().all(|w| w.weight == 0) {
            return Err(ConfigError::Weights {
                mode,
                reason: "profitable pool has no positive weight".into(),
            });
        }
        let foreign = self
            .losing
            .iter()
            .copied()
            .chain(self.profitable.iter().map(|w| w.symbol))
            .find(|s| !mode.contains(*s));
        if let Some(symbol) = foreign {
            return Err(ConfigError::ForeignSymbol {
                symbol: symbol.to_string(),
                mode,
            });
        }
        Ok(())
    }
}

/// Reel generation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReelConfig {
    pub length: usize,
    pub result_offset: usize,
    pub global_loss_rate: f64,
    pub loss_epsilon: f64,
    pub normal: SymbolTable,
    pub devil: SymbolTable,
}

impl ReelConfig {
    /// Position revealed as the spin result
    pub fn result_index(&self) -> usize {
        self.length.saturating_sub(self.result_offset)
    }

    /// Probability of drawing from the loss bucket
    pub fn loss_probability(&self) -> f64 {
        (self.global_loss_rate + self.loss_epsilon).clamp(0.0, 1.0)
    }

    /// Table for a mode
    pub fn table(&self, mode: SymbolMode) -> &SymbolTable {
        match mode {
            SymbolMode::Normal => &self.normal,
            SymbolMode::Devil => &self.devil,
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.result_offset == 0 || self.result_offset > self.length {
            return Err(ConfigError::invalid(
                "reels.result_offset",
                format!("must be within 1..={}", self.length),
            ));
        }
        if !(0.0..=1.0).contains(&self.global_loss_rate) {
            return Err(ConfigError::invalid(
                "reels.global_loss_rate",
                "must be a probability",
            ));
        }
        if !(0.0..=1.0).contains(&self.loss_epsilon) {
            return Err(ConfigError::invalid("reels.loss_epsilon", "must be a probability"));
        }
        self.normal.validate(SymbolMode::Normal)?;
        self.devil.validate(SymbolMode::Devil)
    }
}

impl Default for ReelConfig {
    fn default() -> Self {
        Self {
            length: REEL_LENGTH,
            result_offset: RESULT_OFFSET,
            global_loss_rate: GLOBAL_LOSS_RATE,
            loss_epsilon: LOSS_RATE_EPSILON,
            normal: SymbolTable::normal(),
            devil: SymbolTable::devil(),
        }
    }
}

/// Payout arithmetic parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayoutConfig {
    pub house_edge: Ratio,
    pub three_of_a_kind_floor: u64,
    pub three_of_a_kind_cap: u64,
    pub pair_floor: Ratio,
    pub pair_fallback: Ratio,
    pub table: PayoutTable,
}

impl PayoutConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.house_edge.bps() as u64 >= BPS_SCALE {
            return Err(ConfigError::invalid("payouts.house_edge", "must be below 100%"));
        }
        if self.three_of_a_kind_floor == 0 || self.three_of_a_kind_floor > self.three_of_a_kind_cap {
            return Err(ConfigError::invalid(
                "payouts.three_of_a_kind_floor",
                "must be positive and not above the cap",
            ));
        }

        for (symbol, entry) in self.table.iter() {
            if entry.three_of_a_kind == Ratio::ZERO || entry.two_of_a_kind == Ratio::ZERO {
                return Err(ConfigError::invalid(
                    "payouts.table",
                    format!("{} multipliers must be positive", symbol.glyph()),
                ));
            }
        }
        if self.pair_fallback == Ratio::ZERO {
            return Err(ConfigError::invalid("payouts.pair_fallback", "must be positive"));
        }

        // Pairs must stay strictly under the three-of-a-kind floor
        let ceiling = self.three_of_a_kind_floor as u128 * (BPS_SCALE as u128).pow(2);
        let keep = self.house_edge.complement().bps() as u128;
        let pair_ratios = self
            .table
            .iter()
            .map(|(_, e)| e.two_of_a_kind)
            .chain([self.pair_fallback]);
        for ratio in pair_ratios {
            if ratio.bps() as u128 * keep >= ceiling {
                return Err(ConfigError::invalid(
                    "payouts.table",
                    format!("two-of-a-kind {}× reaches the three-of-a-kind floor", ratio.as_f64()),
                ));
            }
        }
        if self.pair_floor.bps() as u64 >= self.three_of_a_kind_floor * BPS_SCALE {
            return Err(ConfigError::invalid(
                "payouts.pair_floor",
                "must be below the three-of-a-kind floor",
            ));
        }
        Ok(())
    }
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            house_edge: HOUSE_EDGE,
            three_of_a_kind_floor: THREE_OF_A_KIND_FLOOR,
            three_of_a_kind_cap: THREE_OF_A_KIND_CAP,
            pair_floor: PAIR_FLOOR,
            pair_fallback: PAIR_FALLBACK,
            table: PayoutTable::standard(),
        }
    }
}

/// Near-miss and anti-ruin thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PityConfig {
    pub balance_stakes: u64,
    pub max_stake_share: Ratio,
    pub max_bet: u64,
    pub near_miss_payout: Ratio,
    pub near_miss_bonus_xp: u64,
}

impl Default for PityConfig {
    fn default() -> Self {
        Self {
            balance_stakes: PITY_BALANCE_STAKES,
            max_stake_share: PITY_MAX_STAKE_SHARE,
            max_bet: PITY_MAX_BET,
            near_miss_payout: NEAR_MISS_PAYOUT,
            near_miss_bonus_xp: NEAR_MISS_BONUS_XP,
        }
    }
}

/// Event multiplier factor with relative weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorWeight {
    pub factor: u8,
    pub weight: u32,
}

/// Random per-spin multiplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventMultiplierConfig {
    pub probability: f64,
    pub factors: Vec<FactorWeight>,
}

impl EventMultiplierConfig {
    /// Never fires
    pub fn disabled() -> Self {
        Self {
            probability: 0.0,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !(0.0..=1.0).contains(&self.probability) {
            return Err(ConfigError::invalid(
                "event_multiplier.probability",
                "must be a probability",
            ));
        }
        if self.factors.iter().any(|f| f.factor < 1) {
            return Err(ConfigError::invalid("event_multiplier.factors", "factor must be >= 1"));
        }
        if self.probability > 0.0 && self.factors.iter().all(|f| f.weight == 0) {
            return Err(ConfigError::invalid(
                "event_multiplier.factors",
                "no factor has a positive weight",
            ));
        }
        Ok(())
    }
}

impl Default for EventMultiplierConfig {
    fn default() -> Self {
        Self {
            probability: EVENT_MULTIPLIER_PROBABILITY,
            factors: EVENT_MULTIPLIER_FACTORS
                .iter()
                .map(|&(factor, weight)| FactorWeight { factor, weight })
                .collect(),
        }
    }
}

/// Jackpot contribution on losing spins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JackpotConfig {
    pub contribution: Ratio,
    pub conversion_rate: Ratio,
    pub base_amount: u64,
}

impl JackpotConfig {
    /// `floor(stake × contribution × conversion_rate)`
    pub fn contribution_for(&self, stake: u64) -> u64 {
        self.contribution.apply_both(self.conversion_rate, stake)
    }
}

impl Default for JackpotConfig {
    fn default() -> Self {
        Self {
            contribution: JACKPOT_CONTRIBUTION,
            conversion_rate: JACKPOT_CONVERSION_RATE,
            base_amount: JACKPOT_BASE_AMOUNT,
        }
    }
}

/// Streak, free spins and XP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    pub streak_target: u8,
    pub free_spin_grant: u32,
    pub recent_stakes_window: usize,
    pub xp_per_stake: Ratio,
    pub xp_per_win: Ratio,
}

impl ProgressionConfig {
    /// `max(1, floor(stake × xp_per_stake))`
    pub fn stake_xp(&self, stake: u64) -> u64 {
        self.xp_per_stake.apply(stake).max(1)
    }

    /// `floor(amount × xp_per_win) + bonus`
    pub fn win_xp(&self, amount: u64, bonus: u64) -> u64 {
        self.xp_per_win.apply(amount).saturating_add(bonus)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.streak_target == 0 {
            return Err(ConfigError::invalid("progression.streak_target", "must be positive"));
        }
        if self.recent_stakes_window == 0 {
            return Err(ConfigError::invalid(
                "progression.recent_stakes_window",
                "must be positive",
            ));
        }
        Ok(())
    }
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            streak_target: STREAK_TARGET,
            free_spin_grant: FREE_SPIN_GRANT,
            recent_stakes_window: RECENT_STAKES_WINDOW,
            xp_per_stake: XP_PER_STAKE,
            xp_per_win: XP_PER_WIN,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ENGINE CONFIG
// ═══════════════════════════════════════════════════════════════════════════

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub wager: WagerConfig,
    pub reels: ReelConfig,
    pub payouts: PayoutConfig,
    pub pity: PityConfig,
    pub event_multiplier: EventMultiplierConfig,
    pub jackpot: JackpotConfig,
    pub progression: ProgressionConfig,
    pub timing: TimingProfile,
}

impl EngineConfig {
    /// Default odds with instant reveal (tests, simulations)
    pub fn instant() -> Self {
        Self {
            timing: TimingProfile::Instant,
            ..Default::default()
        }
    }

    /// Builder: replace the timing profile
    pub fn with_timing(mut self, timing: TimingProfile) -> Self {
        self.timing = timing;
        self
    }

    /// Check every section for consistency
    pub fn validate(&self) -> ConfigResult<()> {
        if self.wager.bet_max == 0 {
            return Err(ConfigError::invalid("wager.bet_max", "must be positive"));
        }
        if self.wager.devil_mode_threshold == 0 {
            return Err(ConfigError::invalid(
                "wager.devil_mode_threshold",
                "must be positive",
            ));
        }
        self.reels.validate()?;
        self.payouts.validate()?;
        self.event_multiplier.validate()?;
        self.progression.validate()
    }

    /// Parse and validate JSON
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate YAML
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Export as pretty JSON
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Export as YAML
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paytable::PayoutEntry;

    #[test]
    fn test_default_is_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.reels.result_index(), 37);
        assert!((config.reels.loss_probability() - 0.60).abs() < 1e-12);
    }

    #[test]
    fn test_json_round_trip() {
        let config = EngineConfig::instant();
        let json = config.to_json().unwrap();
        assert!(json.contains("house_edge"));
        let back = EngineConfig::from_json(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let yaml = "wager:\n  bet_max: 5000\ntiming: turbo\n";
        let config = EngineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.wager.bet_max, 5000);
        assert_eq!(config.wager.devil_mode_threshold, DEVIL_MODE_THRESHOLD);
        assert_eq!(config.timing, TimingProfile::Turbo);
    }

    #[test]
    fn test_rejects_pair_reaching_three_floor() {
        let mut config = EngineConfig::default();
        config.payouts.house_edge = Ratio::ZERO;
        config.payouts.table = PayoutTable::standard().with_entry(
            Symbol::Cherry,
            PayoutEntry::new(Ratio::whole(3), Ratio::whole(2)),
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "payouts.table", .. })
        ));
    }

    #[test]
    fn test_rejects_zero_multipliers() {
        let mut config = EngineConfig::default();
        config.payouts.table = PayoutTable::standard().with_entry(
            Symbol::Lemon,
            PayoutEntry::new(Ratio::ZERO, Ratio::from_bps(12_000)),
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "payouts.table", .. })
        ));

        config.payouts.table = PayoutTable::standard().with_entry(
            Symbol::Lemon,
            PayoutEntry::new(Ratio::whole(2), Ratio::ZERO),
        );
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.payouts.pair_fallback = Ratio::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "payouts.pair_fallback", .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_timing_profile() {
        assert!(EngineConfig::from_yaml("timing: custom\n").is_err());
    }

    #[test]
    fn test_rejects_foreign_symbol() {
        let mut config = EngineConfig::default();
        config.reels.normal.losing.push(Symbol::Skull);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ForeignSymbol { mode: SymbolMode::Normal, .. })
        ));
    }

    #[test]
    fn test_rejects_bad_offset_and_rates() {
        let mut config = EngineConfig::default();
        config.reels.result_offset = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.event_multiplier.probability = 1.5;
        assert!(config.validate().is_err());

        assert!(EngineConfig::from_json("{\"wager\": {\"bet_max\": 0}}").is_err());
        assert!(matches!(
            EngineConfig::from_json("not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_xp_and_contribution_formulas() {
        let progression = ProgressionConfig::default();
        assert_eq!(progression.stake_xp(1000), 10);
        assert_eq!(progression.stake_xp(5), 1);
        assert_eq!(progression.win_xp(1710, 0), 85);
        assert_eq!(progression.win_xp(500, 25), 50);

        assert_eq!(JackpotConfig::default().contribution_for(1001), 500);
    }
}
