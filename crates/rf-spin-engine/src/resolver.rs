//! Outcome resolution for the three result symbols

use serde::{Deserialize, Serialize};

use crate::config::PayoutConfig;
use crate::paytable::{PayoutTable, Ratio};
use crate::symbols::Symbol;

/// Which payline matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineType {
    Three,
    /// Reels 0 and 1
    TwoLeft,
    /// Reels 1 and 2
    TwoMiddle,
    /// Reels 0 and 2
    TwoRight,
    None,
}

impl LineType {
    pub fn name(self) -> &'static str {
        match self {
            LineType::Three => "three",
            LineType::TwoLeft => "two-left",
            LineType::TwoMiddle => "two-middle",
            LineType::TwoRight => "two-right",
            LineType::None => "none",
        }
    }
}

/// Outcome of one spin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinResult {
    pub win: bool,
    pub amount: u64,
    pub is_jackpot: bool,
    pub line_type: LineType,
    /// Loss converted into a consolation payout
    pub is_pity_win: bool,
    /// Two wilds followed by a non-wild
    #[serde(default)]
    pub near_miss: bool,
    /// Progression credit granted on top of win XP
    #[serde(default)]
    pub bonus_xp: u64,
    /// Event multiplier applied to `amount`
    #[serde(default)]
    pub event_factor: Option<u8>,
}

impl SpinResult {
    /// Plain loss
    pub fn loss() -> Self {
        Self {
            win: false,
            amount: 0,
            is_jackpot: false,
            line_type: LineType::None,
            is_pity_win: false,
            near_miss: false,
            bonus_xp: 0,
            event_factor: None,
        }
    }

    /// Paying line
    pub fn line_win(amount: u64, line_type: LineType) -> Self {
        Self {
            win: true,
            amount,
            line_type,
            ..Self::loss()
        }
    }

    /// Jackpot on three wilds
    pub fn jackpot(amount: u64) -> Self {
        Self {
            is_jackpot: true,
            ..Self::line_win(amount, LineType::Three)
        }
    }

    /// Consolation payout on an otherwise losing spin
    pub fn pity(amount: u64) -> Self {
        Self {
            win: true,
            amount,
            is_pity_win: true,
            ..Self::loss()
        }
    }

    /// Win that counts toward the streak
    pub fn is_genuine_win(&self) -> bool {
        self.win && !self.is_pity_win
    }
}

/// Deterministic resolver over the payout table
#[derive(Debug, Clone)]
pub struct OutcomeResolver {
    table: PayoutTable,
    house_edge: Ratio,
    three_floor: u64,
    three_cap: u64,
    pair_floor: Ratio,
    pair_fallback: Ratio,
}

impl OutcomeResolver {
    pub fn new(config: &PayoutConfig) -> Self {
        Self {
            table: config.table.clone(),
            house_edge: config.house_edge,
            three_floor: config.three_of_a_kind_floor,
            three_cap: config.three_of_a_kind_cap,
            pair_floor: config.pair_floor,
            pair_fallback: config.pair_fallback,
        }
    }

    pub fn table(&self) -> &PayoutTable {
        &self.table
    }

    /// Resolve the result symbols for a locked bet
    ///
    /// `current_jackpot` is only consulted on three wilds.
    pub fn resolve(&self, symbols: [Symbol; 3], locked_bet: u64, current_jackpot: u64) -> SpinResult {
        let [a, b, c] = symbols;

        if a == b && b == c {
            if a.is_wild() {
                return SpinResult::jackpot(self.jackpot_amount(locked_bet, current_jackpot));
            }
            return SpinResult::line_win(self.three_of_a_kind_amount(a, locked_bet), LineType::Three);
        }

        // Two wilds on the first reels are the near-miss pattern, not a pair
        if a == b && a.is_wild() {
            return SpinResult::loss();
        }

        let pair = if a == b {
            Some((a, LineType::TwoLeft))
        } else if b == c {
            Some((b, LineType::TwoMiddle))
        } else if a == c {
            Some((a, LineType::TwoRight))
        } else {
            None
        };

        match pair {
            Some((symbol, line)) => {
                SpinResult::line_win(self.two_of_a_kind_amount(symbol, locked_bet), line)
            }
            None => SpinResult::loss(),
        }
    }

    /// `max(current, bet × three-of-a-kind)`, no house edge
    pub fn jackpot_amount(&self, locked_bet: u64, current_jackpot: u64) -> u64 {
        let multiplier = self
            .table
            .three_of_a_kind(crate::symbols::WILD)
            .unwrap_or(Ratio::whole(self.three_cap as u32));
        multiplier.apply(locked_bet).max(current_jackpot)
    }

    /// `min(max(bet × floor, ⌊bet × m × (1 − edge)⌋), bet × cap)`
    pub fn three_of_a_kind_amount(&self, symbol: Symbol, locked_bet: u64) -> u64 {
        let floor = locked_bet.saturating_mul(self.three_floor);
        let cap = locked_bet.saturating_mul(self.three_cap);
        let raw = self
            .table
            .three_of_a_kind(symbol)
            .map(|m| m.apply_both(self.house_edge.complement(), locked_bet))
            .unwrap_or(0);
        raw.max(floor).min(cap)
    }

    /// `max(⌊bet × m × (1 − edge)⌋, ⌊bet × pair floor⌋)`
    pub fn two_of_a_kind_amount(&self, symbol: Symbol, locked_bet: u64) -> u64 {
        let multiplier = self.table.two_of_a_kind(symbol).unwrap_or(self.pair_fallback);
        let raw = multiplier.apply_both(self.house_edge.complement(), locked_bet);
        raw.max(self.pair_floor.apply(locked_bet))
    }
}

impl Default for OutcomeResolver {
    fn default() -> Self {
        Self::new(&PayoutConfig::default())
    }
}
