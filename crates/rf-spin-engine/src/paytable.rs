//! Paytable and exact multiplier arithmetic
//!
//! Multipliers are stored in basis points so every payout is computed in
//! integers and floored exactly once.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::symbols::Symbol;

/// Basis points in 1.0
pub const BPS_SCALE: u64 = 10_000;

/// Non-negative rational in basis points (10_000 = 1.0)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ratio(u32);

impl Ratio {
    pub const ZERO: Ratio = Ratio(0);
    pub const ONE: Ratio = Ratio(BPS_SCALE as u32);

    /// Create from basis points
    pub const fn from_bps(bps: u32) -> Self {
        Self(bps)
    }

    /// Create from a whole multiplier (e.g. 10 → 10×)
    pub const fn whole(multiplier: u32) -> Self {
        Self(multiplier.saturating_mul(BPS_SCALE as u32))
    }

    /// Basis points
    pub const fn bps(self) -> u32 {
        self.0
    }

    /// Approximate value, for display and stats only
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / BPS_SCALE as f64
    }

    /// `1 − self`, clamped at zero
    pub fn complement(self) -> Ratio {
        Ratio((BPS_SCALE as u32).saturating_sub(self.0))
    }

    /// `floor(amount × self)`
    pub fn apply(self, amount: u64) -> u64 {
        saturating_u64(amount as u128 * self.0 as u128 / BPS_SCALE as u128)
    }

    /// `floor(amount × self × other)` with a single rounding step
    pub fn apply_both(self, other: Ratio, amount: u64) -> u64 {
        let scale = BPS_SCALE as u128 * BPS_SCALE as u128;
        saturating_u64(amount as u128 * self.0 as u128 * other.0 as u128 / scale)
    }
}

fn saturating_u64(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// Multipliers for one symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutEntry {
    /// Paid when all three result symbols match
    pub three_of_a_kind: Ratio,
    /// Paid when exactly two result symbols match
    pub two_of_a_kind: Ratio,
}

impl PayoutEntry {
    pub const fn new(three_of_a_kind: Ratio, two_of_a_kind: Ratio) -> Self {
        Self {
            three_of_a_kind,
            two_of_a_kind,
        }
    }
}

/// Immutable symbol → multiplier map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayoutTable {
    entries: BTreeMap<Symbol, PayoutEntry>,
}

impl PayoutTable {
    /// Empty table (every lookup falls back)
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Standard table covering both symbol sets
    ///
    /// Every two-of-a-kind multiplier stays at or below 2× so pair payouts
    /// remain under the 2× three-of-a-kind floor after the house edge.
    pub fn standard() -> Self {
        let rows = [
            (Symbol::Cherry, 30_000, 18_000),
            (Symbol::Lemon, 20_000, 12_000),
            (Symbol::Orange, 25_000, 13_000),
            (Symbol::Grape, 35_000, 14_000),
            (Symbol::Bell, 50_000, 15_000),
            (Symbol::Star, 80_000, 16_000),
            (Symbol::Diamond, 100_000, 15_000),
            (Symbol::Seven, 500_000, 20_000),
            (Symbol::Devil, 150_000, 17_000),
            (Symbol::Fire, 40_000, 13_000),
            (Symbol::Skull, 20_000, 11_000),
            (Symbol::Bolt, 60_000, 14_000),
        ];

        let entries = rows
            .into_iter()
            .map(|(symbol, three, two)| {
                (
                    symbol,
                    PayoutEntry::new(Ratio::from_bps(three), Ratio::from_bps(two)),
                )
            })
            .collect();

        Self { entries }
    }

    /// Builder: set or replace one entry
    pub fn with_entry(mut self, symbol: Symbol, entry: PayoutEntry) -> Self {
        self.entries.insert(symbol, entry);
        self
    }

    /// Look up a symbol
    pub fn get(&self, symbol: Symbol) -> Option<&PayoutEntry> {
        self.entries.get(&symbol)
    }

    pub fn three_of_a_kind(&self, symbol: Symbol) -> Option<Ratio> {
        self.get(symbol).map(|e| e.three_of_a_kind)
    }

    pub fn two_of_a_kind(&self, symbol: Symbol) -> Option<Ratio> {
        self.get(symbol).map(|e| e.two_of_a_kind)
    }

    /// Iterate entries in symbol order
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &PayoutEntry)> {
        self.entries.iter().map(|(s, e)| (*s, e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PayoutTable {
    fn default() -> Self {
        Self::standard()
    }
}
