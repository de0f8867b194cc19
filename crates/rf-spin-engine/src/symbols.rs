//! Symbol definitions and the two wager-selected symbol sets

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A reel symbol, serialized as its glyph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Symbol {
    #[serde(rename = "🍒")]
    Cherry,
    #[serde(rename = "🍋")]
    Lemon,
    #[serde(rename = "🍊")]
    Orange,
    #[serde(rename = "🍇")]
    Grape,
    #[serde(rename = "🔔")]
    Bell,
    #[serde(rename = "⭐")]
    Star,
    #[serde(rename = "💎")]
    Diamond,
    /// Wild and jackpot symbol in both modes
    #[serde(rename = "7️⃣")]
    Seven,
    #[serde(rename = "😈")]
    Devil,
    #[serde(rename = "🔥")]
    Fire,
    #[serde(rename = "💀")]
    Skull,
    #[serde(rename = "⚡")]
    Bolt,
}

/// The wild/jackpot symbol
pub const WILD: Symbol = Symbol::Seven;

/// Normal-mode symbol set
pub const NORMAL_SYMBOLS: [Symbol; 8] = [
    Symbol::Cherry,
    Symbol::Lemon,
    Symbol::Orange,
    Symbol::Grape,
    Symbol::Bell,
    Symbol::Star,
    Symbol::Diamond,
    Symbol::Seven,
];

/// Devil-mode symbol set (shares 🍒 🔔 💎 7️⃣ with Normal)
pub const DEVIL_SYMBOLS: [Symbol; 8] = [
    Symbol::Cherry,
    Symbol::Bell,
    Symbol::Diamond,
    Symbol::Seven,
    Symbol::Devil,
    Symbol::Fire,
    Symbol::Skull,
    Symbol::Bolt,
];

impl Symbol {
    /// Every symbol across both sets
    pub const ALL: [Symbol; 12] = [
        Symbol::Cherry,
        Symbol::Lemon,
        Symbol::Orange,
        Symbol::Grape,
        Symbol::Bell,
        Symbol::Star,
        Symbol::Diamond,
        Symbol::Seven,
        Symbol::Devil,
        Symbol::Fire,
        Symbol::Skull,
        Symbol::Bolt,
    ];

    /// Display glyph
    pub fn glyph(self) -> &'static str {
        match self {
            Symbol::Cherry => "🍒",
            Symbol::Lemon => "🍋",
            Symbol::Orange => "🍊",
            Symbol::Grape => "🍇",
            Symbol::Bell => "🔔",
            Symbol::Star => "⭐",
            Symbol::Diamond => "💎",
            Symbol::Seven => "7️⃣",
            Symbol::Devil => "😈",
            Symbol::Fire => "🔥",
            Symbol::Skull => "💀",
            Symbol::Bolt => "⚡",
        }
    }

    /// Check if this is the wild/jackpot symbol
    pub fn is_wild(self) -> bool {
        self == WILD
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glyph())
    }
}

impl FromStr for Symbol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Symbol::ALL
            .iter()
            .copied()
            .find(|sym| sym.glyph() == s)
            .ok_or_else(|| format!("Unknown symbol: {}", s))
    }
}

/// Symbol set selector, chosen purely by wager size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolMode {
    Normal,
    Devil,
}

impl SymbolMode {
    /// Devil mode once the locked bet reaches the threshold
    pub fn for_bet(locked_bet: u64, devil_threshold: u64) -> Self {
        if locked_bet >= devil_threshold {
            Self::Devil
        } else {
            Self::Normal
        }
    }

    /// Symbols available in this mode
    pub fn symbols(self) -> &'static [Symbol] {
        match self {
            Self::Normal => &NORMAL_SYMBOLS,
            Self::Devil => &DEVIL_SYMBOLS,
        }
    }

    /// Check membership
    pub fn contains(self, symbol: Symbol) -> bool {
        self.symbols().contains(&symbol)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Devil => "devil",
        }
    }
}

impl fmt::Display for SymbolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
