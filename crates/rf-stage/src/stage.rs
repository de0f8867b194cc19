//! Stage — The core enum defining every reveal phase of a spin
//!
//! A Stage is NOT an animation, NOT an engine event.
//! A Stage is the SEMANTIC MEANING of a moment in the reveal.

use serde::{Deserialize, Serialize};

/// Canonical reveal stage
///
/// Amounts are integer credits, symbols are their display glyphs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Stage {
    // ═══════════════════════════════════════════════════════════════════════
    // SPIN LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════
    /// Wager locked, spin initiated
    SpinStart,

    /// Reel has stopped on its result symbol
    ReelStop {
        /// Which reel stopped (0-indexed)
        reel_index: u8,
        /// Symbol at the result position
        symbol: String,
    },

    /// All reels stopped, result being presented
    EvaluateWins,

    /// Spin complete, ready for next spin
    SpinEnd,

    // ═══════════════════════════════════════════════════════════════════════
    // WIN LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════
    /// Win celebration starting
    WinPresent {
        /// Final credited amount
        win_amount: u64,
        /// Payline that matched ("three", "two-left", ...)
        line_type: String,
    },

    /// Loss converted into a consolation payout
    PityWin {
        /// Refunded amount
        amount: u64,
        /// Rule that granted it ("near_miss", "anti_ruin")
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // JACKPOT
    // ═══════════════════════════════════════════════════════════════════════
    /// Three wild symbols, progressive jackpot won
    JackpotTrigger {
        /// Amount paid out
        amount: u64,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // FEATURES
    // ═══════════════════════════════════════════════════════════════════════
    /// Win streak completed, free spins granted
    FreeSpinsUnlocked {
        /// Spins granted by this unlock
        spins: u32,
        /// Wager every granted spin is played at
        locked_bet: u64,
    },

    /// A free spin is being played
    FreeSpinStart {
        /// Free spins left after this one
        remaining: u32,
    },

    /// Last free spin revealed, back to paid play
    FreeSpinsEnd,

    // ═══════════════════════════════════════════════════════════════════════
    // SPECIAL
    // ═══════════════════════════════════════════════════════════════════════
    /// Two wilds followed by a non-wild
    NearMiss {
        /// Progression credit granted with the consolation
        bonus_xp: u64,
    },

    /// Random event multiplier active for this spin
    EventMultiplier {
        /// Factor applied to a winning amount
        factor: u8,
    },
}

impl Stage {
    /// Get the stage category for grouping
    pub fn category(&self) -> StageCategory {
        match self {
            Stage::SpinStart | Stage::ReelStop { .. } | Stage::EvaluateWins | Stage::SpinEnd => {
                StageCategory::SpinLifecycle
            }

            Stage::WinPresent { .. } | Stage::PityWin { .. } => StageCategory::WinLifecycle,

            Stage::JackpotTrigger { .. } => StageCategory::Jackpot,

            Stage::FreeSpinsUnlocked { .. } | Stage::FreeSpinStart { .. } | Stage::FreeSpinsEnd => {
                StageCategory::Feature
            }

            Stage::NearMiss { .. } | Stage::EventMultiplier { .. } => StageCategory::Special,
        }
    }

    /// Get a simple string name for this stage type
    pub fn type_name(&self) -> &'static str {
        match self {
            Stage::SpinStart => "spin_start",
            Stage::ReelStop { .. } => "reel_stop",
            Stage::EvaluateWins => "evaluate_wins",
            Stage::SpinEnd => "spin_end",
            Stage::WinPresent { .. } => "win_present",
            Stage::PityWin { .. } => "pity_win",
            Stage::JackpotTrigger { .. } => "jackpot_trigger",
            Stage::FreeSpinsUnlocked { .. } => "free_spins_unlocked",
            Stage::FreeSpinStart { .. } => "free_spin_start",
            Stage::FreeSpinsEnd => "free_spins_end",
            Stage::NearMiss { .. } => "near_miss",
            Stage::EventMultiplier { .. } => "event_multiplier",
        }
    }

    /// All known type names
    pub fn all_type_names() -> &'static [&'static str] {
        &[
            "spin_start",
            "reel_stop",
            "evaluate_wins",
            "spin_end",
            "win_present",
            "pity_win",
            "jackpot_trigger",
            "free_spins_unlocked",
            "free_spin_start",
            "free_spins_end",
            "near_miss",
            "event_multiplier",
        ]
    }

    /// Check if a type name is valid
    pub fn is_valid_type_name(name: &str) -> bool {
        Self::all_type_names().contains(&name.to_lowercase().as_str())
    }

    /// Whether presentation should hold the player's attention here
    pub fn is_celebration(&self) -> bool {
        matches!(
            self,
            Stage::WinPresent { .. } | Stage::JackpotTrigger { .. } | Stage::FreeSpinsUnlocked { .. }
        )
    }
}

/// Stage category for grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageCategory {
    SpinLifecycle,
    WinLifecycle,
    Jackpot,
    Feature,
    Special,
}

impl StageCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SpinLifecycle => "Spin Lifecycle",
            Self::WinLifecycle => "Win Lifecycle",
            Self::Jackpot => "Jackpot",
            Self::Feature => "Free Spins",
            Self::Special => "Special",
        }
    }
}
