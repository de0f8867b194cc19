//! StageEvent — A stage occurrence with metadata
//!
//! Wraps a Stage with timing, payload, and source information.

use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// A stage event with full metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
    /// The canonical stage
    pub stage: Stage,

    /// Timestamp in milliseconds from the start of the spin
    pub timestamp_ms: f64,

    /// Additional payload data
    #[serde(default)]
    pub payload: StagePayload,

    /// Custom tags for filtering/routing
    #[serde(default)]
    pub tags: Vec<String>,
}

impl StageEvent {
    /// Create a new stage event
    pub fn new(stage: Stage, timestamp_ms: f64) -> Self {
        Self {
            stage,
            timestamp_ms,
            payload: StagePayload::default(),
            tags: Vec::new(),
        }
    }

    /// Create with payload
    pub fn with_payload(stage: Stage, timestamp_ms: f64, payload: StagePayload) -> Self {
        Self {
            stage,
            timestamp_ms,
            payload,
            tags: Vec::new(),
        }
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Get stage type name
    pub fn type_name(&self) -> &'static str {
        self.stage.type_name()
    }
}

/// Additional payload data for a stage event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StagePayload {
    // ═══ WIN DATA ═══
    /// Total win amount
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_amount: Option<u64>,

    /// Locked bet amount (for ratio calculations)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bet_amount: Option<u64>,

    /// Win-to-bet ratio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_ratio: Option<f64>,

    /// Event multiplier applied to the win
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<u8>,

    // ═══ SYMBOL DATA ═══
    /// Symbol mode the reels were drawn from ("normal", "devil")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_mode: Option<String>,

    // ═══ FEATURE DATA ═══
    /// Free spins remaining
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spins_remaining: Option<u32>,

    // ═══ JACKPOT DATA ═══
    /// Jackpot pool amount seen by this spin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jackpot_pool: Option<u64>,

    // ═══ GAME STATE ═══
    /// Spin ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spin_id: Option<String>,
}

impl StagePayload {
    /// Create empty payload
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with win data
    pub fn with_win(win_amount: u64, bet_amount: Option<u64>) -> Self {
        let win_ratio = bet_amount.map(|bet| {
            if bet > 0 {
                win_amount as f64 / bet as f64
            } else {
                0.0
            }
        });

        Self {
            win_amount: Some(win_amount),
            bet_amount,
            win_ratio,
            ..Default::default()
        }
    }

    /// Builder: set bet amount
    pub fn bet_amount(mut self, amount: u64) -> Self {
        self.bet_amount = Some(amount);
        self
    }

    /// Builder: set multiplier
    pub fn multiplier(mut self, factor: u8) -> Self {
        self.multiplier = Some(factor);
        self
    }

    /// Builder: set symbol mode
    pub fn symbol_mode(mut self, mode: impl Into<String>) -> Self {
        self.symbol_mode = Some(mode.into());
        self
    }

    /// Builder: set spins remaining
    pub fn spins_remaining(mut self, spins: u32) -> Self {
        self.spins_remaining = Some(spins);
        self
    }

    /// Builder: set jackpot pool
    pub fn jackpot_pool(mut self, pool: u64) -> Self {
        self.jackpot_pool = Some(pool);
        self
    }

    /// Builder: set spin ID
    pub fn spin_id(mut self, id: impl Into<String>) -> Self {
        self.spin_id = Some(id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_event_creation() {
        let event = StageEvent::new(Stage::SpinStart, 0.0).with_tag("free_spin");

        assert_eq!(event.stage, Stage::SpinStart);
        assert_eq!(event.timestamp_ms, 0.0);
        assert_eq!(event.type_name(), "spin_start");
        assert!(event.tags.contains(&"free_spin".to_string()));
    }

    #[test]
    fn test_payload_win_ratio() {
        let payload = StagePayload::with_win(50_000, Some(1000));
        assert_eq!(payload.win_ratio, Some(50.0));

        let zero_bet = StagePayload::with_win(10, Some(0));
        assert_eq!(zero_bet.win_ratio, Some(0.0));

        let no_bet = StagePayload::with_win(10, None);
        assert_eq!(no_bet.win_ratio, None);
    }

    #[test]
    fn test_payload_serialization() {
        let payload = StagePayload::with_win(1710, Some(1000)).multiplier(3);

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("win_amount"));
        assert!(json.contains("multiplier"));

        // Empty fields should be skipped
        assert!(!json.contains("jackpot_pool"));
    }
}
