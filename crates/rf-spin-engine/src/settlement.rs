//! Settlement outcomes and the reconciliation log
//!
//! Every ledger call made for a spin ends up as a [`SettlementRecord`]: the
//! service value when the call succeeded, the local arithmetic otherwise.
//! Fallbacks are also appended to the session [`ReconciliationLog`].

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::ServiceResult;

/// Which ledger operation was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementKind {
    Debit,
    Credit,
    StakeXp,
    WinXp,
    JackpotRead,
    JackpotIncrease,
    JackpotReset,
}

impl SettlementKind {
    pub fn name(self) -> &'static str {
        match self {
            SettlementKind::Debit => "debit",
            SettlementKind::Credit => "credit",
            SettlementKind::StakeXp => "stake_xp",
            SettlementKind::WinXp => "win_xp",
            SettlementKind::JackpotRead => "jackpot_read",
            SettlementKind::JackpotIncrease => "jackpot_increase",
            SettlementKind::JackpotReset => "jackpot_reset",
        }
    }
}

/// Result of one settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Settlement {
    /// Service accepted the call; `value` is what it returned
    Confirmed { value: u64 },
    /// Service failed; `value` was computed locally
    LocalFallback { value: u64, reason: String },
}

impl Settlement {
    /// Value adopted as the new truth
    pub fn value(&self) -> u64 {
        match self {
            Settlement::Confirmed { value } | Settlement::LocalFallback { value, .. } => *value,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, Settlement::Confirmed { .. })
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Settlement::LocalFallback { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Settlement::LocalFallback { reason, .. } => Some(reason),
            Settlement::Confirmed { .. } => None,
        }
    }
}

/// One settled ledger call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub kind: SettlementKind,
    /// Amount sent to the service
    pub requested: u64,
    pub settlement: Settlement,
}

impl SettlementRecord {
    /// Settle a service outcome, falling back to `local` on failure
    pub fn from_outcome<T>(
        kind: SettlementKind,
        requested: u64,
        outcome: ServiceResult<T>,
        confirmed: impl FnOnce(&T) -> u64,
        local: u64,
    ) -> Self {
        let settlement = match outcome {
            Ok(response) => Settlement::Confirmed {
                value: confirmed(&response),
            },
            Err(e) => {
                log::warn!(
                    "[Settlement] {} of {} failed, using local value {}: {}",
                    kind.name(),
                    requested,
                    local,
                    e
                );
                Settlement::LocalFallback {
                    value: local,
                    reason: e.to_string(),
                }
            }
        };
        Self {
            kind,
            requested,
            settlement,
        }
    }

    pub fn value(&self) -> u64 {
        self.settlement.value()
    }
}

/// A settlement that fell back to local arithmetic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationEntry {
    pub at: DateTime<Utc>,
    pub spin_id: String,
    pub player_id: String,
    pub kind: SettlementKind,
    pub requested: u64,
    pub local_value: u64,
    pub reason: String,
}

/// Per-session record of drift between local state and the service
#[derive(Debug, Default)]
pub struct ReconciliationLog {
    entries: RwLock<Vec<ReconciliationEntry>>,
}

impl ReconciliationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every fallback among `records`; returns how many were added
    pub fn record_all(&self, spin_id: &str, player_id: &str, records: &[SettlementRecord]) -> usize {
        let now = Utc::now();
        let fallbacks: Vec<ReconciliationEntry> = records
            .iter()
            .filter_map(|record| match &record.settlement {
                Settlement::LocalFallback { value, reason } => Some(ReconciliationEntry {
                    at: now,
                    spin_id: spin_id.to_string(),
                    player_id: player_id.to_string(),
                    kind: record.kind,
                    requested: record.requested,
                    local_value: *value,
                    reason: reason.clone(),
                }),
                Settlement::Confirmed { .. } => None,
            })
            .collect();

        let added = fallbacks.len();
        if added > 0 {
            self.entries.write().extend(fallbacks);
        }
        added
    }

    pub fn entries(&self) -> Vec<ReconciliationEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Hand the pending entries to a reconciler
    pub fn drain(&self) -> Vec<ReconciliationEntry> {
        std::mem::take(&mut *self.entries.write())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;

    #[test]
    fn test_confirmed_uses_service_value() {
        let record = SettlementRecord::from_outcome(
            SettlementKind::Debit,
            100,
            Ok::<u64, ServiceError>(880),
            |v| *v,
            900,
        );
        assert_eq!(record.settlement, Settlement::Confirmed { value: 880 });
        assert!(record.settlement.reason().is_none());
    }

    #[test]
    fn test_failure_falls_back() {
        let record = SettlementRecord::from_outcome(
            SettlementKind::Credit,
            50,
            Err::<u64, _>(ServiceError::Unavailable("down".into())),
            |v| *v,
            950,
        );
        assert!(record.settlement.is_fallback());
        assert_eq!(record.value(), 950);
        assert_eq!(record.settlement.reason(), Some("Service unavailable: down"));
    }

    #[test]
    fn test_log_keeps_only_fallbacks() {
        let log = ReconciliationLog::new();
        let records = vec![
            SettlementRecord {
                kind: SettlementKind::Debit,
                requested: 100,
                settlement: Settlement::Confirmed { value: 900 },
            },
            SettlementRecord {
                kind: SettlementKind::JackpotIncrease,
                requested: 50,
                settlement: Settlement::LocalFallback {
                    value: 5050,
                    reason: "timeout".into(),
                },
            },
        ];

        assert_eq!(log.record_all("spin-1", "p1", &records), 1);
        let entries = log.entries();
        assert_eq!(entries[0].kind, SettlementKind::JackpotIncrease);
        assert_eq!(entries[0].local_value, 5050);

        assert_eq!(log.drain().len(), 1);
        assert!(log.is_empty());
    }

    #[test]
    fn test_settlement_wire_format() {
        let json = serde_json::to_value(Settlement::LocalFallback {
            value: 1,
            reason: "x".into(),
        })
        .unwrap();
        assert_eq!(json["status"], "local_fallback");
    }
}
