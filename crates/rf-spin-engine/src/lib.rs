//! # rf-spin-engine — Spin Resolution Engine for ReelForge
//!
//! Decides what a player wins or loses on each wager of a three-reel slot,
//! enforces the house edge, freezes the wager for the whole spin, grants
//! consolation payouts under configurable rules and unlocks free spins after
//! a win streak.
//!
//! ## Features
//!
//! - **Weighted reels**: loss-biased two-bucket draws, Normal and Devil symbol sets
//! - **Integer payouts**: basis-point multipliers, floors and caps with exact flooring
//! - **Override chain**: near-miss → anti-ruin → event multiplier, in that order
//! - **Progression**: bet lock, win streak, free-spin grants at an averaged stake
//! - **Staged reveal**: compute first, then disclose through timed [`rf_stage::StageEvent`]s
//! - **Explicit settlement**: every ledger call is `Confirmed` or `LocalFallback`
//!
//! ## Architecture
//!
//! ```text
//! SpinOrchestrator (async, one spin in flight per session)
//!     │
//!     ├── BetLockManager / StreakTracker ── ProgressionState
//!     ├── SpinEngine (pure, synchronous)
//!     │       ├── ReelGenerator ── SymbolSet (Normal | Devil)
//!     │       ├── OutcomeResolver ── PayoutTable
//!     │       └── OverrideChain (NearMiss → AntiRuin → EventMultiplier)
//!     ├── Collaborators (currency, jackpot, progression, leaderboard)
//!     └── RevealTimeline ── TimingConfig
//!           │
//!           v
//!     SpinReport + Vec<StageEvent>
//! ```
//!
//! Outcomes are computed in-process from the engine's own RNG. The only
//! player input is the requested wager, so hosts run the engine behind
//! their trust boundary.

pub mod config;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod paytable;
pub mod policy;
pub mod progression;
pub mod reels;
pub mod resolver;
pub mod services;
pub mod settlement;
pub mod simulation;
pub mod stats;
pub mod symbols;
pub mod timing;

pub use config::*;
pub use engine::*;
pub use error::*;
pub use orchestrator::*;
pub use paytable::*;
pub use policy::*;
pub use progression::*;
pub use reels::*;
pub use resolver::*;
pub use services::*;
pub use settlement::*;
pub use simulation::*;
pub use stats::*;
pub use symbols::*;
pub use timing::*;
