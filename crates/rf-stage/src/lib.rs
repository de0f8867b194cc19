//! # rf-stage — ReelForge Reveal Stage System
//!
//! Defines the canonical stages a resolved spin passes through on its way
//! to the player. Presentation never understands engine internals, only STAGES.
//!
//! ## Philosophy
//!
//! Every spin, whatever its outcome, passes through the same semantic phases:
//! - Spin starts → Reels stop one by one → Result evaluated → Win/feature presented
//!
//! The engine computes the whole outcome first; stages are only the
//! timed disclosure of an already-decided result.

pub mod event;
pub mod stage;

pub use event::*;
pub use stage::*;
