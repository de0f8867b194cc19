//! # rf-ledger — Bot Service Adapter for ReelForge
//!
//! Implements the spin engine's collaborator contracts
//! ([`CurrencyService`], [`JackpotService`], [`ProgressionService`],
//! [`LeaderboardService`]) against the external bot service HTTP API.
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use rf_ledger::BotServiceClientBuilder;
//! use rf_spin_engine::Collaborators;
//!
//! let client = BotServiceClientBuilder::new("https://bot.example.com/api/")
//!     .api_key("secret")
//!     .timeout_ms(3000)
//!     .build()?;
//! let collaborators = Collaborators::from_shared(Arc::new(client));
//! ```
//!
//! [`CurrencyService`]: rf_spin_engine::CurrencyService
//! [`JackpotService`]: rf_spin_engine::JackpotService
//! [`ProgressionService`]: rf_spin_engine::ProgressionService
//! [`LeaderboardService`]: rf_spin_engine::LeaderboardService

pub mod client;
pub mod error;

pub use client::*;
pub use error::*;
