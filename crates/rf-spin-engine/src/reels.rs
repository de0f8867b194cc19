//! Reel generation
//!
//! Every position is a two-bucket draw: with the loss probability a symbol
//! is taken uniformly from the losing subset, otherwise from the weighted
//! profitable pool. The result position is re-rolled independently after
//! the reel is filled.

use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{ReelConfig, SymbolTable};
use crate::error::{ConfigError, ConfigResult};
use crate::symbols::{Symbol, SymbolMode};

/// Reels per spin
pub const REEL_COUNT: usize = 3;

/// A generated reel with its designated result position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reel {
    symbols: Vec<Symbol>,
    result_index: usize,
}

impl Reel {
    /// Wrap existing symbols (may be short; see [`ReelGenerator::repair`])
    pub fn new(symbols: Vec<Symbol>, result_index: usize) -> Self {
        Self {
            symbols,
            result_index,
        }
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn result_index(&self) -> usize {
        self.result_index
    }

    /// Symbol at the result position, if the reel is long enough
    pub fn result_symbol(&self) -> Option<Symbol> {
        self.symbols.get(self.result_index).copied()
    }
}

/// Losing subset plus a prepared weighted sampler
#[derive(Debug, Clone)]
struct PreparedTable {
    losing: Vec<Symbol>,
    profitable: Vec<Symbol>,
    weights: WeightedIndex<u32>,
}

impl PreparedTable {
    fn new(table: &SymbolTable, mode: SymbolMode) -> ConfigResult<Self> {
        if table.losing.is_empty() {
            return Err(ConfigError::Weights {
                mode,
                reason: "losing subset is empty".into(),
            });
        }
        let weights = WeightedIndex::new(table.profitable.iter().map(|w| w.weight)).map_err(
            |e| ConfigError::Weights {
                mode,
                reason: e.to_string(),
            },
        )?;

        Ok(Self {
            losing: table.losing.clone(),
            profitable: table.profitable.iter().map(|w| w.symbol).collect(),
            weights,
        })
    }
}

/// Weighted, loss-biased reel generator
#[derive(Debug, Clone)]
pub struct ReelGenerator {
    length: usize,
    result_index: usize,
    loss_probability: f64,
    normal: PreparedTable,
    devil: PreparedTable,
}

impl ReelGenerator {
    /// Build from validated reel tables
    pub fn new(config: &ReelConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            length: config.length,
            result_index: config.result_index(),
            loss_probability: config.loss_probability(),
            normal: PreparedTable::new(&config.normal, SymbolMode::Normal)?,
            devil: PreparedTable::new(&config.devil, SymbolMode::Devil)?,
        })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn result_index(&self) -> usize {
        self.result_index
    }

    fn table(&self, mode: SymbolMode) -> &PreparedTable {
        match mode {
            SymbolMode::Normal => &self.normal,
            SymbolMode::Devil => &self.devil,
        }
    }

    /// Draw one symbol with the two-bucket policy
    pub fn draw<R: Rng + ?Sized>(&self, mode: SymbolMode, rng: &mut R) -> Symbol {
        let table = self.table(mode);
        if rng.random::<f64>() < self.loss_probability {
            table.losing[rng.random_range(0..table.losing.len())]
        } else {
            table.profitable[table.weights.sample(rng)]
        }
    }

    /// Fill a full reel, then re-roll the result position
    pub fn generate<R: Rng + ?Sized>(&self, mode: SymbolMode, rng: &mut R) -> Reel {
        let mut symbols: Vec<Symbol> = (0..self.length).map(|_| self.draw(mode, rng)).collect();
        if let Some(slot) = symbols.get_mut(self.result_index) {
            *slot = self.draw(mode, rng);
        }
        Reel::new(symbols, self.result_index)
    }

    /// Generate the three reels of a spin, each from its own stream
    pub fn generate_spin<R: Rng>(&self, mode: SymbolMode, rng: &mut R) -> [Reel; REEL_COUNT] {
        std::array::from_fn(|_| {
            let mut reel_rng = ChaCha8Rng::from_rng(&mut *rng);
            self.generate(mode, &mut reel_rng)
        })
    }

    /// Pad a short reel with fresh draws; returns how many were added
    pub fn repair<R: Rng + ?Sized>(&self, reel: &mut Reel, mode: SymbolMode, rng: &mut R) -> usize {
        let target = self.length.max(reel.result_index + 1);
        let missing = target.saturating_sub(reel.symbols.len());
        if missing > 0 {
            log::debug!(
                "[ReelGenerator] Padding short reel: {} of {} symbols",
                reel.symbols.len(),
                target
            );
            reel.symbols.extend((0..missing).map(|_| self.draw(mode, rng)));
        }
        missing
    }

    /// Result symbol of a reel, repairing it first if needed
    pub fn result_symbol<R: Rng + ?Sized>(
        &self,
        reel: &mut Reel,
        mode: SymbolMode,
        rng: &mut R,
    ) -> Symbol {
        self.repair(reel, mode, rng);
        match reel.result_symbol() {
            Some(symbol) => symbol,
            None => self.draw(mode, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeightedSymbol;

    fn generator() -> ReelGenerator {
        ReelGenerator::new(&ReelConfig::default()).unwrap()
    }

    #[test]
    fn test_generated_reel_shape() {
        let generator = generator();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let reel = generator.generate(SymbolMode::Normal, &mut rng);
        assert_eq!(reel.len(), 50);
        assert_eq!(reel.result_index(), 37);
        assert!(reel.result_symbol().is_some());
        assert!(reel.symbols().iter().all(|s| SymbolMode::Normal.contains(*s)));
    }

    #[test]
    fn test_devil_reels_use_devil_set() {
        let generator = generator();
        let mut rng = ChaCha8Rng::seed_from_u64(99);

        for reel in generator.generate_spin(SymbolMode::Devil, &mut rng) {
            assert!(reel.symbols().iter().all(|s| SymbolMode::Devil.contains(*s)));
        }
    }

    #[test]
    fn test_spin_is_reproducible_from_seed() {
        let generator = generator();
        let a = generator.generate_spin(SymbolMode::Normal, &mut ChaCha8Rng::seed_from_u64(42));
        let b = generator.generate_spin(SymbolMode::Normal, &mut ChaCha8Rng::seed_from_u64(42));
        assert_eq!(a, b);
        assert_ne!(a[0], a[1]);
    }

    #[test]
    fn test_loss_bucket_dominates() {
        let generator = generator();
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        let losing = [Symbol::Lemon, Symbol::Orange, Symbol::Grape];

        let draws = 20_000;
        let hits = (0..draws)
            .filter(|_| losing.contains(&generator.draw(SymbolMode::Normal, &mut rng)))
            .count();
        let share = hits as f64 / draws as f64;
        assert!((0.57..0.63).contains(&share), "loss share {share}");
    }

    #[test]
    fn test_full_loss_rate_never_draws_profitable() {
        let mut config = ReelConfig::default();
        config.global_loss_rate = 1.0;
        let generator = ReelGenerator::new(&config).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let reel = generator.generate(SymbolMode::Normal, &mut rng);
        assert!(reel.symbols().iter().all(|s| config.normal.losing.contains(s)));
    }

    #[test]
    fn test_repair_pads_short_reel() {
        let generator = generator();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut reel = Reel::new(vec![Symbol::Cherry; 10], 37);

        assert_eq!(reel.result_symbol(), None);
        let symbol = generator.result_symbol(&mut reel, SymbolMode::Normal, &mut rng);
        assert_eq!(reel.len(), 50);
        assert_eq!(reel.result_symbol(), Some(symbol));
        assert_eq!(&reel.symbols()[..10], &[Symbol::Cherry; 10]);

        assert_eq!(generator.repair(&mut reel, SymbolMode::Normal, &mut rng), 0);
    }

    #[test]
    fn test_zero_weights_rejected() {
        let mut config = ReelConfig::default();
        config.normal.profitable = vec![WeightedSymbol::new(Symbol::Cherry, 0)];
        assert!(ReelGenerator::new(&config).is_err());
    }
}
