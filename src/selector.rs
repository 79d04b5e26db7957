//! Chooses between a full-strength and a reduced engine on every move, based on temperature

use log::{debug, info};
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    config::EngineConfig,
    difficulty::Difficulty,
    error::{ConfigError, SearchError},
    evaluator::Weights,
    game::GameState,
    search::{ensure_playable, Searcher, Strategy},
    thermal::{ThermalMonitor, ThermalReading},
};

/// Delegates each move to the standard engine, or to the reduced one while overheating
///
/// The monitor is read exactly once per move request, and the whole search for
/// that move runs on whichever engine the reading selected.
pub struct ThermalAwareSelector {
    monitor: ThermalMonitor,
    standard: Box<dyn Strategy>,
    reduced: Box<dyn Strategy>,
    config: Option<EngineConfig>,
    last_reading: Option<ThermalReading>,
    throttled: bool,
}

impl ThermalAwareSelector {
    pub fn new(
        monitor: ThermalMonitor,
        standard: Box<dyn Strategy>,
        reduced: Box<dyn Strategy>,
    ) -> Self {
        Self {
            monitor,
            standard,
            reduced,
            config: None,
            last_reading: None,
            throttled: false,
        }
    }

    /// Plain searchers at two depths, the reduced one with lightweight weights
    pub fn depth_pair(monitor: ThermalMonitor, standard_depth: u8, reduced_depth: u8) -> Self {
        Self::new(
            monitor,
            Box::new(Searcher::new(standard_depth, Weights::STANDARD)),
            Box::new(Searcher::new(reduced_depth, Weights::LIGHTWEIGHT)),
        )
    }

    /// Both engines play `difficulty`, the reduced one at its reduced depth
    pub fn for_difficulty(monitor: ThermalMonitor, difficulty: Difficulty, seed: u64) -> Self {
        let config = EngineConfig {
            difficulty,
            seed,
            ..Default::default()
        };
        let (standard, reduced) = build_engines(&config);
        Self {
            config: Some(config),
            ..Self::new(monitor, standard, reduced)
        }
    }

    pub fn from_config(
        config: &EngineConfig,
        monitor: ThermalMonitor,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let monitor = monitor
            .with_threshold(config.threshold)
            .with_cache_ttl(config.cache_ttl);
        let (standard, reduced) = build_engines(config);
        Ok(Self {
            config: Some(config.clone()),
            ..Self::new(monitor, standard, reduced)
        })
    }

    /// Rebuilds both engines for `difficulty`
    ///
    /// Depth overrides from an earlier configuration are dropped, the new
    /// difficulty plays at its own depths.
    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        let mut config = self.config.take().unwrap_or_default();
        config.difficulty = difficulty;
        config.standard_depth = None;
        config.reduced_depth = None;

        let (standard, reduced) = build_engines(&config);
        self.standard = standard;
        self.reduced = reduced;
        self.config = Some(config);
    }

    /// None for selectors assembled from arbitrary engines
    pub fn difficulty(&self) -> Option<Difficulty> {
        self.config.as_ref().map(|config| config.difficulty)
    }

    pub fn standard_depth(&self) -> u8 {
        self.standard.depth()
    }

    pub fn reduced_depth(&self) -> u8 {
        self.reduced.depth()
    }

    /// The reading that decided the most recent move
    pub fn last_reading(&self) -> Option<ThermalReading> {
        self.last_reading
    }

    pub fn monitor_mut(&mut self) -> &mut ThermalMonitor {
        &mut self.monitor
    }

    pub fn find_best_move(&mut self, state: &GameState) -> Result<usize, SearchError> {
        ensure_playable(state)?;

        let reading = self.monitor.reading();
        self.last_reading = Some(reading);

        if reading.overheating != self.throttled {
            self.throttled = reading.overheating;
            if reading.overheating {
                info!(
                    "{:.1}°C is over the {:.1}°C threshold, searching at depth {}",
                    reading.temperature,
                    self.monitor.threshold(),
                    self.reduced.depth()
                );
            } else {
                info!(
                    "cooled to {:.1}°C, back to depth {}",
                    reading.temperature,
                    self.standard.depth()
                );
            }
        }

        let engine = if reading.overheating {
            &mut self.reduced
        } else {
            &mut self.standard
        };
        let column = engine.find_best_move(state)?;
        debug!(
            "selector played column {} at depth {} ({:.1}°C)",
            column,
            engine.depth(),
            reading.temperature
        );
        Ok(column)
    }
}

impl Strategy for ThermalAwareSelector {
    fn find_best_move(&mut self, state: &GameState) -> Result<usize, SearchError> {
        ThermalAwareSelector::find_best_move(self, state)
    }

    /// The depth the next move would be searched at, going by the last reading
    fn depth(&self) -> u8 {
        if self.throttled {
            self.reduced.depth()
        } else {
            self.standard.depth()
        }
    }
}

fn build_engines(config: &EngineConfig) -> (Box<dyn Strategy>, Box<dyn Strategy>) {
    let searcher = |depth: u8| {
        let mut searcher = config.difficulty.searcher(depth).with_parallel_root(config.parallel);
        if let Some(limit) = config.time_limit {
            searcher = searcher.with_time_limit(limit);
        }
        searcher
    };
    let standard = config.difficulty.strategy(
        searcher(config.standard_depth()),
        StdRng::seed_from_u64(config.seed),
    );
    let reduced = config.difficulty.strategy(
        searcher(config.reduced_depth()),
        StdRng::seed_from_u64(config.seed.wrapping_add(1)),
    );
    (standard, reduced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ThermalError, thermal::FixedTemperature, thermal::TemperatureSource};
    use std::sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    };

    /// A temperature the test can turn up and down
    #[derive(Clone)]
    struct Dial(Arc<AtomicU64>);

    impl Dial {
        fn new(temperature: f64) -> Self {
            Self(Arc::new(AtomicU64::new(temperature.to_bits())))
        }

        fn set(&self, temperature: f64) {
            self.0.store(temperature.to_bits(), Ordering::SeqCst);
        }
    }

    impl TemperatureSource for Dial {
        fn sample_temperature(&mut self) -> Result<f64, ThermalError> {
            Ok(f64::from_bits(self.0.load(Ordering::SeqCst)))
        }
    }

    /// Records the depth of every engine that was asked for a move
    struct DepthRecorder {
        depth: u8,
        calls: Arc<Mutex<Vec<u8>>>,
    }

    impl Strategy for DepthRecorder {
        fn find_best_move(&mut self, state: &GameState) -> Result<usize, SearchError> {
            self.calls.lock().unwrap().push(self.depth);
            state.legal_moves().first().copied().ok_or(SearchError::NoLegalMoves)
        }

        fn depth(&self) -> u8 {
            self.depth
        }
    }

    fn recorded(dial: &Dial) -> (ThermalAwareSelector, Arc<Mutex<Vec<u8>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let selector = ThermalAwareSelector::new(
            ThermalMonitor::new(dial.clone()),
            Box::new(DepthRecorder {
                depth: 4,
                calls: calls.clone(),
            }),
            Box::new(DepthRecorder {
                depth: 2,
                calls: calls.clone(),
            }),
        );
        (selector, calls)
    }

    #[test]
    fn test_routes_on_temperature() -> Result<(), SearchError> {
        let dial = Dial::new(50.0);
        let (mut selector, calls) = recorded(&dial);
        let state = GameState::default();

        selector.find_best_move(&state)?;
        dial.set(80.0);
        selector.find_best_move(&state)?;
        assert_eq!(Strategy::depth(&selector), 2);
        selector.find_best_move(&state)?;
        dial.set(74.0);
        selector.find_best_move(&state)?;

        assert_eq!(*calls.lock().unwrap(), vec![4, 2, 2, 4]);
        assert_eq!(selector.last_reading().map(|r| r.temperature), Some(74.0));
        Ok(())
    }

    #[test]
    fn test_terminal_state_skips_the_engines() {
        let dial = Dial::new(50.0);
        let (mut selector, calls) = recorded(&dial);
        let state = GameState::from_moves("0101010").unwrap();
        assert_eq!(selector.find_best_move(&state), Err(SearchError::GameOver));
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(selector.last_reading(), None);
    }

    #[test]
    fn test_for_difficulty_depths() {
        for difficulty in Difficulty::ALL {
            let monitor = ThermalMonitor::new(FixedTemperature(40.0));
            let selector = ThermalAwareSelector::for_difficulty(monitor, difficulty, 0);
            assert_eq!(selector.standard_depth(), difficulty.depth());
            assert_eq!(selector.reduced_depth(), difficulty.reduced_depth());
            assert_eq!(selector.difficulty(), Some(difficulty));
        }
    }

    #[test]
    fn test_set_difficulty_rebuilds_engines() {
        let monitor = ThermalMonitor::new(FixedTemperature(40.0));
        let mut selector = ThermalAwareSelector::depth_pair(monitor, 6, 1);
        assert_eq!(selector.difficulty(), None);
        assert_eq!(selector.standard_depth(), 6);

        selector.set_difficulty(Difficulty::Aggressive);
        assert_eq!(selector.difficulty(), Some(Difficulty::Aggressive));
        assert_eq!(selector.standard_depth(), 5);
        assert_eq!(selector.reduced_depth(), 3);
    }

    #[test]
    fn test_from_config() {
        let config = EngineConfig {
            difficulty: Difficulty::Permissive,
            threshold: 60.0,
            standard_depth: Some(3),
            ..Default::default()
        };
        let monitor = ThermalMonitor::new(FixedTemperature(65.0));
        let selector = ThermalAwareSelector::from_config(&config, monitor);
        let mut selector = match selector {
            Ok(selector) => selector,
            Err(err) => panic!("valid config rejected: {}", err),
        };
        assert_eq!(selector.standard_depth(), 3);
        assert_eq!(selector.reduced_depth(), 1);
        assert!(selector.monitor_mut().is_overheating());

        let invalid = EngineConfig {
            standard_depth: Some(0),
            ..Default::default()
        };
        let monitor = ThermalMonitor::new(FixedTemperature(40.0));
        assert!(ThermalAwareSelector::from_config(&invalid, monitor).is_err());
    }
}
