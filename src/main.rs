use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rayon::prelude::*;

use std::io::{stdin, stdout, Write};
use std::time::Duration;

use thermal_connect4::thermal::{
    FixedTemperature, PolledTemperature, SimulatedSensor, SysfsSensor, TemperatureSource,
    ThermalMonitor,
};
use thermal_connect4::*;

mod terminal;

/// Play Connect 4 against an engine that eases off when the CPU runs hot
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    mode: Option<Mode>,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Play against the engine on the terminal (the default)
    Play {
        /// Let the engine make the first move
        #[arg(long)]
        engine_first: bool,

        /// Print the board without colours
        #[arg(long)]
        plain: bool,
    },
    /// Pit the configured engine against another difficulty
    Arena {
        #[arg(long, default_value_t = 20)]
        games: u64,

        #[arg(long, default_value = "permissive")]
        opponent: Difficulty,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Sensor {
    /// The Linux thermal zone if present, otherwise a simulation
    Auto,
    Sysfs,
    Simulated,
    Fixed,
}

#[derive(Args, Debug)]
struct EngineArgs {
    /// permissive, balanced or aggressive (easy, medium and hard also work)
    #[arg(short, long, default_value = "balanced")]
    difficulty: Difficulty,

    /// Temperature in °C at which the engine searches shallower
    #[arg(long, default_value_t = 75.0)]
    threshold: f64,

    /// Seconds to reuse a temperature reading
    #[arg(long, default_value_t = 5)]
    cache_secs: u64,

    /// Search depth while cool, defaults to the difficulty's own
    #[arg(long)]
    depth: Option<u8>,

    /// Search depth while overheating, defaults to the difficulty's own
    #[arg(long)]
    reduced_depth: Option<u8>,

    /// Give up deepening after this many milliseconds per move
    #[arg(long)]
    time_limit_ms: Option<u64>,

    /// Search root moves on separate threads
    #[arg(long)]
    parallel: bool,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long, value_enum, default_value_t = Sensor::Auto)]
    sensor: Sensor,

    /// Reported by the fixed sensor
    #[arg(long, default_value_t = 40.0)]
    temperature: f64,

    /// Sample the sensor on a background thread at this interval
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Start the simulated sensor with a heat spike that crosses the threshold
    #[arg(long)]
    spike: bool,
}

impl EngineArgs {
    fn config(&self) -> EngineConfig {
        EngineConfig {
            difficulty: self.difficulty,
            threshold: self.threshold,
            cache_ttl: Duration::from_secs(self.cache_secs),
            standard_depth: self.depth,
            reduced_depth: self.reduced_depth,
            time_limit: self.time_limit_ms.map(Duration::from_millis),
            parallel: self.parallel,
            seed: self.seed,
        }
    }

    fn monitor(&self, seed: u64) -> ThermalMonitor {
        let simulated = || {
            let mut sensor = SimulatedSensor::new(self.temperature, seed);
            if self.spike {
                sensor.trigger_spike();
            }
            sensor
        };
        let sysfs = SysfsSensor::default();
        let source: Box<dyn TemperatureSource> = match self.sensor {
            Sensor::Sysfs => Box::new(sysfs),
            Sensor::Auto if sysfs.path().exists() => Box::new(sysfs),
            Sensor::Auto | Sensor::Simulated => Box::new(simulated()),
            Sensor::Fixed => Box::new(FixedTemperature(self.temperature)),
        };
        match self.poll_ms {
            Some(interval) => {
                let interval = Duration::from_millis(interval);
                ThermalMonitor::new(PolledTemperature::spawn(source, interval))
            }
            None => ThermalMonitor::new(source),
        }
    }

    fn selector(&self, config: &EngineConfig, seed: u64) -> Result<ThermalAwareSelector> {
        Ok(ThermalAwareSelector::from_config(config, self.monitor(seed))?)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.mode {
        None => play(&cli.engine, false, false),
        Some(Mode::Play { engine_first, plain }) => play(&cli.engine, engine_first, plain),
        Some(Mode::Arena { games, opponent }) => arena(&cli.engine, games, opponent),
    }
}

fn play(args: &EngineArgs, engine_first: bool, plain: bool) -> Result<()> {
    let config = args.config();
    let mut selector = args.selector(&config, config.seed)?;
    let engine_player = if engine_first { Player::One } else { Player::Two };
    let mut state = GameState::default();
    let stdin = stdin();

    println!("Welcome to Connect 4, playing {} difficulty\n", config.difficulty);
    println!("Enter a column number, 'r' to restart or 'q' to quit\n");

    loop {
        terminal::display(&state, plain)?;

        match state.outcome() {
            Outcome::InProgress => {
                let next_move = if state.to_move() == engine_player {
                    println!("Engine is thinking...");
                    stdout().flush()?;

                    let column = selector.find_best_move(&state)?;
                    if let Some(reading) = selector.last_reading() {
                        let mode = if reading.overheating { "reduced" } else { "full" };
                        println!(
                            "Engine plays column {} ({:.1}°C, {} depth {})",
                            column,
                            reading.temperature,
                            mode,
                            Strategy::depth(&selector)
                        );
                    }
                    column
                } else {
                    print!("Move input > ");
                    stdout().flush()?;
                    let mut input_str = String::new();
                    if stdin.read_line(&mut input_str)? == 0 {
                        return Ok(());
                    }

                    match input_str.trim() {
                        "q" => return Ok(()),
                        "r" => {
                            state.reset();
                            continue;
                        }
                        other => match other.parse::<usize>() {
                            Err(_) => {
                                println!("Invalid number: {}", other);
                                continue;
                            }
                            Ok(column) => column,
                        },
                    }
                };

                if let Err(err) = state.play_checked(next_move) {
                    println!("{}", err);
                    // try the move again
                    continue;
                }
            }

            // end states
            Outcome::Won(player) => {
                println!("{} wins!", player);
                break;
            }
            Outcome::Draw => {
                println!("Draw!");
                break;
            }
        }
    }
    Ok(())
}

#[derive(Default)]
struct Tally {
    wins: u64,
    losses: u64,
    draws: u64,
}

fn arena(args: &EngineArgs, games: u64, opponent: Difficulty) -> Result<()> {
    let config = args.config();
    config.validate()?;
    let opponent_config = EngineConfig {
        difficulty: opponent,
        standard_depth: None,
        reduced_depth: None,
        ..config.clone()
    };

    let progress = ProgressBar::new(games);
    progress.set_style(
        ProgressStyle::with_template("{msg} {bar:40.cyan/blue} {pos}/{len} ~{eta} remaining")?
            .progress_chars("█▓▒░  "),
    );
    progress.set_message(format!("{} vs {}", config.difficulty, opponent));

    let outcomes = (0..games)
        .into_par_iter()
        .map(|game| -> Result<Option<bool>> {
            let seed = config.seed.wrapping_add(game * 2);
            let mut engine = args.selector(&config, seed)?;
            let mut rival = args.selector(&opponent_config, seed.wrapping_add(1))?;
            // alternate who starts
            let engine_player = if game % 2 == 0 { Player::One } else { Player::Two };

            let mut state = GameState::default();
            while !state.is_game_over() {
                let column = if state.to_move() == engine_player {
                    engine.find_best_move(&state)?
                } else {
                    rival.find_best_move(&state)?
                };
                state.play_checked(column)?;
            }
            progress.inc(1);

            Ok(match state.outcome() {
                Outcome::Won(player) if player == engine_player => Some(true),
                Outcome::Won(_) => Some(false),
                _ => None,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    progress.finish();

    let tally = outcomes.iter().fold(Tally::default(), |mut tally, outcome| {
        match outcome {
            Some(true) => tally.wins += 1,
            Some(false) => tally.losses += 1,
            None => tally.draws += 1,
        }
        tally
    });
    info!("arena finished after {} games", games);

    if outcomes.is_empty() {
        return Err(anyhow!("no games were played"));
    }
    println!(
        "{} vs {}: {} wins, {} losses, {} draws",
        config.difficulty, opponent, tally.wins, tally.losses, tally.draws
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spike_overheats_the_simulated_sensor() -> Result<()> {
        let cli = Cli::try_parse_from([
            "connect4",
            "--sensor",
            "simulated",
            "--temperature",
            "60",
            "--spike",
        ])?;
        let mut monitor = cli.engine.monitor(0);
        let readings: Vec<bool> = (0..SimulatedSensor::SPIKE_SAMPLES)
            .map(|_| monitor.is_overheating())
            .collect();
        // 60 °C plus 2 °C per sample crosses 75 °C on the eighth sample
        assert!(!readings[0]);
        assert!(readings[7..].iter().all(|&hot| hot));
        Ok(())
    }

    #[test]
    fn test_arguments_build_a_valid_config() -> Result<()> {
        let cli =
            Cli::try_parse_from(["connect4", "-d", "hard", "--time-limit-ms", "50", "arena"])?;
        let config = cli.engine.config();
        assert_eq!(config.difficulty, Difficulty::Aggressive);
        assert_eq!(config.time_limit, Some(Duration::from_millis(50)));
        assert!(config.validate().is_ok());
        assert!(matches!(cli.mode, Some(Mode::Arena { games: 20, .. })));
        Ok(())
    }
}
