//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use log::{info, warn};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use crate::adapters::csv_adapter::CsvQuoteAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::memory_report::MemoryReport;
use crate::domain::config_validation::{build_accounts, validate_simulation_config, AccountSetup};
use crate::domain::error::SimError;
use crate::domain::report::SharedSink;
use crate::domain::simulation::{Simulation, SimulationResult};
use crate::ports::config_port::ConfigPort;
use crate::ports::quote_port::QuotePort;

#[derive(Parser, Debug)]
#[command(name = "tradesim", about = "Strategy simulator over historical quotes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a simulation
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Write every reported series as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration without loading quotes
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the quote range of the instruments in a data directory
    Info {
        #[arg(short, long)]
        data_dir: PathBuf,
        #[arg(long)]
        instrument: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run { config, output } => run_simulation(&config, output.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info {
            data_dir,
            instrument,
        } => run_info(&data_dir, instrument.as_deref()),
    }
}

fn report_error(err: &SimError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SimError> {
    FileConfigAdapter::from_file(path).map_err(|e| SimError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Instruments needed by all accounts, sorted and unique.
pub fn required_instruments(setups: &[AccountSetup]) -> Vec<String> {
    let mut names: Vec<String> = setups
        .iter()
        .flat_map(|s| s.instruments.iter().cloned())
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Loads, builds and runs everything one configuration describes.
pub fn simulate(
    config: &dyn ConfigPort,
    sink: Option<SharedSink>,
) -> Result<SimulationResult, SimError> {
    let mut settings = validate_simulation_config(config)?;
    let setups = build_accounts(config, sink.as_ref())?;
    let mut instruments = required_instruments(&setups);
    instruments.extend(settings.dividends.companion_instruments().cloned());
    instruments.sort();
    instruments.dedup();

    info!(
        "loading {} instrument(s) from {}",
        instruments.len(),
        settings.data_dir.display()
    );
    let adapter = CsvQuoteAdapter::new(settings.data_dir.clone()).with_spread(settings.spread);
    let mut quotes = adapter.fetch(&instruments)?;
    if quotes.is_empty() {
        return Err(SimError::QuoteData {
            reason: "no quotes loaded".into(),
        });
    }

    if let Some(file) = &settings.dividends_file {
        for (name, dividend) in adapter.read_dividends(file)? {
            settings.dividends.add_payment(name, dividend);
        }
    }
    settings.dividends.apply(&mut quotes);

    let mut simulation = Simulation::new(settings.simulation, quotes);
    if let Some(sink) = sink {
        simulation = simulation.with_sink(sink);
    }
    for setup in setups {
        simulation.add_account(setup.account);
    }
    Ok(simulation.run())
}

fn print_summary(result: &SimulationResult) {
    match (result.first_instant, result.last_instant) {
        (Some(first), Some(last)) => {
            eprintln!("\n=== {} instants, {} to {} ===", result.instants, first, last)
        }
        _ => eprintln!("\n=== no instants in range ==="),
    }
    for account in &result.accounts {
        let m = &account.metrics;
        eprintln!("\n[{}] {}", account.id, account.strategy);
        eprintln!("  Final NAV:        {:.2}", account.final_nav);
        eprintln!("  Cash:             {:.2}", account.cash);
        eprintln!("  Total Return:     {:.2}%", m.total_return * 100.0);
        eprintln!("  Annualized:       {:.2}%", m.annualized_return * 100.0);
        eprintln!("  Max Drawdown:     -{:.1}%", m.max_drawdown * 100.0);
        eprintln!("  Drawdown Length:  {} instants", m.max_drawdown_duration);
        eprintln!("  Costs:            {:.2}", account.total_costs);
        eprintln!("  Withdrawn:        {:.2}", account.total_withdrawn);
    }
}

fn run_simulation(config_path: &Path, output: Option<&Path>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return report_error(&e),
    };

    let output = output
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("simulation", "output").map(PathBuf::from));

    let report = Rc::new(RefCell::new(MemoryReport::new()));
    let sink: SharedSink = report.clone();
    let result = match simulate(&config, Some(sink)) {
        Ok(r) => r,
        Err(e) => return report_error(&e),
    };
    print_summary(&result);

    if let Some(path) = output {
        if let Err(e) = report.borrow().write_csv_file(&path) {
            return report_error(&e);
        }
        eprintln!("\nReport written to: {}", path.display());
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return report_error(&e),
    };
    let settings = match validate_simulation_config(&config) {
        Ok(s) => s,
        Err(e) => return report_error(&e),
    };
    let setups = match build_accounts(&config, None) {
        Ok(s) => s,
        Err(e) => return report_error(&e),
    };

    eprintln!("Data directory: {}", settings.data_dir.display());
    for setup in &setups {
        eprintln!(
            "  account {}: {} on {}",
            setup.account.id,
            setup.account.strategy_name(),
            setup.instruments.join(", ")
        );
    }
    eprintln!("Configuration is valid");
    ExitCode::SUCCESS
}

fn run_info(data_dir: &Path, instrument: Option<&str>) -> ExitCode {
    let adapter = CsvQuoteAdapter::new(data_dir.to_path_buf());
    let names = match instrument {
        Some(name) => vec![name.to_string()],
        None => match adapter.list_instruments() {
            Ok(names) => names,
            Err(e) => return report_error(&e),
        },
    };
    if names.is_empty() {
        warn!("no CSV files in {}", data_dir.display());
    }

    for name in &names {
        match adapter.read_instrument(name) {
            Ok(quotes) => match (quotes.first(), quotes.last()) {
                (Some((first, _)), Some((last, _))) => {
                    println!("{name}: {} quotes, {first} to {last}", quotes.len())
                }
                _ => println!("{name}: no quotes"),
            },
            Err(e) if instrument.is_some() => return report_error(&e),
            Err(e) => eprintln!("warning: skipping {name} ({e})"),
        }
    }
    ExitCode::SUCCESS
}
