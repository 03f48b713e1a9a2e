//! Configuration validation and assembly.
//!
//! `[simulation]` names the quote directory, the date range and where
//! dividends come from. Every
//! `[account.<id>]` section becomes one account: its ledger settings, a
//! strategy and an optional market timing. Everything is checked before a
//! simulation runs.

use chrono::NaiveDate;
use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::account::Account;
use crate::domain::assessor::MomentumAssessorConfig;
use crate::domain::dividends::DividendSources;
use crate::domain::error::SimError;
use crate::domain::market_timing::{
    DoubleMarketTiming, EmaMarketTiming, EmaTimingConfig, MarketTiming, MultipleMarketTiming,
    NullMarketTiming, StopLossConfig, StopLossMarketTiming, SuperthonConfig, SuperthonMarketTiming,
};
use crate::domain::periodicity::Periodicity;
use crate::domain::portfolio::{DividendMode, PortfolioConfig};
use crate::domain::report::{Emitter, SharedSink};
use crate::domain::simulation::SimulationConfig;
use crate::domain::strategy::{
    Allocation, BuyAndHoldConfig, BuyAndHoldStrategy, FixedAllocationConfig,
    FixedAllocationStrategy, NullStrategy, PeriodicTransfer, RebalanceMode, RebalancingConfig,
    RebalancingStrategy, Strategy,
};
use crate::domain::universe::parse_names;
use crate::ports::config_port::ConfigPort;

const SIMULATION: &str = "simulation";
const ACCOUNT_PREFIX: &str = "account.";

/// Validated `[simulation]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    pub data_dir: PathBuf,
    pub simulation: SimulationConfig,
    /// Spread applied to every quote loaded.
    pub spread: f64,
    /// Derived dividend series; explicit payments are added once
    /// `dividends_file` is read.
    pub dividends: DividendSources,
    pub dividends_file: Option<PathBuf>,
}

/// An account plus the instruments its strategy and timing need quoted.
#[derive(Debug)]
pub struct AccountSetup {
    pub account: Account,
    pub instruments: Vec<String>,
}

pub fn validate_simulation_config(config: &dyn ConfigPort) -> Result<SimulationSettings, SimError> {
    let data_dir = config
        .get_string(SIMULATION, "data_dir")
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| SimError::missing(SIMULATION, "data_dir"))?;

    let start = optional_date(config, SIMULATION, "start_date")?;
    let end = optional_date(config, SIMULATION, "end_date")?;
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(SimError::invalid(SIMULATION, "start_date", "start_date must not be after end_date"));
        }
    }

    let spread = config.get_double(SIMULATION, "spread", 0.0);
    if !(0.0..1.0).contains(&spread) {
        return Err(SimError::invalid(SIMULATION, "spread", "spread must be in [0, 1)"));
    }

    Ok(SimulationSettings {
        data_dir: PathBuf::from(data_dir.trim()),
        simulation: SimulationConfig { start, end },
        spread,
        dividends: dividend_sources(config)?,
        dividends_file: optional_name(config, SIMULATION, "dividends_file").map(PathBuf::from),
    })
}

/// `adjusted_close_dividends = A, B` and
/// `total_return_dividends = A:A_TR, B:B_TR`.
fn dividend_sources(config: &dyn ConfigPort) -> Result<DividendSources, SimError> {
    let adjusted_close = match config.get_string(SIMULATION, "adjusted_close_dividends") {
        Some(raw) => parse_names(&raw)
            .map_err(|e| SimError::invalid(SIMULATION, "adjusted_close_dividends", e.to_string()))?,
        None => Vec::new(),
    };

    let key = "total_return_dividends";
    let total_return = match config.get_string(SIMULATION, key) {
        Some(raw) => raw
            .split(',')
            .map(|token| match token.split_once(':') {
                Some((name, tr)) if !name.trim().is_empty() && !tr.trim().is_empty() => {
                    Ok((name.trim().to_string(), tr.trim().to_string()))
                }
                _ => Err(SimError::invalid(
                    SIMULATION,
                    key,
                    format!("expected NAME:TOTAL_RETURN_NAME, got '{}'", token.trim()),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    if let Some((name, _)) = total_return.iter().find(|(n, _)| adjusted_close.contains(n)) {
        return Err(SimError::invalid(
            SIMULATION,
            key,
            format!("{name} already takes dividends from its adjusted close"),
        ));
    }

    Ok(DividendSources {
        adjusted_close,
        total_return,
        ..Default::default()
    })
}

/// Ids of all `[account.<id>]` sections, sorted.
pub fn account_ids(config: &dyn ConfigPort) -> Vec<String> {
    let mut ids: Vec<String> = config
        .sections()
        .into_iter()
        .filter_map(|s| s.strip_prefix(ACCOUNT_PREFIX).map(str::to_string))
        .filter(|id| !id.is_empty())
        .collect();
    ids.sort();
    ids
}

/// Builds every configured account. Emitters are attached when a sink is
/// given.
pub fn build_accounts(
    config: &dyn ConfigPort,
    sink: Option<&SharedSink>,
) -> Result<Vec<AccountSetup>, SimError> {
    let ids = account_ids(config);
    if ids.is_empty() {
        return Err(SimError::missing("account.<id>", "strategy"));
    }
    ids.iter().map(|id| build_account(config, id, sink)).collect()
}

pub fn build_account(
    config: &dyn ConfigPort,
    id: &str,
    sink: Option<&SharedSink>,
) -> Result<AccountSetup, SimError> {
    let section = format!("{ACCOUNT_PREFIX}{id}");
    let section = section.as_str();
    let emitter = |scope: &str| match sink {
        Some(sink) if scope.is_empty() => Emitter::new(sink.clone(), id),
        Some(sink) => Emitter::new(sink.clone(), format!("{id}.{scope}")),
        None => Emitter::disabled(),
    };

    let portfolio = portfolio_config(config, section)?;
    let kind = config
        .get_string(section, "strategy")
        .ok_or_else(|| SimError::missing(section, "strategy"))?;

    let mut instruments = Vec::new();
    let strategy: Box<dyn Strategy> = match kind.trim().to_lowercase().as_str() {
        "buy_and_hold" => {
            let mut bh = buy_and_hold_config(config, section)?;
            instruments.push(bh.instrument.clone());
            instruments.extend(bh.safe_instrument.clone());
            let timing = market_timing(config, section, &emitter)?;
            if timing.is_some() {
                bh.timing_instrument = timing_instrument(config, section, Some(&bh.instrument))?;
                instruments.extend(bh.timing_instrument.clone());
            }
            match timing {
                Some(timing) => Box::new(BuyAndHoldStrategy::with_timing(bh, timing)),
                None => Box::new(BuyAndHoldStrategy::new(bh)),
            }
        }
        "fixed_allocation" => {
            let fa = fixed_allocation_config(config, section)?;
            instruments.extend(fa.allocations.iter().filter_map(|a| a.name.clone()));
            Box::new(FixedAllocationStrategy::new(fa)?)
        }
        "rebalancing" => {
            let mut rb = rebalancing_config(config, section)?;
            instruments.extend(rb.universe.iter().cloned());
            let timing = market_timing(config, section, &emitter)?;
            if timing.is_some() {
                rb.timing_instrument = timing_instrument(config, section, None)?;
                instruments.extend(rb.timing_instrument.clone());
            }
            Box::new(RebalancingStrategy::new(
                rb,
                timing.unwrap_or_else(|| Box::new(NullMarketTiming)),
            ))
        }
        "none" | "cash" => Box::new(NullStrategy),
        other => {
            return Err(SimError::invalid(
                section,
                "strategy",
                format!("unknown strategy '{other}' (expected buy_and_hold, fixed_allocation, rebalancing or none)"),
            ));
        }
    };

    instruments.sort();
    instruments.dedup();
    let account = Account::new(id, portfolio, strategy).with_emitter(emitter(""));
    Ok(AccountSetup {
        account,
        instruments,
    })
}

fn portfolio_config(config: &dyn ConfigPort, section: &str) -> Result<PortfolioConfig, SimError> {
    let cash = config.get_double(section, "cash", 0.0);
    if cash < 0.0 {
        return Err(SimError::invalid(section, "cash", "cash must be non-negative"));
    }
    let settlement_days = config.get_int(section, "settlement_days", 0);
    let settlement_days = u32::try_from(settlement_days)
        .map_err(|_| SimError::invalid(section, "settlement_days", "settlement_days must be non-negative"))?;
    let transfer_cost = config.get_double(section, "transfer_cost", 0.0);
    if transfer_cost < 0.0 {
        return Err(SimError::invalid(section, "transfer_cost", "transfer_cost must be non-negative"));
    }
    let dividend_mode = parsed(config, section, "dividend_mode")?.unwrap_or(DividendMode::Percentage);

    Ok(PortfolioConfig {
        cash,
        settlement_days,
        transfer_cost,
        dividend_mode,
    })
}

fn buy_and_hold_config(config: &dyn ConfigPort, section: &str) -> Result<BuyAndHoldConfig, SimError> {
    let instrument = required_name(config, section, "instrument")?;
    let safe_instrument = optional_name(config, section, "safe_instrument");

    let transfer = match config.get_string(section, "transfer_amount") {
        None => None,
        Some(raw) => {
            let amount: f64 = raw
                .trim()
                .parse()
                .map_err(|_| SimError::invalid(section, "transfer_amount", "not a number"))?;
            if amount <= 0.0 {
                return Err(SimError::invalid(section, "transfer_amount", "transfer_amount must be positive"));
            }
            let periodicity =
                parsed(config, section, "transfer_periodicity")?.unwrap_or(Periodicity::Monthly);
            Some(PeriodicTransfer {
                periodicity,
                amount,
            })
        }
    };

    Ok(BuyAndHoldConfig {
        instrument,
        safe_instrument,
        timing_instrument: None,
        transfer,
    })
}

/// `NAME:PERCENT` pairs separated by commas. A missing name or percentage
/// is kept as `None` so the strategy reports the precise mistake.
fn parse_allocations(section: &str, raw: &str) -> Result<Vec<Allocation>, SimError> {
    raw.split(',')
        .map(|token| {
            let (name, pct) = match token.split_once(':') {
                Some((name, pct)) => (name.trim(), pct.trim()),
                None => (token.trim(), ""),
            };
            let percentage = if pct.is_empty() {
                None
            } else {
                Some(pct.parse::<f64>().map_err(|_| {
                    SimError::invalid(section, "allocations", format!("invalid percentage '{pct}'"))
                })?)
            };
            Ok(Allocation {
                name: (!name.is_empty()).then(|| name.to_string()),
                percentage,
            })
        })
        .collect()
}

fn fixed_allocation_config(config: &dyn ConfigPort, section: &str) -> Result<FixedAllocationConfig, SimError> {
    let raw = config
        .get_string(section, "allocations")
        .ok_or_else(|| SimError::missing(section, "allocations"))?;
    let allocations = parse_allocations(section, &raw)?;

    let mode = match config.get_string(section, "rebalance").as_deref().map(str::trim) {
        None | Some("periodic") => RebalanceMode::Periodic,
        Some("drift") => RebalanceMode::Drift,
        Some(other) => {
            return Err(SimError::invalid(
                section,
                "rebalance",
                format!("unknown mode '{other}' (expected periodic or drift)"),
            ));
        }
    };
    let drift_threshold = config.get_double(section, "drift_threshold", 5.0);
    if drift_threshold <= 0.0 {
        return Err(SimError::invalid(section, "drift_threshold", "drift_threshold must be positive"));
    }

    Ok(FixedAllocationConfig {
        allocations,
        mode,
        periodicity: parsed(config, section, "periodicity")?,
        drift_threshold,
    })
}

fn rebalancing_config(config: &dyn ConfigPort, section: &str) -> Result<RebalancingConfig, SimError> {
    let defaults = RebalancingConfig::default();
    let universe = match config.get_string(section, "universe") {
        Some(raw) => parse_names(&raw).map_err(|e| SimError::invalid(section, "universe", e.to_string()))?,
        None => return Err(SimError::missing(section, "universe")),
    };
    let top_of_index = positive(config, section, "top_of_index", defaults.top_of_index)?;

    let assessor_defaults = MomentumAssessorConfig::default();
    let assessor = MomentumAssessorConfig {
        momentum_samples: positive(config, section, "momentum_samples", assessor_defaults.momentum_samples)?,
        moving_average_samples: positive(
            config,
            section,
            "moving_average_samples",
            assessor_defaults.moving_average_samples,
        )?,
        atr_periods: positive(config, section, "atr_periods", assessor_defaults.atr_periods)?,
        max_gap: config.get_double(section, "max_gap", assessor_defaults.max_gap),
        risk_factor: config.get_double(section, "risk_factor", assessor_defaults.risk_factor),
        max_position_fraction: config.get_double(
            section,
            "max_position_fraction",
            assessor_defaults.max_position_fraction,
        ),
        rsi_periods: positive(config, section, "rsi_periods", assessor_defaults.rsi_periods)?,
        max_rsi: parsed::<Percent>(config, section, "max_rsi")?.map(|p| p.0),
    };
    if assessor.max_position_fraction <= 0.0 || assessor.max_position_fraction > 1.0 {
        return Err(SimError::invalid(
            section,
            "max_position_fraction",
            "max_position_fraction must be in (0, 1]",
        ));
    }

    Ok(RebalancingConfig {
        position_rebalance: parsed(config, section, "position_rebalance")?
            .unwrap_or(defaults.position_rebalance),
        portfolio_rebalance: parsed(config, section, "portfolio_rebalance")?
            .unwrap_or(defaults.portfolio_rebalance),
        top_of_index,
        universe,
        timing_instrument: None,
        assessor,
    })
}

/// An RSI level in [0, 100].
struct Percent(f64);

impl FromStr for Percent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<f64>() {
            Ok(v) if (0.0..=100.0).contains(&v) => Ok(Percent(v)),
            _ => Err(format!("'{}' is not a number in [0, 100]", s.trim())),
        }
    }
}

fn timing_instrument(
    config: &dyn ConfigPort,
    section: &str,
    fallback: Option<&String>,
) -> Result<Option<String>, SimError> {
    match optional_name(config, section, "timing_instrument").or_else(|| fallback.cloned()) {
        Some(name) => Ok(Some(name)),
        None => Err(SimError::missing(section, "timing_instrument")),
    }
}

/// `timing` lists detector kinds; several kinds are AND-combined.
/// `double` pairs a `bear_timing` exit detector with a `bull_timing` entry
/// detector.
fn market_timing(
    config: &dyn ConfigPort,
    section: &str,
    emitter: &dyn Fn(&str) -> Emitter,
) -> Result<Option<Box<dyn MarketTiming>>, SimError> {
    let Some(raw) = config.get_string(section, "timing") else {
        return Ok(None);
    };
    let kinds: Vec<String> = raw
        .split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty() && k != "none")
        .collect();

    let mut timings = kinds
        .iter()
        .map(|kind| match kind.as_str() {
            "double" => {
                let bear = required_name(config, section, "bear_timing")?;
                let bull = required_name(config, section, "bull_timing")?;
                Ok(Box::new(
                    DoubleMarketTiming::new(
                        detector(config, section, "bear_timing", &bear.to_lowercase(), emitter)?,
                        detector(config, section, "bull_timing", &bull.to_lowercase(), emitter)?,
                    )
                    .with_emitter(emitter("DOUBLE")),
                ) as Box<dyn MarketTiming>)
            }
            other => detector(config, section, "timing", other, emitter),
        })
        .collect::<Result<Vec<_>, SimError>>()?;

    Ok(match timings.len() {
        0 => None,
        1 => timings.pop(),
        _ => Some(Box::new(MultipleMarketTiming::new(timings).with_emitter(emitter("TIMING")))),
    })
}

fn detector(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    kind: &str,
    emitter: &dyn Fn(&str) -> Emitter,
) -> Result<Box<dyn MarketTiming>, SimError> {
    let periodicity = parsed(config, section, "timing_periodicity")?;
    Ok(match kind {
        "ema" => {
            let defaults = EmaTimingConfig::default();
            let short_period = positive(config, section, "ema_short", defaults.short_period)?;
            let long_period = positive(config, section, "ema_long", defaults.long_period)?;
            if short_period >= long_period {
                return Err(SimError::invalid(section, "ema_short", "ema_short must be below ema_long"));
            }
            let trigger_period = match config.get_string(section, "ema_trigger") {
                Some(_) => Some(positive(config, section, "ema_trigger", 1)?),
                None => None,
            };
            Box::new(
                EmaMarketTiming::new(EmaTimingConfig {
                    periodicity: periodicity.unwrap_or(defaults.periodicity),
                    short_period,
                    long_period,
                    trigger_period,
                })
                .with_emitter(emitter("EMA")),
            )
        }
        "superthon" => {
            let defaults = SuperthonConfig::default();
            Box::new(
                SuperthonMarketTiming::new(SuperthonConfig {
                    periodicity: periodicity.unwrap_or(defaults.periodicity),
                    periods: positive(config, section, "superthon_periods", defaults.periods)?,
                    threshold: config.get_double(section, "superthon_threshold", defaults.threshold),
                })
                .with_emitter(emitter("SUPERTHON")),
            )
        }
        "stop_loss" => {
            let defaults = StopLossConfig::default();
            let multiplier = config.get_double(section, "stop_loss_multiplier", defaults.multiplier);
            if multiplier <= 0.0 {
                return Err(SimError::invalid(section, "stop_loss_multiplier", "multiplier must be positive"));
            }
            Box::new(
                StopLossMarketTiming::new(StopLossConfig {
                    atr_periods: positive(config, section, "stop_loss_atr", defaults.atr_periods)?,
                    multiplier,
                })
                .with_emitter(emitter("STOPLOSS")),
            )
        }
        other => {
            return Err(SimError::invalid(
                section,
                key,
                format!("unknown timing '{other}' (expected ema, superthon, stop_loss or double)"),
            ));
        }
    })
}

fn optional_date(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<NaiveDate>, SimError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| SimError::invalid(section, key, format!("invalid {key} format, expected YYYY-MM-DD"))),
    }
}

fn parsed<T>(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<T>, SimError>
where
    T: FromStr<Err = String>,
{
    config
        .get_string(section, key)
        .map(|raw| raw.parse::<T>().map_err(|e| SimError::invalid(section, key, e)))
        .transpose()
}

fn positive(config: &dyn ConfigPort, section: &str, key: &str, default: usize) -> Result<usize, SimError> {
    let value = config.get_int(section, key, default as i64);
    match usize::try_from(value) {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(SimError::invalid(section, key, format!("{key} must be a positive integer"))),
    }
}

fn optional_name(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn required_name(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, SimError> {
    optional_name(config, section, key).ok_or_else(|| SimError::missing(section, key))
}
