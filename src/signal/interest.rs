//! Interest filter
//!
//! A flat percentage threshold over-alerts on long shots and under-alerts
//! on favorites: a 10% drop from 1.40 is a major repricing while the same
//! drop from 25.0 is routine noise. The filter keeps one hard percentage
//! floor and lets a move qualify through a range-scaled percentage
//! requirement, an implied-probability gain, or a tick distance on a fixed
//! price ladder.
//!
//! Every boundary value here is tuned policy, not an invariant, so the
//! ladders live in configuration with these values as defaults.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use super::types::probability_gain;

/// One segment of the price ladder: tick size `step` applies on `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TickBand {
    pub from: Decimal,
    pub to: Decimal,
    pub step: Decimal,
}

/// Requirement keyed by the pre-move price: applies while `old < up_to`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct OddsBand {
    pub up_to: Decimal,
    pub value: Decimal,
}

/// Interest filter configuration; all floors independently tunable.
#[derive(Debug, Clone, Deserialize)]
pub struct InterestConfig {
    /// Hard floor: below this drop percentage nothing passes
    #[serde(default = "default_min_drop_pct")]
    pub min_drop_pct: Decimal,

    /// Implied-probability gain that qualifies a move on its own
    #[serde(default = "default_min_probability_gain")]
    pub min_probability_gain: Decimal,

    /// Tick-based qualification on/off
    #[serde(default = "default_true")]
    pub use_ticks: bool,

    /// Global tick override; the range-scaled requirement still applies
    /// via `max()`
    #[serde(default)]
    pub min_ticks: Option<u32>,

    /// Tick qualification is skipped at or above this pre-move price
    #[serde(default = "default_tick_odds_ceiling")]
    pub tick_odds_ceiling: Decimal,

    /// Range-scaled percentage requirement by pre-move price band
    #[serde(default = "default_drop_ladder")]
    pub drop_ladder: Vec<OddsBand>,

    /// Percentage requirement above the last ladder band
    #[serde(default = "default_drop_ladder_tail")]
    pub drop_ladder_tail: Decimal,

    /// Price ladder used to count discrete ticks
    #[serde(default = "default_tick_ladder")]
    pub tick_ladder: Vec<TickBand>,

    /// Range-scaled tick requirement by pre-move price band
    #[serde(default = "default_required_ticks")]
    pub required_ticks: Vec<OddsBand>,

    /// Tick requirement above the last ladder band
    #[serde(default = "default_required_ticks_tail")]
    pub required_ticks_tail: u32,
}

fn default_min_drop_pct() -> Decimal {
    dec!(11.0)
}
fn default_min_probability_gain() -> Decimal {
    dec!(0.03)
}
fn default_true() -> bool {
    true
}
fn default_tick_odds_ceiling() -> Decimal {
    dec!(8.0)
}

fn default_drop_ladder() -> Vec<OddsBand> {
    [
        (dec!(1.50), dec!(4.0)),
        (dec!(2.00), dec!(8.0)),
        (dec!(3.00), dec!(10.0)),
        (dec!(4.00), dec!(12.0)),
        (dec!(6.00), dec!(14.0)),
        (dec!(10.00), dec!(20.0)),
        (dec!(20.00), dec!(25.0)),
    ]
    .into_iter()
    .map(|(up_to, value)| OddsBand { up_to, value })
    .collect()
}

fn default_drop_ladder_tail() -> Decimal {
    dec!(30.0)
}

fn default_tick_ladder() -> Vec<TickBand> {
    [
        (dec!(1.01), dec!(2.00), dec!(0.01)),
        (dec!(2.00), dec!(3.00), dec!(0.02)),
        (dec!(3.00), dec!(4.00), dec!(0.05)),
        (dec!(4.00), dec!(6.00), dec!(0.10)),
        (dec!(6.00), dec!(10.00), dec!(0.20)),
        (dec!(10.00), dec!(20.00), dec!(0.50)),
        (dec!(20.00), dec!(30.00), dec!(1.00)),
        (dec!(30.00), dec!(50.00), dec!(2.00)),
        (dec!(50.00), dec!(100.00), dec!(5.00)),
        (dec!(100.00), dec!(1000.00), dec!(10.00)),
    ]
    .into_iter()
    .map(|(from, to, step)| TickBand { from, to, step })
    .collect()
}

fn default_required_ticks() -> Vec<OddsBand> {
    [
        (dec!(2.0), dec!(5)),
        (dec!(3.0), dec!(4)),
        (dec!(6.0), dec!(4)),
        (dec!(10.0), dec!(5)),
        (dec!(20.0), dec!(6)),
    ]
    .into_iter()
    .map(|(up_to, value)| OddsBand { up_to, value })
    .collect()
}

fn default_required_ticks_tail() -> u32 {
    8
}

impl Default for InterestConfig {
    fn default() -> Self {
        Self {
            min_drop_pct: default_min_drop_pct(),
            min_probability_gain: default_min_probability_gain(),
            use_ticks: true,
            min_ticks: None,
            tick_odds_ceiling: default_tick_odds_ceiling(),
            drop_ladder: default_drop_ladder(),
            drop_ladder_tail: default_drop_ladder_tail(),
            tick_ladder: default_tick_ladder(),
            required_ticks: default_required_ticks(),
            required_ticks_tail: default_required_ticks_tail(),
        }
    }
}

/// Decides whether a computed delta is worth an alert.
#[derive(Debug, Clone)]
pub struct InterestFilter {
    config: InterestConfig,
}

impl InterestFilter {
    pub fn new(config: InterestConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(InterestConfig::default())
    }

    /// Range-scaled percentage requirement for a given pre-move price.
    fn required_drop_pct(&self, old: Decimal) -> Decimal {
        for band in &self.config.drop_ladder {
            if old < band.up_to {
                return band.value;
            }
        }
        self.config.drop_ladder_tail
    }

    /// Range-scaled tick requirement for a given pre-move price.
    fn required_ticks(&self, old: Decimal) -> u32 {
        for band in &self.config.required_ticks {
            if old < band.up_to {
                return band.value.to_u32().unwrap_or(u32::MAX);
            }
        }
        self.config.required_ticks_tail
    }

    /// Discrete price-ladder steps between two prices.
    pub fn tick_count(&self, old: Decimal, new: Decimal) -> Decimal {
        if old <= Decimal::ZERO || new <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let lo = old.min(new);
        let hi = old.max(new);
        let mut ticks = Decimal::ZERO;
        for band in &self.config.tick_ladder {
            let a = lo.max(band.from);
            let b = hi.min(band.to);
            if b > a && band.step > Decimal::ZERO {
                ticks += (b - a) / band.step;
            }
        }
        ticks
    }

    /// A move passes if it clears the hard percentage floor and qualifies
    /// through at least one of the three scaled criteria.
    pub fn is_interesting(&self, old: Decimal, new: Decimal, drop_pct: Decimal) -> bool {
        if old <= Decimal::ZERO || new <= Decimal::ZERO || drop_pct <= Decimal::ZERO {
            return false;
        }
        if drop_pct < self.config.min_drop_pct {
            return false;
        }

        let pct_need = self.config.min_drop_pct.max(self.required_drop_pct(old));
        if drop_pct >= pct_need {
            return true;
        }

        if probability_gain(old, new) >= self.config.min_probability_gain {
            return true;
        }

        // long-odds tick moves are usually noise
        if self.config.use_ticks && old < self.config.tick_odds_ceiling {
            let need = self
                .config
                .min_ticks
                .unwrap_or(0)
                .max(self.required_ticks(old));
            if self.tick_count(old, new) >= Decimal::from(need) {
                return true;
            }
        }

        false
    }
}
