use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TargetError;

/// Which way the live value has to cross `target` for the alert to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

impl FromStr for Direction {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            _ => Err(TargetError::UnknownDirection(s.to_string())),
        }
    }
}

/// The value recorded on the previous run.
///
/// `Unset` means the target has never been evaluated successfully. It is
/// neither less nor greater than any value, so a target with no baseline
/// can never trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<Decimal>", into = "Option<Decimal>")]
pub enum Baseline {
    #[default]
    Unset,
    Value(Decimal),
}

impl Baseline {
    pub fn value(&self) -> Option<Decimal> {
        match self {
            Baseline::Unset => None,
            Baseline::Value(v) => Some(*v),
        }
    }

    fn is_above(&self, other: Decimal) -> bool {
        matches!(self, Baseline::Value(v) if *v > other)
    }

    fn is_below(&self, other: Decimal) -> bool {
        matches!(self, Baseline::Value(v) if *v < other)
    }
}

impl From<Option<Decimal>> for Baseline {
    fn from(value: Option<Decimal>) -> Self {
        value.map_or(Baseline::Unset, Baseline::Value)
    }
}

impl From<Baseline> for Option<Decimal> {
    fn from(value: Baseline) -> Self {
        value.value()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    #[serde(default)]
    pub id: Option<u64>,
    /// Display ticker, e.g. "BTC".
    pub symbol: String,
    /// Key the value source is queried with, e.g. "bitcoin".
    pub source_key: String,
    pub target: Decimal,
    pub direction: Direction,
    #[serde(default)]
    pub last_saved: Baseline,
    #[serde(default, skip_serializing)]
    pub current: Option<Decimal>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl Target {
    pub fn new(
        symbol: impl Into<String>,
        source_key: impl Into<String>,
        target: Decimal,
        direction: Direction,
    ) -> Result<Self, TargetError> {
        if target <= Decimal::ZERO {
            return Err(TargetError::NonPositiveTarget(target));
        }
        Ok(Self {
            id: None,
            symbol: symbol.into(),
            source_key: source_key.into(),
            target,
            direction,
            last_saved: Baseline::Unset,
            current: None,
            active: true,
            updated_at: None,
        })
    }

    /// Builder-style baseline, mostly for seeding stores.
    pub fn with_last_saved(mut self, last_saved: Decimal) -> Result<Self, TargetError> {
        if last_saved <= Decimal::ZERO {
            return Err(TargetError::NonPositiveBaseline(last_saved));
        }
        self.last_saved = Baseline::Value(last_saved);
        Ok(self)
    }

    /// Re-checks the invariants `new` and `with_last_saved` enforce. Rows
    /// decoded from storage bypass both.
    pub fn validate(&self) -> Result<(), TargetError> {
        if self.target <= Decimal::ZERO {
            return Err(TargetError::NonPositiveTarget(self.target));
        }
        if let Baseline::Value(v) = self.last_saved {
            if v <= Decimal::ZERO {
                return Err(TargetError::NonPositiveBaseline(v));
            }
        }
        Ok(())
    }

    /// DOWN fires on `last_saved > target >= current`, UP on
    /// `last_saved < target <= current`. Touching the target counts.
    pub fn is_triggered(&self) -> bool {
        let Some(current) = self.current else {
            return false;
        };
        match self.direction {
            Direction::Down => self.last_saved.is_above(self.target) && self.target >= current,
            Direction::Up => self.last_saved.is_below(self.target) && self.target <= current,
        }
    }

    /// Runs the trigger predicate and deactivates the target when it fires.
    /// Returns whether it fired. An inactive target is never reactivated.
    pub fn evaluate(&mut self) -> bool {
        let fired = self.is_triggered();
        if fired {
            self.active = false;
        }
        fired
    }

    /// Moves the freshly fetched value into the baseline. Leaves the
    /// baseline untouched when nothing was fetched this run.
    pub fn advance_baseline(&mut self) {
        if let Some(current) = self.current {
            if current > Decimal::ZERO {
                self.last_saved = Baseline::Value(current);
            }
        }
    }

    /// `|target - last_saved|`, `None` until a baseline exists.
    pub fn distance_to_target(&self) -> Option<Decimal> {
        self.last_saved.value().map(|v| (self.target - v).abs())
    }

    pub fn alert_message(&self) -> String {
        let verb = match self.direction {
            Direction::Up => "rose",
            Direction::Down => "fell",
        };
        let now = self
            .current
            .map_or_else(|| "?".to_string(), |c| c.normalize().to_string());
        let mut msg = format!(
            "{} {} to {} (target {}, {})",
            self.symbol,
            verb,
            now,
            self.target.normalize(),
            self.direction,
        );
        if let Some(prev) = self.last_saved.value() {
            msg.push_str(&format!("; previously {}", prev.normalize()));
        }
        msg
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.symbol, self.direction, self.target.normalize())
    }
}
