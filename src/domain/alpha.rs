//! Alpha columns: explicit `(ticker, date) -> value` maps produced by alpha
//! sources and consumed read-only by the signal generator.
//!
//! Alpha sources never write into the shared frames. Each one returns its own
//! [`AlphaColumn`], and [`compute_alphas`] fans the sources out in parallel and
//! joins the results back in declaration order.

use chrono::NaiveDate;
use log::info;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;

use crate::domain::error::AlphatraderError;
use crate::domain::frame::TickerFrame;
use crate::ports::alpha_port::AlphaPort;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlphaColumn {
    pub name: String,
    values: HashMap<String, HashMap<NaiveDate, f64>>,
}

impl AlphaColumn {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            values: HashMap::new(),
        }
    }

    pub fn insert(&mut self, ticker: &str, date: NaiveDate, value: f64) {
        self.values
            .entry(ticker.to_string())
            .or_default()
            .insert(date, value);
    }

    pub fn with_value(mut self, ticker: &str, date: NaiveDate, value: f64) -> Self {
        self.insert(ticker, date, value);
        self
    }

    /// Raw value, which may be NaN, or `None` when the alpha produced nothing.
    pub fn value(&self, ticker: &str, date: NaiveDate) -> Option<f64> {
        self.values.get(ticker).and_then(|m| m.get(&date)).copied()
    }

    pub fn len(&self) -> usize {
        self.values.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How an alpha is computed, as written in the `[alphas]` config section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlphaKind {
    /// Precomputed numeric column from the data files.
    Column(String),
    /// Trailing n-row return.
    Momentum(usize),
    /// Negative z-score of close against its trailing n-row mean.
    MeanReversion(usize),
}

impl fmt::Display for AlphaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlphaKind::Column(c) => write!(f, "column({c})"),
            AlphaKind::Momentum(n) => write!(f, "momentum({n})"),
            AlphaKind::MeanReversion(n) => write!(f, "mean_reversion({n})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlphaSpec {
    pub name: String,
    pub kind: AlphaKind,
}

impl AlphaSpec {
    pub fn parse(name: &str, input: &str) -> Result<Self, AlphatraderError> {
        let invalid = |reason: String| AlphatraderError::ConfigInvalid {
            section: "alphas".to_string(),
            key: name.to_string(),
            reason,
        };

        let input = input.trim();
        if input.is_empty() {
            return Err(invalid("empty alpha definition".into()));
        }

        let Some(open) = input.find('(') else {
            if !is_identifier(input) {
                return Err(invalid(format!("expected a column name, got '{input}'")));
            }
            return Ok(Self {
                name: name.to_string(),
                kind: AlphaKind::Column(input.to_string()),
            });
        };

        if !input.ends_with(')') {
            return Err(invalid(format!("unterminated argument list in '{input}'")));
        }
        let func = input[..open].trim().to_lowercase();
        let arg = input[open + 1..input.len() - 1].trim();

        let period = || -> Result<usize, AlphatraderError> {
            match arg.parse::<usize>() {
                Ok(n) if n >= 1 => Ok(n),
                _ => Err(invalid(format!("{func} needs a positive period, got '{arg}'"))),
            }
        };

        let kind = match func.as_str() {
            "column" if is_identifier(arg) => AlphaKind::Column(arg.to_string()),
            "column" => return Err(invalid(format!("invalid column name '{arg}'"))),
            "momentum" => AlphaKind::Momentum(period()?),
            "mean_reversion" => AlphaKind::MeanReversion(period()?),
            other => return Err(invalid(format!("unknown alpha function '{other}'"))),
        };

        Ok(Self {
            name: name.to_string(),
            kind,
        })
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Computes every alpha over `trade_range`. Sources run concurrently; the
/// returned columns keep the order of `sources`.
pub fn compute_alphas(
    sources: &[Box<dyn AlphaPort>],
    frames: &[TickerFrame],
    trade_range: &[NaiveDate],
) -> Result<Vec<AlphaColumn>, AlphatraderError> {
    info!(
        "Computing {} alpha(s) over {} dates",
        sources.len(),
        trade_range.len()
    );
    sources
        .par_iter()
        .map(|source| source.compute(frames, trade_range))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn column_value_lookup() {
        let col = AlphaColumn::new("m")
            .with_value("AAPL", d(1), 1.5)
            .with_value("AAPL", d(2), f64::NAN);
        assert_eq!(col.value("AAPL", d(1)), Some(1.5));
        assert!(col.value("AAPL", d(2)).unwrap().is_nan());
        assert_eq!(col.value("AAPL", d(3)), None);
        assert_eq!(col.value("MSFT", d(1)), None);
        assert_eq!(col.len(), 2);
    }

    #[test]
    fn parse_function_specs() {
        let spec = AlphaSpec::parse("mom", "momentum(20)").unwrap();
        assert_eq!(spec.kind, AlphaKind::Momentum(20));

        let spec = AlphaSpec::parse("mr", " Mean_Reversion( 5 ) ").unwrap();
        assert_eq!(spec.kind, AlphaKind::MeanReversion(5));

        let spec = AlphaSpec::parse("val", "column(value_score)").unwrap();
        assert_eq!(spec.kind, AlphaKind::Column("value_score".into()));
    }

    #[test]
    fn bare_identifier_is_a_column() {
        let spec = AlphaSpec::parse("val", "value_score").unwrap();
        assert_eq!(spec.kind, AlphaKind::Column("value_score".into()));
        assert_eq!(spec.kind.to_string(), "column(value_score)");
    }

    #[test]
    fn parse_rejects_bad_specs() {
        for bad in ["", "momentum(0)", "momentum(x)", "momentum(3", "rsi(14)", "a b"] {
            let err = AlphaSpec::parse("bad", bad).unwrap_err();
            assert!(
                matches!(err, AlphatraderError::ConfigInvalid { ref key, .. } if key == "bad"),
                "{bad}: {err}"
            );
        }
    }
}
