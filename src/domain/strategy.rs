//! Named strategies and the system that backtests and compares them.

use chrono::NaiveDate;
use log::{info, warn};
use serde::Serialize;

use crate::domain::alpha::AlphaColumn;
use crate::domain::backtest::{run_backtest, BacktestConfig};
use crate::domain::error::AlphatraderError;
use crate::domain::frame::TickerFrame;
use crate::domain::metrics::PnlStats;
use crate::domain::recommendation::{Recommendation, RecommendationEngine};

/// A strategy is an ordered set of alphas whose z-scores are summed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyDefinition {
    pub name: String,
    pub alphas: Vec<String>,
}

impl StrategyDefinition {
    /// Parses a comma separated alpha list such as `"momentum, value"`.
    /// Alpha names are lowercased to match config keys.
    pub fn parse(name: &str, input: &str) -> Result<Self, AlphatraderError> {
        let alphas: Vec<String> = input
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        if alphas.is_empty() {
            return Err(AlphatraderError::ConfigInvalid {
                section: "strategies".to_string(),
                key: name.to_string(),
                reason: "strategy lists no alphas".to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            alphas,
        })
    }
}

/// Result of one strategy's full-range backtest.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyReport {
    pub strategy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<PnlStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StrategyReport {
    /// Sharpe ratio, or negative infinity for a failed run.
    pub fn rank_score(&self) -> f64 {
        self.stats
            .as_ref()
            .map_or(f64::NEG_INFINITY, |s| s.sharpe_ratio)
    }
}

/// Index of the report with the greatest Sharpe ratio. Failed runs rank
/// lowest and the earliest report wins ties.
pub fn select_best_strategy(reports: &[StrategyReport]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, report) in reports.iter().enumerate() {
        let score = report.rank_score();
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

pub struct TradingSystem {
    frames: Vec<TickerFrame>,
    alphas: Vec<AlphaColumn>,
    strategies: Vec<StrategyDefinition>,
    config: BacktestConfig,
}

impl TradingSystem {
    /// Fails if any strategy refers to an alpha that was not computed.
    pub fn new(
        frames: Vec<TickerFrame>,
        alphas: Vec<AlphaColumn>,
        strategies: Vec<StrategyDefinition>,
        config: BacktestConfig,
    ) -> Result<Self, AlphatraderError> {
        let system = Self {
            frames,
            alphas,
            strategies,
            config,
        };
        for strategy in &system.strategies {
            system.alphas_for(strategy)?;
        }
        Ok(system)
    }

    pub fn frames(&self) -> &[TickerFrame] {
        &self.frames
    }

    pub fn strategies(&self) -> &[StrategyDefinition] {
        &self.strategies
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn strategy(&self, name: &str) -> Result<&StrategyDefinition, AlphatraderError> {
        self.strategies
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| AlphatraderError::UnknownStrategy {
                name: name.to_string(),
            })
    }

    fn alphas_for(
        &self,
        strategy: &StrategyDefinition,
    ) -> Result<Vec<&AlphaColumn>, AlphatraderError> {
        strategy
            .alphas
            .iter()
            .map(|name| {
                self.alphas
                    .iter()
                    .find(|a| &a.name == name)
                    .ok_or_else(|| AlphatraderError::UnknownAlpha { name: name.clone() })
            })
            .collect()
    }

    /// Backtest of `name` over the configured date range.
    pub fn run_backtest(&self, name: &str) -> Result<PnlStats, AlphatraderError> {
        let strategy = self.strategy(name)?;
        let alphas = self.alphas_for(strategy)?;
        info!("Backtesting {} ({})", strategy.name, strategy.alphas.join(", "));
        run_backtest(&self.frames, &alphas, &self.config)
    }

    /// Every strategy in declaration order; failures are reported, not raised.
    pub fn run_all_backtests(&self) -> Vec<StrategyReport> {
        self.strategies
            .iter()
            .map(|strategy| match self.run_backtest(&strategy.name) {
                Ok(stats) => StrategyReport {
                    strategy: strategy.name.clone(),
                    stats: Some(stats),
                    error: None,
                },
                Err(e) => {
                    warn!("Strategy {} failed: {}", strategy.name, e);
                    StrategyReport {
                        strategy: strategy.name.clone(),
                        stats: None,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect()
    }

    pub fn best_strategy(&self) -> Result<&StrategyDefinition, AlphatraderError> {
        let reports = self.run_all_backtests();
        let index = select_best_strategy(&reports).ok_or(AlphatraderError::NoStrategies)?;
        Ok(&self.strategies[index])
    }

    /// Live recommendation from `strategy`, or from the best backtested
    /// strategy when none is named.
    pub fn recommend(
        &self,
        strategy: Option<&str>,
        date: Option<NaiveDate>,
    ) -> Result<Recommendation, AlphatraderError> {
        let strategy = match strategy {
            Some(name) => self.strategy(name)?,
            None => self.best_strategy()?,
        };
        info!("Using strategy: {}", strategy.name);
        let alphas = self.alphas_for(strategy)?;
        RecommendationEngine::new(&self.frames, &alphas, &self.config).trade_indicator(date)
    }
}
