//! Analysis result shapes.
//!
//! A deployment of the analysis service answers either with a structured
//! record (typed per target kind) or with formatted markdown text. The shape
//! is resolved once, at parse time; downstream code matches on the variant.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::AnalysisTargetKind;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "shape", content = "content", rename_all = "snake_case")]
pub enum AnalysisResult {
    Structured(StructuredAnalysis),
    FormattedText(String),
}

impl AnalysisResult {
    /// Resolve the `analysis` field of a service reply.
    ///
    /// Strings become formatted text; objects are parsed as the structured
    /// record for `kind`. Anything else, and blank text, is malformed.
    pub fn from_value(kind: AnalysisTargetKind, value: Value) -> Result<Self, String> {
        match value {
            Value::String(text) => {
                if text.trim().is_empty() {
                    Err("analysis text is empty".to_string())
                } else {
                    Ok(AnalysisResult::FormattedText(text))
                }
            }
            Value::Object(_) => StructuredAnalysis::from_value(kind, value)
                .map(AnalysisResult::Structured)
                .map_err(|e| format!("structured {} analysis: {}", kind, e)),
            other => Err(format!("unexpected analysis value: {}", json_type(&other))),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnalysisResult::FormattedText(text) => Some(text),
            AnalysisResult::Structured(_) => None,
        }
    }

    pub fn confidence_level(&self) -> Option<&str> {
        match self {
            AnalysisResult::Structured(s) => s.confidence_level(),
            AnalysisResult::FormattedText(_) => None,
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StructuredAnalysis {
    Event(EventAnalysis),
    HotTrend(HotTrendAnalysis),
    Strategy(StrategyAnalysis),
}

impl StructuredAnalysis {
    pub fn from_value(kind: AnalysisTargetKind, value: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            AnalysisTargetKind::Event => StructuredAnalysis::Event(serde_json::from_value(value)?),
            AnalysisTargetKind::HotTrend => {
                StructuredAnalysis::HotTrend(serde_json::from_value(value)?)
            }
            AnalysisTargetKind::Strategy => {
                StructuredAnalysis::Strategy(serde_json::from_value(value)?)
            }
        })
    }

    pub fn kind(&self) -> AnalysisTargetKind {
        match self {
            StructuredAnalysis::Event(_) => AnalysisTargetKind::Event,
            StructuredAnalysis::HotTrend(_) => AnalysisTargetKind::HotTrend,
            StructuredAnalysis::Strategy(_) => AnalysisTargetKind::Strategy,
        }
    }

    /// "高", "中" or "低" as reported by the model
    pub fn confidence_level(&self) -> Option<&str> {
        match self {
            StructuredAnalysis::Event(a) => a.confidence_level.as_deref(),
            StructuredAnalysis::HotTrend(a) => a.confidence_level.as_deref(),
            StructuredAnalysis::Strategy(a) => a.confidence_level.as_deref(),
        }
    }
}

// ============= Event =============

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventAnalysis {
    pub event_impact: EventImpact,
    pub market_reaction: MarketReaction,
    pub trading_strategy: EventTradingStrategy,
    #[serde(default)]
    pub key_stocks_to_watch: Vec<StockAction>,
    #[serde(default)]
    pub confidence_level: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventImpact {
    #[serde(default)]
    pub short_term: Option<String>,
    #[serde(default)]
    pub medium_term: Option<String>,
    #[serde(default)]
    pub long_term: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketReaction {
    #[serde(default)]
    pub expected_volatility: Option<String>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub key_indicators: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventTradingStrategy {
    #[serde(default)]
    pub before_event: Option<String>,
    #[serde(default)]
    pub during_event: Option<String>,
    #[serde(default)]
    pub after_event: Option<String>,
    #[serde(default)]
    pub risk_control: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StockAction {
    pub name: String,
    #[serde(default)]
    pub action: Option<String>, // "買入", "賣出", "觀望"
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub target_price: Option<String>,
}

// ============= Hot trend =============

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HotTrendAnalysis {
    pub technical_analysis: String,
    #[serde(default)]
    pub fundamental_analysis: Option<String>,
    #[serde(default)]
    pub risk_assessment: Option<String>,
    #[serde(default)]
    pub trading_suggestion: Option<TradingSuggestion>,
    #[serde(default)]
    pub key_stocks: Vec<StockRating>,
    #[serde(default)]
    pub confidence_level: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TradingSuggestion {
    #[serde(default)]
    pub entry_point: Option<String>,
    #[serde(default)]
    pub stop_loss: Option<String>,
    #[serde(default)]
    pub take_profit: Option<String>,
    #[serde(default)]
    pub holding_period: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StockRating {
    pub name: String,
    #[serde(default)]
    pub rating: Option<String>, // "強力推薦", "推薦", ...
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub entry_price: Option<String>,
}

// ============= Strategy =============

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyAnalysis {
    pub strategy_rationale: String,
    pub execution_details: ExecutionDetails,
    #[serde(default)]
    pub risk_management: Option<RiskManagement>,
    #[serde(default)]
    pub historical_performance: Option<String>,
    #[serde(default)]
    pub success_probability: Option<String>,
    #[serde(default)]
    pub confidence_level: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionDetails {
    #[serde(default)]
    pub entry_timing: Option<String>,
    #[serde(default)]
    pub position_sizing: Option<String>,
    #[serde(default)]
    pub exit_strategy: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskManagement {
    #[serde(default)]
    pub max_loss: Option<String>,
    #[serde(default)]
    pub hedge_method: Option<String>,
    #[serde(default)]
    pub warning_signs: Option<String>,
}
