//! Read-only catalog records supplied by the calendar views.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockEvent {
    pub id: String,
    pub date: String,
    pub title: String,
    pub market: String, // "US", "TW", "Global"
    #[serde(rename = "type")]
    pub event_type: String, // "critical", "hot", "corporate", "macro", "holiday"
    pub trend: String, // "bull", "bear", "neutral", "volatile"
    #[serde(default)]
    pub related_stocks: Option<Vec<String>>,
    pub description: String,
    #[serde(default)]
    pub strategy: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HotTrend {
    pub id: String,
    pub name: String,
    /// Capital-flow strength, 0-100
    pub strength: u8,
    pub trend: String,
    #[serde(default)]
    pub stocks: Vec<String>,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrategyItem {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub strategy_type: String,
    pub desc: String,
    pub risk: String, // "低", "中", "高"
    #[serde(default)]
    pub target: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetPayload {
    Event(StockEvent),
    HotTrend(HotTrend),
    Strategy(StrategyItem),
}

impl TargetPayload {
    /// Parse a raw record according to the kind it was opened as
    pub fn from_value(
        kind: super::AnalysisTargetKind,
        value: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        use super::AnalysisTargetKind;

        Ok(match kind {
            AnalysisTargetKind::Event => TargetPayload::Event(serde_json::from_value(value)?),
            AnalysisTargetKind::HotTrend => TargetPayload::HotTrend(serde_json::from_value(value)?),
            AnalysisTargetKind::Strategy => TargetPayload::Strategy(serde_json::from_value(value)?),
        })
    }

    pub fn headline(&self) -> &str {
        match self {
            TargetPayload::Event(e) => &e.title,
            TargetPayload::HotTrend(t) => &t.name,
            TargetPayload::Strategy(s) => &s.title,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            TargetPayload::Event(e) => format!("{} | {}", e.date, e.description),
            TargetPayload::HotTrend(t) => format!("資金強度: {}/100 | {}", t.strength, t.reason),
            TargetPayload::Strategy(s) => format!("{} | 風險: {}", s.desc, s.risk),
        }
    }
}
