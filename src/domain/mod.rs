pub mod analysis;
pub mod payload;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

pub use analysis::{AnalysisResult, StructuredAnalysis};
pub use payload::{HotTrend, StockEvent, StrategyItem, TargetPayload};

/// Kind of item an analysis is requested for. Determines the endpoint
/// segment and the expected structured result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalysisTargetKind {
    #[serde(rename = "event")]
    Event,
    #[serde(rename = "hot-trend")]
    HotTrend,
    #[serde(rename = "strategy")]
    Strategy,
}

impl AnalysisTargetKind {
    /// Path segment used by the analysis service
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisTargetKind::Event => "event",
            AnalysisTargetKind::HotTrend => "hot-trend",
            AnalysisTargetKind::Strategy => "strategy",
        }
    }
}

impl fmt::Display for AnalysisTargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The item an analysis is bound to
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisTarget {
    kind: AnalysisTargetKind,
    id: String,
    payload: Option<TargetPayload>,
}

impl AnalysisTarget {
    pub fn new(kind: AnalysisTargetKind, id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::EmptyTargetId);
        }
        Ok(Self {
            kind,
            id,
            payload: None,
        })
    }

    /// Attach the display record. The payload is never sent to the
    /// analysis service.
    pub fn with_payload(mut self, payload: TargetPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn event(event: StockEvent) -> Result<Self, ValidationError> {
        Ok(Self::new(AnalysisTargetKind::Event, event.id.clone())?
            .with_payload(TargetPayload::Event(event)))
    }

    pub fn hot_trend(trend: HotTrend) -> Result<Self, ValidationError> {
        Ok(Self::new(AnalysisTargetKind::HotTrend, trend.id.clone())?
            .with_payload(TargetPayload::HotTrend(trend)))
    }

    pub fn strategy(item: StrategyItem) -> Result<Self, ValidationError> {
        Ok(Self::new(AnalysisTargetKind::Strategy, item.id.clone())?
            .with_payload(TargetPayload::Strategy(item)))
    }

    pub fn kind(&self) -> AnalysisTargetKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn payload(&self) -> Option<&TargetPayload> {
        self.payload.as_ref()
    }

    /// Title line of the item-info block
    pub fn headline(&self) -> String {
        match &self.payload {
            Some(payload) => payload.headline().to_string(),
            None => self.id.clone(),
        }
    }

    /// Detail line of the item-info block
    pub fn summary(&self) -> Option<String> {
        self.payload.as_ref().map(TargetPayload::summary)
    }
}

impl fmt::Display for AnalysisTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}
