#[cfg(test)]
mod domain_tests {
    use serde_json::json;

    use crate::domain::analysis::{EventAnalysis, HotTrendAnalysis};
    use crate::domain::{
        AnalysisResult, AnalysisTarget, AnalysisTargetKind, HotTrend, StockEvent, StructuredAnalysis,
        TargetPayload,
    };
    use crate::error::ValidationError;

    fn fomc_event() -> StockEvent {
        serde_json::from_value(json!({
            "id": "12-10-fomc",
            "date": "2025-12-10",
            "title": "FOMC 利率決議",
            "market": "US",
            "type": "critical",
            "trend": "volatile",
            "relatedStocks": ["TLT", "QQQ"],
            "description": "聯準會公布利率決策",
            "strategy": "觀望"
        }))
        .unwrap()
    }

    // ============= Targets =============

    #[test]
    fn test_kind_path_segments() {
        assert_eq!(AnalysisTargetKind::Event.as_str(), "event");
        assert_eq!(AnalysisTargetKind::HotTrend.as_str(), "hot-trend");
        assert_eq!(AnalysisTargetKind::Strategy.to_string(), "strategy");

        let kind: AnalysisTargetKind = serde_json::from_value(json!("hot-trend")).unwrap();
        assert_eq!(kind, AnalysisTargetKind::HotTrend);
    }

    #[test]
    fn test_empty_target_id_rejected() {
        assert_eq!(
            AnalysisTarget::new(AnalysisTargetKind::Event, ""),
            Err(ValidationError::EmptyTargetId)
        );
        assert_eq!(
            AnalysisTarget::new(AnalysisTargetKind::Strategy, "   "),
            Err(ValidationError::EmptyTargetId)
        );
    }

    #[test]
    fn test_target_without_payload_uses_id() {
        let target = AnalysisTarget::new(AnalysisTargetKind::Strategy, "st-3").unwrap();
        assert_eq!(target.headline(), "st-3");
        assert_eq!(target.summary(), None);
        assert_eq!(target.to_string(), "strategy/st-3");
    }

    #[test]
    fn test_event_target_from_record() {
        let target = AnalysisTarget::event(fomc_event()).unwrap();

        assert_eq!(target.kind(), AnalysisTargetKind::Event);
        assert_eq!(target.id(), "12-10-fomc");
        assert_eq!(target.headline(), "FOMC 利率決議");
        assert_eq!(
            target.summary().as_deref(),
            Some("2025-12-10 | 聯準會公布利率決策")
        );
        match target.payload() {
            Some(TargetPayload::Event(e)) => {
                assert_eq!(e.event_type, "critical");
                assert_eq!(e.related_stocks, Some(vec!["TLT".to_string(), "QQQ".to_string()]));
            }
            other => panic!("Expected event payload, got {:?}", other),
        }
    }

    #[test]
    fn test_event_without_related_stocks() {
        let event: StockEvent = serde_json::from_value(json!({
            "id": "e1",
            "date": "2025-01-01",
            "title": "元旦",
            "market": "TW",
            "type": "holiday",
            "trend": "neutral",
            "description": "休市"
        }))
        .unwrap();

        assert_eq!(event.related_stocks, None);
        assert_eq!(event.strategy, "");
    }

    #[test]
    fn test_hot_trend_summary() {
        let trend = HotTrend {
            id: "ai-servers".to_string(),
            name: "AI 伺服器".to_string(),
            strength: 92,
            trend: "bull".to_string(),
            stocks: vec!["2382".to_string()],
            reason: "雲端資本支出上修".to_string(),
        };
        let target = AnalysisTarget::hot_trend(trend).unwrap();

        assert_eq!(target.kind(), AnalysisTargetKind::HotTrend);
        assert_eq!(target.summary().as_deref(), Some("資金強度: 92/100 | 雲端資本支出上修"));
    }

    #[test]
    fn test_payload_parsed_per_kind() {
        let strategy = TargetPayload::from_value(
            AnalysisTargetKind::Strategy,
            json!({ "id": "st-1", "title": "均線回測", "type": "swing", "desc": "回測月線進場", "risk": "中" }),
        )
        .unwrap();

        assert_eq!(strategy.headline(), "均線回測");
        assert_eq!(strategy.summary(), "回測月線進場 | 風險: 中");

        // A strategy record is not a valid event
        assert!(TargetPayload::from_value(
            AnalysisTargetKind::Event,
            json!({ "id": "st-1", "title": "均線回測", "type": "swing", "desc": "x", "risk": "中" }),
        )
        .is_err());
    }

    // ============= Results =============

    #[test]
    fn test_text_result() {
        let result =
            AnalysisResult::from_value(AnalysisTargetKind::Event, json!("## Report\n...")).unwrap();
        assert_eq!(result.as_text(), Some("## Report\n..."));
        assert_eq!(result.confidence_level(), None);
    }

    #[test]
    fn test_blank_text_is_malformed() {
        assert!(AnalysisResult::from_value(AnalysisTargetKind::Event, json!("  \n")).is_err());
    }

    #[test]
    fn test_non_text_non_object_is_malformed() {
        for value in [json!(null), json!(42), json!(true), json!(["a"])] {
            assert!(
                AnalysisResult::from_value(AnalysisTargetKind::Strategy, value.clone()).is_err(),
                "{} should be rejected",
                value
            );
        }
    }

    #[test]
    fn test_structured_event_result() {
        let value = json!({
            "event_impact": { "short_term": "債市波動", "long_term": "利率路徑明朗" },
            "market_reaction": { "sentiment": "謹慎", "key_indicators": ["DXY", "US10Y"] },
            "trading_strategy": { "before_event": "降低部位" },
            "key_stocks_to_watch": [{ "name": "TLT", "action": "觀望" }],
            "confidence_level": "中"
        });

        let result = AnalysisResult::from_value(AnalysisTargetKind::Event, value.clone()).unwrap();

        assert_eq!(result.confidence_level(), Some("中"));
        let expected: EventAnalysis = serde_json::from_value(value).unwrap();
        assert_eq!(
            result,
            AnalysisResult::Structured(StructuredAnalysis::Event(expected))
        );
    }

    #[test]
    fn test_structured_result_must_match_kind() {
        let hot_trend = json!({ "technical_analysis": "突破前高" });

        let parsed = StructuredAnalysis::from_value(AnalysisTargetKind::HotTrend, hot_trend.clone())
            .unwrap();
        assert_eq!(parsed.kind(), AnalysisTargetKind::HotTrend);
        assert_eq!(
            parsed,
            StructuredAnalysis::HotTrend(HotTrendAnalysis {
                technical_analysis: "突破前高".to_string(),
                ..HotTrendAnalysis::default()
            })
        );

        assert!(AnalysisResult::from_value(AnalysisTargetKind::Strategy, hot_trend).is_err());
    }

    #[test]
    fn test_result_serializes_with_shape_tag() {
        let result = AnalysisResult::FormattedText("ok".to_string());
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({ "shape": "formatted_text", "content": "ok" })
        );
    }
}
