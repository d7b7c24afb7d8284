#[cfg(test)]
mod llm_tests {
    use serde_json::json;
    use std::sync::Arc;
    use url::Url;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::client::AnalysisBackend;
    use crate::domain::{AnalysisResult, AnalysisTarget, AnalysisTargetKind, StockEvent};
    use crate::error::{AnalysisError, ErrorDetail, ErrorKind};
    use crate::llm::{build_prompt, interpret_chat_response, LlmAnalyst, DEFAULT_LLM_MODEL};
    use crate::request::RequestBuilder;
    use crate::test_support::{status, ScriptedTransport};
    use crate::transport::{ReqwestTransport, Transport, TransportResponse};

    fn event(related: Option<Vec<&str>>) -> AnalysisTarget {
        let event = StockEvent {
            id: "12-10-fomc".to_string(),
            date: "2025-12-10".to_string(),
            title: "FOMC 利率決議".to_string(),
            market: "US".to_string(),
            event_type: "critical".to_string(),
            trend: "volatile".to_string(),
            related_stocks: related.map(|v| v.into_iter().map(String::from).collect()),
            description: "聯準會公布利率決策".to_string(),
            strategy: String::new(),
        };
        AnalysisTarget::event(event).unwrap()
    }

    fn completion(text: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1733800000,
            "model": DEFAULT_LLM_MODEL,
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": text },
                "finish_reason": "stop"
            }]
        })
    }

    fn analyst_over(transport: Arc<dyn Transport>, base: &str) -> LlmAnalyst {
        LlmAnalyst::new(transport, Url::parse(base).unwrap(), DEFAULT_LLM_MODEL.to_string())
    }

    /// Analyst over real HTTP pointed at `server`, under the Gemini-style path
    fn analyst_for(server: &MockServer) -> LlmAnalyst {
        let transport = Arc::new(ReqwestTransport::new(None).unwrap());
        analyst_over(transport, &format!("{}/v1beta/openai", server.uri()))
    }

    async fn run(analyst: &LlmAnalyst) -> Result<AnalysisResult, AnalysisError> {
        let key = crate::credential::Credential::new("k1").unwrap();
        let ev = event(None);
        let request = RequestBuilder::fetch(&ev);
        let execution = analyst.execute(&request, Some(&key));
        tokio::time::timeout(std::time::Duration::from_secs(3), execution)
            .await
            .expect("model call should return without retrying")
    }

    // ============= Prompts =============

    #[test]
    fn test_event_prompt_describes_record() {
        let prompt = build_prompt(&event(Some(vec!["TLT", "QQQ"])), None);

        assert!(prompt.contains("FOMC 利率決議"));
        assert!(prompt.contains("2025-12-10"));
        assert!(prompt.contains("TLT, QQQ"));
        assert!(prompt.contains("戰略報告"));
        assert!(!prompt.contains("修正"));
    }

    #[test]
    fn test_event_prompt_without_related_stocks() {
        assert!(build_prompt(&event(None), None).contains("相關個股：無"));
        assert!(build_prompt(&event(Some(vec![])), None).contains("相關個股：無"));
    }

    #[test]
    fn test_prompt_without_payload_uses_id() {
        let target = AnalysisTarget::new(AnalysisTargetKind::HotTrend, "ai-servers").unwrap();
        let prompt = build_prompt(&target, None);

        assert!(prompt.contains("ai-servers"));
        assert!(prompt.contains("資金熱點族群"));
        assert!(prompt.contains("【技術面】"));
    }

    #[test]
    fn test_feedback_is_appended() {
        let prompt = build_prompt(&event(None), Some("日期有誤"));

        assert!(prompt.contains("請據此修正"));
        assert!(prompt.trim_end().ends_with("日期有誤"));
    }

    #[test]
    fn test_chat_request_shape() {
        let analyst = analyst_over(ScriptedTransport::new(vec![]), "https://llm.test/v1");
        let request = serde_json::to_value(analyst.chat_request("hello").unwrap()).unwrap();

        assert_eq!(request["model"], DEFAULT_LLM_MODEL);
        assert_eq!(request["messages"][0]["role"], "system");
        assert_eq!(request["messages"][1]["role"], "user");
        assert_eq!(request["messages"][1]["content"], "hello");
    }

    // ============= Response mapping =============

    #[test]
    fn test_completion_text_is_returned() {
        let text = interpret_chat_response(TransportResponse {
            status: 200,
            body: completion("## 報告").to_string(),
        });
        assert_eq!(text, Ok("## 報告".to_string()));
    }

    #[test]
    fn test_undecodable_completion_is_malformed() {
        let result = interpret_chat_response(TransportResponse {
            status: 200,
            body: "{".to_string(),
        });
        assert!(matches!(result, Err(AnalysisError::MalformedResponse(_))));
    }

    #[test]
    fn test_gateway_page_on_5xx_is_outage() {
        let result = interpret_chat_response(TransportResponse {
            status: 502,
            body: "<html>Bad Gateway</html>".to_string(),
        });
        assert!(matches!(
            result,
            Err(AnalysisError::ServiceUnavailable { status: Some(502), .. })
        ));
    }

    #[test]
    fn test_gemini_error_list_carries_message() {
        let result = interpret_chat_response(TransportResponse {
            status: 400,
            body: json!([{ "error": { "code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT" } }])
                .to_string(),
        });
        assert_eq!(
            result,
            Err(AnalysisError::RequestRejected {
                status: 400,
                message: "API key not valid".to_string()
            })
        );
    }

    // ============= Backend over HTTP =============

    #[tokio::test]
    async fn test_missing_credential_makes_no_call() {
        let transport = ScriptedTransport::new(vec![]);
        let analyst = analyst_over(transport.clone(), "https://llm.test/v1");
        let descriptor = RequestBuilder::fetch(&event(None));

        assert_eq!(analyst.name(), "llm");
        assert_eq!(
            analyst.execute(&descriptor, None).await,
            Err(AnalysisError::MissingCredential)
        );
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_execute_returns_report() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/openai/chat/completions"))
            .and(header("Authorization", "Bearer k1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("## 戰略報告")))
            .expect(1)
            .mount(&server)
            .await;

        let result = run(&analyst_for(&server)).await;

        assert_eq!(result, Ok(AnalysisResult::FormattedText("## 戰略報告".to_string())));
    }

    #[tokio::test]
    async fn test_rate_limit_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/openai/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": { "message": "slow down", "type": "rate_limit_exceeded" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = run(&analyst_for(&server)).await;

        assert_eq!(
            result,
            Err(AnalysisError::RequestRejected {
                status: 429,
                message: "slow down".to_string()
            })
        );
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_model_outage_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": { "message": "overloaded", "type": "server_error" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let error = run(&analyst_for(&server)).await.unwrap_err();
        let detail = ErrorDetail::from(&error);

        assert_eq!(
            error,
            AnalysisError::ServiceUnavailable {
                status: Some(503),
                message: "overloaded".to_string()
            }
        );
        assert_eq!(detail.kind, ErrorKind::ServiceUnavailable);
        assert!(detail.retryable);
    }

    #[tokio::test]
    async fn test_bad_key_is_rejection() {
        let transport = ScriptedTransport::new(vec![status(
            401,
            r#"{"error":{"message":"Incorrect API key provided"}}"#,
        )]);
        let analyst = analyst_over(transport.clone(), "https://llm.test/v1");

        let error = run(&analyst).await.unwrap_err();
        let detail = ErrorDetail::from(&error);

        assert_eq!(detail.kind, ErrorKind::RequestRejected);
        assert_eq!(detail.status, Some(401));
        assert!(!detail.retryable);
        assert_eq!(transport.calls()[0].url.path(), "/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_empty_completion_is_malformed() {
        let transport = ScriptedTransport::new(vec![Ok(TransportResponse {
            status: 200,
            body: completion("  ").to_string(),
        })]);
        let analyst = analyst_over(transport, "https://llm.test/v1");

        assert!(matches!(
            run(&analyst).await,
            Err(AnalysisError::MalformedResponse(_))
        ));
    }
}
