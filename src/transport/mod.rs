pub mod http;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::TransportError;
use crate::request::HttpMethod;

pub use http::ReqwestTransport;

#[derive(Clone, Debug, PartialEq)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues one HTTP exchange. Any reply with a status code is `Ok`; only
/// failures to obtain a reply are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}
