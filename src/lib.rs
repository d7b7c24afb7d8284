//! StockCal analysis engine
//!
//! Orchestrates on-demand AI strategy analyses for calendar events, trending
//! sectors and tactical strategies: credential handling, request building,
//! the service client and the per-item session state machine.

pub mod api;
pub mod bus;
pub mod client;
pub mod config;
pub mod constants;
pub mod credential;
pub mod domain;
pub mod error;
pub mod llm;
pub mod request;
pub mod session;
pub mod transport;

// Re-export commonly used types
pub use client::{AnalysisBackend, AnalysisClient};
pub use credential::{Credential, CredentialStore};
pub use domain::{AnalysisResult, AnalysisTarget, AnalysisTargetKind, StructuredAnalysis};
pub use error::{AnalysisError, ErrorDetail, ErrorKind, SessionError, ValidationError};
pub use request::{RequestBuilder, RequestDescriptor};
pub use session::{AnalysisEngine, SessionEvent, SessionHandle, SessionState};

#[cfg(test)]
mod domain_tests;
#[cfg(test)]
mod llm_tests;
#[cfg(test)]
mod test_support;
