//! Application-wide constants
//!
//! Endpoint shapes, limits and the user-facing strings shown by the
//! presentation layer live here so they can be tuned in one place.

/// Analysis service endpoint layout
pub mod endpoints {
    /// Leading path segments of every analysis request: `/api/analyze/{kind}/{id}`
    pub const ANALYZE_PREFIX: [&str; 2] = ["api", "analyze"];

    /// Trailing segment of a feedback-driven regeneration request
    pub const REGENERATE_SUFFIX: &str = "regenerate";

    /// Header carrying the caller's credential
    pub const API_KEY_HEADER: &str = "X-API-Key";

    /// Default public deployment of the analysis service
    pub const DEFAULT_SERVICE_URL: &str = "https://stockcal-api.onrender.com";
}

/// Input limits
pub mod limits {
    /// Maximum feedback length accepted for a regeneration (in characters)
    pub const MAX_FEEDBACK_CHARS: usize = 500;

    /// Default number of backend calls allowed in flight across all sessions
    pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 4;

    /// Default capacity of the session update bus
    pub const DEFAULT_BUS_CAPACITY: usize = 256;
}

/// User-facing messages (Traditional Chinese, the product locale)
pub mod messages {
    pub const MISSING_CREDENTIAL: &str = "請先在設定頁面中輸入 API Key";
    pub const SERVICE_UNAVAILABLE: &str = "AI 分析服務暫時無法使用";
    pub const REQUEST_REJECTED: &str = "分析請求遭到拒絕";
    pub const MALFORMED_RESPONSE: &str = "分析結果格式錯誤，請稍後再試";
    pub const EMPTY_FEEDBACK: &str = "請輸入回饋內容";
    pub const FEEDBACK_TOO_LONG: &str = "回饋內容過長";
}

/// Shown with every successfully rendered analysis
pub const DISCLAIMER: &str = "⚠️ AI 分析僅供參考，不構成投資建議。投資有風險，請謹慎評估。";
