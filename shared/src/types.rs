use serde::{Deserialize, Serialize};

// ========== ANALYSIS ==========
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalysisView {
    pub analysis_id: i64,
    pub user_id: i64,
    pub url: String,
    pub created_at: String,
}

// ========== RESULT ==========
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResultView {
    pub result_id: i64,
    pub analysis_id: i64,
    pub criterion: String, // WCAG criterion, e.g. "1.1.1"
    pub status: String,    // pass | fail | not_applicable
}

// ========== ERROR ==========
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorView {
    pub error_id: i64,
    pub result_id: i64,
    pub code: String,
    pub message: String,
    pub selector: Option<String>,
}

// ========== COMPOSITE ==========
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CompleteAnalysis {
    pub analysis_id: i64,
    pub user_id: i64,
    pub url: String,
    pub created_at: String,
    pub results: Vec<CompleteResult>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CompleteResult {
    pub result_id: i64,
    pub analysis_id: i64,
    pub criterion: String,
    pub status: String,
    pub errors: Vec<ErrorView>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
