use crate::types::{AnalysisView, ErrorView, ResultView};
use async_trait::async_trait;
use lambda_http::Error;

/// Read contract over stored analyses.
///
/// "No data" is `Ok(None)` / an empty vec; an `Err` is a genuine store fault
/// and propagates to the caller untouched.
#[async_trait]
pub trait AnalysisReader: Send + Sync {
    async fn get_by_id(&self, analysis_id: i64) -> Result<Option<AnalysisView>, Error>;
    async fn get_by_user(&self, user_id: i64) -> Result<Vec<AnalysisView>, Error>;
}

/// Read contract over per-criterion results of an analysis.
#[async_trait]
pub trait ResultReader: Send + Sync {
    async fn get_by_analysis(&self, analysis_id: i64) -> Result<Vec<ResultView>, Error>;
}

/// Read contract over the errors recorded for one result.
#[async_trait]
pub trait ErrorReader: Send + Sync {
    async fn get_by_result(&self, result_id: i64) -> Result<Vec<ErrorView>, Error>;
}
