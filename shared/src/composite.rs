use crate::readers::{AnalysisReader, ErrorReader, ResultReader};
use crate::types::{CompleteAnalysis, CompleteResult};
use lambda_http::Error;

/// Assembles the nested analysis -> results -> errors graph by fanning out to
/// the three read services.
///
/// All underlying reads happen sequentially and outside any transaction, so
/// the tree is only consistent as of the moment each read ran.
pub struct CompositeAnalysisService<'a> {
    analyses: &'a dyn AnalysisReader,
    results: &'a dyn ResultReader,
    errors: &'a dyn ErrorReader,
}

impl<'a> CompositeAnalysisService<'a> {
    pub fn new(
        analyses: &'a dyn AnalysisReader,
        results: &'a dyn ResultReader,
        errors: &'a dyn ErrorReader,
    ) -> Self {
        Self {
            analyses,
            results,
            errors,
        }
    }

    /// Build the complete tree for one analysis, or `None` if it does not
    /// exist. Results keep the order the result reader returned them in.
    pub async fn get_complete_by_id(
        &self,
        analysis_id: i64,
    ) -> Result<Option<CompleteAnalysis>, Error> {
        let Some(analysis) = self.analyses.get_by_id(analysis_id).await? else {
            tracing::debug!("Analysis {} not found", analysis_id);
            return Ok(None);
        };

        let result_views = self.results.get_by_analysis(analysis_id).await?;

        let mut results = Vec::with_capacity(result_views.len());
        for view in result_views {
            let errors = self.errors.get_by_result(view.result_id).await?;
            results.push(CompleteResult {
                result_id: view.result_id,
                analysis_id: view.analysis_id,
                criterion: view.criterion,
                status: view.status,
                errors,
            });
        }

        Ok(Some(CompleteAnalysis {
            analysis_id: analysis.analysis_id,
            user_id: analysis.user_id,
            url: analysis.url,
            created_at: analysis.created_at,
            results,
        }))
    }

    /// Build the complete tree for every analysis owned by a user.
    ///
    /// The per-id lookup runs against the store a second time, so an analysis
    /// deleted between the listing and the lookup is skipped rather than
    /// surfaced as an error.
    pub async fn get_complete_by_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<CompleteAnalysis>, Error> {
        let owned = self.analyses.get_by_user(user_id).await?;

        let mut complete = Vec::with_capacity(owned.len());
        for analysis in owned {
            if let Some(tree) = self.get_complete_by_id(analysis.analysis_id).await? {
                complete.push(tree);
            }
        }

        Ok(complete)
    }
}
