use crate::readers::{AnalysisReader, ErrorReader, ResultReader};
use crate::types::{AnalysisView, ErrorView, ResultView};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::Error;

/// DynamoDB-backed implementation of the three read contracts.
///
/// Single-table layout:
/// - `PK=ANALYSIS#{id}  SK=ANALYSIS#{id}` - analysis record
/// - `PK=USER#{uid}     SK=ANALYSIS#{id}` - user -> analysis link
/// - `PK=ANALYSIS#{id}  SK=RESULT#{rid}`  - result record
/// - `PK=RESULT#{rid}   SK=ERROR#{eid}`   - error record
pub struct DynamoStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoStore {
    pub fn new(client: DynamoClient, table_name: String) -> Self {
        Self { client, table_name }
    }
}

#[async_trait]
impl AnalysisReader for DynamoStore {
    async fn get_by_id(&self, analysis_id: i64) -> Result<Option<AnalysisView>, Error> {
        let pk = format!("ANALYSIS#{}", analysis_id);

        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk.clone()))
            .key("SK", AttributeValue::S(pk))
            .send()
            .await?;

        let Some(item) = result.item() else {
            return Ok(None);
        };

        Ok(Some(AnalysisView {
            analysis_id,
            user_id: item
                .get("user_id")
                .and_then(|v| v.as_n().ok())
                .and_then(|n| n.parse::<i64>().ok())
                .unwrap_or_default(),
            url: item
                .get("url")
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .unwrap_or_default(),
            created_at: item
                .get("created_at")
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .unwrap_or_default(),
        }))
    }

    async fn get_by_user(&self, user_id: i64) -> Result<Vec<AnalysisView>, Error> {
        let pk = format!("USER#{}", user_id);

        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
            .expression_attribute_values(":pk", AttributeValue::S(pk))
            .expression_attribute_values(":sk_prefix", AttributeValue::S("ANALYSIS#".to_string()))
            .send()
            .await?;

        // Collect the owned analysis ids from the link items
        let mut analysis_ids = Vec::new();
        for item in result.items() {
            if let Some(sk) = item.get("SK").and_then(|v| v.as_s().ok()) {
                if let Some(id) = sk.strip_prefix("ANALYSIS#").and_then(|s| s.parse::<i64>().ok()) {
                    analysis_ids.push(id);
                }
            }
        }

        // Fetch each record; a link whose record is already gone is skipped
        let mut analyses = Vec::new();
        for analysis_id in analysis_ids {
            if let Some(view) = self.get_by_id(analysis_id).await? {
                analyses.push(view);
            }
        }

        Ok(analyses)
    }
}

#[async_trait]
impl ResultReader for DynamoStore {
    async fn get_by_analysis(&self, analysis_id: i64) -> Result<Vec<ResultView>, Error> {
        let pk = format!("ANALYSIS#{}", analysis_id);

        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
            .expression_attribute_values(":pk", AttributeValue::S(pk))
            .expression_attribute_values(":sk_prefix", AttributeValue::S("RESULT#".to_string()))
            .send()
            .await?;

        let mut results = Vec::new();
        for item in result.items() {
            if let Some(sk) = item.get("SK").and_then(|v| v.as_s().ok()) {
                if let Some(result_id) = sk.strip_prefix("RESULT#").and_then(|s| s.parse::<i64>().ok()) {
                    results.push(ResultView {
                        result_id,
                        analysis_id,
                        criterion: item
                            .get("criterion")
                            .and_then(|v| v.as_s().ok())
                            .map(|s| s.to_string())
                            .unwrap_or_default(),
                        status: item
                            .get("status")
                            .and_then(|v| v.as_s().ok())
                            .map(|s| s.to_string())
                            .unwrap_or_default(),
                    });
                }
            }
        }

        Ok(results)
    }
}

#[async_trait]
impl ErrorReader for DynamoStore {
    async fn get_by_result(&self, result_id: i64) -> Result<Vec<ErrorView>, Error> {
        let pk = format!("RESULT#{}", result_id);

        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
            .expression_attribute_values(":pk", AttributeValue::S(pk))
            .expression_attribute_values(":sk_prefix", AttributeValue::S("ERROR#".to_string()))
            .send()
            .await?;

        let mut errors = Vec::new();
        for item in result.items() {
            if let Some(sk) = item.get("SK").and_then(|v| v.as_s().ok()) {
                if let Some(error_id) = sk.strip_prefix("ERROR#").and_then(|s| s.parse::<i64>().ok()) {
                    errors.push(ErrorView {
                        error_id,
                        result_id,
                        code: item
                            .get("code")
                            .and_then(|v| v.as_s().ok())
                            .map(|s| s.to_string())
                            .unwrap_or_default(),
                        message: item
                            .get("message")
                            .and_then(|v| v.as_s().ok())
                            .map(|s| s.to_string())
                            .unwrap_or_default(),
                        selector: item
                            .get("selector")
                            .and_then(|v| v.as_s().ok())
                            .map(|s| s.to_string()),
                    });
                }
            }
        }

        Ok(errors)
    }
}
