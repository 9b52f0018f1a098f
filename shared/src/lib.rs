pub mod types;
pub mod identity;
pub mod gate;
pub mod readers;
pub mod dynamo;
pub mod composite;

use aws_sdk_dynamodb::Client as DynamoClient;
use std::sync::Arc;

/// Shared application state
///
/// Built once at startup and read-only for the lifetime of the process.
pub struct AppState {
    pub dynamo_client: DynamoClient,
    pub table_name: String,
    pub gateway_secret: Option<String>,
}

impl AppState {
    pub fn new(
        dynamo_client: DynamoClient,
        table_name: String,
        gateway_secret: Option<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            dynamo_client,
            table_name,
            gateway_secret,
        })
    }
}
