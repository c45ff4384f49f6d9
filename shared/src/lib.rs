pub mod types;
pub mod ministries;
pub mod members;
pub mod shifts;
pub mod assignments;
pub mod rotation;
pub mod email;

use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_sesv2::Client as SesClient;
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub dynamo_client: DynamoClient,
    pub ses_client: SesClient,
}

impl AppState {
    pub fn new(dynamo_client: DynamoClient, ses_client: SesClient) -> Arc<Self> {
        Arc::new(Self {
            dynamo_client,
            ses_client,
        })
    }
}
