//! AWS Lambda function that replaces the ACLED feature layer on a schedule.

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

use acled_sync_lambda::{handle_event, init_tracing, LambdaResponse, SyncSummary};

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    lambda_runtime::run(service_fn(handler)).await
}

async fn handler(event: LambdaEvent<Value>) -> Result<LambdaResponse<SyncSummary>, Error> {
    let request_id = event.context.request_id.clone();
    Ok(handle_event(event.payload, &request_id).await)
}
