use lambda_http::{run, service_fn, tracing, Error, Request};
use aws_sdk_dynamodb::Client as DynamoClient;
use a11y_shared::AppState;
use std::env;
use std::sync::Arc;

mod http_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    // Initialize AWS clients once at startup
    let config = aws_config::load_from_env().await;

    let table_name = env::var("TABLE_NAME").unwrap_or_else(|_| "a11y-audits".to_string());

    // An unset or blank secret disables the gateway check entirely.
    let gateway_secret = env::var("GATEWAY_SECRET")
        .ok()
        .filter(|s| !s.trim().is_empty());
    match &gateway_secret {
        Some(_) => tracing::info!("Gateway secret check enabled"),
        None => tracing::info!("GATEWAY_SECRET not set; gateway secret check disabled"),
    }

    let state = AppState::new(DynamoClient::new(&config), table_name, gateway_secret);

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { http_handler::function_handler(event, state).await }
    }))
    .await
}
