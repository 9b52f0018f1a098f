use crate::types::ErrorResponse;
use lambda_http::{http::StatusCode, Body, Error, Request, Response};

/// Header the gateway uses to prove a request came through it.
pub const GATEWAY_SECRET_HEADER: &str = "X-Gateway-Secret";

/// Check the pre-shared gateway secret on an inbound request.
///
/// Returns `Some(response)` with a ready-to-send 403 when the request must be
/// rejected, `None` when it may continue down the pipeline. With no secret
/// configured the check is disabled and every request passes.
pub fn check_gateway_secret(
    configured_secret: Option<&str>,
    event: &Request,
) -> Result<Option<Response<Body>>, Error> {
    let Some(secret) = configured_secret else {
        return Ok(None);
    };

    let provided = event
        .headers()
        .get(GATEWAY_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if provided.trim().is_empty() {
        tracing::warn!(
            "Rejecting request to {}: missing gateway secret",
            event.uri().path()
        );
        return forbidden().map(Some);
    }

    // Exact, case-sensitive match against the configured value.
    if provided != secret {
        tracing::warn!(
            "Rejecting request to {}: invalid gateway secret",
            event.uri().path()
        );
        return forbidden().map(Some);
    }

    tracing::debug!("Gateway secret verified");
    Ok(None)
}

fn forbidden() -> Result<Response<Body>, Error> {
    let error = ErrorResponse {
        error: "Forbidden".to_string(),
        message: "Forbidden: request did not come through the gateway".to_string(),
    };
    Ok(Response::builder()
        .status(StatusCode::FORBIDDEN)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&error)?.into())
        .map_err(Box::new)?)
}
