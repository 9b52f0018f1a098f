use a11y_shared::composite::CompositeAnalysisService;
use a11y_shared::dynamo::DynamoStore;
use a11y_shared::identity::{self, RequestIdentity};
use a11y_shared::{gate, AppState};
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, RequestExt, Response,
};
use std::sync::Arc;

/// Main Lambda handler - gateway gate, identity resolution, then routing
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    tracing::info!("API Lambda invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == "OPTIONS" {
        return Ok(Response::builder()
            .status(StatusCode::OK)
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", "GET,OPTIONS")
            .header(
                "Access-Control-Allow-Headers",
                "Content-Type,Authorization,X-User-Id,X-User-Email,X-User-Role,X-User-Name",
            )
            .body(Body::Empty)
            .map_err(Box::new)?);
    }

    // Gateway secret check runs first; a rejected request never reaches
    // identity resolution or the read services.
    if let Some(rejection) = gate::check_gateway_secret(state.gateway_secret.as_deref(), &event)? {
        return Ok(rejection);
    }

    // Claims attached by the API Gateway JWT authorizer, if a token was sent
    let claims = event
        .request_context_ref()
        .and_then(|ctx| ctx.authorizer())
        .and_then(|auth| auth.jwt.as_ref())
        .map(|jwt| jwt.claims.clone());
    let caller = identity::resolve(event.headers(), claims.as_ref());

    let store = DynamoStore::new(state.dynamo_client.clone(), state.table_name.clone());
    let service = CompositeAnalysisService::new(&store, &store, &store);

    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (method, parts.as_slice()) {
        // GET /composite-analysis/{id} - one complete analysis
        (&Method::GET, ["composite-analysis", analysis_id]) => match analysis_id.parse::<i64>() {
            Ok(analysis_id) => get_composite_analysis(&service, &caller, analysis_id).await,
            Err(_) => bad_request("Analysis id must be numeric"),
        },
        // GET /composite-analysis?userId= - all complete analyses of one user
        (&Method::GET, ["composite-analysis"]) => {
            let user_id = event
                .query_string_parameters_ref()
                .and_then(|params| params.first("userId"))
                .and_then(|v| v.parse::<i64>().ok());

            match user_id {
                Some(user_id) => list_user_composite_analyses(&service, &caller, user_id).await,
                None => bad_request("userId query parameter is required"),
            }
        }
        (_, ["composite-analysis"]) | (_, ["composite-analysis", _]) => method_not_allowed(),
        _ => {
            tracing::warn!("No route matched - Method: {} Path: {}", method, path);
            not_found("Not found")
        }
    }
}

/// GET /composite-analysis/{id}
///
/// The ownership check needs the record's owner, so the aggregate is built
/// first and only released to admins and the owner.
async fn get_composite_analysis(
    service: &CompositeAnalysisService<'_>,
    caller: &RequestIdentity,
    analysis_id: i64,
) -> Result<Response<Body>, Error> {
    if !caller.is_authenticated() {
        return unauthorized();
    }

    let Some(analysis) = service.get_complete_by_id(analysis_id).await? else {
        return not_found("Analysis not found");
    };

    if !caller.is_admin() && caller.user_id != analysis.user_id {
        tracing::warn!(
            "Denying analysis {} to user {}: owned by user {}",
            analysis_id,
            caller.user_id,
            analysis.user_id
        );
        return forbidden();
    }

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({
                "message": "Analysis retrieved successfully",
                "data": analysis,
            })
            .to_string()
            .into(),
        )
        .map_err(Box::new)?)
}

/// GET /composite-analysis?userId=
///
/// The target owner is the query parameter itself, so the ownership check
/// runs before any read service is called.
async fn list_user_composite_analyses(
    service: &CompositeAnalysisService<'_>,
    caller: &RequestIdentity,
    user_id: i64,
) -> Result<Response<Body>, Error> {
    if !caller.is_authenticated() {
        return unauthorized();
    }

    if !caller.is_admin() && caller.user_id != user_id {
        tracing::warn!(
            "Denying analyses of user {} to user {}",
            user_id,
            caller.user_id
        );
        return forbidden();
    }

    let analyses = service.get_complete_by_user(user_id).await?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({
                "message": "Analyses retrieved successfully",
                "data": analyses,
            })
            .to_string()
            .into(),
        )
        .map_err(Box::new)?)
}

fn unauthorized() -> Result<Response<Body>, Error> {
    json_error(StatusCode::UNAUTHORIZED, "Unauthorized", "Authentication is required")
}

fn forbidden() -> Result<Response<Body>, Error> {
    json_error(
        StatusCode::FORBIDDEN,
        "Forbidden",
        "You do not have access to this user's analyses",
    )
}

fn not_found(message: &str) -> Result<Response<Body>, Error> {
    json_error(StatusCode::NOT_FOUND, "NotFound", message)
}

fn bad_request(message: &str) -> Result<Response<Body>, Error> {
    json_error(StatusCode::BAD_REQUEST, "InvalidRequest", message)
}

fn method_not_allowed() -> Result<Response<Body>, Error> {
    json_error(
        StatusCode::METHOD_NOT_ALLOWED,
        "MethodNotAllowed",
        "Method not allowed",
    )
}

fn json_error(status: StatusCode, error: &str, message: &str) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({"error": error, "message": message})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use a11y_shared::readers::{AnalysisReader, ErrorReader, ResultReader};
    use a11y_shared::types::{AnalysisView, ErrorView, ResultView};
    use async_trait::async_trait;

    struct FakeStore {
        analyses: Vec<AnalysisView>,
        results: Vec<ResultView>,
        errors: Vec<ErrorView>,
        // makes the by-user listing blow up, to prove it was never reached
        fail_listing: bool,
    }

    #[async_trait]
    impl AnalysisReader for FakeStore {
        async fn get_by_id(&self, analysis_id: i64) -> Result<Option<AnalysisView>, Error> {
            Ok(self
                .analyses
                .iter()
                .find(|a| a.analysis_id == analysis_id)
                .cloned())
        }

        async fn get_by_user(&self, user_id: i64) -> Result<Vec<AnalysisView>, Error> {
            if self.fail_listing {
                return Err("by-user listing should not have been called".into());
            }
            Ok(self
                .analyses
                .iter()
                .filter(|a| a.user_id == user_id)
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl ResultReader for FakeStore {
        async fn get_by_analysis(&self, analysis_id: i64) -> Result<Vec<ResultView>, Error> {
            Ok(self
                .results
                .iter()
                .filter(|r| r.analysis_id == analysis_id)
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl ErrorReader for FakeStore {
        async fn get_by_result(&self, result_id: i64) -> Result<Vec<ErrorView>, Error> {
            Ok(self
                .errors
                .iter()
                .filter(|e| e.result_id == result_id)
                .cloned()
                .collect())
        }
    }

    fn store() -> FakeStore {
        FakeStore {
            analyses: vec![AnalysisView {
                analysis_id: 7,
                user_id: 42,
                url: "https://example.com".to_string(),
                created_at: "2024-05-01T12:00:00Z".to_string(),
            }],
            results: vec![
                ResultView {
                    result_id: 1,
                    analysis_id: 7,
                    criterion: "1.1.1".to_string(),
                    status: "fail".to_string(),
                },
                ResultView {
                    result_id: 2,
                    analysis_id: 7,
                    criterion: "1.4.3".to_string(),
                    status: "pass".to_string(),
                },
            ],
            errors: vec![ErrorView {
                error_id: 10,
                result_id: 1,
                code: "image-alt".to_string(),
                message: "Image is missing alternative text".to_string(),
                selector: None,
            }],
            fail_listing: false,
        }
    }

    fn caller(user_id: i64, role: &str) -> RequestIdentity {
        RequestIdentity {
            user_id,
            role: role.to_string(),
            ..Default::default()
        }
    }

    fn body_string(response: &Response<Body>) -> String {
        String::from_utf8(response.body().to_vec()).unwrap()
    }

    #[tokio::test]
    async fn owner_gets_complete_analysis() {
        let store = store();
        let service = CompositeAnalysisService::new(&store, &store, &store);

        let response = get_composite_analysis(&service, &caller(42, ""), 7)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(&response);
        assert!(body.contains("\"analysis_id\":7"));
        assert!(body.contains("\"message\":\"Analysis retrieved successfully\""));
    }

    #[tokio::test]
    async fn non_owner_is_forbidden_without_aggregate_body() {
        let store = store();
        let service = CompositeAnalysisService::new(&store, &store, &store);

        let response = get_composite_analysis(&service, &caller(99, ""), 7)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_string(&response);
        assert!(!body.contains("analysis_id"));
        assert!(body.contains("Forbidden"));
    }

    #[tokio::test]
    async fn admin_reads_any_analysis() {
        let store = store();
        let service = CompositeAnalysisService::new(&store, &store, &store);

        let response = get_composite_analysis(&service, &caller(99, "Admin"), 7)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unauthenticated_caller_gets_401() {
        let store = store();
        let service = CompositeAnalysisService::new(&store, &store, &store);

        let response = get_composite_analysis(&service, &RequestIdentity::default(), 7)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = list_user_composite_analyses(&service, &RequestIdentity::default(), 42)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_analysis_is_404() {
        let store = store();
        let service = CompositeAnalysisService::new(&store, &store, &store);

        let response = get_composite_analysis(&service, &caller(42, ""), 999)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_string(&response).contains("NotFound"));
    }

    #[tokio::test]
    async fn by_user_rejects_non_owner_before_any_read() {
        let mut store = store();
        store.fail_listing = true;
        let service = CompositeAnalysisService::new(&store, &store, &store);

        let response = list_user_composite_analyses(&service, &caller(99, ""), 42)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn owner_lists_own_analyses() {
        let store = store();
        let service = CompositeAnalysisService::new(&store, &store, &store);

        let response = list_user_composite_analyses(&service, &caller(42, ""), 42)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(&response);
        assert!(body.contains("\"results\""));
        assert!(body.contains("\"errors\""));
    }

    #[tokio::test]
    async fn admin_lists_other_users_analyses() {
        let store = store();
        let service = CompositeAnalysisService::new(&store, &store, &store);

        let response = list_user_composite_analyses(&service, &caller(1, "Admin"), 42)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    // Full-pipeline tests. The state carries an unconfigured DynamoDB client,
    // so any request that reaches the read services would error out; every
    // request below must terminate before that point.

    fn test_state(gateway_secret: Option<&str>) -> Arc<AppState> {
        let config = aws_sdk_dynamodb::Config::builder()
            .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
            .build();
        AppState::new(
            aws_sdk_dynamodb::Client::from_conf(config),
            "a11y-audits-test".to_string(),
            gateway_secret.map(|s| s.to_string()),
        )
    }

    fn get(uri: &str, headers: &[(&str, &str)]) -> Request {
        let mut builder = lambda_http::http::Request::builder().method("GET").uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::Empty).unwrap()
    }

    #[tokio::test]
    async fn missing_gateway_secret_rejects_before_anything_else() {
        let event = get("/composite-analysis/7", &[("X-User-Id", "42")]);

        let response = function_handler(event, test_state(Some("s3cret")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(body_string(&response).contains("Forbidden"));
    }

    #[tokio::test]
    async fn valid_secret_but_no_identity_is_401() {
        let event = get("/composite-analysis/7", &[("X-Gateway-Secret", "s3cret")]);

        let response = function_handler(event, test_state(Some("s3cret")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn by_user_forbids_non_owner_before_any_store_call() {
        use std::collections::HashMap;

        let mut query: HashMap<String, String> = HashMap::new();
        query.insert("userId".into(), "42".into());

        let event = get("/composite-analysis", &[("X-User-Id", "5")])
            .with_query_string_parameters(query);

        let response = function_handler(event, test_state(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn authorizer_claims_resolve_the_caller_when_headers_are_absent() {
        use lambda_http::aws_lambda_events::apigw::{
            ApiGatewayRequestAuthorizer, ApiGatewayRequestAuthorizerJwtDescription,
            ApiGatewayV2httpRequestContext,
        };
        use lambda_http::request::RequestContext;
        use std::collections::HashMap;

        let mut claims: HashMap<String, String> = HashMap::new();
        claims.insert("sub".into(), "5".into());

        let context = ApiGatewayV2httpRequestContext {
            authorizer: Some(ApiGatewayRequestAuthorizer {
                jwt: Some(ApiGatewayRequestAuthorizerJwtDescription {
                    claims,
                    scopes: None,
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        let mut query: HashMap<String, String> = HashMap::new();
        query.insert("userId".into(), "42".into());

        // A 403 rather than a 401 proves user 5 was resolved from the token.
        let event = get("/composite-analysis", &[])
            .with_query_string_parameters(query)
            .with_request_context(RequestContext::ApiGatewayV2(context));

        let response = function_handler(event, test_state(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn non_numeric_analysis_id_is_400() {
        let event = get("/composite-analysis/latest", &[("X-User-Id", "42")]);

        let response = function_handler(event, test_state(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_user_id_param_is_400() {
        let event = get("/composite-analysis", &[("X-User-Id", "42")]);

        let response = function_handler(event, test_state(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn post_on_composite_route_is_405() {
        let event = lambda_http::http::Request::builder()
            .method("POST")
            .uri("/composite-analysis/7")
            .header("X-User-Id", "42")
            .body(Body::Empty)
            .unwrap();

        let response = function_handler(event, test_state(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let event = get("/healthz", &[]);

        let response = function_handler(event, test_state(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
