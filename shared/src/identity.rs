use lambda_http::http::HeaderMap;
use std::collections::HashMap;

/// Role value that grants access to other users' records.
pub const ADMIN_ROLE: &str = "Admin";

const USER_ID_HEADER: &str = "X-User-Id";
const EMAIL_HEADER: &str = "X-User-Email";
const ROLE_HEADER: &str = "X-User-Role";
const NAME_HEADER: &str = "X-User-Name";

// Claims are tried in order: API Gateway forwards the short names, tokens
// minted by the legacy identity provider carry the long-form URIs.
const SUBJECT_CLAIMS: &[&str] = &[
    "sub",
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier",
];
const ROLE_CLAIMS: &[&str] = &[
    "role",
    "http://schemas.microsoft.com/ws/2008/06/identity/claims/role",
];
const EMAIL_CLAIMS: &[&str] = &["email"];
const NAME_CLAIMS: &[&str] = &["name"];

/// Caller identity for one request.
///
/// Populated once by [`resolve`] after the gateway secret check and read-only
/// afterwards. `user_id == 0` means no verifiable identity was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestIdentity {
    pub user_id: i64,
    pub email: String,
    pub display_name: String,
    pub role: String,
}

impl RequestIdentity {
    pub fn is_authenticated(&self) -> bool {
        self.user_id != 0
    }

    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// Resolve the caller identity from gateway headers or JWT claims.
///
/// The gateway headers win outright when X-User-Id carries a positive integer;
/// claims are only consulted when no usable id header exists. Unparseable ids
/// are treated as absent, so resolution never fails - it degrades to an
/// unauthenticated identity and lets the handlers reject the request.
pub fn resolve(
    headers: &HeaderMap,
    claims: Option<&HashMap<String, String>>,
) -> RequestIdentity {
    if let Some(identity) = from_headers(headers) {
        tracing::info!("Resolved caller from gateway headers: user_id={}", identity.user_id);
        return identity;
    }

    if let Some(identity) = claims.and_then(from_claims) {
        tracing::info!("Resolved caller from token claims: user_id={}", identity.user_id);
        return identity;
    }

    tracing::debug!("No identity signal on request; caller is unauthenticated");
    RequestIdentity::default()
}

fn from_headers(headers: &HeaderMap) -> Option<RequestIdentity> {
    let user_id = header_value(headers, USER_ID_HEADER).and_then(|v| parse_user_id(&v))?;

    Some(RequestIdentity {
        user_id,
        email: header_value(headers, EMAIL_HEADER).unwrap_or_default(),
        display_name: header_value(headers, NAME_HEADER).unwrap_or_default(),
        role: header_value(headers, ROLE_HEADER).unwrap_or_default(),
    })
}

fn from_claims(claims: &HashMap<String, String>) -> Option<RequestIdentity> {
    let user_id = SUBJECT_CLAIMS
        .iter()
        .find_map(|key| claims.get(*key).and_then(|v| parse_user_id(v)))?;

    Some(RequestIdentity {
        user_id,
        email: claim_value(claims, EMAIL_CLAIMS),
        display_name: claim_value(claims, NAME_CLAIMS),
        role: claim_value(claims, ROLE_CLAIMS),
    })
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn claim_value(claims: &HashMap<String, String>, candidates: &[&str]) -> String {
    candidates
        .iter()
        .find_map(|key| claims.get(*key))
        .cloned()
        .unwrap_or_default()
}

fn parse_user_id(value: &str) -> Option<i64> {
    value.parse::<i64>().ok().filter(|id| *id > 0)
}
