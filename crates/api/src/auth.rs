use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::AppState;

/// Gate for `/api/*`. Passes everything through when no dashboard token is set.
pub async fn require_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if authorized(state.dashboard_token.as_deref(), &headers) {
        return next.run(request).await;
    }
    let body = Json(json!({ "error": "unauthorized" }));
    (StatusCode::UNAUTHORIZED, body).into_response()
}

fn authorized(expected: Option<&str>, headers: &HeaderMap) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|presented| presented == expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn open_without_token() {
        assert!(authorized(None, &HeaderMap::new()));
    }

    #[test]
    fn bearer_must_match() {
        assert!(authorized(Some("s3cret"), &with_auth("Bearer s3cret")));
        assert!(!authorized(Some("s3cret"), &with_auth("Bearer other")));
        assert!(!authorized(Some("s3cret"), &with_auth("s3cret")));
        assert!(!authorized(Some("s3cret"), &HeaderMap::new()));
    }
}
