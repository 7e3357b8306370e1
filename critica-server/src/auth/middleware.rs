use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use critica_core::access::Requester;

use crate::AppState;
use crate::errors::AppError;

/// Resolve the bearer credential (if any) into a [`Requester`] extension
/// before any handler runs. Requests without credentials proceed as
/// [`Requester::Anonymous`]; a credential that is present but invalid is
/// rejected here with 401 rather than silently downgraded.
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let requester = match extract_bearer_token(request.headers()) {
        None => Requester::Anonymous,
        Some(token) => {
            let claims = state.tokens.verify(token)?;
            let user = state
                .db
                .users()
                .get_by_id(claims.sub)
                .await?
                .ok_or_else(|| AppError::unauthorized("unknown user"))?;
            Requester::Authenticated(user)
        }
    };

    request.extensions_mut().insert(requester);
    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(extract_bearer_token(&headers), Some("abc.def.ghi"));

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcg=="),
        );
        assert_eq!(extract_bearer_token(&headers), None);
    }
}
