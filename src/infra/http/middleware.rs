use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::{
    context::RequestContext,
    error::{ErrorReport, HttpError},
    sessions::SessionError,
};

use super::public::HttpState;

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext::new(Uuid::new_v4().to_string());
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if response.extensions().get::<RequestContext>().is_none() {
        response.extensions_mut().insert(ctx);
    }
    response
}

/// Attach the session's user to the request context. Requests with a bad or
/// expired token continue anonymously.
pub async fn resolve_actor(
    State(state): State<HttpState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = session_token(request.headers(), &state.auth.session_cookie) else {
        return next.run(request).await;
    };

    match state.sessions.authenticate(&token).await {
        Ok(actor) => {
            let ctx = request
                .extensions()
                .get::<RequestContext>()
                .cloned()
                .unwrap_or_default()
                .with_actor(actor);
            request.extensions_mut().insert(ctx.clone());

            // Lets the response logger name the user.
            let mut response = next.run(request).await;
            response.extensions_mut().insert(ctx);
            return response;
        }
        Err(SessionError::Repo(err)) => return HttpError::from(err).into_response(),
        Err(err) => {
            debug!(
                target = "yatube::http::session",
                reason = %err,
                "ignoring session token"
            );
        }
    }

    next.run(request).await
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        let elapsed_ms = start.elapsed().as_millis();
        let (request_id, user) = response
            .extensions()
            .get::<RequestContext>()
            .map(|ctx| {
                (
                    ctx.request_id.clone(),
                    ctx.actor()
                        .map(|actor| actor.username.clone())
                        .unwrap_or_default(),
                )
            })
            .unwrap_or_default();
        let report = response.extensions_mut().remove::<ErrorReport>();
        let (source, messages) = match report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        if status.is_server_error() {
            error!(
                target = "yatube::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                user = user,
                "request failed",
            );
        } else {
            warn!(
                target = "yatube::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                request_id = request_id,
                user = user,
                "client request error",
            );
        }
    }

    response
}

/// Bearer header wins over the cookie.
fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(bearer) = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.strip_prefix("Bearer "))
    {
        return Some(bearer.trim().to_string());
    }

    CookieJar::from_headers(headers)
        .get(cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use axum::http::header::COOKIE;

    use super::*;

    #[test]
    fn bearer_header_is_preferred() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer ys_abc_def"));
        headers.insert(COOKIE, HeaderValue::from_static("yatube_session=ys_cookie_x"));

        assert_eq!(
            session_token(&headers, "yatube_session").as_deref(),
            Some("ys_abc_def")
        );
    }

    #[test]
    fn cookie_is_read_by_name() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; yatube_session=ys_cookie_x"),
        );

        assert_eq!(
            session_token(&headers, "yatube_session").as_deref(),
            Some("ys_cookie_x")
        );
        assert_eq!(session_token(&headers, "other"), None);
    }
}
