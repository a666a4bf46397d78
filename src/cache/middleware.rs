//! Page cache middleware.
//!
//! Serves stored renderings for GET requests and records fresh `200 OK`
//! responses. Responses that set cookies, or whose body exceeds
//! `MAX_CACHED_BODY_BYTES`, are passed through without being stored.

use std::sync::Arc;

use axum::{
    body::{Body, HttpBody},
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;
use tracing::{debug, instrument, warn};

use crate::application::context::RequestContext;

use super::{CachedResponse, PageCache, PageCacheConfig, PageKey};

const MAX_CACHED_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct PageCacheState {
    pub config: PageCacheConfig,
    pub pages: Arc<PageCache>,
}

impl PageCacheState {
    pub fn new(config: PageCacheConfig) -> Self {
        let pages = Arc::new(PageCache::new(&config));
        Self { config, pages }
    }
}

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn page_cache_layer(
    State(cache): State<PageCacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.enabled || request.method() != Method::GET {
        return next.run(request).await;
    }

    let viewer = request
        .extensions()
        .get::<RequestContext>()
        .and_then(RequestContext::actor_id);
    let key = PageKey::new(
        request.uri().path(),
        request.uri().query().unwrap_or(""),
        viewer,
    );

    if let Some(cached) = cache.pages.get(&key) {
        debug!(cache = "page", outcome = "hit", "serving stored page");
        return build_response(cached);
    }
    debug!(cache = "page", outcome = "miss", "rendering page");

    let response = next.run(request).await;
    if response.status() != StatusCode::OK || response.headers().contains_key(SET_COOKIE) {
        return response;
    }

    if body_exceeds_limit(response.body()) {
        debug!(cache = "page", outcome = "skip", "page too large to store");
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            warn!(cache = "page", error = %err, "failed to buffer response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    if bytes.len() > MAX_CACHED_BODY_BYTES {
        debug!(cache = "page", outcome = "skip", "page too large to store");
        return Response::from_parts(parts, Body::from(bytes));
    }

    let cached = CachedResponse {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect(),
        body: bytes.clone(),
    };
    cache.pages.put(key, cached);
    debug!(cache = "page", outcome = "store", "stored page");

    Response::from_parts(parts, Body::from(bytes))
}

/// Rendered bodies report an exact size; streamed ones may only bound it.
fn body_exceeds_limit(body: &Body) -> bool {
    let hint = body.size_hint();
    let lower = usize::try_from(hint.lower()).unwrap_or(usize::MAX);
    lower > MAX_CACHED_BODY_BYTES
}

fn build_response(cached: CachedResponse) -> Response {
    let mut builder = Response::builder().status(cached.status);
    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{Router, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;

    fn app(state: PageCacheState, calls: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/",
                get(move || {
                    let calls = Arc::clone(&calls);
                    async move {
                        let n = calls.fetch_add(1, Ordering::SeqCst);
                        format!("render {n}")
                    }
                }),
            )
            .route(
                "/large",
                get(|| async { "x".repeat(MAX_CACHED_BODY_BYTES + 1) }),
            )
            .route(
                "/cookie",
                get(|| async { ([(SET_COOKIE, "a=b")], "with cookie") }),
            )
            .layer(middleware::from_fn_with_state(state, page_cache_layer))
    }

    async fn body_of(app: &Router, uri: &str) -> String {
        let response = app
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn second_request_is_served_from_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(PageCacheState::new(PageCacheConfig::default()), calls.clone());

        assert_eq!(body_of(&app, "/").await, "render 0");
        assert_eq!(body_of(&app, "/").await, "render 0");
        assert_eq!(body_of(&app, "/?page=2").await, "render 1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disabled_cache_always_renders() {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = PageCacheConfig {
            enabled: false,
            ..Default::default()
        };
        let app = app(PageCacheState::new(config), calls.clone());

        body_of(&app, "/").await;
        body_of(&app, "/").await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn oversized_pages_are_served_but_not_stored() {
        let state = PageCacheState::new(PageCacheConfig::default());
        let app = app(state.clone(), Arc::new(AtomicUsize::new(0)));

        let response = app
            .clone()
            .oneshot(Request::get("/large").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes.len(), MAX_CACHED_BODY_BYTES + 1);
        assert!(state.pages.is_empty());
    }

    #[tokio::test]
    async fn responses_setting_cookies_are_not_stored() {
        let state = PageCacheState::new(PageCacheConfig::default());
        let app = app(state.clone(), Arc::new(AtomicUsize::new(0)));

        body_of(&app, "/cookie").await;
        assert!(state.pages.is_empty());
    }
}
