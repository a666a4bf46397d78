//! Request identity for handlers and the login redirect for protected routes.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{Uri, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use url::form_urlencoded;

use crate::application::context::{Actor, RequestContext};
use crate::config::AuthSettings;

/// The request context installed by the middleware stack. Anonymous when the
/// stack did not run, which only happens in handler-level tests.
pub(super) struct Viewer(pub RequestContext);

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer(
            parts
                .extensions
                .get::<RequestContext>()
                .cloned()
                .unwrap_or_default(),
        ))
    }
}

/// The authenticated actor, or a redirect to the login page that comes back to `uri`.
pub(super) fn require_login(
    ctx: &RequestContext,
    auth: &AuthSettings,
    uri: &Uri,
) -> Result<Actor, Response> {
    match ctx.actor() {
        Some(actor) => Ok(actor.clone()),
        None => Err(login_redirect(auth, uri).into_response()),
    }
}

/// `303 See Other` to `{login_path}?next={path+query}` with `next` fully percent-encoded.
pub fn login_redirect(auth: &AuthSettings, uri: &Uri) -> Redirect {
    let original = uri
        .path_and_query()
        .map(|value| value.as_str())
        .unwrap_or_else(|| uri.path());
    let next: String = form_urlencoded::byte_serialize(original.as_bytes()).collect();
    Redirect::to(&format!("{}?next={next}", auth.login_path))
}

#[cfg(test)]
mod tests {
    use axum::http::{StatusCode, header::LOCATION};

    use super::*;

    #[test]
    fn redirect_encodes_path_and_query() {
        let uri: Uri = "/create/?draft=1".parse().unwrap();
        let response = login_redirect(&AuthSettings::default(), &uri).into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "/auth/login/?next=%2Fcreate%2F%3Fdraft%3D1"
        );
    }

    #[test]
    fn anonymous_context_is_redirected() {
        let uri: Uri = "/follow/".parse().unwrap();
        let err = require_login(&RequestContext::default(), &AuthSettings::default(), &uri)
            .expect_err("anonymous must redirect");
        assert_eq!(err.status(), StatusCode::SEE_OTHER);
    }
}
