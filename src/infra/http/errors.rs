use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::application::{
    error::{ErrorReport, HttpError},
    follows::FollowError,
    listing::ListingError,
    posts::PostServiceError,
};
use crate::presentation::views::{LayoutChrome, render_not_found_response};

fn not_found(chrome: LayoutChrome, source: &'static str, detail: String) -> Response {
    let mut response = render_not_found_response(chrome);
    ErrorReport::from_message(source, StatusCode::NOT_FOUND, detail).attach(&mut response);
    response
}

pub(super) fn listing_error_response(err: ListingError, chrome: LayoutChrome) -> Response {
    const SOURCE: &str = "infra::http::listing_error_response";
    match err {
        ListingError::GroupNotFound(_)
        | ListingError::AuthorNotFound(_)
        | ListingError::Pagination(_) => not_found(chrome, SOURCE, err.to_string()),
        ListingError::Repo(err) => HttpError::from(err).into_response(),
    }
}

/// Validation errors are handled by the caller, which owns the form.
pub(super) fn post_error_response(err: PostServiceError, chrome: LayoutChrome) -> Response {
    const SOURCE: &str = "infra::http::post_error_response";
    match err {
        PostServiceError::NotFound(_) => not_found(chrome, SOURCE, err.to_string()),
        PostServiceError::Validation(errors) => HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Invalid submission",
            errors.to_string(),
        )
        .into_response(),
        PostServiceError::Repo(err) => HttpError::from(err).into_response(),
    }
}

pub(super) fn follow_error_response(err: FollowError, chrome: LayoutChrome) -> Response {
    const SOURCE: &str = "infra::http::follow_error_response";
    match err {
        FollowError::AuthorNotFound(_) | FollowError::NotFollowing { .. } => {
            not_found(chrome, SOURCE, err.to_string())
        }
        FollowError::Repo(err) => HttpError::from(err).into_response(),
    }
}
