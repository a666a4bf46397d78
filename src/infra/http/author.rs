//! Routes that act on behalf of a signed-in user.

use axum::{
    Form,
    extract::{Path, RawQuery, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, info};

use crate::{
    application::{
        context::{Actor, RequestContext},
        follows::FollowOutcome,
        posts::{Guarded, PostInput, PostServiceError},
    },
    domain::{entities::PostId, error::FieldErrors},
    presentation::views::{
        CommentFormView, FeedPageView, FollowTemplate, LayoutChrome, LayoutContext, ListingView,
        PostFormTemplate, PostFormView, post_href, profile_href, render_not_found_response,
        render_template_response,
    },
};

use super::{
    auth::{Viewer, require_login},
    errors::{follow_error_response, listing_error_response, post_error_response},
    forms::{CommentForm, PageQuery, PostForm, parse_post_id},
    public::{HttpState, render_post_detail},
};

pub(super) async fn create_form(
    State(state): State<HttpState>,
    Viewer(ctx): Viewer,
    uri: Uri,
) -> Response {
    if let Err(redirect) = require_login(&ctx, &state.auth, &uri) {
        return redirect;
    }

    render_post_form(&state, &ctx, "/create/".to_string(), false, &PostInput::default(), None)
        .await
}

pub(super) async fn create_submit(
    State(state): State<HttpState>,
    Viewer(ctx): Viewer,
    uri: Uri,
    Form(form): Form<PostForm>,
) -> Response {
    let actor = match require_login(&ctx, &state.auth, &uri) {
        Ok(actor) => actor,
        Err(redirect) => return redirect,
    };

    let input = PostInput::from(form);
    match state.posts.create_post(&actor, input.clone()).await {
        Ok(_) => Redirect::to(&profile_href(&actor.username)).into_response(),
        Err(PostServiceError::Validation(errors)) => {
            render_post_form(&state, &ctx, "/create/".to_string(), false, &input, Some(&errors))
                .await
        }
        Err(err) => post_error_response(err, LayoutChrome::for_context(&ctx)),
    }
}

pub(super) async fn edit_form(
    State(state): State<HttpState>,
    Viewer(ctx): Viewer,
    Path(raw_id): Path<String>,
    uri: Uri,
) -> Response {
    let actor = match require_login(&ctx, &state.auth, &uri) {
        Ok(actor) => actor,
        Err(redirect) => return redirect,
    };
    let Some(id) = parse_post_id(&raw_id) else {
        return render_not_found_response(LayoutChrome::for_context(&ctx));
    };

    match state.posts.edit_form(&actor, id).await {
        Ok(Guarded::Done(post)) => {
            let input = PostInput {
                text: post.text,
                group: post.group.map(|group| group.id.to_string()),
                image: post.image,
            };
            render_post_form(&state, &ctx, edit_action(id), true, &input, None).await
        }
        Ok(Guarded::Forbidden(post)) => forbidden_edit(&actor, post.id),
        Err(err) => post_error_response(err, LayoutChrome::for_context(&ctx)),
    }
}

pub(super) async fn edit_submit(
    State(state): State<HttpState>,
    Viewer(ctx): Viewer,
    Path(raw_id): Path<String>,
    uri: Uri,
    Form(form): Form<PostForm>,
) -> Response {
    let actor = match require_login(&ctx, &state.auth, &uri) {
        Ok(actor) => actor,
        Err(redirect) => return redirect,
    };
    let Some(id) = parse_post_id(&raw_id) else {
        return render_not_found_response(LayoutChrome::for_context(&ctx));
    };

    let input = PostInput::from(form);
    match state.posts.update_post(&actor, id, input.clone()).await {
        Ok(Guarded::Done(post)) => Redirect::to(&post_href(post.id)).into_response(),
        Ok(Guarded::Forbidden(post)) => forbidden_edit(&actor, post.id),
        Err(PostServiceError::Validation(errors)) => {
            render_post_form(&state, &ctx, edit_action(id), true, &input, Some(&errors)).await
        }
        Err(err) => post_error_response(err, LayoutChrome::for_context(&ctx)),
    }
}

pub(super) async fn delete_post(
    State(state): State<HttpState>,
    Viewer(ctx): Viewer,
    Path(raw_id): Path<String>,
    uri: Uri,
) -> Response {
    let actor = match require_login(&ctx, &state.auth, &uri) {
        Ok(actor) => actor,
        Err(redirect) => return redirect,
    };
    let Some(id) = parse_post_id(&raw_id) else {
        return render_not_found_response(LayoutChrome::for_context(&ctx));
    };

    match state.posts.delete_post(&actor, id).await {
        Ok(Guarded::Done(())) => Redirect::to(&profile_href(&actor.username)).into_response(),
        Ok(Guarded::Forbidden(_)) => {
            info!(
                target = "yatube::http::guard",
                post_id = id,
                user = %actor.username,
                "delete refused for non-author"
            );
            Redirect::to("/").into_response()
        }
        Err(err) => post_error_response(err, LayoutChrome::for_context(&ctx)),
    }
}

pub(super) async fn add_comment(
    State(state): State<HttpState>,
    Viewer(ctx): Viewer,
    Path(raw_id): Path<String>,
    uri: Uri,
    Form(form): Form<CommentForm>,
) -> Response {
    let actor = match require_login(&ctx, &state.auth, &uri) {
        Ok(actor) => actor,
        Err(redirect) => return redirect,
    };
    let chrome = LayoutChrome::for_context(&ctx);
    let Some(id) = parse_post_id(&raw_id) else {
        return render_not_found_response(chrome);
    };

    match state.posts.add_comment(&actor, id, &form.text).await {
        Ok(_) => Redirect::to(&post_href(id)).into_response(),
        Err(PostServiceError::Validation(errors)) => {
            let detail = match state.posts.detail(id).await {
                Ok(detail) => detail,
                Err(err) => return post_error_response(err, chrome),
            };
            let comment_form = CommentFormView {
                action: format!("/posts/{id}/comment/"),
                text: form.text,
                errors: errors.messages_for("text"),
            };
            render_post_detail(chrome, &ctx, detail, Some(comment_form), StatusCode::OK)
        }
        Err(err) => post_error_response(err, chrome),
    }
}

pub(super) async fn follow_index(
    State(state): State<HttpState>,
    Viewer(ctx): Viewer,
    RawQuery(raw_query): RawQuery,
    uri: Uri,
) -> Response {
    let actor = match require_login(&ctx, &state.auth, &uri) {
        Ok(actor) => actor,
        Err(redirect) => return redirect,
    };
    let chrome = LayoutChrome::for_context(&ctx);
    let selector = match PageQuery::from_raw(raw_query.as_deref()).selector() {
        Ok(selector) => selector,
        Err(err) => return listing_error_response(err.into(), chrome),
    };

    match state.listing.list_followed_posts(&actor, selector).await {
        Ok(page) => {
            let content = FeedPageView {
                listing: ListingView::from_page(&page, "/follow/"),
            };
            let view = LayoutContext::new(chrome, "Following", content);
            render_template_response(FollowTemplate { view }, StatusCode::OK)
        }
        Err(err) => listing_error_response(err, chrome),
    }
}

pub(super) async fn profile_follow(
    State(state): State<HttpState>,
    Viewer(ctx): Viewer,
    Path(username): Path<String>,
    uri: Uri,
) -> Response {
    let actor = match require_login(&ctx, &state.auth, &uri) {
        Ok(actor) => actor,
        Err(redirect) => return redirect,
    };

    match state.follows.follow(&actor, &username).await {
        Ok(outcome) => {
            if outcome == FollowOutcome::SelfFollowRejected {
                debug!(
                    target = "yatube::http::follows",
                    user = %actor.username,
                    "self-follow ignored"
                );
            }
            Redirect::to(&profile_href(&username)).into_response()
        }
        Err(err) => follow_error_response(err, LayoutChrome::for_context(&ctx)),
    }
}

pub(super) async fn profile_unfollow(
    State(state): State<HttpState>,
    Viewer(ctx): Viewer,
    Path(username): Path<String>,
    uri: Uri,
) -> Response {
    let actor = match require_login(&ctx, &state.auth, &uri) {
        Ok(actor) => actor,
        Err(redirect) => return redirect,
    };

    match state.follows.unfollow(&actor, &username).await {
        Ok(()) => Redirect::to(&profile_href(&username)).into_response(),
        Err(err) => follow_error_response(err, LayoutChrome::for_context(&ctx)),
    }
}

fn edit_action(id: PostId) -> String {
    format!("/posts/{id}/edit/")
}

fn forbidden_edit(actor: &Actor, id: PostId) -> Response {
    info!(
        target = "yatube::http::guard",
        post_id = id,
        user = %actor.username,
        "edit refused for non-author"
    );
    Redirect::to(&post_href(id)).into_response()
}

async fn render_post_form(
    state: &HttpState,
    ctx: &RequestContext,
    action: String,
    is_edit: bool,
    input: &PostInput,
    errors: Option<&FieldErrors>,
) -> Response {
    let chrome = LayoutChrome::for_context(ctx);
    let groups = match state.posts.groups().await {
        Ok(groups) => groups,
        Err(err) => return post_error_response(err, chrome),
    };

    let mut form = PostFormView::new(
        action,
        is_edit,
        &groups,
        &input.text,
        input.group.as_deref(),
        input.image.as_deref(),
    );
    if let Some(errors) = errors {
        form = form.with_errors(errors);
    }
    let title = if is_edit { "Edit post" } else { "New post" };
    let view = LayoutContext::new(chrome, title, form);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}
