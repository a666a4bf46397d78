use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, RawQuery, State},
    http::StatusCode,
    middleware,
    response::Response,
    routing::{get, post},
};

use crate::{
    application::{
        context::RequestContext,
        follows::FollowService,
        listing::ListingService,
        posts::{PostDetail, PostService},
        sessions::SessionService,
    },
    cache::{PageCacheState, page_cache_layer},
    config::AuthSettings,
    presentation::views::{
        CommentFormView, CommentView, FeedPageView, FollowActionView, GroupPageView,
        IndexTemplate, LayoutChrome, LayoutContext, ListingView, PostCard, PostDetailTemplate,
        PostDetailView, ProfilePageView, ProfileTemplate, GroupTemplate, profile_href,
        render_not_found_response, render_template_response,
    },
};

use super::{
    auth::Viewer,
    author,
    errors::{listing_error_response, post_error_response},
    forms::{PageQuery, parse_post_id},
    middleware::{log_responses, resolve_actor, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub listing: Arc<ListingService>,
    pub posts: Arc<PostService>,
    pub follows: Arc<FollowService>,
    pub sessions: Arc<SessionService>,
    pub auth: AuthSettings,
    pub page_cache: Option<PageCacheState>,
}

pub fn build_router(state: HttpState) -> Router {
    // Only the home listing is page-cached.
    let home = Router::new().route("/", get(index));
    let home = if let Some(cache_state) = state.page_cache.clone() {
        home.layer(middleware::from_fn_with_state(cache_state, page_cache_layer))
    } else {
        home
    };

    Router::new()
        .route("/group/{slug}/", get(group_posts))
        .route("/profile/{username}/", get(profile))
        .route("/posts/{id}/", get(post_detail))
        .route(
            "/create/",
            get(author::create_form).post(author::create_submit),
        )
        .route(
            "/posts/{id}/edit/",
            get(author::edit_form).post(author::edit_submit),
        )
        .route("/posts/{id}/comment/", post(author::add_comment))
        .route("/posts/delete/{id}", post(author::delete_post))
        .route("/follow/", get(author::follow_index))
        .route("/profile/{username}/follow/", get(author::profile_follow))
        .route(
            "/profile/{username}/unfollow/",
            get(author::profile_unfollow),
        )
        .merge(home)
        .fallback(fallback)
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(state, resolve_actor))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn index(
    State(state): State<HttpState>,
    Viewer(ctx): Viewer,
    RawQuery(raw_query): RawQuery,
) -> Response {
    let chrome = LayoutChrome::for_context(&ctx);
    let selector = match PageQuery::from_raw(raw_query.as_deref()).selector() {
        Ok(selector) => selector,
        Err(err) => return listing_error_response(err.into(), chrome),
    };

    match state.listing.home(selector).await {
        Ok(page) => {
            let content = FeedPageView {
                listing: ListingView::from_page(&page, "/"),
            };
            let view = LayoutContext::new(chrome, "Latest posts", content);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => listing_error_response(err, chrome),
    }
}

async fn group_posts(
    State(state): State<HttpState>,
    Viewer(ctx): Viewer,
    Path(slug): Path<String>,
    RawQuery(raw_query): RawQuery,
) -> Response {
    let chrome = LayoutChrome::for_context(&ctx);
    let selector = match PageQuery::from_raw(raw_query.as_deref()).selector() {
        Ok(selector) => selector,
        Err(err) => return listing_error_response(err.into(), chrome),
    };

    match state.listing.group(&slug, selector).await {
        Ok(listing) => {
            let base = format!("/group/{}/", listing.group.slug);
            let title = format!("Group {}", listing.group.title);
            let content = GroupPageView {
                title: listing.group.title.clone(),
                description: listing.group.description.clone(),
                listing: ListingView::from_page(&listing.page, &base),
            };
            let view = LayoutContext::new(chrome, title, content);
            render_template_response(GroupTemplate { view }, StatusCode::OK)
        }
        Err(err) => listing_error_response(err, chrome),
    }
}

async fn profile(
    State(state): State<HttpState>,
    Viewer(ctx): Viewer,
    Path(username): Path<String>,
    RawQuery(raw_query): RawQuery,
) -> Response {
    let chrome = LayoutChrome::for_context(&ctx);
    let selector = match PageQuery::from_raw(raw_query.as_deref()).selector() {
        Ok(selector) => selector,
        Err(err) => return listing_error_response(err.into(), chrome),
    };

    match state.listing.profile(&ctx, &username, selector).await {
        Ok(listing) => {
            let author = listing.author.username.clone();
            let base = profile_href(&author);
            let follow_action = (ctx.is_authenticated() && !listing.is_own_profile).then(|| {
                let verb = if listing.following { "unfollow" } else { "follow" };
                FollowActionView {
                    following: listing.following,
                    href: format!("{base}{verb}/"),
                }
            });
            let content = ProfilePageView {
                username: author.clone(),
                post_count: listing.post_count(),
                follow_action,
                listing: ListingView::from_page(&listing.page, &base),
            };
            let view = LayoutContext::new(chrome, format!("Profile of {author}"), content);
            render_template_response(ProfileTemplate { view }, StatusCode::OK)
        }
        Err(err) => listing_error_response(err, chrome),
    }
}

async fn post_detail(
    State(state): State<HttpState>,
    Viewer(ctx): Viewer,
    Path(raw_id): Path<String>,
) -> Response {
    let chrome = LayoutChrome::for_context(&ctx);
    let Some(id) = parse_post_id(&raw_id) else {
        return render_not_found_response(chrome);
    };

    match state.posts.detail(id).await {
        Ok(detail) => {
            let comment_form = ctx.is_authenticated().then(|| CommentFormView {
                action: format!("/posts/{id}/comment/"),
                text: String::new(),
                errors: Vec::new(),
            });
            render_post_detail(chrome, &ctx, detail, comment_form, StatusCode::OK)
        }
        Err(err) => post_error_response(err, chrome),
    }
}

/// Render a post page; the comment handler reuses this to show form errors.
pub(super) fn render_post_detail(
    chrome: LayoutChrome,
    ctx: &RequestContext,
    detail: PostDetail,
    comment_form: Option<CommentFormView>,
    status: StatusCode,
) -> Response {
    let PostDetail {
        post,
        comments,
        author_post_count,
    } = detail;

    let is_author = ctx.actor_id() == Some(post.author.id);
    let card = PostCard::from_record(&post);
    let title = format!("Post {}", card.title);
    let content = PostDetailView {
        edit_href: is_author.then(|| format!("/posts/{}/edit/", post.id)),
        delete_action: is_author.then(|| format!("/posts/delete/{}", post.id)),
        post: card,
        author_post_count,
        comments: comments.iter().map(CommentView::from_record).collect(),
        comment_form,
    };
    let view = LayoutContext::new(chrome, title, content);
    render_template_response(PostDetailTemplate { view }, status)
}

async fn fallback(Viewer(ctx): Viewer) -> Response {
    render_not_found_response(LayoutChrome::for_context(&ctx))
}
