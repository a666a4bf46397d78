use crate::application::context::RequestContext;
use crate::application::error::{ErrorReport, HttpError};
use crate::application::pagination::Page;
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord};
use crate::domain::error::FieldErrors;
use crate::domain::posts::preview;
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{
    OffsetDateTime, format_description::FormatItem, format_description::well_known::Rfc3339,
    macros::format_description,
};

const PUBLISHED_FORMAT: &[FormatItem<'static>] =
    format_description!("[day] [month repr:short] [year] [hour]:[minute]");

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let view = LayoutContext::new(chrome, "Page not found", ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

pub fn profile_href(username: &str) -> String {
    format!("/profile/{username}/")
}

pub fn post_href(id: i64) -> String {
    format!("/posts/{id}/")
}

pub fn group_href(slug: &str) -> String {
    format!("/group/{slug}/")
}

#[derive(Clone)]
pub struct ViewerView {
    pub username: String,
    pub profile_href: String,
}

/// Parts of the page shell that depend on who is looking.
#[derive(Clone, Default)]
pub struct LayoutChrome {
    pub viewer: Option<ViewerView>,
}

impl LayoutChrome {
    pub fn for_context(ctx: &RequestContext) -> Self {
        Self {
            viewer: ctx.actor().map(|actor| ViewerView {
                username: actor.username.clone(),
                profile_href: profile_href(&actor.username),
            }),
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub viewer: Option<ViewerView>,
    pub title: String,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, title: impl Into<String>, content: T) -> Self {
        Self {
            viewer: chrome.viewer,
            title: title.into(),
            content,
        }
    }
}

#[derive(Clone)]
pub struct GroupLinkView {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct PostCard {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub published: String,
    pub iso_date: String,
    pub author: String,
    pub author_href: String,
    pub group: Option<GroupLinkView>,
    pub image: Option<String>,
    pub detail_href: String,
}

impl PostCard {
    pub fn from_record(post: &PostRecord) -> Self {
        Self {
            id: post.id,
            title: preview(&post.text),
            text: post.text.clone(),
            published: format_published(post.pub_date),
            iso_date: format_iso(post.pub_date),
            author: post.author.username.clone(),
            author_href: profile_href(&post.author.username),
            group: post.group.as_ref().map(|group| GroupLinkView {
                title: group.title.clone(),
                href: group_href(&group.slug),
            }),
            image: post.image.clone(),
            detail_href: post_href(post.id),
        }
    }
}

/// Previous/next navigation for a numbered page.
#[derive(Clone)]
pub struct PaginatorView {
    pub number: u64,
    pub num_pages: u64,
    pub first_href: Option<String>,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
    pub last_href: Option<String>,
    pub is_paginated: bool,
}

impl PaginatorView {
    pub fn from_page<T>(page: &Page<T>, base_path: &str) -> Self {
        let href = |number: u64| format!("{base_path}?page={number}");
        Self {
            number: page.number,
            num_pages: page.num_pages,
            first_href: page.has_previous().then(|| href(1)),
            previous_href: page.previous_number().map(href),
            next_href: page.next_number().map(href),
            last_href: page.has_next().then(|| href(page.num_pages)),
            is_paginated: page.num_pages > 1,
        }
    }
}

#[derive(Clone)]
pub struct ListingView {
    pub posts: Vec<PostCard>,
    pub paginator: PaginatorView,
    pub has_results: bool,
}

impl ListingView {
    pub fn from_page(page: &Page<PostRecord>, base_path: &str) -> Self {
        Self {
            posts: page.items.iter().map(PostCard::from_record).collect(),
            paginator: PaginatorView::from_page(page, base_path),
            has_results: !page.items.is_empty(),
        }
    }
}

/// Home and follow feeds: a bare listing.
pub struct FeedPageView {
    pub listing: ListingView,
}

#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<FeedPageView>,
}

#[derive(Template)]
#[template(path = "posts/follow.html")]
pub struct FollowTemplate {
    pub view: LayoutContext<FeedPageView>,
}

pub struct GroupPageView {
    pub title: String,
    pub description: String,
    pub listing: ListingView,
}

#[derive(Template)]
#[template(path = "posts/group_list.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupPageView>,
}

pub struct FollowActionView {
    pub following: bool,
    pub href: String,
}

pub struct ProfilePageView {
    pub username: String,
    pub post_count: u64,
    /// Absent for anonymous viewers and on one's own profile.
    pub follow_action: Option<FollowActionView>,
    pub listing: ListingView,
}

#[derive(Template)]
#[template(path = "posts/profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfilePageView>,
}

pub struct CommentView {
    pub author: String,
    pub author_href: String,
    pub text: String,
    pub published: String,
}

impl CommentView {
    pub fn from_record(comment: &CommentRecord) -> Self {
        Self {
            author: comment.author.username.clone(),
            author_href: profile_href(&comment.author.username),
            text: comment.text.clone(),
            published: format_published(comment.created_at),
        }
    }
}

pub struct CommentFormView {
    pub action: String,
    pub text: String,
    pub errors: Vec<String>,
}

pub struct PostDetailView {
    pub post: PostCard,
    pub author_post_count: u64,
    pub comments: Vec<CommentView>,
    pub edit_href: Option<String>,
    pub delete_action: Option<String>,
    pub comment_form: Option<CommentFormView>,
}

#[derive(Template)]
#[template(path = "posts/post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailView>,
}

pub struct GroupOptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

pub struct PostFormView {
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub image: String,
    pub group_options: Vec<GroupOptionView>,
    pub text_errors: Vec<String>,
    pub group_errors: Vec<String>,
    pub image_errors: Vec<String>,
}

impl PostFormView {
    pub fn new(
        action: String,
        is_edit: bool,
        groups: &[GroupRecord],
        text: &str,
        group: Option<&str>,
        image: Option<&str>,
    ) -> Self {
        let selected = group.map(str::trim).unwrap_or("");
        let mut group_options = vec![GroupOptionView {
            value: String::new(),
            label: "---------".to_string(),
            selected: selected.is_empty(),
        }];
        group_options.extend(groups.iter().map(|group| {
            let value = group.id.to_string();
            GroupOptionView {
                selected: value == selected,
                value,
                label: group.title.clone(),
            }
        }));

        Self {
            is_edit,
            action,
            text: text.to_string(),
            image: image.unwrap_or("").to_string(),
            group_options,
            text_errors: Vec::new(),
            group_errors: Vec::new(),
            image_errors: Vec::new(),
        }
    }

    pub fn with_errors(self, errors: &FieldErrors) -> Self {
        Self {
            text_errors: errors.messages_for("text"),
            group_errors: errors.messages_for("group"),
            image_errors: errors.messages_for("image"),
            ..self
        }
    }
}

#[derive(Template)]
#[template(path = "posts/create_post.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormView>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page not found".to_string(),
            message: "The page you requested does not exist.".to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/".to_string(),
            label: "Back to home".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

fn format_published(value: OffsetDateTime) -> String {
    value.format(PUBLISHED_FORMAT).unwrap_or_default()
}

fn format_iso(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_default()
}
