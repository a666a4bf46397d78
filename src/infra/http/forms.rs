use serde::Deserialize;
use url::form_urlencoded;

use crate::application::pagination::{PageSelector, PaginationError};
use crate::application::posts::PostInput;
use crate::domain::entities::PostId;

/// The `page` parameter of a listing URL. Decoded by hand so repeated or
/// unrelated parameters never reject the request; the last `page` wins.
#[derive(Debug, Default)]
pub(super) struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    pub(super) fn from_raw(raw: Option<&str>) -> Self {
        let page = raw.and_then(|query| {
            form_urlencoded::parse(query.as_bytes())
                .filter(|(key, _)| key == "page")
                .map(|(_, value)| value.into_owned())
                .last()
        });
        Self { page }
    }

    pub(super) fn selector(&self) -> Result<PageSelector, PaginationError> {
        PageSelector::parse(self.page.as_deref())
    }
}

/// Post form body. The author never comes from the form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PostForm {
    pub text: String,
    pub group: Option<String>,
    pub image: Option<String>,
}

impl From<PostForm> for PostInput {
    fn from(form: PostForm) -> Self {
        Self {
            text: form.text,
            group: form.group,
            image: form.image,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CommentForm {
    pub text: String,
}

/// Route ids that are not positive integers name no post.
pub(super) fn parse_post_id(raw: &str) -> Option<PostId> {
    raw.parse::<PostId>().ok().filter(|id| *id > 0)
}
