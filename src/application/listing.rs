use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::application::context::{Actor, RequestContext};
use crate::application::pagination::{
    POSTS_PER_PAGE, Page, PageSelector, PaginationError, Paginator,
};
use crate::application::follows::FollowService;
use crate::application::repos::{GroupsRepo, PostScope, PostsRepo, RepoError, UsersRepo};
use crate::domain::entities::{GroupRecord, PostRecord, UserRecord};

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("group `{0}` does not exist")]
    GroupNotFound(String),
    #[error("author `{0}` does not exist")]
    AuthorNotFound(String),
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct GroupListing {
    pub group: GroupRecord,
    pub page: Page<PostRecord>,
}

#[derive(Debug, Clone)]
pub struct ProfileListing {
    pub author: UserRecord,
    pub page: Page<PostRecord>,
    /// Whether the viewer follows this author. Always false for anonymous
    /// viewers and for the author looking at their own profile.
    pub following: bool,
    pub is_own_profile: bool,
}

impl ProfileListing {
    pub fn post_count(&self) -> u64 {
        self.page.total_count
    }
}

/// Read side of the site: every paginated post listing.
#[derive(Clone)]
pub struct ListingService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    follows: Arc<FollowService>,
}

impl ListingService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        follows: Arc<FollowService>,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            follows,
        }
    }

    pub async fn home(&self, selector: PageSelector) -> Result<Page<PostRecord>, ListingError> {
        self.paginate(PostScope::All, selector).await
    }

    pub async fn group(
        &self,
        slug: &str,
        selector: PageSelector,
    ) -> Result<GroupListing, ListingError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| ListingError::GroupNotFound(slug.to_string()))?;
        let page = self.paginate(PostScope::Group(group.id), selector).await?;
        Ok(GroupListing { group, page })
    }

    pub async fn profile(
        &self,
        ctx: &RequestContext,
        username: &str,
        selector: PageSelector,
    ) -> Result<ProfileListing, ListingError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| ListingError::AuthorNotFound(username.to_string()))?;
        let page = self.paginate(PostScope::Author(author.id), selector).await?;

        let is_own_profile = ctx.actor_id() == Some(author.id);
        let following = match ctx.actor() {
            Some(actor) if !is_own_profile => self.follows.is_following(actor.id, author.id).await?,
            _ => false,
        };

        Ok(ProfileListing {
            author,
            page,
            following,
            is_own_profile,
        })
    }

    /// Posts written by authors `actor` follows.
    pub async fn list_followed_posts(
        &self,
        actor: &Actor,
        selector: PageSelector,
    ) -> Result<Page<PostRecord>, ListingError> {
        self.paginate(PostScope::FollowedBy(actor.id), selector)
            .await
    }

    async fn paginate(
        &self,
        scope: PostScope,
        selector: PageSelector,
    ) -> Result<Page<PostRecord>, ListingError> {
        let total = self.posts.count_posts(scope).await?;
        let request = Paginator::new(total, POSTS_PER_PAGE).resolve(selector)?;
        let items = self.posts.list_posts(scope, request).await?;
        debug!(
            target = "yatube::listing",
            ?scope,
            page = request.number,
            total,
            returned = items.len(),
            "listing resolved"
        );
        Ok(Page::new(items, request, total))
    }
}
