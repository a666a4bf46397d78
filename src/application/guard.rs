//! Ownership checks run before any post mutation.

use crate::application::context::Actor;
use crate::application::repos::{PostsRepo, RepoError};
use crate::domain::entities::{PostId, PostRecord};

/// Outcome of checking whether an actor may mutate a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ownership {
    Allowed(PostRecord),
    Forbidden(PostRecord),
    NotFound,
}

/// Classify an already loaded post for `actor`.
pub fn check_owner(actor: &Actor, post: Option<PostRecord>) -> Ownership {
    match post {
        None => Ownership::NotFound,
        Some(post) if post.is_authored_by(actor.id) => Ownership::Allowed(post),
        Some(post) => Ownership::Forbidden(post),
    }
}

pub async fn guard_post_owner(
    posts: &dyn PostsRepo,
    actor: &Actor,
    post_id: PostId,
) -> Result<Ownership, RepoError> {
    let post = posts.find_by_id(post_id).await?;
    Ok(check_owner(actor, post))
}
