use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::context::Actor;
use crate::application::repos::{FollowInsert, FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::{UserId, UserRecord};

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("author `{0}` does not exist")]
    AuthorNotFound(String),
    #[error("`{follower}` does not follow `{author}`")]
    NotFollowing { follower: String, author: String },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    /// Following oneself is refused without touching the store.
    SelfFollowRejected,
}

#[derive(Clone)]
pub struct FollowService {
    follows: Arc<dyn FollowsRepo>,
    users: Arc<dyn UsersRepo>,
}

impl FollowService {
    pub fn new(follows: Arc<dyn FollowsRepo>, users: Arc<dyn UsersRepo>) -> Self {
        Self { follows, users }
    }

    pub async fn follow(
        &self,
        actor: &Actor,
        author_username: &str,
    ) -> Result<FollowOutcome, FollowError> {
        let author = self.load_author(author_username).await?;
        if author.id == actor.id {
            return Ok(FollowOutcome::SelfFollowRejected);
        }

        match self.follows.create_follow(actor.id, author.id).await? {
            FollowInsert::Created(edge) => {
                info!(
                    target = "yatube::follows",
                    follow_id = edge.id,
                    follower = %actor.username,
                    author = %author.username,
                    "follow created"
                );
                Ok(FollowOutcome::Created)
            }
            FollowInsert::Existing => Ok(FollowOutcome::AlreadyFollowing),
        }
    }

    pub async fn unfollow(&self, actor: &Actor, author_username: &str) -> Result<(), FollowError> {
        let author = self.load_author(author_username).await?;
        if !self.follows.delete_follow(actor.id, author.id).await? {
            return Err(FollowError::NotFollowing {
                follower: actor.username.clone(),
                author: author.username,
            });
        }

        info!(
            target = "yatube::follows",
            follower = %actor.username,
            author = %author.username,
            "follow removed"
        );
        Ok(())
    }

    /// Whether `user_id` currently follows `author_id`.
    pub async fn is_following(
        &self,
        user_id: UserId,
        author_id: UserId,
    ) -> Result<bool, RepoError> {
        Ok(self.follows.find_follow(user_id, author_id).await?.is_some())
    }

    async fn load_author(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| FollowError::AuthorNotFound(username.to_string()))
    }
}
