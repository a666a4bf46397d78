use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::context::Actor;
use crate::application::guard::{Ownership, guard_post_owner};
use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostScope, PostsRepo,
    PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{CommentRecord, GroupRecord, PostId, PostRecord};
use crate::domain::error::FieldErrors;
use crate::domain::posts::{INVALID_CHOICE_MESSAGE, PostDraft, parse_comment};

#[derive(Debug, Error)]
pub enum PostServiceError {
    #[error("post {0} does not exist")]
    NotFound(PostId),
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Raw post form values as submitted.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub text: String,
    pub group: Option<String>,
    pub image: Option<String>,
}

/// Result of a mutation that passed through the ownership guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guarded<T> {
    Done(T),
    /// The actor is not the author; nothing was changed.
    Forbidden(PostRecord),
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostRecord,
    pub comments: Vec<CommentRecord>,
    pub author_post_count: u64,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    comments: Arc<dyn CommentsRepo>,
    groups: Arc<dyn GroupsRepo>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        comments: Arc<dyn CommentsRepo>,
        groups: Arc<dyn GroupsRepo>,
    ) -> Self {
        Self {
            posts,
            writer,
            comments,
            groups,
        }
    }

    pub async fn detail(&self, id: PostId) -> Result<PostDetail, PostServiceError> {
        let post = self
            .posts
            .find_by_id(id)
            .await?
            .ok_or(PostServiceError::NotFound(id))?;
        let comments = self.comments.list_for_post(id).await?;
        let author_post_count = self
            .posts
            .count_posts(PostScope::Author(post.author.id))
            .await?;

        Ok(PostDetail {
            post,
            comments,
            author_post_count,
        })
    }

    /// Groups offered by the post form.
    pub async fn groups(&self) -> Result<Vec<GroupRecord>, PostServiceError> {
        Ok(self.groups.list_groups().await?)
    }

    pub async fn create_post(
        &self,
        actor: &Actor,
        input: PostInput,
    ) -> Result<PostRecord, PostServiceError> {
        let draft = self.validate(&input).await?;
        let post = self
            .writer
            .create_post(CreatePostParams {
                author_id: actor.id,
                text: draft.text,
                group_id: draft.group_id,
                image: draft.image,
            })
            .await?;

        info!(
            target = "yatube::posts",
            post_id = post.id,
            author = %actor.username,
            "post created"
        );
        Ok(post)
    }

    /// Load a post for the edit form, subject to the ownership guard.
    pub async fn edit_form(
        &self,
        actor: &Actor,
        id: PostId,
    ) -> Result<Guarded<PostRecord>, PostServiceError> {
        match guard_post_owner(self.posts.as_ref(), actor, id).await? {
            Ownership::Allowed(post) => Ok(Guarded::Done(post)),
            Ownership::Forbidden(post) => Ok(Guarded::Forbidden(post)),
            Ownership::NotFound => Err(PostServiceError::NotFound(id)),
        }
    }

    pub async fn update_post(
        &self,
        actor: &Actor,
        id: PostId,
        input: PostInput,
    ) -> Result<Guarded<PostRecord>, PostServiceError> {
        let post = match guard_post_owner(self.posts.as_ref(), actor, id).await? {
            Ownership::Allowed(post) => post,
            Ownership::Forbidden(post) => return Ok(Guarded::Forbidden(post)),
            Ownership::NotFound => return Err(PostServiceError::NotFound(id)),
        };

        let draft = self.validate(&input).await?;
        let updated = self
            .writer
            .update_post(UpdatePostParams {
                id: post.id,
                text: draft.text,
                group_id: draft.group_id,
                image: draft.image,
            })
            .await?;

        info!(target = "yatube::posts", post_id = id, "post updated");
        Ok(Guarded::Done(updated))
    }

    pub async fn delete_post(
        &self,
        actor: &Actor,
        id: PostId,
    ) -> Result<Guarded<()>, PostServiceError> {
        match guard_post_owner(self.posts.as_ref(), actor, id).await? {
            Ownership::Allowed(post) => {
                self.writer.delete_post(post.id).await?;
                info!(
                    target = "yatube::posts",
                    post_id = id,
                    author = %actor.username,
                    "post deleted"
                );
                Ok(Guarded::Done(()))
            }
            Ownership::Forbidden(post) => Ok(Guarded::Forbidden(post)),
            Ownership::NotFound => Err(PostServiceError::NotFound(id)),
        }
    }

    /// Attach a comment by `actor` to the post named in the route.
    pub async fn add_comment(
        &self,
        actor: &Actor,
        post_id: PostId,
        text: &str,
    ) -> Result<CommentRecord, PostServiceError> {
        if self.posts.find_by_id(post_id).await?.is_none() {
            return Err(PostServiceError::NotFound(post_id));
        }
        let text = parse_comment(text).map_err(PostServiceError::Validation)?;

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id,
                author_id: actor.id,
                text,
            })
            .await?;
        info!(
            target = "yatube::posts",
            post_id,
            comment_id = comment.id,
            "comment added"
        );
        Ok(comment)
    }

    async fn validate(&self, input: &PostInput) -> Result<PostDraft, PostServiceError> {
        let draft = PostDraft::parse(&input.text, input.group.as_deref(), input.image.as_deref())
            .map_err(PostServiceError::Validation)?;

        if let Some(group_id) = draft.group_id
            && self.groups.find_by_id(group_id).await?.is_none()
        {
            let mut errors = FieldErrors::new();
            errors.push("group", INVALID_CHOICE_MESSAGE);
            return Err(PostServiceError::Validation(errors));
        }

        Ok(draft)
    }
}
