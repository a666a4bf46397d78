//! Provisioning of users and groups from the command line.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{
    CreateGroupParams, CreateUserParams, GroupsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{GroupRecord, UserRecord};
use crate::domain::error::FieldErrors;
use crate::domain::slug::{SlugError, generate_unique_slug, validate_slug};
use crate::domain::users::validate_username;

const GROUP_TITLE_MAX_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum AccountsError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error("`{0}` is already taken")]
    Taken(String),
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for AccountsError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate { constraint } => Self::Taken(constraint),
            other => Self::Repo(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateGroupCommand {
    pub title: String,
    pub slug: Option<String>,
    pub description: String,
}

#[derive(Clone)]
pub struct AccountsService {
    users: Arc<dyn UsersRepo>,
    groups: Arc<dyn GroupsRepo>,
}

impl AccountsService {
    pub fn new(users: Arc<dyn UsersRepo>, groups: Arc<dyn GroupsRepo>) -> Self {
        Self { users, groups }
    }

    pub async fn create_user(&self, username: &str) -> Result<UserRecord, AccountsError> {
        validate_username(username).map_err(AccountsError::Validation)?;
        if self.users.find_by_username(username).await?.is_some() {
            return Err(AccountsError::Taken(username.to_string()));
        }

        let user = self
            .users
            .create_user(CreateUserParams {
                username: username.to_string(),
            })
            .await?;
        info!(
            target = "yatube::accounts",
            user_id = user.id,
            username = %user.username,
            "user created"
        );
        Ok(user)
    }

    /// Create a group. Without an explicit slug one is derived from the title,
    /// suffixed when an existing group already uses it.
    pub async fn create_group(
        &self,
        command: CreateGroupCommand,
    ) -> Result<GroupRecord, AccountsError> {
        let title = command.title.trim().to_string();
        let mut errors = FieldErrors::new();
        if title.is_empty() {
            errors.push("title", "This field is required.");
        } else if title.chars().count() > GROUP_TITLE_MAX_LEN {
            errors.push(
                "title",
                format!("Ensure this value has at most {GROUP_TITLE_MAX_LEN} characters."),
            );
        }
        errors.into_result(()).map_err(AccountsError::Validation)?;

        let slug = match command.slug.as_deref().map(str::trim) {
            Some(explicit) if !explicit.is_empty() => {
                validate_slug(explicit)?;
                explicit.to_string()
            }
            _ => {
                let taken: Vec<String> = self
                    .groups
                    .list_groups()
                    .await?
                    .into_iter()
                    .map(|group| group.slug)
                    .collect();
                generate_unique_slug(&title, |candidate| {
                    !taken.iter().any(|slug| slug == candidate)
                })?
            }
        };

        if self.groups.find_by_slug(&slug).await?.is_some() {
            return Err(AccountsError::Taken(slug));
        }

        let group = self
            .groups
            .create_group(CreateGroupParams {
                title,
                slug,
                description: command.description,
            })
            .await?;
        info!(
            target = "yatube::accounts",
            group_id = group.id,
            slug = %group.slug,
            "group created"
        );
        Ok(group)
    }
}
