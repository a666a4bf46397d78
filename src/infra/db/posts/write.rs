use async_trait::async_trait;

use crate::application::repos::{CreatePostParams, PostsWriteRepo, RepoError, UpdatePostParams};
use crate::domain::entities::{PostId, PostRecord};

use super::super::{PostgresRepositories, map_sqlx_error};
use super::PostRow;

/// Re-joins a row produced by a data-modifying CTE named `written`.
const WRITTEN_POST_SELECT: &str = "SELECT p.id, p.text, p.pub_date, p.image, \
        p.author_id, u.username AS author_username, \
        p.group_id, g.slug AS group_slug, g.title AS group_title \
    FROM written p \
    INNER JOIN users u ON u.id = p.author_id \
    LEFT JOIN groups g ON g.id = p.group_id";

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let CreatePostParams {
            author_id,
            text,
            group_id,
            image,
        } = params;

        let sql = format!(
            "WITH written AS ( \
                INSERT INTO posts (author_id, text, group_id, image) \
                VALUES ($1, $2, $3, $4) \
                RETURNING id, text, pub_date, image, author_id, group_id \
            ) {WRITTEN_POST_SELECT}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(author_id)
            .bind(text)
            .bind(group_id)
            .bind(image)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let UpdatePostParams {
            id,
            text,
            group_id,
            image,
        } = params;

        let sql = format!(
            "WITH written AS ( \
                UPDATE posts SET text = $2, group_id = $3, image = $4 \
                WHERE id = $1 \
                RETURNING id, text, pub_date, image, author_id, group_id \
            ) {WRITTEN_POST_SELECT}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .bind(text)
            .bind(group_id)
            .bind(image)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;

        Ok(row.into())
    }

    async fn delete_post(&self, id: PostId) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
