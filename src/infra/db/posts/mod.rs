mod read;
mod write;

use time::OffsetDateTime;

use crate::domain::entities::{AuthorRef, GroupRef, PostRecord};

/// Projection shared by every post query: the post joined with its author
/// and, when set, its group.
const POST_SELECT: &str = "SELECT p.id, p.text, p.pub_date, p.image, \
        p.author_id, u.username AS author_username, \
        p.group_id, g.slug AS group_slug, g.title AS group_title \
    FROM posts p \
    INNER JOIN users u ON u.id = p.author_id \
    LEFT JOIN groups g ON g.id = p.group_id";

const POST_ORDER: &str = " ORDER BY p.pub_date DESC, p.id DESC";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    text: String,
    pub_date: OffsetDateTime,
    image: Option<String>,
    author_id: i64,
    author_username: String,
    group_id: Option<i64>,
    group_slug: Option<String>,
    group_title: Option<String>,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        let group = match (row.group_id, row.group_slug, row.group_title) {
            (Some(id), Some(slug), Some(title)) => Some(GroupRef { id, slug, title }),
            _ => None,
        };

        Self {
            id: row.id,
            text: row.text,
            pub_date: row.pub_date,
            image: row.image,
            author: AuthorRef {
                id: row.author_id,
                username: row.author_username,
            },
            group,
        }
    }
}
