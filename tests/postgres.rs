use std::collections::HashSet;
use std::sync::Arc;

use sqlx::PgPool;
use yatube::application::{
    pagination::PageRequest,
    repos::{
        CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams, CreateUserParams,
        FollowInsert, FollowsRepo, GroupsRepo, PostScope, PostsRepo, PostsWriteRepo, RepoError,
        UsersRepo,
    },
    sessions::{SessionError, SessionService},
};
use yatube::domain::entities::{GroupId, PostRecord, UserRecord};
use yatube::infra::db::PostgresRepositories;

async fn user(repos: &PostgresRepositories, username: &str) -> UserRecord {
    UsersRepo::create_user(
        repos,
        CreateUserParams {
            username: username.to_string(),
        },
    )
    .await
    .expect("insert user")
}

async fn post(
    repos: &PostgresRepositories,
    author: &UserRecord,
    text: &str,
    group_id: Option<GroupId>,
) -> PostRecord {
    PostsWriteRepo::create_post(
        repos,
        CreatePostParams {
            author_id: author.id,
            text: text.to_string(),
            group_id,
            image: None,
        },
    )
    .await
    .expect("insert post")
}

fn first_page() -> PageRequest {
    PageRequest {
        number: 1,
        per_page: 10,
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn follow_insert_is_idempotent(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let leo = user(&repos, "leo").await;
    let anna = user(&repos, "anna").await;

    let first = repos.create_follow(anna.id, leo.id).await.unwrap();
    assert!(matches!(first, FollowInsert::Created(edge) if edge.author_id == leo.id));
    assert_eq!(
        repos.create_follow(anna.id, leo.id).await.unwrap(),
        FollowInsert::Existing
    );

    let self_follow = repos.create_follow(leo.id, leo.id).await;
    assert!(matches!(self_follow, Err(RepoError::Integrity { .. })));

    assert!(repos.delete_follow(anna.id, leo.id).await.unwrap());
    assert!(!repos.delete_follow(anna.id, leo.id).await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
async fn scopes_filter_and_order_posts(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let leo = user(&repos, "leo").await;
    let anna = user(&repos, "anna").await;
    let reader = user(&repos, "reader").await;
    let group = GroupsRepo::create_group(
        &repos,
        CreateGroupParams {
            title: "Prose".into(),
            slug: "prose".into(),
            description: String::new(),
        },
    )
    .await
    .unwrap();

    let older = post(&repos, &leo, "leo in prose", Some(group.id)).await;
    let newer = post(&repos, &anna, "anna ungrouped", None).await;
    repos.create_follow(reader.id, leo.id).await.unwrap();

    let all = repos.list_posts(PostScope::All, first_page()).await.unwrap();
    let ids: Vec<_> = all.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);

    assert_eq!(repos.count_posts(PostScope::Group(group.id)).await.unwrap(), 1);
    assert_eq!(repos.count_posts(PostScope::Author(anna.id)).await.unwrap(), 1);

    let followed = repos
        .list_posts(PostScope::FollowedBy(reader.id), first_page())
        .await
        .unwrap();
    assert_eq!(followed.len(), 1);
    assert_eq!(followed[0].author.username, "leo");
    assert_eq!(followed[0].group.as_ref().map(|g| g.slug.as_str()), Some("prose"));

    let window = repos
        .list_posts(
            PostScope::All,
            PageRequest {
                number: 2,
                per_page: 1,
            },
        )
        .await
        .unwrap();
    assert_eq!(window[0].id, older.id);
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_a_post_removes_its_comments(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let leo = user(&repos, "leo").await;
    let record = post(&repos, &leo, "short lived", None).await;

    repos
        .create_comment(CreateCommentParams {
            post_id: record.id,
            author_id: leo.id,
            text: "first".into(),
        })
        .await
        .unwrap();
    assert_eq!(repos.list_for_post(record.id).await.unwrap().len(), 1);

    repos.delete_post(record.id).await.unwrap();
    assert!(PostsRepo::find_by_id(&repos, record.id).await.unwrap().is_none());
    assert!(repos.list_for_post(record.id).await.unwrap().is_empty());
    assert!(matches!(
        repos.delete_post(record.id).await,
        Err(RepoError::NotFound)
    ));
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_usernames_are_reported(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    user(&repos, "leo").await;

    let duplicate = UsersRepo::create_user(
        &repos,
        CreateUserParams {
            username: "leo".into(),
        },
    )
    .await;
    assert!(matches!(duplicate, Err(RepoError::Duplicate { .. })));
}

#[sqlx::test(migrations = "./migrations")]
async fn issued_sessions_authenticate(pool: PgPool) {
    let repos = Arc::new(PostgresRepositories::new(pool));
    let leo = user(&repos, "leo").await;
    let sessions = SessionService::new(repos.clone(), repos.clone());

    let issued = sessions.issue("leo", None).await.unwrap();
    let actor = sessions.authenticate(&issued.token).await.unwrap();
    assert_eq!(actor.id, leo.id);

    let expired = sessions
        .issue("leo", Some(time::Duration::seconds(-1)))
        .await
        .unwrap();
    assert!(matches!(
        sessions.authenticate(&expired.token).await,
        Err(SessionError::Expired)
    ));
    assert!(matches!(
        sessions.issue("ghost", None).await,
        Err(SessionError::UnknownUser(_))
    ));
}

async fn walk_scope(repos: &PostgresRepositories, scope: PostScope) -> Vec<PostRecord> {
    let total = repos.count_posts(scope).await.unwrap();
    let num_pages = total.div_ceil(10).max(1);
    let mut items = Vec::new();
    for number in 1..=num_pages {
        let page = repos
            .list_posts(
                scope,
                PageRequest {
                    number,
                    per_page: 10,
                },
            )
            .await
            .unwrap();
        let expected = if number == num_pages {
            total - (num_pages - 1) * 10
        } else {
            10
        };
        assert_eq!(page.len() as u64, expected, "page {number} of {scope:?}");
        items.extend(page);
    }
    items
}

#[sqlx::test(migrations = "./migrations")]
async fn scoped_pages_partition_matching_posts(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let leo = user(&repos, "leo").await;
    let fyodor = user(&repos, "fyodor").await;
    let reader = user(&repos, "reader").await;
    let group = GroupsRepo::create_group(
        &repos,
        CreateGroupParams {
            title: "Prose".into(),
            slug: "prose".into(),
            description: String::new(),
        },
    )
    .await
    .unwrap();
    repos.create_follow(reader.id, leo.id).await.unwrap();

    let mut by_leo = HashSet::new();
    let mut in_group = HashSet::new();
    for n in 0..12 {
        let grouped = n % 4 != 0;
        let record = post(&repos, &leo, &format!("leo {n}"), grouped.then_some(group.id)).await;
        by_leo.insert(record.id);
        if grouped {
            in_group.insert(record.id);
        }
        let noise = post_by_other(&repos, &fyodor, n, group.id).await;
        if let Some(id) = noise {
            in_group.insert(id);
        }
    }

    let followed = walk_scope(&repos, PostScope::FollowedBy(reader.id)).await;
    assert!(followed.iter().all(|p| p.author.id == leo.id));
    let ids: HashSet<_> = followed.iter().map(|p| p.id).collect();
    assert_eq!(ids.len(), followed.len());
    assert_eq!(ids, by_leo);

    let grouped = walk_scope(&repos, PostScope::Group(group.id)).await;
    assert!(
        grouped
            .iter()
            .all(|p| p.group.as_ref().map(|g| g.id) == Some(group.id))
    );
    let ids: HashSet<_> = grouped.iter().map(|p| p.id).collect();
    assert_eq!(ids.len(), grouped.len());
    assert_eq!(ids, in_group);
}

/// Every other iteration fyodor posts into the group; the rest stay ungrouped.
async fn post_by_other(
    repos: &PostgresRepositories,
    author: &UserRecord,
    n: u32,
    group_id: GroupId,
) -> Option<i64> {
    let grouped = n % 2 == 0;
    let record = post(repos, author, &format!("fyodor {n}"), grouped.then_some(group_id)).await;
    grouped.then_some(record.id)
}

#[sqlx::test(migrations = "./migrations")]
async fn removing_a_group_keeps_its_posts(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let leo = user(&repos, "leo").await;
    let group = GroupsRepo::create_group(
        &repos,
        CreateGroupParams {
            title: "Short lived".into(),
            slug: "short-lived".into(),
            description: String::new(),
        },
    )
    .await
    .unwrap();
    let record = post(&repos, &leo, "outlives its group", Some(group.id)).await;
    assert_eq!(repos.count_posts(PostScope::Group(group.id)).await.unwrap(), 1);

    sqlx::query("DELETE FROM groups WHERE id = $1")
        .bind(group.id)
        .execute(repos.pool())
        .await
        .unwrap();

    let survivor = PostsRepo::find_by_id(&repos, record.id)
        .await
        .unwrap()
        .expect("post survives group removal");
    assert_eq!(survivor.group, None);
    assert_eq!(repos.count_posts(PostScope::Group(group.id)).await.unwrap(), 0);
    assert_eq!(repos.count_posts(PostScope::Author(leo.id)).await.unwrap(), 1);
}
