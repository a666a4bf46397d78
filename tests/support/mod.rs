//! In-memory repositories and a router harness shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use time::{Duration, OffsetDateTime, macros::datetime};
use tokio::sync::Mutex;
use tower::ServiceExt;
use yatube::{
    application::{
        follows::FollowService,
        listing::ListingService,
        pagination::PageRequest,
        posts::PostService,
        repos::{
            CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams,
            CreateSessionParams, CreateUserParams, FollowInsert, FollowsRepo, GroupsRepo,
            PostScope, PostsRepo, PostsWriteRepo, RepoError, SessionsRepo, StoreHealth,
            UpdatePostParams, UsersRepo,
        },
        sessions::SessionService,
    },
    cache::{PageCacheConfig, PageCacheState},
    config::AuthSettings,
    domain::entities::{
        AuthorRef, CommentRecord, FollowRecord, GroupId, GroupRef, GroupRecord, PostId,
        PostRecord, SessionRecord, UserId, UserRecord,
    },
    infra::http::{AdminState, HttpState, build_admin_router, build_router},
};

const EPOCH: OffsetDateTime = datetime!(2024-01-01 00:00 UTC);

#[derive(Clone)]
struct StoredPost {
    id: PostId,
    text: String,
    pub_date: OffsetDateTime,
    image: Option<String>,
    author_id: UserId,
    group_id: Option<GroupId>,
}

#[derive(Default)]
struct State {
    next_id: i64,
    users: Vec<UserRecord>,
    groups: Vec<GroupRecord>,
    posts: Vec<StoredPost>,
    comments: Vec<CommentRecord>,
    follows: Vec<FollowRecord>,
    sessions: Vec<SessionRecord>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Strictly increasing timestamps so ordering is deterministic.
    fn tick(&mut self) -> OffsetDateTime {
        let id = self.next_id();
        EPOCH + Duration::seconds(id)
    }

    fn hydrate(&self, post: &StoredPost) -> Option<PostRecord> {
        let author = self.users.iter().find(|u| u.id == post.author_id)?;
        let group = post
            .group_id
            .and_then(|id| self.groups.iter().find(|g| g.id == id))
            .map(|g| GroupRef {
                id: g.id,
                slug: g.slug.clone(),
                title: g.title.clone(),
            });
        Some(PostRecord {
            id: post.id,
            text: post.text.clone(),
            pub_date: post.pub_date,
            image: post.image.clone(),
            author: AuthorRef {
                id: author.id,
                username: author.username.clone(),
            },
            group,
        })
    }

    fn scoped(&self, scope: PostScope) -> Vec<PostRecord> {
        let followees: Vec<UserId> = match scope {
            PostScope::FollowedBy(user_id) => self
                .follows
                .iter()
                .filter(|f| f.user_id == user_id)
                .map(|f| f.author_id)
                .collect(),
            _ => Vec::new(),
        };
        let mut posts: Vec<PostRecord> = self
            .posts
            .iter()
            .filter_map(|p| self.hydrate(p))
            .filter(|p| scope_matches(scope, p, &followees))
            .collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        posts
    }
}

/// In-memory counterpart of the SQL predicate for each scope.
fn scope_matches(scope: PostScope, post: &PostRecord, followees: &[UserId]) -> bool {
    match scope {
        PostScope::All => true,
        PostScope::Group(group_id) => post.group.as_ref().is_some_and(|g| g.id == group_id),
        PostScope::Author(author_id) => post.author.id == author_id,
        PostScope::FollowedBy(_) => followees.contains(&post.author.id),
    }
}

/// Repository double backing every trait with one locked state.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn post_count(&self) -> usize {
        self.state.lock().await.posts.len()
    }

    pub async fn follow_count(&self) -> usize {
        self.state.lock().await.follows.len()
    }

    pub async fn comment_count(&self) -> usize {
        self.state.lock().await.comments.len()
    }
}

#[async_trait]
impl UsersRepo for MemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.users.iter().any(|u| u.username == params.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".into(),
            });
        }
        let user = UserRecord {
            id: state.next_id(),
            username: params.username,
            created_at: EPOCH,
        };
        state.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl GroupsRepo for MemoryStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.groups.iter().find(|g| g.slug == slug).cloned())
    }

    async fn find_by_id(&self, id: GroupId) -> Result<Option<GroupRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.groups.iter().find(|g| g.id == id).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let state = self.state.lock().await;
        let mut groups = state.groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }

    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.groups.iter().any(|g| g.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "groups_slug_key".into(),
            });
        }
        let group = GroupRecord {
            id: state.next_id(),
            title: params.title,
            slug: params.slug,
            description: params.description,
        };
        state.groups.push(group.clone());
        Ok(group)
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError> {
        let state = self.state.lock().await;
        Ok(state.scoped(scope).len() as u64)
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .scoped(scope)
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect())
    }

    async fn find_by_id(&self, id: PostId) -> Result<Option<PostRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .posts
            .iter()
            .find(|p| p.id == id)
            .and_then(|p| state.hydrate(p)))
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        let pub_date = state.tick();
        let stored = StoredPost {
            id: state.next_id(),
            text: params.text,
            pub_date,
            image: params.image,
            author_id: params.author_id,
            group_id: params.group_id,
        };
        state.posts.push(stored.clone());
        state.hydrate(&stored).ok_or(RepoError::Integrity {
            message: "post author does not exist".into(),
        })
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        let stored = state
            .posts
            .iter_mut()
            .find(|p| p.id == params.id)
            .ok_or(RepoError::NotFound)?;
        stored.text = params.text;
        stored.group_id = params.group_id;
        stored.image = params.image;
        let stored = stored.clone();
        state.hydrate(&stored).ok_or(RepoError::NotFound)
    }

    async fn delete_post(&self, id: PostId) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        let before = state.posts.len();
        state.posts.retain(|p| p.id != id);
        if state.posts.len() == before {
            return Err(RepoError::NotFound);
        }
        state.comments.retain(|c| c.post_id != id);
        Ok(())
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn list_for_post(&self, post_id: PostId) -> Result<Vec<CommentRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.lock().await;
        let author = state
            .users
            .iter()
            .find(|u| u.id == params.author_id)
            .map(|u| AuthorRef {
                id: u.id,
                username: u.username.clone(),
            })
            .ok_or(RepoError::Integrity {
                message: "comment author does not exist".into(),
            })?;
        let created_at = state.tick();
        let comment = CommentRecord {
            id: state.next_id(),
            post_id: params.post_id,
            author,
            text: params.text,
            created_at,
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl FollowsRepo for MemoryStore {
    async fn find_follow(
        &self,
        user_id: UserId,
        author_id: UserId,
    ) -> Result<Option<FollowRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .follows
            .iter()
            .find(|f| f.user_id == user_id && f.author_id == author_id)
            .copied())
    }

    async fn create_follow(
        &self,
        user_id: UserId,
        author_id: UserId,
    ) -> Result<FollowInsert, RepoError> {
        let mut state = self.state.lock().await;
        if user_id == author_id {
            return Err(RepoError::Integrity {
                message: "follows_no_self_follow".into(),
            });
        }
        if state
            .follows
            .iter()
            .any(|f| f.user_id == user_id && f.author_id == author_id)
        {
            return Ok(FollowInsert::Existing);
        }
        let edge = FollowRecord {
            id: state.next_id(),
            user_id,
            author_id,
            created_at: EPOCH,
        };
        state.follows.push(edge);
        Ok(FollowInsert::Created(edge))
    }

    async fn delete_follow(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError> {
        let mut state = self.state.lock().await;
        let before = state.follows.len();
        state
            .follows
            .retain(|f| !(f.user_id == user_id && f.author_id == author_id));
        Ok(state.follows.len() != before)
    }
}

#[async_trait]
impl SessionsRepo for MemoryStore {
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionRecord, RepoError> {
        let mut state = self.state.lock().await;
        let record = SessionRecord {
            id: state.next_id(),
            user_id: params.user_id,
            prefix: params.prefix,
            hashed_secret: params.hashed_secret,
            created_at: OffsetDateTime::now_utc(),
            expires_at: params.expires_at,
            revoked_at: None,
        };
        state.sessions.push(record.clone());
        Ok(record)
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<SessionRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.sessions.iter().find(|s| s.prefix == prefix).cloned())
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

/// Services wired over one [`MemoryStore`].
pub struct Services {
    pub store: Arc<MemoryStore>,
    pub listing: Arc<ListingService>,
    pub posts: Arc<PostService>,
    pub follows: Arc<FollowService>,
    pub sessions: Arc<SessionService>,
}

impl Services {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let follows = Arc::new(FollowService::new(store.clone(), store.clone()));
        let listing = Arc::new(ListingService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            follows.clone(),
        ));
        let posts = Arc::new(PostService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        ));
        let sessions = Arc::new(SessionService::new(store.clone(), store.clone()));
        Self {
            store,
            listing,
            posts,
            follows,
            sessions,
        }
    }

    pub async fn user(&self, username: &str) -> UserRecord {
        UsersRepo::create_user(
            self.store.as_ref(),
            CreateUserParams {
                username: username.to_string(),
            },
        )
        .await
        .expect("create user")
    }

    pub async fn group(&self, title: &str, slug: &str) -> GroupRecord {
        GroupsRepo::create_group(
            self.store.as_ref(),
            CreateGroupParams {
                title: title.to_string(),
                slug: slug.to_string(),
                description: format!("About {title}"),
            },
        )
        .await
        .expect("create group")
    }

    pub async fn post(
        &self,
        author: &UserRecord,
        text: &str,
        group: Option<GroupId>,
    ) -> PostRecord {
        PostsWriteRepo::create_post(
            self.store.as_ref(),
            CreatePostParams {
                author_id: author.id,
                text: text.to_string(),
                group_id: group,
                image: None,
            },
        )
        .await
        .expect("create post")
    }

    pub async fn follow(&self, user: &UserRecord, author: &UserRecord) {
        FollowsRepo::create_follow(self.store.as_ref(), user.id, author.id)
            .await
            .expect("create follow");
    }

    pub async fn token_for(&self, username: &str) -> String {
        self.sessions
            .issue(username, None)
            .await
            .expect("issue session")
            .token
    }
}

/// Public and admin routers over in-memory services.
pub struct TestApp {
    pub services: Services,
    pub public: Router,
    pub admin: Router,
    pub auth: AuthSettings,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_cache(PageCacheConfig::default())
    }

    pub fn with_cache(config: PageCacheConfig) -> Self {
        let services = Services::new();
        let page_cache = PageCacheState::new(config);
        let auth = AuthSettings::default();

        let public = build_router(HttpState {
            listing: services.listing.clone(),
            posts: services.posts.clone(),
            follows: services.follows.clone(),
            sessions: services.sessions.clone(),
            auth: auth.clone(),
            page_cache: Some(page_cache.clone()),
        });
        let admin = build_admin_router(AdminState {
            cache: Some(page_cache.pages.clone()),
            store: services.store.clone(),
        });

        Self {
            services,
            public,
            admin,
            auth,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        let mut builder = Request::get(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.public
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn post_form(&self, uri: &str, token: Option<&str>, body: &str) -> Response<Body> {
        let mut builder = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.public
            .clone()
            .oneshot(builder.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap()
    }

    pub async fn admin_post(&self, uri: &str) -> Response<Body> {
        self.admin
            .clone()
            .oneshot(Request::post(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
