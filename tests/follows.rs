mod support;

use support::Services;
use yatube::application::{
    context::Actor,
    follows::{FollowError, FollowOutcome},
};

#[tokio::test]
async fn following_twice_creates_one_edge() {
    let services = Services::new();
    let author = services.user("leo").await;
    let reader = services.user("anna").await;
    let actor = Actor::from(reader.clone());

    let first = services.follows.follow(&actor, "leo").await.unwrap();
    let second = services.follows.follow(&actor, "leo").await.unwrap();

    assert_eq!(first, FollowOutcome::Created);
    assert_eq!(second, FollowOutcome::AlreadyFollowing);
    assert_eq!(services.store.follow_count().await, 1);
    assert!(services.follows.is_following(reader.id, author.id).await.unwrap());
}

#[tokio::test]
async fn self_follow_is_rejected_without_an_edge() {
    let services = Services::new();
    let leo = services.user("leo").await;

    let outcome = services
        .follows
        .follow(&Actor::from(leo), "leo")
        .await
        .unwrap();
    assert_eq!(outcome, FollowOutcome::SelfFollowRejected);
    assert_eq!(services.store.follow_count().await, 0);
}

#[tokio::test]
async fn unfollow_without_edge_is_not_found() {
    let services = Services::new();
    services.user("leo").await;
    let reader = services.user("anna").await;

    let err = services
        .follows
        .unfollow(&Actor::from(reader), "leo")
        .await
        .expect_err("no edge to remove");
    assert!(matches!(err, FollowError::NotFollowing { .. }));
}

#[tokio::test]
async fn unfollow_removes_the_edge() {
    let services = Services::new();
    let author = services.user("leo").await;
    let reader = services.user("anna").await;
    services.follow(&reader, &author).await;

    services
        .follows
        .unfollow(&Actor::from(reader.clone()), "leo")
        .await
        .unwrap();
    assert!(!services.follows.is_following(reader.id, author.id).await.unwrap());
}

#[tokio::test]
async fn unknown_author_is_not_found() {
    let services = Services::new();
    let reader = services.user("anna").await;

    let err = services
        .follows
        .follow(&Actor::from(reader), "ghost")
        .await
        .expect_err("unknown author");
    assert!(matches!(err, FollowError::AuthorNotFound(name) if name == "ghost"));
}
