//! Notification fan-out and the inbox
mod common;

use common::test_app;
use social_feed_service::models::NotificationKind;
use social_feed_service::pagination::PageRequest;
use social_feed_service::AppError;

#[tokio::test]
async fn test_engagement_notifies_the_owner() {
    let app = test_app();
    let author = app.register("author").await;
    let fan = app.register("fan").await;
    let post = app.publish(&author, "notify me").await;

    app.state.engagement.like_post(fan.id, post.id).await.unwrap();
    let comment = app
        .state
        .engagement
        .create_comment(fan.id, post.id, "hi", None)
        .await
        .unwrap();
    app.state.engagement.follow(fan.id, "author").await.unwrap();

    let inbox = app
        .state
        .inbox
        .list(author.id, "author", false, &PageRequest::first(50))
        .await
        .unwrap();

    assert_eq!(inbox.unread_count, 3);
    let kinds: Vec<NotificationKind> = inbox.notifications.iter().map(|n| n.kind).collect();
    assert_eq!(kinds.len(), 3);
    assert!(kinds.contains(&NotificationKind::Like));
    assert!(kinds.contains(&NotificationKind::Follow));

    let comment_note = inbox
        .notifications
        .iter()
        .find(|n| n.kind == NotificationKind::Comment)
        .expect("comment notification");
    assert_eq!(comment_note.comment_id, Some(comment.id));
    assert_eq!(comment_note.post_id, Some(post.id));
    assert_eq!(comment_note.actor.handle, "fan");
}

#[tokio::test]
async fn test_self_engagement_is_silent() {
    let app = test_app();
    let author = app.register("author").await;
    let post = app.publish(&author, "talking to myself").await;

    app.state.engagement.like_post(author.id, post.id).await.unwrap();
    app.state
        .engagement
        .create_comment(author.id, post.id, "me again", None)
        .await
        .unwrap();

    let inbox = app
        .state
        .inbox
        .list(author.id, "author", false, &PageRequest::first(50))
        .await
        .unwrap();
    assert!(inbox.notifications.is_empty());
    assert_eq!(inbox.unread_count, 0);
}

#[tokio::test]
async fn test_reply_notifies_the_parent_author() {
    let app = test_app();
    let author = app.register("author").await;
    let commenter = app.register("commenter").await;
    let replier = app.register("replier").await;
    let post = app.publish(&author, "thread").await;

    let top = app
        .state
        .engagement
        .create_comment(commenter.id, post.id, "top", None)
        .await
        .unwrap();
    let reply = app
        .state
        .engagement
        .create_comment(replier.id, post.id, "reply", Some(top.id))
        .await
        .unwrap();

    let inbox = app
        .state
        .inbox
        .list(commenter.id, "commenter", false, &PageRequest::first(50))
        .await
        .unwrap();
    assert_eq!(inbox.notifications.len(), 1);
    assert_eq!(inbox.notifications[0].kind, NotificationKind::Reply);
    assert_eq!(inbox.notifications[0].comment_id, Some(reply.id));
}

#[tokio::test]
async fn test_inbox_is_private() {
    let app = test_app();
    app.register("owner").await;
    let snoop = app.register("snoop").await;

    let err = app
        .state
        .inbox
        .list(snoop.id, "owner", false, &PageRequest::first(50))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let missing = app
        .state
        .inbox
        .list(snoop.id, "nobody", false, &PageRequest::first(50))
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_mark_read_and_unread_filter() {
    let app = test_app();
    let author = app.register("author").await;
    let fan = app.register("fan").await;
    let first = app.publish(&author, "one").await;
    let second = app.publish(&author, "two").await;
    app.state.engagement.like_post(fan.id, first.id).await.unwrap();
    app.state.engagement.like_post(fan.id, second.id).await.unwrap();

    let inbox = app
        .state
        .inbox
        .list(author.id, "author", false, &PageRequest::first(50))
        .await
        .unwrap();
    let target = inbox.notifications[0].id;

    let err = app.state.inbox.mark_read(fan.id, target).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    app.state.inbox.mark_read(author.id, target).await.unwrap();
    // Marking twice is harmless
    app.state.inbox.mark_read(author.id, target).await.unwrap();

    let unread = app
        .state
        .inbox
        .list(author.id, "author", true, &PageRequest::first(50))
        .await
        .unwrap();
    assert_eq!(unread.notifications.len(), 1);
    assert_eq!(unread.unread_count, 1);
    assert!(unread.notifications.iter().all(|n| !n.read));

    assert_eq!(app.state.inbox.mark_all_read(author.id).await.unwrap(), 1);
    assert_eq!(app.state.inbox.mark_all_read(author.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_mark_read_unknown_notification() {
    let app = test_app();
    let author = app.register("author").await;
    let err = app
        .state
        .inbox
        .mark_read(author.id, uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
