//! Home feed and public timeline paging against the in-process store
mod common;

use chrono::{Duration, TimeZone, Utc};
use std::collections::HashSet;
use uuid::Uuid;

use common::test_app;
use social_feed_service::pagination::PageRequest;
use social_feed_service::AppError;

#[tokio::test]
async fn test_timeline_pages_cover_every_post_once() {
    let app = test_app();
    let author = app.seed_agent("paginator", Utc::now()).await;

    // Identical timestamps force the id tie-break
    let at = Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap();
    for _ in 0..45 {
        app.seed_post(author.id, at).await;
    }

    let mut seen = HashSet::new();
    let mut sizes = Vec::new();
    let mut request = PageRequest::first(20);
    loop {
        let page = app.state.feed.public_timeline(&request).await.unwrap();
        sizes.push(page.posts.len());
        for post in &page.posts {
            assert!(seen.insert(post.id), "post {} returned twice", post.id);
        }
        match page.next_cursor {
            Some(cursor) => {
                assert!(page.has_more);
                request = PageRequest::after(20, cursor);
            }
            None => {
                assert!(!page.has_more);
                break;
            }
        }
    }

    assert_eq!(sizes, vec![20, 20, 5]);
    assert_eq!(seen.len(), 45);
}

#[tokio::test]
async fn test_exact_multiple_has_no_trailing_page() {
    let app = test_app();
    let author = app.seed_agent("exact", Utc::now()).await;
    let base = Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap();
    for i in 0..4 {
        app.seed_post(author.id, base + Duration::minutes(i)).await;
    }

    let first = app.state.feed.public_timeline(&PageRequest::first(2)).await.unwrap();
    assert!(first.has_more);

    let second = app
        .state
        .feed
        .public_timeline(&PageRequest::after(2, first.next_cursor.unwrap()))
        .await
        .unwrap();
    assert_eq!(second.posts.len(), 2);
    assert!(!second.has_more);
    assert_eq!(second.next_cursor, None);
}

#[tokio::test]
async fn test_timeline_is_newest_first() {
    let app = test_app();
    let author = app.seed_agent("chrono", Utc::now()).await;
    let base = Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap();
    let old = app.seed_post(author.id, base).await;
    let new = app.seed_post(author.id, base + Duration::hours(1)).await;

    let page = app.state.feed.public_timeline(&PageRequest::first(10)).await.unwrap();
    let ids: Vec<Uuid> = page.posts.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![new.id, old.id]);
}

#[tokio::test]
async fn test_home_feed_is_self_plus_followees() {
    let app = test_app();
    let viewer = app.register("viewer").await;
    let friend = app.register("friend").await;
    let stranger = app.register("stranger").await;

    app.state.engagement.follow(viewer.id, "friend").await.unwrap();

    let own = app.publish(&viewer, "mine").await;
    let followed = app.publish(&friend, "friend's").await;
    app.publish(&stranger, "not followed").await;

    let feed = app
        .state
        .feed
        .home_feed(viewer.id, &PageRequest::first(20))
        .await
        .unwrap();

    let ids: HashSet<Uuid> = feed.posts.iter().map(|p| p.id).collect();
    assert_eq!(ids, HashSet::from([own.id, followed.id]));
}

#[tokio::test]
async fn test_home_feed_pages_in_reverse_chronological_order() {
    let app = test_app();
    let base = Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap();
    let a = app.seed_agent("reader", base).await;
    let b = app.seed_agent("writer_b", base).await;
    let c = app.seed_agent("writer_c", base).await;
    let d = app.seed_agent("unfollowed", base).await;
    app.seed_follow(a.id, b.id, base).await;
    app.seed_follow(a.id, c.id, base).await;

    let mut expected = Vec::new();
    let mut excluded = HashSet::new();
    for (minute, author) in [a.id, b.id, c.id, d.id, b.id, c.id, d.id, a.id]
        .into_iter()
        .enumerate()
    {
        let post = app
            .seed_post(author, base + Duration::minutes(minute as i64 + 1))
            .await;
        if author == d.id {
            excluded.insert(post.id);
        } else {
            expected.push(post.id);
        }
    }
    expected.reverse();

    let mut ids = Vec::new();
    let mut sizes = Vec::new();
    let mut request = PageRequest::first(2);
    loop {
        let page = app.state.feed.home_feed(a.id, &request).await.unwrap();
        sizes.push(page.posts.len());
        ids.extend(page.posts.iter().map(|p| p.id));
        match page.next_cursor {
            Some(cursor) => request = PageRequest::after(2, cursor),
            None => break,
        }
    }

    assert_eq!(sizes, vec![2, 2, 2]);
    assert_eq!(ids, expected);
    assert!(ids.iter().all(|id| !excluded.contains(id)));
}

#[tokio::test]
async fn test_home_feed_with_no_follows_shows_own_posts() {
    let app = test_app();
    let loner = app.register("loner").await;
    let other = app.register("other").await;
    let own = app.publish(&loner, "solo").await;
    app.publish(&other, "elsewhere").await;

    let feed = app
        .state
        .feed
        .home_feed(loner.id, &PageRequest::first(20))
        .await
        .unwrap();
    assert_eq!(feed.posts.len(), 1);
    assert_eq!(feed.posts[0].id, own.id);
}

#[tokio::test]
async fn test_feed_carries_live_counts() {
    let app = test_app();
    let author = app.register("counted").await;
    let fan = app.register("fan").await;
    let post = app.publish(&author, "count me").await;

    app.state.engagement.like_post(fan.id, post.id).await.unwrap();
    app.state
        .engagement
        .create_comment(fan.id, post.id, "nice", None)
        .await
        .unwrap();

    let view = app.state.content.get_post(post.id).await.unwrap();
    assert_eq!(view.likes_count, 1);
    assert_eq!(view.comments_count, 1);
    assert_eq!(view.agent.handle, "counted");
}

#[tokio::test]
async fn test_deleted_cursor_is_not_found() {
    let app = test_app();
    let author = app.register("deleter").await;
    for i in 0..3 {
        app.publish(&author, &format!("post {}", i)).await;
    }

    let page = app.state.feed.public_timeline(&PageRequest::first(1)).await.unwrap();
    let cursor = page.next_cursor.unwrap();
    app.state.content.delete_post(author.id, cursor).await.unwrap();

    let err = app
        .state
        .feed
        .public_timeline(&PageRequest::after(1, cursor))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_followers_and_following_pages() {
    let app = test_app();
    let base = Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap();
    let star = app.seed_agent("star", base).await;
    let mut fans = Vec::new();
    for i in 0..3 {
        let fan = app.seed_agent(&format!("fan_{}", i), base).await;
        app.seed_follow(fan.id, star.id, base + Duration::minutes(i)).await;
        fans.push(fan);
    }
    app.seed_follow(star.id, fans[0].id, base + Duration::hours(1)).await;

    let followers = app
        .state
        .graph
        .followers("star", &PageRequest::first(2))
        .await
        .unwrap();
    let handles: Vec<&str> = followers.agents.iter().map(|a| a.handle.as_str()).collect();
    // Newest edge first
    assert_eq!(handles, vec!["fan_2", "fan_1"]);
    assert!(followers.has_more);

    let rest = app
        .state
        .graph
        .followers("star", &PageRequest::after(2, followers.next_cursor.unwrap()))
        .await
        .unwrap();
    assert_eq!(rest.agents.len(), 1);
    assert_eq!(rest.agents[0].handle, "fan_0");
    assert!(!rest.has_more);

    let following = app
        .state
        .graph
        .following("star", &PageRequest::first(20))
        .await
        .unwrap();
    let handles: Vec<&str> = following.agents.iter().map(|a| a.handle.as_str()).collect();
    assert_eq!(handles, vec!["fan_0"]);

    let missing = app.state.graph.followers("nobody", &PageRequest::first(20)).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}
