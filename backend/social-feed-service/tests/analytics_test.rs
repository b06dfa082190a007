//! Analytics reports over a seeded store with a fixed clock
mod common;

use chrono::{DateTime, TimeZone, Utc};

use common::{test_app, TestApp};

fn at(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, month, day, hour, 0, 0).unwrap()
}

/// Wednesday 2026-03-18 12:00 UTC
fn now() -> DateTime<Utc> {
    at(3, 18, 12)
}

/// alpha signs up 02-26 and posts 03-05, then likes bravo's post 03-13.
/// bravo signs up 03-10 and posts 03-12. charlie signs up this morning.
async fn seeded() -> TestApp {
    let app = test_app();
    let alpha = app.seed_agent("alpha", at(2, 26, 12)).await;
    let bravo = app.seed_agent("bravo", at(3, 10, 10)).await;
    app.seed_agent("charlie", at(3, 18, 8)).await;

    app.seed_post(alpha.id, at(3, 5, 9)).await;
    let bravo_post = app.seed_post(bravo.id, at(3, 12, 9)).await;
    app.seed_like(alpha.id, bravo_post.id, at(3, 13, 9)).await;
    app
}

#[tokio::test]
async fn test_overview_counts() {
    let app = seeded().await;
    let overview = app.state.analytics.overview(now()).await.unwrap();

    assert_eq!(overview.totals.agents, 3);
    assert_eq!(overview.totals.posts, 2);
    assert_eq!(overview.totals.likes, 1);
    assert_eq!(overview.totals.comments, 0);
    assert_eq!(overview.totals.follows, 0);
    // Since 03-17 00:00 and 03-11 00:00
    assert_eq!(overview.today.new_agents, 1);
    assert_eq!(overview.today.new_posts, 0);
    assert_eq!(overview.this_week.new_agents, 1);
    assert_eq!(overview.this_week.new_posts, 1);
    assert_eq!(overview.generated_at, now());
}

#[tokio::test]
async fn test_signups_are_zero_filled_daily_buckets() {
    let app = seeded().await;
    let report = app.state.analytics.signups(now(), 10).await.unwrap();

    assert_eq!(report.period.days, 10);
    assert_eq!(report.period.start_date, "2026-03-09");
    assert_eq!(report.data.len(), 10);
    assert_eq!(report.data.first().unwrap().date, "2026-03-09");
    assert_eq!(report.data.last().unwrap().date, "2026-03-18");

    let nonzero: Vec<(&str, i64)> = report
        .data
        .iter()
        .filter(|d| d.count > 0)
        .map(|d| (d.date.as_str(), d.count))
        .collect();
    assert_eq!(nonzero, vec![("2026-03-10", 1), ("2026-03-18", 1)]);
    assert_eq!(report.total, 2);
}

#[tokio::test]
async fn test_activity_buckets_and_totals() {
    let app = seeded().await;
    let report = app.state.analytics.activity(now(), 7).await.unwrap();

    assert_eq!(report.data.len(), 7);
    assert_eq!(report.period.start_date, "2026-03-12");
    assert_eq!(report.totals.posts, 1);
    assert_eq!(report.totals.likes, 1);
    assert_eq!(report.totals.comments, 0);

    let march_13 = report.data.iter().find(|d| d.date == "2026-03-13").unwrap();
    assert_eq!(march_13.likes, 1);
    assert_eq!(march_13.posts, 0);
}

#[tokio::test]
async fn test_activation_funnel() {
    let app = seeded().await;
    let report = app.state.analytics.activation(now()).await.unwrap();

    assert_eq!(report.funnel.signed_up, 3);
    assert_eq!(report.funnel.posted_once, 2);
    assert_eq!(report.funnel.liked, 1);
    assert_eq!(report.funnel.commented, 0);
    assert_eq!(report.funnel.followed, 0);
    assert_eq!(report.funnel.fully_activated, 1);
    assert_eq!(report.rates.signup_to_post, "66.7%");
    assert_eq!(report.rates.signup_to_activated, "33.3%");
    assert_eq!(report.rates.post_to_activated, "50.0%");
}

#[tokio::test]
async fn test_retention_cohorts() {
    let app = seeded().await;
    let report = app.state.analytics.retention(now(), 4).await.unwrap();

    let weeks: Vec<&str> = report.cohorts.iter().map(|c| c.cohort_week.as_str()).collect();
    assert_eq!(weeks, vec!["2026-02-18", "2026-02-25", "2026-03-04", "2026-03-11"]);

    // Empty cohort: elapsed windows are 0, the rest -1
    let empty = &report.cohorts[0];
    assert_eq!(empty.signups, 0);
    assert_eq!((empty.active_week1, empty.active_week2, empty.active_week4), (0, 0, -1));

    // alpha: posted in week 1, liked in week 2
    let alpha = &report.cohorts[1];
    assert_eq!(alpha.signups, 1);
    assert_eq!((alpha.active_week1, alpha.active_week2, alpha.active_week4), (1, 1, -1));

    // bravo: posted in week 1, later windows still open
    let bravo = &report.cohorts[2];
    assert_eq!(bravo.signups, 1);
    assert_eq!((bravo.active_week1, bravo.active_week2, bravo.active_week4), (1, -1, -1));

    let current = &report.cohorts[3];
    assert_eq!(current.signups, 0);
    assert_eq!(current.active_week1, -1);
}

#[tokio::test]
async fn test_week_over_week_growth() {
    let app = seeded().await;
    let report = app.state.analytics.growth(now()).await.unwrap();
    let wow = &report.week_over_week;

    assert_eq!((wow.agents.previous, wow.agents.current), (1, 1));
    assert_eq!(wow.agents.growth_percent, 0.0);
    assert_eq!((wow.posts.previous, wow.posts.current), (1, 1));
    assert_eq!((wow.likes.previous, wow.likes.current), (0, 1));
    assert_eq!(wow.likes.growth_percent, 100.0);
    assert_eq!((wow.follows.previous, wow.follows.current), (0, 0));
    assert_eq!(wow.follows.growth_percent, 0.0);
}

#[tokio::test]
async fn test_top_agents_rankings() {
    let app = seeded().await;
    let report = app.state.analytics.top_agents(2).await.unwrap();

    let by_posts: Vec<&str> = report.by_posts.iter().map(|a| a.handle.as_str()).collect();
    assert_eq!(by_posts, vec!["alpha", "bravo"]);

    assert_eq!(report.by_engagement.len(), 2);
    assert_eq!(report.by_engagement[0].handle, "alpha");
    assert_eq!(report.by_engagement[0].likes, 1);
    assert_eq!(report.by_engagement[0].total, 1);
    assert_eq!(report.by_engagement[0].display_name, "ALPHA");
}

#[tokio::test]
async fn test_reports_on_an_empty_store() {
    let app = test_app();
    let overview = app.state.analytics.overview(now()).await.unwrap();
    assert_eq!(overview.totals.agents, 0);

    let activation = app.state.analytics.activation(now()).await.unwrap();
    assert_eq!(activation.rates.signup_to_post, "0%");

    let top = app.state.analytics.top_agents(10).await.unwrap();
    assert!(top.by_posts.is_empty());
}
