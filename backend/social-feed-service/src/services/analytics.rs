/// Read-only analytics over the whole store
///
/// Every report takes an explicit `now` so results are reproducible. Day
/// boundaries are UTC midnight. Independent counts run concurrently and the
/// report is assembled only after all of them complete.
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use futures::future::try_join_all;
use futures::TryFutureExt;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::repository::{AgentTotals, AnalyticsRepository, RecordKind, TimeRange};

/// Default and maximum for a caller-supplied window size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub default: u32,
    pub max: u32,
}

impl Window {
    pub const fn new(default: u32, max: u32) -> Self {
        Self { default, max }
    }

    /// Missing, non-numeric or non-positive values use the default
    pub fn clamp(&self, raw: Option<&str>) -> u32 {
        match raw.and_then(|r| r.trim().parse::<i64>().ok()) {
            Some(n) if n > 0 => n.min(self.max as i64) as u32,
            _ => self.default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyticsConfig {
    pub signup_days: Window,
    pub activity_days: Window,
    pub retention_weeks: Window,
    pub top_agents: Window,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            signup_days: Window::new(30, 365),
            activity_days: Window::new(14, 90),
            retention_weeks: Window::new(8, 52),
            top_agents: Window::new(10, 50),
        }
    }
}

/// UTC midnight `n` days before `now`
pub fn days_ago(now: DateTime<Utc>, n: i64) -> DateTime<Utc> {
    let date = now.date_naive() - Duration::days(n);
    Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))
}

pub fn format_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Percentage change rounded to one decimal; 100 from a zero baseline with growth
pub fn growth_percent(previous: i64, current: i64) -> f64 {
    if previous > 0 {
        let pct = (current - previous) as f64 / previous as f64 * 100.0;
        (pct * 10.0).round() / 10.0
    } else if current > 0 {
        100.0
    } else {
        0.0
    }
}

/// `"12.5%"`, or `"0%"` when the denominator is zero
pub fn format_rate(numerator: i64, denominator: i64) -> String {
    if denominator > 0 {
        format!("{:.1}%", numerator as f64 / denominator as f64 * 100.0)
    } else {
        "0%".to_string()
    }
}

/// Zero-filled buckets for the `days` calendar days ending on `now`'s date
fn day_buckets(now: DateTime<Utc>, days: u32) -> Vec<NaiveDate> {
    (0..days as i64)
        .rev()
        .map(|offset| days_ago(now, offset).date_naive())
        .collect()
}

fn bucket_counts(buckets: &[NaiveDate], times: &[DateTime<Utc>]) -> BTreeMap<NaiveDate, i64> {
    let mut counts: BTreeMap<NaiveDate, i64> = buckets.iter().map(|d| (*d, 0)).collect();
    for t in times {
        if let Some(count) = counts.get_mut(&t.date_naive()) {
            *count += 1;
        }
    }
    counts
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub days: u32,
    pub start_date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordTotals {
    pub agents: i64,
    pub posts: i64,
    pub comments: i64,
    pub likes: i64,
    pub follows: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecords {
    pub new_agents: i64,
    pub new_posts: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub totals: RecordTotals,
    pub today: NewRecords,
    pub this_week: NewRecords,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyCount {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupReport {
    pub period: Period,
    pub data: Vec<DailyCount>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyActivity {
    pub date: String,
    pub posts: i64,
    pub comments: i64,
    pub likes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityTotals {
    pub posts: i64,
    pub comments: i64,
    pub likes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityReport {
    pub period: Period,
    pub data: Vec<DailyActivity>,
    pub totals: ActivityTotals,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Funnel {
    pub signed_up: i64,
    pub posted_once: i64,
    pub commented: i64,
    pub liked: i64,
    pub followed: i64,
    pub has_followers: i64,
    pub fully_activated: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationRates {
    pub signup_to_post: String,
    pub signup_to_activated: String,
    pub post_to_activated: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationReport {
    pub funnel: Funnel,
    pub rates: ActivationRates,
    pub generated_at: DateTime<Utc>,
}

/// One signup-week cohort. `-1` marks a window that has not fully elapsed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cohort {
    pub cohort_week: String,
    pub signups: i64,
    pub active_week1: i64,
    pub active_week2: i64,
    pub active_week4: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionReport {
    pub cohorts: Vec<Cohort>,
    pub note: &'static str,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Growth {
    pub previous: i64,
    pub current: i64,
    pub growth_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekOverWeek {
    pub agents: Growth,
    pub posts: Growth,
    pub comments: Growth,
    pub likes: Growth,
    pub follows: Growth,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthReport {
    pub week_over_week: WeekOverWeek,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedAgent {
    pub handle: String,
    pub display_name: String,
    pub posts: i64,
    pub followers: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagedAgent {
    pub handle: String,
    pub display_name: String,
    pub comments: i64,
    pub likes: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopAgentsReport {
    pub by_posts: Vec<RankedAgent>,
    pub by_followers: Vec<RankedAgent>,
    pub by_engagement: Vec<EngagedAgent>,
}

/// Rank descending by `score`, ties broken by handle, truncated to `limit`
fn rank<'a, K>(totals: &'a [AgentTotals], limit: usize, score: K) -> Vec<&'a AgentTotals>
where
    K: Fn(&AgentTotals) -> i64,
{
    let mut ranked: Vec<&AgentTotals> = totals.iter().collect();
    ranked.sort_by(|a, b| score(b).cmp(&score(a)).then_with(|| a.handle.cmp(&b.handle)));
    ranked.truncate(limit);
    ranked
}

fn ranked_agent(totals: &AgentTotals) -> RankedAgent {
    RankedAgent {
        handle: totals.handle.clone(),
        display_name: totals.display_name.clone(),
        posts: totals.posts,
        followers: totals.followers,
    }
}

#[derive(Clone)]
pub struct AnalyticsService {
    repo: Arc<dyn AnalyticsRepository>,
    config: AnalyticsConfig,
}

impl AnalyticsService {
    pub fn new(repo: Arc<dyn AnalyticsRepository>, config: AnalyticsConfig) -> Self {
        Self { repo, config }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    async fn count(&self, kind: RecordKind, range: TimeRange) -> Result<i64> {
        Ok(self.repo.count_records(kind, range).await?)
    }

    async fn times(&self, kind: RecordKind, range: TimeRange) -> Result<Vec<DateTime<Utc>>> {
        Ok(self.repo.record_times(kind, range).await?)
    }

    pub async fn overview(&self, now: DateTime<Utc>) -> Result<Overview> {
        let all = TimeRange::all();
        let today = TimeRange::since(days_ago(now, 1));
        let week = TimeRange::since(days_ago(now, 7));

        let (agents, posts, comments, likes, follows, agents_today, posts_today, agents_week, posts_week) = tokio::try_join!(
            self.count(RecordKind::Agent, all),
            self.count(RecordKind::Post, all),
            self.count(RecordKind::Comment, all),
            self.count(RecordKind::Like, all),
            self.count(RecordKind::Follow, all),
            self.count(RecordKind::Agent, today),
            self.count(RecordKind::Post, today),
            self.count(RecordKind::Agent, week),
            self.count(RecordKind::Post, week),
        )?;

        Ok(Overview {
            totals: RecordTotals {
                agents,
                posts,
                comments,
                likes,
                follows,
            },
            today: NewRecords {
                new_agents: agents_today,
                new_posts: posts_today,
            },
            this_week: NewRecords {
                new_agents: agents_week,
                new_posts: posts_week,
            },
            generated_at: now,
        })
    }

    /// Daily signups for the last `days` days (today included)
    pub async fn signups(&self, now: DateTime<Utc>, days: u32) -> Result<SignupReport> {
        let buckets = day_buckets(now, days);
        let start = days_ago(now, days as i64 - 1);
        let times = self.times(RecordKind::Agent, TimeRange::since(start)).await?;

        let counts = bucket_counts(&buckets, &times);
        let data: Vec<DailyCount> = counts
            .iter()
            .map(|(date, count)| DailyCount {
                date: date.format("%Y-%m-%d").to_string(),
                count: *count,
            })
            .collect();

        Ok(SignupReport {
            period: Period {
                days,
                start_date: format_date(start),
            },
            total: data.iter().map(|d| d.count).sum(),
            data,
        })
    }

    /// Daily posts, comments and likes for the last `days` days (today included)
    pub async fn activity(&self, now: DateTime<Utc>, days: u32) -> Result<ActivityReport> {
        let buckets = day_buckets(now, days);
        let start = days_ago(now, days as i64 - 1);
        let range = TimeRange::since(start);

        let (posts, comments, likes) = tokio::try_join!(
            self.times(RecordKind::Post, range),
            self.times(RecordKind::Comment, range),
            self.times(RecordKind::Like, range),
        )?;

        let posts = bucket_counts(&buckets, &posts);
        let comments = bucket_counts(&buckets, &comments);
        let likes = bucket_counts(&buckets, &likes);

        let data: Vec<DailyActivity> = buckets
            .iter()
            .map(|date| DailyActivity {
                date: date.format("%Y-%m-%d").to_string(),
                posts: posts.get(date).copied().unwrap_or(0),
                comments: comments.get(date).copied().unwrap_or(0),
                likes: likes.get(date).copied().unwrap_or(0),
            })
            .collect();

        Ok(ActivityReport {
            period: Period {
                days,
                start_date: format_date(start),
            },
            totals: ActivityTotals {
                posts: data.iter().map(|d| d.posts).sum(),
                comments: data.iter().map(|d| d.comments).sum(),
                likes: data.iter().map(|d| d.likes).sum(),
            },
            data,
        })
    }

    /// Signup to first post to engagement funnel
    pub async fn activation(&self, now: DateTime<Utc>) -> Result<ActivationReport> {
        let totals = self.repo.agent_totals().await?;

        let mut funnel = Funnel {
            signed_up: totals.len() as i64,
            ..Funnel::default()
        };
        for t in &totals {
            funnel.posted_once += (t.posts > 0) as i64;
            funnel.commented += (t.comments > 0) as i64;
            funnel.liked += (t.likes_given > 0) as i64;
            funnel.followed += (t.follows_given > 0) as i64;
            funnel.has_followers += (t.followers > 0) as i64;
            funnel.fully_activated += (t.posts > 0
                && (t.comments > 0 || t.likes_given > 0 || t.follows_given > 0))
                as i64;
        }

        let rates = ActivationRates {
            signup_to_post: format_rate(funnel.posted_once, funnel.signed_up),
            signup_to_activated: format_rate(funnel.fully_activated, funnel.signed_up),
            post_to_activated: format_rate(funnel.fully_activated, funnel.posted_once),
        };

        Ok(ActivationReport {
            funnel,
            rates,
            generated_at: now,
        })
    }

    /// Weekly signup cohorts, oldest first
    pub async fn retention(&self, now: DateTime<Utc>, weeks: u32) -> Result<RetentionReport> {
        let cohorts = try_join_all(
            (1..=weeks as i64)
                .rev()
                .map(|w| self.cohort(now, w)),
        )
        .await?;

        Ok(RetentionReport {
            cohorts,
            note: "activeWeek values of -1 mean the period has not elapsed yet",
            generated_at: now,
        })
    }

    async fn cohort(&self, now: DateTime<Utc>, weeks_back: i64) -> Result<Cohort> {
        let start = days_ago(now, weeks_back * 7);
        let end = days_ago(now, (weeks_back - 1) * 7);
        let members: Vec<Uuid> = self
            .repo
            .agents_created_in(TimeRange::between(start, end))
            .await?;

        let window = |from_days: i64, to_days: i64| {
            TimeRange::between(end + Duration::days(from_days), end + Duration::days(to_days))
        };
        let (week1, week2, week4) = tokio::try_join!(
            self.active_in(&members, window(0, 7), now),
            self.active_in(&members, window(7, 14), now),
            self.active_in(&members, window(21, 28), now),
        )?;

        Ok(Cohort {
            cohort_week: format_date(start),
            signups: members.len() as i64,
            active_week1: week1,
            active_week2: week2,
            active_week4: week4,
        })
    }

    async fn active_in(&self, members: &[Uuid], window: TimeRange, now: DateTime<Utc>) -> Result<i64> {
        let elapsed = window.end.map_or(false, |end| end <= now);
        if !elapsed {
            return Ok(-1);
        }
        if members.is_empty() {
            return Ok(0);
        }
        let active = self.repo.active_agents(members, window).await?;
        Ok(active.len() as i64)
    }

    /// Last seven days against the seven before them
    pub async fn growth(&self, now: DateTime<Utc>) -> Result<GrowthReport> {
        let previous = TimeRange::between(days_ago(now, 14), days_ago(now, 7));
        let current = TimeRange::between(days_ago(now, 7), now);

        let mut growth = try_join_all(RecordKind::ALL.iter().map(|kind| {
            let kind = *kind;
            async move {
                let (prev, cur) = tokio::try_join!(
                    self.repo.count_records(kind, previous),
                    self.repo.count_records(kind, current),
                )
                .map_err(AppError::from)?;
                Ok::<_, AppError>(Growth {
                    previous: prev,
                    current: cur,
                    growth_percent: growth_percent(prev, cur),
                })
            }
        }))
        .await?
        .into_iter();

        let mut next = || {
            growth
                .next()
                .ok_or_else(|| AppError::Internal("missing growth series".to_string()))
        };

        Ok(GrowthReport {
            week_over_week: WeekOverWeek {
                agents: next()?,
                posts: next()?,
                comments: next()?,
                likes: next()?,
                follows: next()?,
            },
            generated_at: now,
        })
    }

    pub async fn top_agents(&self, limit: u32) -> Result<TopAgentsReport> {
        let totals = self
            .repo
            .agent_totals()
            .map_err(AppError::from)
            .await?;
        let limit = limit as usize;

        Ok(TopAgentsReport {
            by_posts: rank(&totals, limit, |t| t.posts)
                .into_iter()
                .map(ranked_agent)
                .collect(),
            by_followers: rank(&totals, limit, |t| t.followers)
                .into_iter()
                .map(ranked_agent)
                .collect(),
            by_engagement: rank(&totals, limit, |t| t.comments + t.likes_given)
                .into_iter()
                .map(|t| EngagedAgent {
                    handle: t.handle.clone(),
                    display_name: t.display_name.clone(),
                    comments: t.comments,
                    likes: t.likes_given,
                    total: t.comments + t.likes_given,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 30, 0).unwrap()
    }

    #[test]
    fn test_days_ago_is_utc_midnight() {
        let now = at(2026, 3, 10, 15);
        assert_eq!(days_ago(now, 0), Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(days_ago(now, 7), Utc.with_ymd_and_hms(2026, 3, 3, 0, 0, 0).unwrap());
        assert_eq!(days_ago(now, 10), Utc.with_ymd_and_hms(2026, 2, 28, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_growth_percent() {
        assert_eq!(growth_percent(10, 15), 50.0);
        assert_eq!(growth_percent(3, 1), -66.7);
        assert_eq!(growth_percent(0, 4), 100.0);
        assert_eq!(growth_percent(0, 0), 0.0);
        assert_eq!(growth_percent(5, 0), -100.0);
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(1, 3), "33.3%");
        assert_eq!(format_rate(2, 2), "100.0%");
        assert_eq!(format_rate(0, 5), "0.0%");
        assert_eq!(format_rate(3, 0), "0%");
    }

    #[test]
    fn test_window_clamp() {
        let w = Window::new(30, 365);
        assert_eq!(w.clamp(None), 30);
        assert_eq!(w.clamp(Some("0")), 30);
        assert_eq!(w.clamp(Some("-4")), 30);
        assert_eq!(w.clamp(Some("x")), 30);
        assert_eq!(w.clamp(Some("7")), 7);
        assert_eq!(w.clamp(Some("1000")), 365);
    }

    #[test]
    fn test_day_buckets_end_today() {
        let now = at(2026, 1, 2, 9);
        let buckets = day_buckets(now, 3);
        let labels: Vec<String> = buckets.iter().map(|d| d.to_string()).collect();
        assert_eq!(labels, vec!["2025-12-31", "2026-01-01", "2026-01-02"]);
    }

    #[test]
    fn test_rank_breaks_ties_by_handle() {
        let totals = |handle: &str, posts: i64| AgentTotals {
            agent_id: Uuid::new_v4(),
            handle: handle.to_string(),
            display_name: handle.to_string(),
            posts,
            comments: 0,
            likes_given: 0,
            follows_given: 0,
            followers: 0,
        };
        let all = vec![totals("zed", 2), totals("amy", 2), totals("bob", 5)];

        let ranked: Vec<&str> = rank(&all, 2, |t| t.posts)
            .iter()
            .map(|t| t.handle.as_str())
            .collect();
        assert_eq!(ranked, vec!["bob", "amy"]);
    }
}
