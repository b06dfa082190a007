/// Cursor pagination shared by every list endpoint
///
/// Collections are ordered by `(created_at, id)`. A cursor is the id of the last
/// record of the previous page; it is resolved back to its keyset position and
/// the next page starts strictly after that position, so identical timestamps
/// never produce duplicates or gaps.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::repository::RepoResult;

/// Limits applied to incoming page requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    /// Notifications use a larger default page
    pub notification_default_limit: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
            notification_default_limit: 50,
        }
    }
}

impl PaginationConfig {
    pub fn page(&self, params: &PageParams) -> PageRequest {
        PageRequest::new(
            params.limit.as_deref(),
            params.cursor.as_deref(),
            self.default_limit,
            self.max_limit,
        )
    }

    pub fn notification_page(&self, params: &PageParams) -> PageRequest {
        PageRequest::new(
            params.limit.as_deref(),
            params.cursor.as_deref(),
            self.notification_default_limit,
            self.max_limit,
        )
    }
}

/// Raw `?limit=&cursor=` query parameters
///
/// Both are kept as text: a non-numeric limit falls back to the default rather
/// than rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<String>,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    After(Uuid),
    /// Cursor text that can never name a record
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    pub cursor: Option<Cursor>,
}

impl PageRequest {
    pub fn new(limit: Option<&str>, cursor: Option<&str>, default_limit: usize, max_limit: usize) -> Self {
        let limit = match limit.and_then(|l| l.trim().parse::<i64>().ok()) {
            Some(n) if n > 0 => (n as usize).min(max_limit),
            _ => default_limit,
        };

        let cursor = cursor
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| match Uuid::parse_str(c) {
                Ok(id) => Cursor::After(id),
                Err(_) => Cursor::Invalid,
            });

        Self { limit, cursor }
    }

    /// First page of the given size
    pub fn first(limit: usize) -> Self {
        Self {
            limit,
            cursor: None,
        }
    }

    pub fn after(limit: usize, cursor: Uuid) -> Self {
        Self {
            limit,
            cursor: Some(Cursor::After(cursor)),
        }
    }
}

/// Position of a record in a `(created_at, id)` ordered collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Keyset {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
}

pub trait Keyed {
    fn keyset(&self) -> Keyset;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest first
    Ascending,
    /// Newest first
    Descending,
}

impl SortOrder {
    /// Whether `candidate` comes strictly after `position` in this order
    pub fn is_after(&self, candidate: &Keyset, position: &Keyset) -> bool {
        match self {
            SortOrder::Ascending => candidate > position,
            SortOrder::Descending => candidate < position,
        }
    }

    pub fn sort<T: Keyed>(&self, items: &mut [T]) {
        match self {
            SortOrder::Ascending => items.sort_by_key(|i| i.keyset()),
            SortOrder::Descending => items.sort_by(|a, b| b.keyset().cmp(&a.keyset())),
        }
    }
}

/// A collection that can be read one page at a time
#[async_trait]
pub trait CursorSource: Send + Sync {
    type Item: Keyed + Send;

    /// Resolve a cursor id to its position, `None` if no such record exists
    async fn locate(&self, cursor: Uuid) -> RepoResult<Option<Keyset>>;

    /// Up to `take` records strictly after `after`, in the collection's order
    async fn fetch(&self, after: Option<Keyset>, take: usize) -> RepoResult<Vec<Self::Item>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<Uuid>,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
            has_more: false,
        }
    }

    /// Replace the items while keeping the cursor computed from the raw records
    pub fn with_items<U>(self, items: Vec<U>) -> Page<U> {
        Page {
            items,
            next_cursor: self.next_cursor,
            has_more: self.has_more,
        }
    }
}

pub async fn paginate<S>(source: &S, request: &PageRequest) -> Result<Page<S::Item>>
where
    S: CursorSource + ?Sized,
{
    let after = match request.cursor {
        None => None,
        Some(Cursor::Invalid) => return Err(AppError::NotFound("Cursor not found".to_string())),
        Some(Cursor::After(id)) => Some(
            source
                .locate(id)
                .await?
                .ok_or_else(|| AppError::NotFound("Cursor not found".to_string()))?,
        ),
    };

    let mut items = source.fetch(after, request.limit + 1).await?;
    let has_more = items.len() > request.limit;
    items.truncate(request.limit);

    let next_cursor = if has_more {
        items.last().map(|item| item.keyset().id)
    } else {
        None
    };

    Ok(Page {
        items,
        next_cursor,
        has_more,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[derive(Debug, Clone, PartialEq)]
    struct Row(Keyset);

    impl Keyed for Row {
        fn keyset(&self) -> Keyset {
            self.0
        }
    }

    struct VecSource {
        rows: Vec<Row>,
        order: SortOrder,
    }

    #[async_trait]
    impl CursorSource for VecSource {
        type Item = Row;

        async fn locate(&self, cursor: Uuid) -> RepoResult<Option<Keyset>> {
            Ok(self.rows.iter().find(|r| r.0.id == cursor).map(|r| r.0))
        }

        async fn fetch(&self, after: Option<Keyset>, take: usize) -> RepoResult<Vec<Row>> {
            let mut rows: Vec<Row> = self
                .rows
                .iter()
                .filter(|r| after.map_or(true, |pos| self.order.is_after(&r.0, &pos)))
                .cloned()
                .collect();
            self.order.sort(&mut rows);
            rows.truncate(take);
            Ok(rows)
        }
    }

    fn rows(n: usize, same_timestamp: bool) -> Vec<Row> {
        let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let offset = if same_timestamp { 0 } else { i as i64 };
                Row(Keyset {
                    created_at: base + Duration::seconds(offset),
                    id: Uuid::new_v4(),
                })
            })
            .collect()
    }

    #[test]
    fn test_limit_clamping() {
        let cfg = PaginationConfig::default();
        let req = |limit: Option<&str>| PageRequest::new(limit, None, cfg.default_limit, cfg.max_limit);

        assert_eq!(req(None).limit, 20);
        assert_eq!(req(Some("0")).limit, 20);
        assert_eq!(req(Some("-5")).limit, 20);
        assert_eq!(req(Some("abc")).limit, 20);
        assert_eq!(req(Some("7")).limit, 7);
        assert_eq!(req(Some("500")).limit, 100);
    }

    #[test]
    fn test_notification_default_limit() {
        let cfg = PaginationConfig::default();
        let req = cfg.notification_page(&PageParams::default());
        assert_eq!(req.limit, 50);
    }

    #[test]
    fn test_cursor_parsing() {
        let id = Uuid::new_v4();
        let req = PageRequest::new(None, Some(&id.to_string()), 20, 100);
        assert_eq!(req.cursor, Some(Cursor::After(id)));

        let req = PageRequest::new(None, Some("not-a-uuid"), 20, 100);
        assert_eq!(req.cursor, Some(Cursor::Invalid));

        let req = PageRequest::new(None, Some(""), 20, 100);
        assert_eq!(req.cursor, None);
    }

    #[tokio::test]
    async fn test_pages_cover_collection_without_overlap() {
        let source = VecSource {
            rows: rows(45, false),
            order: SortOrder::Descending,
        };

        let first = paginate(&source, &PageRequest::first(20)).await.unwrap();
        assert_eq!(first.items.len(), 20);
        assert!(first.has_more);

        let second = paginate(&source, &PageRequest::after(20, first.next_cursor.unwrap()))
            .await
            .unwrap();
        assert_eq!(second.items.len(), 20);
        assert!(second.has_more);

        let third = paginate(&source, &PageRequest::after(20, second.next_cursor.unwrap()))
            .await
            .unwrap();
        assert_eq!(third.items.len(), 5);
        assert!(!third.has_more);
        assert_eq!(third.next_cursor, None);

        let mut seen: Vec<Uuid> = first
            .items
            .iter()
            .chain(&second.items)
            .chain(&third.items)
            .map(|r| r.0.id)
            .collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 45);
    }

    #[tokio::test]
    async fn test_identical_timestamps_break_ties_by_id() {
        let source = VecSource {
            rows: rows(5, true),
            order: SortOrder::Ascending,
        };

        let first = paginate(&source, &PageRequest::first(2)).await.unwrap();
        let second = paginate(&source, &PageRequest::after(2, first.next_cursor.unwrap()))
            .await
            .unwrap();
        let third = paginate(&source, &PageRequest::after(2, second.next_cursor.unwrap()))
            .await
            .unwrap();

        let ids: Vec<Uuid> = first
            .items
            .iter()
            .chain(&second.items)
            .chain(&third.items)
            .map(|r| r.0.id)
            .collect();
        let mut expected: Vec<Uuid> = source.rows.iter().map(|r| r.0.id).collect();
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_exact_multiple_has_no_phantom_page() {
        let source = VecSource {
            rows: rows(4, false),
            order: SortOrder::Descending,
        };

        let page = paginate(&source, &PageRequest::first(4)).await.unwrap();
        assert_eq!(page.items.len(), 4);
        assert!(!page.has_more);
        assert_eq!(page.next_cursor, None);
    }

    #[tokio::test]
    async fn test_unknown_cursor_is_not_found() {
        let source = VecSource {
            rows: rows(3, false),
            order: SortOrder::Descending,
        };

        let err = paginate(&source, &PageRequest::after(2, Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");

        let invalid = PageRequest::new(None, Some("garbage"), 20, 100);
        let err = paginate(&source, &invalid).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }
}
