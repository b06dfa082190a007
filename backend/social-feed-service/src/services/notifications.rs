/// Notification fan-out (write side) and inbox (read side)
use async_trait::async_trait;
use futures::TryFutureExt;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use super::load_agents;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{
    AgentSummary, NewNotification, Notification, NotificationPage, NotificationView,
};
use crate::pagination::{paginate, CursorSource, Keyed, Keyset, PageRequest};
use crate::repository::{AgentRepository, NotificationRepository, RepoResult};

/// Emits notifications as a side effect of engagement writes
///
/// Fan-out never fails the triggering action: self-notifications are
/// suppressed and persistence errors are logged, counted and dropped.
#[derive(Clone)]
pub struct NotificationFanout {
    repo: Arc<dyn NotificationRepository>,
}

impl NotificationFanout {
    pub fn new(repo: Arc<dyn NotificationRepository>) -> Self {
        Self { repo }
    }

    pub async fn emit(&self, event: NewNotification) -> Option<Notification> {
        if event.recipient_id == event.actor_id {
            metrics::record_notification(event.kind, "suppressed");
            return None;
        }

        match self.repo.insert_notification(event).await {
            Ok(notification) => {
                metrics::record_notification(event.kind, "emitted");
                debug!(
                    kind = %event.kind,
                    recipient_id = %event.recipient_id,
                    actor_id = %event.actor_id,
                    "notification emitted"
                );
                Some(notification)
            }
            Err(e) => {
                metrics::record_notification(event.kind, "dropped");
                error!(
                    kind = %event.kind,
                    recipient_id = %event.recipient_id,
                    actor_id = %event.actor_id,
                    error = %e,
                    "failed to persist notification"
                );
                None
            }
        }
    }
}

struct InboxSource<'a> {
    repo: &'a dyn NotificationRepository,
    recipient_id: Uuid,
    unread_only: bool,
}

#[async_trait]
impl CursorSource for InboxSource<'_> {
    type Item = Notification;

    async fn locate(&self, cursor: Uuid) -> RepoResult<Option<Keyset>> {
        Ok(self
            .repo
            .find_notification(cursor)
            .await?
            .map(|n| n.keyset()))
    }

    async fn fetch(&self, after: Option<Keyset>, take: usize) -> RepoResult<Vec<Notification>> {
        self.repo
            .scan_notifications(self.recipient_id, self.unread_only, after, take)
            .await
    }
}

/// Read side of notifications; every operation is scoped to the viewer
#[derive(Clone)]
pub struct NotificationInbox {
    agents: Arc<dyn AgentRepository>,
    notifications: Arc<dyn NotificationRepository>,
}

impl NotificationInbox {
    pub fn new(
        agents: Arc<dyn AgentRepository>,
        notifications: Arc<dyn NotificationRepository>,
    ) -> Self {
        Self {
            agents,
            notifications,
        }
    }

    pub async fn list(
        &self,
        viewer: Uuid,
        handle: &str,
        unread_only: bool,
        page: &PageRequest,
    ) -> Result<NotificationPage> {
        let owner = self
            .agents
            .find_agent_by_handle(handle)
            .await?
            .ok_or_else(|| AppError::NotFound("Agent not found".to_string()))?;

        if owner.id != viewer {
            return Err(AppError::Forbidden(
                "Can only view your own notifications".to_string(),
            ));
        }

        let source = InboxSource {
            repo: self.notifications.as_ref(),
            recipient_id: owner.id,
            unread_only,
        };
        let (page, unread_count) = tokio::try_join!(
            paginate(&source, page),
            self.notifications
                .count_unread(owner.id)
                .map_err(AppError::from)
        )?;

        let actor_ids: Vec<Uuid> = page.items.iter().map(|n| n.actor_id).collect();
        let actors = load_agents(self.agents.as_ref(), &actor_ids).await?;

        let views = page
            .items
            .iter()
            .filter_map(|n| {
                actors
                    .get(&n.actor_id)
                    .map(|actor| NotificationView::new(n, AgentSummary::from(actor)))
            })
            .collect();

        Ok(NotificationPage::new(page.with_items(views), unread_count))
    }

    pub async fn mark_read(&self, viewer: Uuid, notification_id: Uuid) -> Result<()> {
        let notification = self
            .notifications
            .find_notification(notification_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

        if notification.recipient_id != viewer {
            return Err(AppError::Forbidden(
                "Can only mark your own notifications as read".to_string(),
            ));
        }

        if !notification.read {
            self.notifications.mark_read(notification_id).await?;
        }
        Ok(())
    }

    /// Returns how many notifications changed from unread to read
    pub async fn mark_all_read(&self, viewer: Uuid) -> Result<u64> {
        let changed = self.notifications.mark_all_read(viewer).await?;
        debug!(agent_id = %viewer, changed, "marked all notifications read");
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{now_utc, NotificationKind};
    use crate::repository::RepoError;
    use mockall::mock;

    mock! {
        pub Notifications {}

        #[async_trait]
        impl NotificationRepository for Notifications {
            async fn insert_notification(&self, notification: NewNotification) -> RepoResult<Notification>;
            async fn find_notification(&self, id: Uuid) -> RepoResult<Option<Notification>>;
            async fn scan_notifications(
                &self,
                recipient_id: Uuid,
                unread_only: bool,
                after: Option<Keyset>,
                limit: usize,
            ) -> RepoResult<Vec<Notification>>;
            async fn count_unread(&self, recipient_id: Uuid) -> RepoResult<i64>;
            async fn mark_read(&self, id: Uuid) -> RepoResult<bool>;
            async fn mark_all_read(&self, recipient_id: Uuid) -> RepoResult<u64>;
        }
    }

    fn like_event(recipient_id: Uuid, actor_id: Uuid) -> NewNotification {
        NewNotification {
            recipient_id,
            actor_id,
            kind: NotificationKind::Like,
            post_id: Some(Uuid::new_v4()),
            comment_id: None,
        }
    }

    #[tokio::test]
    async fn test_self_notification_is_never_persisted() {
        let mut repo = MockNotifications::new();
        repo.expect_insert_notification().never();

        let fanout = NotificationFanout::new(Arc::new(repo));
        let me = Uuid::new_v4();

        assert!(fanout.emit(like_event(me, me)).await.is_none());
    }

    #[tokio::test]
    async fn test_persistence_failure_is_swallowed() {
        let mut repo = MockNotifications::new();
        repo.expect_insert_notification()
            .times(1)
            .returning(|_| Err(RepoError::Unavailable("connection refused".to_string())));

        let fanout = NotificationFanout::new(Arc::new(repo));
        let before = metrics::notification_count(NotificationKind::Like, "dropped");

        let result = fanout
            .emit(like_event(Uuid::new_v4(), Uuid::new_v4()))
            .await;

        assert!(result.is_none());
        assert!(metrics::notification_count(NotificationKind::Like, "dropped") > before);
    }

    #[tokio::test]
    async fn test_emit_persists_for_other_recipient() {
        let mut repo = MockNotifications::new();
        repo.expect_insert_notification()
            .times(1)
            .returning(|event| Ok(event.into_record()));

        let fanout = NotificationFanout::new(Arc::new(repo));
        let recipient = Uuid::new_v4();

        let notification = fanout
            .emit(like_event(recipient, Uuid::new_v4()))
            .await
            .unwrap();
        assert_eq!(notification.recipient_id, recipient);
        assert!(!notification.read);
        assert!(notification.created_at <= now_utc());
    }
}
