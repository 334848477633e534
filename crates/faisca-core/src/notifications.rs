use std::sync::Arc;

use uuid::Uuid;

use faisca_db::Database;
use faisca_gateway::dispatcher::Dispatcher;
use faisca_types::error::CoreResult;
use faisca_types::events::ChangeEvent;
use faisca_types::models::{Notification, NotificationKind};

use crate::{blocking, convert, now_ts};

/// One merged feed for like-derived and generic notifications, newest
/// first. Event-driven: each push lands as a targeted change event; the
/// client's periodic refetch is the reconciliation safety net, there is no
/// second polling path.
#[derive(Clone)]
pub struct NotificationFeed {
    db: Arc<Database>,
    dispatcher: Dispatcher,
}

impl NotificationFeed {
    pub fn new(db: Arc<Database>, dispatcher: Dispatcher) -> Self {
        Self { db, dispatcher }
    }

    pub async fn push(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        ref_id: Option<Uuid>,
        body: String,
    ) -> CoreResult<Notification> {
        let id = Uuid::new_v4();
        let created_at = now_ts();

        let db = self.db.clone();
        let row_body = body.clone();
        let ts = created_at.clone();
        blocking(move || {
            db.insert_notification(
                &id.to_string(),
                &user_id.to_string(),
                kind.as_str(),
                ref_id.map(|r| r.to_string()).as_deref(),
                &row_body,
                &ts,
            )
        })
        .await?;

        let notification = Notification {
            id,
            user_id,
            kind,
            ref_id,
            body,
            created_at: convert::parse_ts(&created_at, "notifications.created_at"),
            read: false,
        };

        self.dispatcher
            .send_to_user(
                user_id,
                ChangeEvent::NotificationCreate {
                    notification: notification.clone(),
                },
            )
            .await;

        Ok(notification)
    }

    pub async fn list(&self, user_id: Uuid) -> CoreResult<Vec<Notification>> {
        let db = self.db.clone();
        let rows = blocking(move || db.notifications_for_user(&user_id.to_string())).await?;
        Ok(rows.iter().map(convert::to_notification).collect())
    }

    /// Idempotent: reapplying has no additional effect.
    pub async fn mark_read(&self, id: Uuid, user_id: Uuid) -> CoreResult<()> {
        let db = self.db.clone();
        blocking(move || db.mark_notification_read(&id.to_string(), &user_id.to_string())).await?;
        Ok(())
    }

    /// Idempotent: reapplying has no additional effect.
    pub async fn mark_all_read(&self, user_id: Uuid) -> CoreResult<()> {
        let db = self.db.clone();
        blocking(move || db.mark_all_notifications_read(&user_id.to_string())).await?;
        Ok(())
    }
}
