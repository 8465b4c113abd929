//! Notification fanout: mailbox queries, read flags, and interval polling.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::records::{Collection, ListQuery, RecordStore, RecordStoreExt, SortOrder};

use super::domain::{fields, Notification, NotificationCategory, NotificationId, Role};
use super::error::PortalError;
use super::session::Session;

/// Notifications shown to staff accounts, newest first.
pub const STAFF_MAILBOX_LIMIT: usize = 10;

/// Mailbox contents published by the poller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InboxSnapshot {
    pub items: Vec<Notification>,
    pub unread: usize,
}

impl InboxSnapshot {
    fn from_items(items: Vec<Notification>) -> Self {
        let unread = items.iter().filter(|item| !item.read).count();
        Self { items, unread }
    }
}

pub struct NotificationCenter<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for NotificationCenter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> NotificationCenter<S>
where
    S: RecordStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create an unread notification addressed to `recipient_email`.
    pub fn notify(
        &self,
        recipient_email: &str,
        title: &str,
        message: &str,
        category: NotificationCategory,
    ) -> Result<Notification, PortalError> {
        let notification = Notification {
            id: NotificationId::default(),
            recipient_email: recipient_email.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            read: false,
            created_at: Utc::now(),
            category,
        };
        let stored: Notification = self
            .store
            .create_as(Collection::Notifications, &notification)?;
        debug!(notification_id = %stored.id, recipient = %stored.recipient_email, "created notification");
        Ok(stored)
    }

    /// Applicants see their own notifications; staff see the most recent ones globally.
    pub fn inbox(&self, session: &Session) -> Result<Vec<Notification>, PortalError> {
        let query = match session.role {
            Role::Applicant => ListQuery::new()
                .filter(fields::RECIPIENT_EMAIL, session.email.clone())
                .sort_by(fields::CREATED_AT, SortOrder::Descending),
            Role::Evaluator | Role::Admin => ListQuery::new()
                .sort_by(fields::CREATED_AT, SortOrder::Descending)
                .limit(STAFF_MAILBOX_LIMIT),
        };
        Ok(self.store.list_as(Collection::Notifications, &query)?)
    }

    pub fn snapshot(&self, session: &Session) -> Result<InboxSnapshot, PortalError> {
        self.inbox(session).map(InboxSnapshot::from_items)
    }

    pub fn unread_count(&self, session: &Session) -> Result<usize, PortalError> {
        Ok(self.snapshot(session)?.unread)
    }

    pub fn mark_read(
        &self,
        session: &Session,
        id: &NotificationId,
    ) -> Result<Notification, PortalError> {
        let current: Notification = self
            .store
            .get_as(Collection::Notifications, id.as_str())?
            .ok_or_else(|| PortalError::not_found("notification", id.as_str()))?;

        let visible = match session.role {
            Role::Applicant => current.recipient_email.eq_ignore_ascii_case(&session.email),
            Role::Evaluator | Role::Admin => true,
        };
        if !visible {
            return Err(PortalError::not_found("notification", id.as_str()));
        }
        if current.read {
            return Ok(current);
        }

        Ok(self.store.patch_as(
            Collection::Notifications,
            id.as_str(),
            serde_json::json!({ "read": true }),
        )?)
    }

    /// Patch every unread item for the session's recipient filter, one at a time.
    ///
    /// Not transactional: a failure stops the sweep with earlier items already marked, and
    /// notifications arriving mid-sweep are left unread.
    pub fn mark_all_read(&self, session: &Session) -> Result<usize, PortalError> {
        let query = match session.role {
            Role::Applicant => ListQuery::new()
                .filter(fields::RECIPIENT_EMAIL, session.email.clone())
                .filter(fields::READ, "false"),
            Role::Evaluator | Role::Admin => ListQuery::new().filter(fields::READ, "false"),
        };
        let unread: Vec<Notification> = self.store.list_as(Collection::Notifications, &query)?;

        for notification in &unread {
            self.store.patch(
                Collection::Notifications,
                notification.id.as_str(),
                serde_json::json!({ "read": true }),
            )?;
        }

        info!(email = %session.email, marked = unread.len(), "marked notifications read");
        Ok(unread.len())
    }
}

/// Background mailbox refresh. Dropping the handle stops the task.
pub struct InboxPoller {
    receiver: watch::Receiver<InboxSnapshot>,
    refresh: Arc<Notify>,
    task: JoinHandle<()>,
}

impl InboxPoller {
    pub fn subscribe(&self) -> watch::Receiver<InboxSnapshot> {
        self.receiver.clone()
    }

    pub fn latest(&self) -> InboxSnapshot {
        self.receiver.borrow().clone()
    }

    /// Fetch again without waiting for the next tick.
    pub fn refresh_now(&self) {
        self.refresh.notify_one();
    }
}

impl Drop for InboxPoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Poll the session's mailbox every `interval`, starting immediately.
///
/// Must be called from within a tokio runtime. Store calls run on the blocking pool;
/// failed polls are logged and the previous snapshot is kept.
pub fn spawn_inbox_poller<S>(
    center: NotificationCenter<S>,
    session: Session,
    interval: Duration,
) -> InboxPoller
where
    S: RecordStore + ?Sized + 'static,
{
    let (sender, receiver) = watch::channel(InboxSnapshot::default());
    let refresh = Arc::new(Notify::new());
    let wake = Arc::clone(&refresh);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = wake.notified() => {}
            }

            let center = center.clone();
            let session = session.clone();
            match tokio::task::spawn_blocking(move || center.snapshot(&session)).await {
                Ok(Ok(snapshot)) => {
                    if sender.send(snapshot).is_err() {
                        break;
                    }
                }
                Ok(Err(err)) => warn!(error = %err, "inbox poll failed"),
                Err(err) => warn!(error = %err, "inbox poll task panicked"),
            }
        }
    });

    InboxPoller {
        receiver,
        refresh,
        task,
    }
}
