use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Email address or phone number of the recipient.
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn order_confirmation(to: impl Into<String>, order_id: impl std::fmt::Display) -> Self {
        Self {
            to: to.into(),
            subject: "Order Confirmation".to_string(),
            body: format!("Your order has been placed successfully. Order number: {order_id}"),
        }
    }

    pub fn review_request(
        to: impl Into<String>,
        order_id: impl std::fmt::Display,
        review_url_base: &str,
    ) -> Self {
        Self {
            to: to.into(),
            subject: "Order Delivered".to_string(),
            body: format!(
                "We hope your order arrived safely and look forward to your feedback. \
                 Leave your review here: {}/{order_id}",
                review_url_base.trim_end_matches('/')
            ),
        }
    }

    pub fn password_reset(to: impl Into<String>, code: &str) -> Self {
        Self {
            to: to.into(),
            subject: "Password Reset Code".to_string(),
            body: format!("Your password reset code is: {code}"),
        }
    }
}

/// Outbound message transport (email, SMS, ...).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of delivering them.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        tracing::info!(
            to = %notification.to,
            subject = %notification.subject,
            "notification sent"
        );
        Ok(())
    }
}

/// Fire-and-forget delivery; the caller never waits on or fails because of it.
pub fn dispatch(notifier: Arc<dyn Notifier>, notification: Notification) {
    tokio::spawn(async move {
        let subject = notification.subject.clone();
        if let Err(err) = notifier.send(notification).await {
            tracing::warn!(error = %err, subject = %subject, "notification failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_request_links_to_the_order() {
        let n = Notification::review_request("a@b.c", 42, "https://shop.test/review/");
        assert!(n.body.ends_with("https://shop.test/review/42"));
    }

    #[test]
    fn confirmation_carries_order_id() {
        let n = Notification::order_confirmation("a@b.c", "abc-123");
        assert!(n.body.contains("abc-123"));
    }
}
