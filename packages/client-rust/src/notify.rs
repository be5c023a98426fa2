//! Notifier that turns engine notifications into log events.

use cms_admin_core::notify::{Notification, Notifier, Severity};
use tracing::{error, info};

/// Emits each notification as a `tracing` event on the `cms_admin::notify` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Success | Severity::Info => {
                info!(
                    target: "cms_admin::notify",
                    severity = ?notification.severity,
                    "{}",
                    notification.message
                );
            }
            Severity::Error => {
                error!(target: "cms_admin::notify", "{}", notification.message);
            }
        }
    }
}
