const APP_NAME: &str = "radiomark";

/// Surfaces a one-line outcome to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, body: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, body: &str) {
        if let Err(err) = notify_rust::Notification::new()
            .appname(APP_NAME)
            .summary("Radiografia")
            .body(body)
            .show()
        {
            tracing::warn!("system notification failed: {err}");
        }
    }
}

/// Logs instead of showing anything; used by headless hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, body: &str) {
        tracing::info!(body, "notification");
    }
}
