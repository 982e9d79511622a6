//! Navigator the gateway redirects through.

use common::AppRoute;
use tokio::sync::mpsc;

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: AppRoute);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: AppRoute) {
        log::info!("Navigating to {} ({})", route.name(), route.path());
    }
}

/// Forwards navigation requests to whoever owns the screen.
#[derive(Debug, Clone)]
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<AppRoute>,
}

impl ChannelNavigator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AppRoute>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, route: AppRoute) {
        if self.tx.send(route).is_err() {
            log::debug!("Navigation to {} dropped, receiver closed", route);
        }
    }
}
