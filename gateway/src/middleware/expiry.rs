use std::sync::Arc;

use common::AppRoute;

use crate::error::SESSION_EXPIRED_MESSAGE;
use crate::navigation::Navigator;
use crate::notify::{Notice, Notifier};
use crate::session::{ExpiryOutcome, SessionContext, SessionSnapshot};

/// Session-expiry recovery: clear the credential, tell the user, go to the
/// login route.
#[derive(Clone)]
pub struct SessionExpiry {
    session: SessionContext,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    login_route: AppRoute,
}

impl SessionExpiry {
    pub fn new(
        session: SessionContext,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        login_route: AppRoute,
    ) -> Self {
        Self {
            session,
            notifier,
            navigator,
            login_route,
        }
    }

    /// Handles a 401 received by a request issued under `observed`.
    ///
    /// The credential is cleared on every 401. The notice and redirect run
    /// only for [`ExpiryOutcome::Recovered`], so any number of overlapping
    /// 401s produce one notice and one redirect.
    pub fn on_unauthorized(&self, observed: &SessionSnapshot) -> ExpiryOutcome {
        let outcome = self.session.expire(observed);

        match outcome {
            ExpiryOutcome::Recovered => {
                log::info!(
                    "Session expired, redirecting to {}",
                    self.login_route.path()
                );
                self.notifier.notify(Notice::error(SESSION_EXPIRED_MESSAGE));
                self.navigator.navigate(self.login_route);
            }
            ExpiryOutcome::AlreadyExpired | ExpiryOutcome::Stale => {
                log::debug!("Credential cleared, recovery already handled ({:?})", outcome);
            }
        }

        outcome
    }

    /// Runs the recovery against the current session.
    pub fn recover(&self) -> ExpiryOutcome {
        let snapshot = self.session.snapshot();
        self.on_unauthorized(&snapshot)
    }
}
