//! Authentication self-test: one plain call and one stream handshake.

use protocol::SseEvent;

use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::middleware::mask_token;
use crate::stream::EventHandler;

const PROBE_MESSAGE: &str = "ping";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Ok,
    Unauthorized,
    Failed(String),
    /// Not attempted.
    Skipped,
}

impl ProbeStatus {
    fn from_error(err: &GatewayError) -> Self {
        match err {
            GatewayError::Unauthorized => ProbeStatus::Unauthorized,
            other => ProbeStatus::Failed(other.user_message()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub token_present: bool,
    pub api: ProbeStatus,
    pub stream: ProbeStatus,
}

impl ProbeReport {
    /// Neither check was rejected with 401.
    pub fn authenticated(&self) -> bool {
        self.token_present
            && self.api != ProbeStatus::Unauthorized
            && self.stream != ProbeStatus::Unauthorized
    }
}

struct Discard;

impl EventHandler for Discard {
    fn on_event(&mut self, _event: SseEvent) {}
}

/// Checks that the stored token is accepted by `/user/info` and by the
/// chat stream handshake. A 401 on either runs the usual expiry recovery.
pub async fn probe_auth(gateway: &Gateway) -> ProbeReport {
    let Some(token) = gateway.session().token() else {
        log::warn!("Auth probe: no token stored, log in first");
        return ProbeReport {
            token_present: false,
            api: ProbeStatus::Skipped,
            stream: ProbeStatus::Skipped,
        };
    };

    log::info!("Auth probe with token {}", mask_token(&token));

    let api = match gateway.users().info().await {
        Ok(_) => ProbeStatus::Ok,
        Err(err) => ProbeStatus::from_error(&err),
    };
    log::info!("Auth probe: /user/info -> {:?}", api);

    if api == ProbeStatus::Unauthorized {
        return ProbeReport {
            token_present: true,
            api,
            stream: ProbeStatus::Skipped,
        };
    }

    let stream = match gateway.chat().chat_stream(PROBE_MESSAGE, Discard).await {
        Ok(handle) => {
            handle.abort().await;
            ProbeStatus::Ok
        }
        Err(err) => ProbeStatus::from_error(&err),
    };
    log::info!("Auth probe: chat stream -> {:?}", stream);

    ProbeReport {
        token_present: true,
        api,
        stream,
    }
}
