//! HTTP session: balance resync and re-auth hook

use rf_reveal::{ServiceFailure, SessionAuthority};

use crate::connector::GameConnector;
use crate::protocol::{ProfileResponse, PROFILE_PATH};

/// Session authority over the game server's profile endpoint
///
/// Shares the bearer token with the [`GameConnector`] it came from, so
/// clearing it here logs the spin requests out too.
#[derive(Clone)]
pub struct HttpSession {
    connector: GameConnector,
}

impl HttpSession {
    pub(crate) fn new(connector: GameConnector) -> Self {
        Self { connector }
    }

    pub fn has_token(&self) -> bool {
        self.connector.has_token()
    }

    /// Fetch the full profile
    pub async fn profile(&self) -> Result<ProfileResponse, ServiceFailure> {
        let profile: ProfileResponse = self.connector.get_json(PROFILE_PATH).await?;
        log::debug!(
            "[Session] {} ({}) balance {}",
            profile.username,
            profile.role,
            profile.balance
        );
        Ok(profile)
    }
}

impl SessionAuthority for HttpSession {
    async fn current_balance(&self) -> Result<f64, ServiceFailure> {
        Ok(self.profile().await?.balance)
    }

    fn on_unauthorized(&self) {
        log::warn!("[Session] Unauthorized, clearing token");
        self.connector.clear_token();
    }
}
