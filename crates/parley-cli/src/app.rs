//! Wiring from config to session objects.

use std::sync::Arc;
use std::time::Duration;

use parley_config::ParleyConfig;
use parley_session::{
    build_http_client, AuthenticatedClient, ChatApi, ConnectionManager, RealtimeConfig,
    SessionError, TokenSession,
};
use reqwest::Url;

pub struct App {
    pub config: ParleyConfig,
    pub session: Arc<TokenSession>,
    pub api: ChatApi,
}

impl App {
    pub fn new(
        config: ParleyConfig,
        token: Option<String>,
        refresh_token: Option<String>,
    ) -> Result<Self, SessionError> {
        let http = build_http_client(
            Duration::from_secs(u64::from(config.server.connect_timeout_secs)),
            Duration::from_secs(u64::from(config.server.request_timeout_secs)),
        )?;

        let http_base = Url::parse(&config.server.http_base()).map_err(|e| {
            SessionError::InvalidRequest(format!("bad server host {}: {e}", config.server.host))
        })?;
        let refresh_url = http_base
            .join(&config.auth.refresh_path)
            .map_err(|e| SessionError::InvalidRequest(format!("bad refresh path: {e}")))?;

        let mut session = TokenSession::new(http.clone(), refresh_url, token);
        if let Some(refresh_token) = refresh_token {
            session = session.with_refresh_token(refresh_token);
        }
        let session = Arc::new(session);

        let client = AuthenticatedClient::new(
            http,
            session.clone(),
            config.auth.issuance_marker.clone(),
        );
        let api = ChatApi::new(Arc::new(client), http_base);

        Ok(Self {
            config,
            session,
            api,
        })
    }

    pub fn connection_manager(&self) -> ConnectionManager {
        let realtime = RealtimeConfig::new(self.config.server.ws_base()).with_connect_timeout(
            Duration::from_secs(u64::from(self.config.server.connect_timeout_secs)),
        );
        ConnectionManager::new(realtime)
    }
}
