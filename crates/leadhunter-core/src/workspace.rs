// ── Workspace facade ──
//
// Owns the gateway for one backend project and hands out data handles.
// Created once at startup, torn down explicitly with `shutdown`. Every
// handle's token is a child of the workspace token, so shutting the
// workspace down closes every handle it opened.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use leadhunter_api::transport::{TlsMode, TransportConfig};
use leadhunter_api::{Credentials, Gateway, RestGateway, Session};

use crate::campaigns::CampaignsHandle;
use crate::config::{TlsVerification, WorkspaceConfig};
use crate::error::CoreError;
use crate::leads::LeadsHandle;
use crate::model::LeadFilter;
use crate::notify::{Notification, Notifier};

/// Entry point for consumers.
///
/// Cheaply cloneable; clones share the gateway and notifier.
#[derive(Clone)]
pub struct Workspace {
    gateway: Arc<dyn Gateway>,
    /// Set when built by [`connect`](Self::connect); needed for sign-out
    /// and feed shutdown, which are not part of the `Gateway` seam.
    rest: Option<Arc<RestGateway>>,
    notifier: Notifier,
    realtime_enabled: bool,
    cancel: CancellationToken,
}

impl Workspace {
    /// Build the REST gateway for `config` and sign in if credentials
    /// are configured.
    pub async fn connect(config: WorkspaceConfig) -> Result<Self, CoreError> {
        let transport = build_transport(&config);
        let rest = Arc::new(RestGateway::new(
            config.url.as_str(),
            config.anon_key.clone(),
            &transport,
        )?);

        match &config.sign_in {
            Some(sign_in) => {
                let credentials = Credentials {
                    email: sign_in.email.clone(),
                    password: sign_in.password.clone(),
                };
                rest.sign_in_with_password(&credentials).await?;
            }
            None => debug!("no credentials configured, running anonymously"),
        }

        info!(url = %config.url, realtime = config.realtime_enabled, "workspace connected");
        let gateway: Arc<dyn Gateway> = rest.clone();
        Ok(Self {
            gateway,
            rest: Some(rest),
            notifier: Notifier::new(),
            realtime_enabled: config.realtime_enabled,
            cancel: CancellationToken::new(),
        })
    }

    /// Wrap an existing gateway (alternate backends, test doubles).
    pub fn with_gateway(gateway: Arc<dyn Gateway>, realtime_enabled: bool) -> Self {
        Self {
            gateway,
            rest: None,
            notifier: Notifier::new(),
            realtime_enabled,
            cancel: CancellationToken::new(),
        }
    }

    pub fn gateway(&self) -> &Arc<dyn Gateway> {
        &self.gateway
    }

    pub fn session(&self) -> Option<Session> {
        self.gateway.session()
    }

    /// Subscribe to operation notifications from every handle opened here.
    pub fn notifications(&self) -> tokio::sync::broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    // ── Handles ──────────────────────────────────────────────────────

    /// Open a leads handle, run the initial fetch, and start watching for
    /// changes if realtime is enabled.
    ///
    /// A failed initial fetch does not fail the call; it shows up in the
    /// handle's error slot.
    pub async fn open_leads(&self, filter: LeadFilter) -> Result<LeadsHandle, CoreError> {
        if self.is_shut_down() {
            return Err(CoreError::Disconnected);
        }
        let handle = LeadsHandle::new(
            Arc::clone(&self.gateway),
            filter,
            self.notifier.clone(),
            self.cancel.child_token(),
        );
        handle.fetch_leads().await;
        if self.realtime_enabled {
            if let Err(e) = handle.watch_changes().await {
                warn!(error = %e, "leads realtime unavailable, continuing without it");
            }
        }
        Ok(handle)
    }

    /// Open a campaigns handle. Same lifecycle as [`open_leads`](Self::open_leads).
    pub async fn open_campaigns(&self) -> Result<CampaignsHandle, CoreError> {
        if self.is_shut_down() {
            return Err(CoreError::Disconnected);
        }
        let handle = CampaignsHandle::new(
            Arc::clone(&self.gateway),
            self.notifier.clone(),
            self.cancel.child_token(),
        );
        handle.fetch_campaigns().await;
        if self.realtime_enabled {
            if let Err(e) = handle.watch_changes().await {
                warn!(error = %e, "campaigns realtime unavailable, continuing without it");
            }
        }
        Ok(handle)
    }

    // ── Teardown ─────────────────────────────────────────────────────

    /// Close every handle opened here, stop realtime feeds, and sign out.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(rest) = &self.rest {
            rest.shutdown();
            if let Err(e) = rest.sign_out().await {
                warn!(error = %e, "sign-out failed (non-fatal)");
            }
        }
        debug!("workspace shut down");
    }

    /// Connect, run `f`, shut down.
    ///
    /// For one-off CLI commands: realtime is disabled since only a single
    /// request/response cycle is needed.
    pub async fn oneshot<F, Fut, T>(config: WorkspaceConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Workspace) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.realtime_enabled = false;

        let workspace = Workspace::connect(cfg).await?;
        let result = f(workspace.clone()).await;
        workspace.shutdown().await;
        result
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn build_transport(config: &WorkspaceConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
