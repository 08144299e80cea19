// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Server runtime orchestration.
//!
//! Turns a validated [`CampusConfig`] into a running API server:
//!
//! - PEM keys are read and the token codec is built
//! - Seeded groups fill the in-memory group store
//! - Configured accounts back the static identity provider
//! - Expired refresh tokens are purged in the background
//! - Shutdown drains connections up to `api.shutdown_timeout`

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use campus_api::auth::{
    parse_algorithm, Account, GroupPermissions, JwtConfig, JwtManager, PrincipalKind,
    PrincipalProfile, StaticIdentityProvider,
};
use campus_api::store::{Group, MemoryGroupStore, MemoryTokenStore, TokenStore};
use campus_api::{ApiConfig, ApiServer, ApiServerBuilder, CorsConfig};
use campus_config::{load_config, AccountConfig, CampusConfig, JwtSection};

use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

/// Interval between refresh-token purges.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

// =============================================================================
// CampusRuntime
// =============================================================================

/// Runs the API server until shutdown is signaled.
pub struct CampusRuntime {
    config: Arc<CampusConfig>,
    shutdown: ShutdownCoordinator,
}

impl CampusRuntime {
    /// Creates a new runtime.
    pub fn new(config: CampusConfig) -> Self {
        Self {
            config: Arc::new(config),
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Returns the shutdown coordinator.
    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CampusConfig {
        &self.config
    }

    /// Runs the server until SIGINT/SIGTERM or a manual shutdown.
    pub async fn run(self) -> BinResult<()> {
        info!("Starting campus v{}", campus_api::VERSION);

        let server = build_server(&self.config)?;
        let drain_timeout = self.config.api.shutdown_timeout;

        let purge = tokio::spawn(purge_expired_tokens(
            server.state().tokens().clone(),
            self.shutdown.clone(),
        ));

        let serve = server.run_with_shutdown(self.shutdown.shutdown_signal().wait());
        tokio::pin!(serve);

        let result = tokio::select! {
            result = &mut serve => result,
            _ = self.shutdown.wait_for_shutdown() => {
                info!("Shutdown initiated, draining connections...");
                match tokio::time::timeout(drain_timeout, &mut serve).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!("Connections still open after {:?}, stopping", drain_timeout);
                        Ok(())
                    }
                }
            }
        };

        self.shutdown.initiate_shutdown();
        if let Err(e) = purge.await {
            warn!("Token purge task ended abnormally: {}", e);
        }

        info!("campus shutdown complete");

        result.map_err(BinError::from)
    }
}

/// Drops expired refresh tokens until shutdown.
async fn purge_expired_tokens(tokens: Arc<dyn TokenStore>, shutdown: ShutdownCoordinator) {
    let mut interval = tokio::time::interval(PURGE_INTERVAL);
    interval.tick().await;

    let signal = shutdown.shutdown_signal().wait();
    tokio::pin!(signal);

    loop {
        tokio::select! {
            _ = &mut signal => break,
            _ = interval.tick() => match tokens.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => debug!(purged, "Purged expired refresh tokens"),
                Err(e) => warn!("Failed to purge refresh tokens: {}", e),
            },
        }
    }
}

// =============================================================================
// Config Mapping
// =============================================================================

/// Builds the API server from configuration.
pub fn build_server(config: &CampusConfig) -> BinResult<ApiServer> {
    let api_config = api_config(config)?;

    info!(
        groups = config.groups.len(),
        accounts = config.accounts.len(),
        "Seeding stores from configuration"
    );

    ApiServerBuilder::new()
        .config(api_config)
        .group_store(Arc::new(group_store(config)))
        .token_store(Arc::new(MemoryTokenStore::new()))
        .identity_provider(Arc::new(identity_provider(config)))
        .build()
        .map_err(|e| BinError::from(e).with_context("Failed to build API server"))
}

/// Maps the `api` and `jwt` sections to the runtime [`ApiConfig`].
pub fn api_config(config: &CampusConfig) -> BinResult<ApiConfig> {
    let api = &config.api;

    let cors = CorsConfig {
        allowed_origins: api.cors.allowed_origins.clone(),
        allowed_methods: api.cors.allowed_methods.clone(),
        allowed_headers: api.cors.allowed_headers.clone(),
        allow_credentials: api.cors.allow_credentials,
        max_age: api.cors.max_age,
    };

    let mut api_config = ApiConfig::new()
        .with_host(api.host)
        .with_port(api.port)
        .with_cors(cors)
        .with_access_cookie(&api.access_cookie)
        .with_jwt(jwt_config(&config.jwt)?);
    api_config.request_timeout = api.request_timeout;
    api_config.shutdown_timeout = api.shutdown_timeout;
    if let Some(paths) = &api.public_paths {
        api_config.public_paths = paths.clone();
    }

    Ok(api_config)
}

/// Maps the `jwt` section to a [`JwtConfig`], reading the PEM files.
pub fn jwt_config(jwt: &JwtSection) -> BinResult<JwtConfig> {
    let algorithm = parse_algorithm(&jwt.algorithm).ok_or_else(|| {
        BinError::config(format!("Unsupported JWT algorithm '{}'", jwt.algorithm))
    })?;

    let private_key = match (&jwt.private_key, &jwt.private_key_path) {
        (Some(inline), _) => inline.expose().to_string(),
        (None, Some(path)) => read_pem(path)?,
        (None, None) => return Err(BinError::config("jwt.private_key_path is not set")),
    };
    let public_key = match (&jwt.public_key, &jwt.public_key_path) {
        (Some(inline), _) => inline.clone(),
        (None, Some(path)) => read_pem(path)?,
        (None, None) => return Err(BinError::config("jwt.public_key_path is not set")),
    };

    let mut config = JwtConfig::new(private_key, public_key)
        .with_algorithm(algorithm)
        .with_issuer(&jwt.issuer)
        .with_access_ttl(jwt.access_ttl)
        .with_refresh_ttl(jwt.refresh_ttl);
    config.leeway_secs = jwt.leeway_secs;

    Ok(config)
}

/// Builds the token codec from the `jwt` section.
pub fn jwt_manager(jwt: &JwtSection) -> BinResult<JwtManager> {
    JwtManager::new(jwt_config(jwt)?).map_err(BinError::from)
}

fn read_pem(path: &Path) -> BinResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| BinError::key(path, e))
}

/// Fills an in-memory group store with the seeded groups.
pub fn group_store(config: &CampusConfig) -> MemoryGroupStore {
    MemoryGroupStore::with_groups(config.groups.iter().map(|seed| {
        Group::new(
            seed.id.as_str(),
            seed.name.as_str(),
            GroupPermissions::new(seed.view.iter().cloned(), seed.edit.iter().cloned()),
        )
    }))
}

/// Builds the identity provider from the configured accounts.
pub fn identity_provider(config: &CampusConfig) -> StaticIdentityProvider {
    StaticIdentityProvider::new(config.accounts.iter().map(|account| Account {
        login: account.login.clone(),
        password: account.password.expose().to_string(),
        profile: profile(account),
    }))
}

/// Returns the profile handed out for an account.
pub fn profile(account: &AccountConfig) -> PrincipalProfile {
    let kind = match account.grade {
        Some(grade) => PrincipalKind::Student {
            grade,
            class: account.class.unwrap_or_default(),
            number: account.number.unwrap_or_default(),
        },
        None => PrincipalKind::Teacher,
    };

    PrincipalProfile {
        id: account.id.clone(),
        name: account.name.clone(),
        kind,
        groups: account.groups.clone(),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for constructing the runtime.
#[derive(Default)]
pub struct RuntimeBuilder {
    config_path: Option<PathBuf>,
    config: Option<CampusConfig>,
    host: Option<IpAddr>,
    port: Option<u16>,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration file path.
    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the configuration directly.
    pub fn config(mut self, config: CampusConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides the bind address.
    pub fn host(mut self, host: Option<IpAddr>) -> Self {
        self.host = host;
        self
    }

    /// Overrides the port.
    pub fn port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> BinResult<CampusRuntime> {
        let mut config = match self.config {
            Some(cfg) => cfg,
            None => {
                let path = self
                    .config_path
                    .ok_or_else(|| BinError::config("No configuration provided"))?;

                load_config(&path).map_err(|e| {
                    BinError::from(e)
                        .with_context(format!("Failed to load config from {}", path.display()))
                })?
            }
        };

        if let Some(host) = self.host {
            config.api.host = host;
        }
        if let Some(port) = self.port {
            config.api.port = port;
        }

        Ok(CampusRuntime::new(config))
    }
}

// =============================================================================
// Tests
// =============================================================================
