//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::auth::JwtVerifier;
use crate::config::{ConfigError, DatabaseConfig, Settings};
use crate::request::BodyValidator;
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Debug)]
pub struct AppState {
    pub settings: Settings,
    pub services: Services,
    pub daos: Daos,
}

/// Stateless services shared by every request
#[derive(Debug, Clone)]
pub struct Services {
    /// Bearer token verification
    pub jwt: JwtVerifier,
    /// Rule evaluation for decoded request bodies
    pub validator: BodyValidator,
}

/// Handles for data-access objects.
///
/// Holds the connection descriptor only; opening connections is up to the
/// data-access layer built on top.
#[derive(Debug, Clone)]
pub struct Daos {
    database: DatabaseConfig,
}

impl Daos {
    pub fn database(&self) -> &DatabaseConfig {
        &self.database
    }

    pub fn connection_url(&self) -> Result<url::Url, ConfigError> {
        self.database.connection_url()
    }
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let services = Services {
            jwt: JwtVerifier::new(&settings.auth),
            validator: BodyValidator::new(),
        };
        let daos = Daos {
            database: settings.database.clone(),
        };

        Self {
            settings,
            services,
            daos,
        }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
