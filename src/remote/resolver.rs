//! Cached resolution of a session's controller address.

use super::{call_with_timeout, DirectoryService};
use crate::error::ControlError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

const GRPC_SCHEME: &str = "grpc://";

/// Resolves the controller address of a session through the directory
/// service, caching one address per session.
///
/// The cache lock is held across the directory lookup so concurrent first
/// lookups for a session result in a single remote call.
pub struct AddressResolver {
    directory: Arc<dyn DirectoryService>,
    service: String,
    kind: String,
    call_timeout: Duration,
    cache: Mutex<HashMap<String, String>>,
}

impl AddressResolver {
    pub fn new(
        directory: Arc<dyn DirectoryService>,
        service: impl Into<String>,
        kind: impl Into<String>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            directory,
            service: service.into(),
            kind: kind.into(),
            call_timeout,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Address of the controller for `session`. Exactly one endpoint must be
    /// registered; the `grpc://` scheme is stripped.
    pub async fn resolve(&self, session: &str) -> Result<String, ControlError> {
        let mut cache = self.cache.lock().await;
        if let Some(address) = cache.get(session) {
            debug!(session, address = %address, "Controller address cache hit");
            return Ok(address.clone());
        }

        let endpoints = call_with_timeout(
            "resolve_controller_address",
            self.call_timeout,
            self.directory.resolve(session, &self.service, &self.kind),
        )
        .await?;

        let [endpoint] = endpoints.as_slice() else {
            return Err(ControlError::AddressResolution {
                session: session.to_string(),
                found: endpoints.len(),
            });
        };

        let address = endpoint
            .uri
            .strip_prefix(GRPC_SCHEME)
            .unwrap_or(&endpoint.uri)
            .to_string();
        info!(session, address = %address, "Resolved controller address");
        cache.insert(session.to_string(), address.clone());
        Ok(address)
    }

    /// Forget the cached address of `session`, e.g. after the controller moved.
    pub async fn invalidate(&self, session: &str) {
        self.cache.lock().await.remove(session);
    }
}
