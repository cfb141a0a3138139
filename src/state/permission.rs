/// Process-lifetime cache of the media permission answer
///
/// The first check asks the provider; later checks reuse the answer,
/// including a denial, until `clear` is called. Concurrent first checks
/// share a single provider query.
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use crate::provider::AssetProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    #[default]
    Unknown,
    Granted,
    Denied,
}

#[derive(Debug, Default)]
pub struct PermissionGate {
    state: Mutex<PermissionState>,
    // Held across the provider query so only one caller asks
    query: AsyncMutex<()>,
}

impl PermissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PermissionState {
        *self.state.lock()
    }

    /// Cached answer, or ask `provider` if nothing is cached
    ///
    /// A provider error counts as a denial for this call but is not cached,
    /// so the next check asks again.
    pub async fn check(&self, provider: &dyn AssetProvider) -> bool {
        if let Some(granted) = self.resolved() {
            return granted;
        }

        let _query = self.query.lock().await;
        if let Some(granted) = self.resolved() {
            return granted;
        }

        match provider.request_permission().await {
            Ok(granted) => {
                let state = if granted {
                    PermissionState::Granted
                } else {
                    PermissionState::Denied
                };
                info!(state = ?state, "Media permission resolved");
                *self.state.lock() = state;
                granted
            }
            Err(err) => {
                warn!(error = %err, "Permission query failed");
                false
            }
        }
    }

    fn resolved(&self) -> Option<bool> {
        match self.state() {
            PermissionState::Granted => Some(true),
            PermissionState::Denied => Some(false),
            PermissionState::Unknown => None,
        }
    }

    /// Forget the cached answer
    pub fn clear(&self) {
        *self.state.lock() = PermissionState::Unknown;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    #[tokio::test]
    async fn test_answer_is_cached_until_cleared() {
        let provider = ScriptedProvider::new();
        let gate = PermissionGate::new();

        assert!(gate.check(&provider).await);
        assert!(gate.check(&provider).await);
        assert_eq!(provider.permission_calls(), 1);
        assert_eq!(gate.state(), PermissionState::Granted);

        gate.clear();
        assert_eq!(gate.state(), PermissionState::Unknown);
        assert!(gate.check(&provider).await);
        assert_eq!(provider.permission_calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_checks_share_one_query() {
        let provider = ScriptedProvider::new();
        let gate = PermissionGate::new();

        let (a, b, c) = tokio::join!(
            gate.check(&provider),
            gate.check(&provider),
            gate.check(&provider)
        );
        assert!(a && b && c);
        assert_eq!(provider.permission_calls(), 1);
    }

    #[tokio::test]
    async fn test_query_error_is_not_cached() {
        let provider = ScriptedProvider::new();
        provider.fail_permission(true);
        let gate = PermissionGate::new();

        assert!(!gate.check(&provider).await);
        assert_eq!(gate.state(), PermissionState::Unknown);

        provider.fail_permission(false);
        assert!(gate.check(&provider).await);
        assert_eq!(provider.permission_calls(), 2);
    }

    #[tokio::test]
    async fn test_denial_is_cached() {
        let provider = ScriptedProvider::new();
        provider.set_permission(false);
        let gate = PermissionGate::new();

        assert!(!gate.check(&provider).await);
        provider.set_permission(true);
        assert!(!gate.check(&provider).await);
        assert_eq!(provider.permission_calls(), 1);
        assert_eq!(gate.state(), PermissionState::Denied);
    }
}
