use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use tracing::warn;

/// The auth collaborator as seen by the device request layer.
pub trait CredentialProvider: Send + Sync {
    /// Bearer token for privileged requests, if the operator has one
    fn credential(&self) -> Option<String>;

    /// The device rejected our credential
    fn on_unauthorized(&self);
}

/// Token supplied up front (flag, env or config file). There is no login
/// flow; once the device rejects it, it is dropped and the operator has to
/// restart with a fresh token.
pub struct StaticToken {
    token: RwLock<Option<String>>,
    invalidated: AtomicBool,
}

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.trim().is_empty())),
            invalidated: AtomicBool::new(false),
        }
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated.load(Ordering::Relaxed)
    }
}

impl CredentialProvider for StaticToken {
    fn credential(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    fn on_unauthorized(&self) {
        if !self.invalidated.swap(true, Ordering::Relaxed) {
            warn!("device rejected the session token; restart with a fresh --token");
        }
        if let Ok(mut token) = self.token.write() {
            *token = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_token_is_no_token() {
        assert_eq!(StaticToken::new(Some("  ".to_string())).credential(), None);
        assert_eq!(StaticToken::new(None).credential(), None);
    }

    #[test]
    fn test_unauthorized_drops_token() {
        let auth = StaticToken::new(Some("abc123".to_string()));
        assert_eq!(auth.credential().as_deref(), Some("abc123"));
        auth.on_unauthorized();
        auth.on_unauthorized();
        assert!(auth.is_invalidated());
        assert_eq!(auth.credential(), None);
    }
}
