//! Maps a connection's presented credential to a display name.

use std::sync::Arc;

use crate::auth::service::AuthService;

/// Display name used when a connection neither authenticates nor declares one.
pub const ANONYMOUS: &str = "Anonymous";

/// The name a session is known by for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub name: String,
    pub authenticated: bool,
}

impl ResolvedIdentity {
    /// Unauthenticated identity from a client-declared name.
    pub fn declared(name: Option<&str>) -> Self {
        let name = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or(ANONYMOUS);
        Self {
            name: name.to_string(),
            authenticated: false,
        }
    }
}

/// Resolves identities at connection admission.
///
/// Never rejects: a missing, malformed or expired token downgrades the
/// connection to the declared-name path.
#[derive(Clone)]
pub struct IdentityResolver {
    auth: Arc<dyn AuthService>,
}

impl IdentityResolver {
    pub fn new(auth: Arc<dyn AuthService>) -> Self {
        Self { auth }
    }

    pub async fn resolve(&self, credential: Option<&str>, declared: Option<&str>) -> ResolvedIdentity {
        let Some(token) = credential.map(str::trim).filter(|t| !t.is_empty()) else {
            return ResolvedIdentity::declared(declared);
        };

        match self.auth.verify(token).await {
            Ok(name) => ResolvedIdentity {
                name,
                authenticated: true,
            },
            Err(err) => {
                tracing::debug!(%err, "credential rejected, continuing anonymously");
                ResolvedIdentity::declared(declared)
            }
        }
    }
}
