//! Credential propagation.
//!
//! Collects the tokens the master and its workers need to act on behalf of the
//! submitting identity. Acquisition is best effort: failures degrade into
//! [`CredentialWarning`]s, only a malformed secure store is an error.
use std::{any::Any, fmt, sync::Arc};

use async_trait::async_trait;
use tern_model::{CredentialSet, Token};
use tracing::{debug, warn};

use crate::{error::CredentialError, storage::Location};

/// Submitting identity, passed explicitly instead of looked up globally.
#[derive(Clone, Debug)]
pub struct Identity {
    user: String,
    credentials: CredentialSet,
    secure: bool,
}

impl Identity {
    /// Identity without a secure-login context.
    pub fn insecure(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            credentials: CredentialSet::new(),
            secure: false,
        }
    }

    /// Identity logged in securely, carrying its ambient credentials.
    pub fn secure(user: impl Into<String>, credentials: CredentialSet) -> Self {
        Self {
            user: user.into(),
            credentials,
            secure: true,
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn credentials(&self) -> &CredentialSet {
        &self.credentials
    }
}

/// Source of delegation tokens scoped to a storage location.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Issuer name used in logs and warnings.
    fn name(&self) -> &'static str;

    /// Issue tokens renewable by `renewer` that grant access to `scope`.
    ///
    /// Returns `(alias, token)` pairs.
    async fn issue(&self, renewer: &str, scope: &Location) -> Result<Vec<(String, Token)>, String>;
}

/// Non-fatal outcome of credential gathering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CredentialWarning {
    /// No secure-login context; processes start without delegated tokens.
    InsecureLogin { user: String },
    /// An issuer failed; its tokens are missing from the set.
    DelegationFailed { issuer: &'static str, reason: String },
}

impl fmt::Display for CredentialWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialWarning::InsecureLogin { user } => {
                write!(f, "user '{user}' has no secure login, skipping token delegation")
            }
            CredentialWarning::DelegationFailed { issuer, reason } => {
                write!(f, "token issuer '{issuer}' failed: {reason}")
            }
        }
    }
}

/// Credentials and the warnings collected while gathering them.
#[derive(Debug, Default)]
pub struct Gathered {
    pub credentials: CredentialSet,
    pub warnings: Vec<CredentialWarning>,
}

/// Caller-provided credential store of unknown concrete type.
///
/// Only a [`CredentialSet`] is accepted when merged; anything else is
/// rejected with [`CredentialError::UnsupportedCredentialType`].
pub struct SecureStore {
    inner: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl SecureStore {
    pub fn new<T: Any + Send + Sync>(store: T) -> Self {
        Self {
            inner: Box::new(store),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn credentials(&self) -> Result<&CredentialSet, CredentialError> {
        self.inner
            .downcast_ref::<CredentialSet>()
            .ok_or(CredentialError::UnsupportedCredentialType {
                found: self.type_name,
            })
    }
}

impl fmt::Debug for SecureStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecureStore").field(&self.type_name).finish()
    }
}

impl From<CredentialSet> for SecureStore {
    fn from(set: CredentialSet) -> Self {
        SecureStore::new(set)
    }
}

/// Builds the credential set handed to the master.
pub struct CredentialPropagator {
    identity: Identity,
    issuers: Vec<Arc<dyn TokenIssuer>>,
    stores: CredentialSet,
}

impl CredentialPropagator {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            issuers: Vec::new(),
            stores: CredentialSet::new(),
        }
    }

    pub fn with_issuer(mut self, issuer: Arc<dyn TokenIssuer>) -> Self {
        self.issuers.push(issuer);
        self
    }

    pub fn add_issuer(&mut self, issuer: Arc<dyn TokenIssuer>) {
        self.issuers.push(issuer);
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Merge a caller-provided store; fails immediately on a foreign type.
    pub fn merge_secure_store(&mut self, store: &SecureStore) -> Result<(), CredentialError> {
        let set = store.credentials()?;
        debug!(tokens = set.token_count(), "merging secure store");
        self.stores.merge(set);
        Ok(())
    }

    /// Ambient credentials plus delegated tokens plus merged stores.
    ///
    /// Merged stores only contribute aliases the identity does not already hold.
    ///
    /// Never fails: an insecure identity or a failing issuer only adds a warning.
    pub async fn gather(&self, renewer: &str, scope: &Location) -> Gathered {
        let mut out = Gathered::default();

        if !self.identity.is_secure() {
            let warning = CredentialWarning::InsecureLogin {
                user: self.identity.user.clone(),
            };
            warn!(user = %self.identity.user, "{warning}");
            out.warnings.push(warning);
        } else {
            out.credentials.merge(&self.identity.credentials);
            for issuer in &self.issuers {
                match issuer.issue(renewer, scope).await {
                    Ok(tokens) => {
                        for (alias, token) in tokens {
                            debug!(
                                issuer = issuer.name(),
                                %alias,
                                kind = %token.kind,
                                service = %token.service,
                                "token acquired"
                            );
                            out.credentials.add_token(alias, token);
                        }
                    }
                    Err(reason) => {
                        warn!(issuer = issuer.name(), %reason, "token delegation failed");
                        out.warnings.push(CredentialWarning::DelegationFailed {
                            issuer: issuer.name(),
                            reason,
                        });
                    }
                }
            }
        }

        out.credentials.merge(&self.stores);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_model::ResourceUri;

    struct FixedIssuer(Result<Vec<(String, Token)>, String>);

    #[async_trait]
    impl TokenIssuer for FixedIssuer {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn issue(&self, _: &str, _: &Location) -> Result<Vec<(String, Token)>, String> {
            self.0.clone()
        }
    }

    fn scope() -> Location {
        Location::new(ResourceUri::from_parts("mem", "", "/"))
    }

    fn token(service: &str) -> Token {
        Token::new("storage-delegation", service, vec![1], vec![2])
    }

    #[tokio::test]
    async fn insecure_identity_yields_empty_set_and_warning() {
        let p = CredentialPropagator::new(Identity::insecure("bob"))
            .with_issuer(Arc::new(FixedIssuer(Ok(vec![("fs".into(), token("x"))]))));

        let g = p.gather("rm", &scope()).await;

        assert!(g.credentials.is_empty());
        assert_eq!(
            g.warnings,
            vec![CredentialWarning::InsecureLogin { user: "bob".into() }]
        );
    }

    #[tokio::test]
    async fn secure_identity_collects_ambient_and_issued_tokens() {
        let mut ambient = CredentialSet::new();
        ambient.add_token("kerberos", token("kdc"));

        let p = CredentialPropagator::new(Identity::secure("alice", ambient))
            .with_issuer(Arc::new(FixedIssuer(Ok(vec![("fs".into(), token("nn:8020"))]))));

        let g = p.gather("rm", &scope()).await;

        assert!(g.warnings.is_empty());
        assert_eq!(g.credentials.token_count(), 2);
        assert_eq!(g.credentials.token("fs").unwrap().service, "nn:8020");
    }

    #[tokio::test]
    async fn failing_issuer_degrades_to_warning() {
        let p = CredentialPropagator::new(Identity::secure("alice", CredentialSet::new()))
            .with_issuer(Arc::new(FixedIssuer(Err("kdc unreachable".into()))));

        let g = p.gather("rm", &scope()).await;

        assert!(g.credentials.is_empty());
        assert!(matches!(
            &g.warnings[..],
            [CredentialWarning::DelegationFailed { issuer: "fixed", .. }]
        ));
    }

    #[tokio::test]
    async fn identity_tokens_win_over_merged_store() {
        let mut ambient = CredentialSet::new();
        ambient.add_token("fs", token("ambient"));
        let mut p = CredentialPropagator::new(Identity::secure("alice", ambient))
            .with_issuer(Arc::new(FixedIssuer(Ok(vec![("rm".into(), token("issued"))]))));

        let mut extra = CredentialSet::new();
        extra.add_token("fs", token("store"));
        extra.add_token("rm", token("store"));
        extra.add_token("hbase", token("store"));
        p.merge_secure_store(&SecureStore::from(extra)).unwrap();

        let g = p.gather("rm", &scope()).await;
        assert_eq!(g.credentials.token("fs").unwrap().service, "ambient");
        assert_eq!(g.credentials.token("rm").unwrap().service, "issued");
        assert_eq!(g.credentials.token("hbase").unwrap().service, "store");
    }

    #[test]
    fn foreign_store_is_rejected() {
        let mut p = CredentialPropagator::new(Identity::insecure("bob"));
        let err = p
            .merge_secure_store(&SecureStore::new(String::from("not credentials")))
            .unwrap_err();

        match err {
            CredentialError::UnsupportedCredentialType { found } => {
                assert!(found.contains("String"), "{found}");
            }
        }
    }
}
