//! Request classification and privilege checks.
//!
//! A bearer token is turned into a [`Caller`] by a [`CredentialVerifier`];
//! the `require_*` functions then decide whether that caller may proceed.
//! Every denial goes through [`deny`], which picks `UNAUTHORIZED` when no
//! credential was presented and `FORBIDDEN` otherwise.

use crate::model::{Caller, Order, Role};
use crate::order_actor::OrderError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// What a verified credential says about its holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub subject: String,
    pub role: Role,
    pub expires_at: Option<DateTime<Utc>>,
}

/// The credential layer. Issuing credentials is someone else's job; this
/// only answers whether a presented token is currently valid.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Option<Claims>;
}

/// In-memory token table for wiring and tests.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    tokens: RwLock<HashMap<String, Claims>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self, token: impl Into<String>, claims: Claims) {
        let mut tokens = self.tokens.write().unwrap_or_else(|e| e.into_inner());
        tokens.insert(token.into(), claims);
    }

    pub fn revoke(&self, token: &str) {
        let mut tokens = self.tokens.write().unwrap_or_else(|e| e.into_inner());
        tokens.remove(token);
    }
}

#[async_trait]
impl CredentialVerifier for TokenRegistry {
    async fn verify(&self, token: &str) -> Option<Claims> {
        let tokens = self.tokens.read().unwrap_or_else(|e| e.into_inner());
        tokens.get(token).cloned()
    }
}

/// Classifies incoming requests.
#[derive(Clone)]
pub struct AccessGuard {
    verifier: Arc<dyn CredentialVerifier>,
}

impl AccessGuard {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { verifier }
    }

    /// Turns an optional bearer token into a [`Caller`].
    ///
    /// Unknown and expired tokens classify as anonymous but still count as a
    /// supplied credential.
    #[tracing::instrument(skip_all)]
    pub async fn authenticate(&self, token: Option<&str>) -> Caller {
        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            return Caller::anonymous();
        };

        match self.verifier.verify(token).await {
            Some(claims) if claims.expires_at.map_or(true, |at| at > Utc::now()) => {
                match claims.role {
                    Role::Admin => Caller::admin(claims.subject),
                    Role::Customer => Caller::customer(claims.subject),
                }
            }
            Some(claims) => {
                tracing::debug!(subject = %claims.subject, "Credential expired");
                Caller {
                    credential_supplied: true,
                    ..Caller::anonymous()
                }
            }
            None => {
                tracing::debug!("Credential rejected");
                Caller {
                    credential_supplied: true,
                    ..Caller::anonymous()
                }
            }
        }
    }
}

/// The error for a caller lacking the required privilege.
pub fn deny(caller: &Caller) -> OrderError {
    if caller.credential_supplied {
        OrderError::Forbidden
    } else {
        OrderError::Unauthorized
    }
}

pub fn require_admin(caller: &Caller) -> Result<(), OrderError> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(deny(caller))
    }
}

/// Any verified customer or admin.
pub fn require_identified(caller: &Caller) -> Result<(), OrderError> {
    match caller.subject() {
        Some(_) => Ok(()),
        None => Err(deny(caller)),
    }
}

/// An admin, or the customer who bought `order`.
pub fn require_buyer_or_admin(caller: &Caller, order: &Order) -> Result<(), OrderError> {
    if caller.is_admin() {
        return Ok(());
    }
    match caller.subject() {
        Some(subject) if order.is_bought_by(subject) => Ok(()),
        _ => Err(deny(caller)),
    }
}
