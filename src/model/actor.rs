use serde::{Deserialize, Serialize};

/// Privilege level carried by a verified credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

/// Who is making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    Customer { subject: String },
    Admin { subject: String },
}

/// The classified actor plus whether any credential was presented.
///
/// The second half decides between `UNAUTHORIZED` (nothing presented) and
/// `FORBIDDEN` (something presented, but not enough).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub actor: Actor,
    pub credential_supplied: bool,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self {
            actor: Actor::Anonymous,
            credential_supplied: false,
        }
    }

    pub fn customer(subject: impl Into<String>) -> Self {
        Self {
            actor: Actor::Customer {
                subject: subject.into(),
            },
            credential_supplied: true,
        }
    }

    pub fn admin(subject: impl Into<String>) -> Self {
        Self {
            actor: Actor::Admin {
                subject: subject.into(),
            },
            credential_supplied: true,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.actor, Actor::Admin { .. })
    }

    /// Subject of the credential, if it verified.
    pub fn subject(&self) -> Option<&str> {
        match &self.actor {
            Actor::Anonymous => None,
            Actor::Customer { subject } | Actor::Admin { subject } => Some(subject),
        }
    }
}
