//! CodeBreaker Billing: subscription activation and access gating.
//!
//! The payment processor and identity provider are external services.
//! This crate only speaks the activation contract
//! (`POST {userId, plan}` → `{success, plan?, error?}`) and decides,
//! from the stored entitlement, whether the user is in their trial,
//! subscribed, or locked out.

pub mod access;
pub mod client;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use access::{AccessStatus, Entitlement, EntitlementStore, ENTITLEMENT_KEY};
pub use client::{ActivationOutcome, BillingClient, BillingConfig};

/// Errors from billing operations.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("Billing request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected billing response (HTTP {status}): {message}")]
    InvalidResponse { status: u16, message: String },

    #[error("Unknown plan: {0}")]
    UnknownPlan(String),

    #[error("Entitlement storage error: {0}")]
    Storage(#[from] codebreaker_store::KvError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Opaque user identifier issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Subscription plans offered at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Monthly,
    Yearly,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "yearly" | "annual" => Ok(Self::Yearly),
            _ => Err(BillingError::UnknownPlan(s.to_string())),
        }
    }
}
