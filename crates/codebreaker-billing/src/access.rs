//! Free-trial / subscription access gating.

use chrono::{DateTime, TimeDelta, Utc};
use codebreaker_store::KeyValueStore;
use serde::{Deserialize, Serialize};

use crate::{BillingError, Plan, UserId};

/// Key holding the JSON entitlement record.
pub const ENTITLEMENT_KEY: &str = "codebreaker_entitlement";

/// What the user is entitled to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    /// Set once a subscription has been activated.
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub trial_started_at: DateTime<Utc>,
    #[serde(default)]
    pub plan: Option<Plan>,
    #[serde(default)]
    pub activated_at: Option<DateTime<Utc>>,
}

/// Access level derived from an entitlement at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessStatus {
    /// Inside the free trial; `days_left` counts partial days as whole.
    Trial {
        ends_at: DateTime<Utc>,
        days_left: i64,
    },
    Subscribed {
        plan: Plan,
    },
    /// Trial over and no subscription.
    Expired,
}

impl AccessStatus {
    pub fn allows_rescue(&self) -> bool {
        !matches!(self, Self::Expired)
    }
}

impl Entitlement {
    pub fn start_trial(now: DateTime<Utc>) -> Self {
        Self {
            user_id: None,
            trial_started_at: now,
            plan: None,
            activated_at: None,
        }
    }

    /// Record a successful activation.
    pub fn activate(&mut self, user: UserId, plan: Plan, now: DateTime<Utc>) {
        self.user_id = Some(user);
        self.plan = Some(plan);
        self.activated_at = Some(now);
    }

    pub fn status(&self, now: DateTime<Utc>, trial_days: u32) -> AccessStatus {
        if let Some(plan) = self.plan {
            return AccessStatus::Subscribed { plan };
        }

        let ends_at = self.trial_started_at + TimeDelta::days(i64::from(trial_days));
        if now >= ends_at {
            return AccessStatus::Expired;
        }

        let remaining = ends_at - now;
        let mut days_left = remaining.num_days();
        if remaining > TimeDelta::days(days_left) {
            days_left += 1;
        }
        AccessStatus::Trial { ends_at, days_left }
    }
}

/// Persists the entitlement alongside, but separately from, session data.
///
/// Clearing session history does not reset the trial.
#[derive(Debug)]
pub struct EntitlementStore<K> {
    kv: K,
}

impl<K: KeyValueStore> EntitlementStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    pub fn load(&self) -> Result<Option<Entitlement>, BillingError> {
        match self.kv.get(ENTITLEMENT_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn save(&mut self, entitlement: &Entitlement) -> Result<(), BillingError> {
        let json = serde_json::to_string(entitlement)?;
        self.kv.set(ENTITLEMENT_KEY, &json)?;
        Ok(())
    }

    /// Load the entitlement, starting the trial on first use.
    ///
    /// An unreadable record is replaced with a trial starting now.
    pub fn load_or_start_trial(&mut self, now: DateTime<Utc>) -> Result<Entitlement, BillingError> {
        match self.load() {
            Ok(Some(entitlement)) => return Ok(entitlement),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Unreadable entitlement, starting a new trial"),
        }

        let entitlement = Entitlement::start_trial(now);
        self.save(&entitlement)?;
        tracing::info!(trial_started_at = %now, "Free trial started");
        Ok(entitlement)
    }
}
