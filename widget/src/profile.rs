//! Per-visitor preference profile and its persistence.
//!
//! A visitor identifier is generated once per storage and never changes; the
//! profile lives under a key namespaced by that identifier. The model updates
//! the profile by embedding a partial [`ProfileDelta`] in its replies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::storage::{StorageError, StorageRef};

/// Key of the chat history written by older widget versions; always cleared.
pub const LEGACY_HISTORY_KEY: &str = "chatHistory";

/// Prefix of generated visitor identifiers
const VISITOR_ID_PREFIX: &str = "miryu_";

/// Preferences learned about a visitor. `None` means unknown.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub likes_fries: Option<bool>,
    #[serde(default)]
    pub likes_spicy: Option<bool>,
    #[serde(default)]
    pub preferred_drink: Option<String>,
    #[serde(default)]
    pub is_health_conscious: Option<bool>,
    #[serde(default)]
    pub visit_count: u32,
    #[serde(default)]
    pub last_visit_at: Option<DateTime<Utc>>,
    /// Keys the model sent that the widget does not know about
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Overwrite exactly the keys present in `delta`
    pub fn merge(&mut self, delta: &ProfileDelta) {
        if let Some(value) = delta.likes_fries {
            self.likes_fries = value;
        }
        if let Some(value) = delta.likes_spicy {
            self.likes_spicy = value;
        }
        if let Some(value) = &delta.preferred_drink {
            self.preferred_drink = value.clone();
        }
        if let Some(value) = delta.is_health_conscious {
            self.is_health_conscious = value;
        }
        if let Some(value) = delta.visit_count {
            self.visit_count = value;
        }
        if let Some(value) = delta.last_visit_at {
            self.last_visit_at = value;
        }
        for (key, value) in &delta.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }

    /// True when no preference is known (visit bookkeeping aside)
    pub fn has_no_preferences(&self) -> bool {
        self.likes_fries.is_none()
            && self.likes_spicy.is_none()
            && self.preferred_drink.as_deref().map_or(true, str::is_empty)
            && self.is_health_conscious.is_none()
    }
}

/// Partial profile update. The outer `Option` tells whether the key was
/// present; the inner one carries an explicit `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProfileDelta {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub likes_fries: Option<Option<bool>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub likes_spicy: Option<Option<bool>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub preferred_drink: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub is_health_conscious: Option<Option<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit_count: Option<u32>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub last_visit_at: Option<Option<DateTime<Utc>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProfileDelta {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Deserialize a field that is present (possibly `null`) into `Some(..)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Visitor identifier plus the profile persisted under it.
#[derive(Debug)]
pub struct ProfileStore {
    storage: StorageRef,
    namespace: String,
    visitor_id: String,
    profile: UserProfile,
}

impl ProfileStore {
    /// Resolve (or generate) the visitor identifier and load the stored
    /// profile. Does not count a visit; see [`ProfileStore::record_visit`].
    pub fn open(storage: StorageRef, namespace: impl Into<String>) -> Result<Self, StorageError> {
        let namespace = namespace.into();
        let id_key = user_id_key(&namespace);

        let visitor_id = match storage.get_item(&id_key)? {
            Some(id) if !id.trim().is_empty() => id,
            _ => {
                let id = format!("{}{}", VISITOR_ID_PREFIX, Uuid::new_v4());
                storage.set_item(&id_key, &id)?;
                info!(visitor_id = %id, "Generated visitor id");
                id
            }
        };

        let mut store = Self {
            storage,
            namespace,
            visitor_id,
            profile: UserProfile::default(),
        };
        store.profile = store.load()?;
        Ok(store)
    }

    pub fn visitor_id(&self) -> &str {
        &self.visitor_id
    }

    /// In-memory copy of the profile
    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    /// Storage key of this visitor's profile
    pub fn profile_key(&self) -> String {
        profile_key(&self.namespace, &self.visitor_id)
    }

    /// Persisted profile, or defaults when nothing (or garbage) is stored
    pub fn load(&self) -> Result<UserProfile, StorageError> {
        let Some(raw) = self.storage.get_item(&self.profile_key())? else {
            return Ok(UserProfile::default());
        };

        match serde_json::from_str::<UserProfile>(&raw) {
            Ok(profile) => Ok(profile),
            Err(e) => {
                warn!(error = %e, "Profile parse error, starting from defaults");
                Ok(UserProfile::default())
            }
        }
    }

    /// Overwrite the stored profile
    pub fn save(&mut self, profile: UserProfile) -> Result<(), StorageError> {
        self.profile = profile;
        self.persist()
    }

    fn persist(&self) -> Result<(), StorageError> {
        let json = serde_json::to_string(&self.profile)
            .map_err(|e| StorageError::Backend(format!("Failed to serialize profile: {}", e)))?;
        self.storage.set_item(&self.profile_key(), &json)
    }

    /// Remove the stored profile and revert the in-memory copy to defaults
    pub fn reset(&mut self) -> Result<(), StorageError> {
        self.storage.remove_item(&self.profile_key())?;
        self.profile = UserProfile::default();
        info!(visitor_id = %self.visitor_id, "Profile reset");
        Ok(())
    }

    /// Merge a delta (last write wins per key) and persist immediately
    pub fn apply_delta(&mut self, delta: &ProfileDelta) -> Result<(), StorageError> {
        self.profile.merge(delta);
        debug!(?delta, "Applied profile delta");
        self.persist()
    }

    /// Count one page load
    pub fn record_visit(&mut self, now: DateTime<Utc>) -> Result<(), StorageError> {
        self.profile.visit_count = self.profile.visit_count.saturating_add(1);
        self.profile.last_visit_at = Some(now);
        self.persist()?;
        info!(visit_count = self.profile.visit_count, "User profile loaded");
        Ok(())
    }

    /// Drop the chat history older widget versions kept in storage
    pub fn clear_legacy_history(&self) -> Result<(), StorageError> {
        self.storage.remove_item(LEGACY_HISTORY_KEY)
    }
}

/// Storage key of the visitor identifier
pub fn user_id_key(namespace: &str) -> String {
    format!("{}_user_id", namespace)
}

/// Storage key of a visitor's profile
pub fn profile_key(namespace: &str, visitor_id: &str) -> String {
    format!("{}_profile_{}", namespace, visitor_id)
}
