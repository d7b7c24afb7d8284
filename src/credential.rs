//! Process-wide API credential holder
//!
//! The store is injected into the engine rather than read from ambient
//! global state. Cloning it yields another handle to the same slot.

use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::error::ValidationError;

/// Opaque API credential. Never blank, never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Trims the raw value and rejects blank input
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::BlankCredential);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Clone, Default)]
pub struct CredentialStore {
    slot: Arc<RwLock<Option<Credential>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `credential`, if any
    pub fn seeded(credential: Option<Credential>) -> Self {
        let store = Self::new();
        if let Some(credential) = credential {
            store.set(credential);
        }
        store
    }

    pub fn get(&self) -> Option<Credential> {
        match self.slot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set(&self, credential: Credential) {
        let mut guard = match self.slot.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(credential);
        info!("🔑 [CREDENTIAL] API key updated");
    }

    pub fn clear(&self) {
        let mut guard = match self.slot.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.take().is_some() {
            info!("🔑 [CREDENTIAL] API key cleared");
        }
    }

    pub fn is_configured(&self) -> bool {
        self.get().is_some()
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("configured", &self.is_configured())
            .finish()
    }
}
