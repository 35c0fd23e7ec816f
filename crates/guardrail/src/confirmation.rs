//! Confirmation token protocol.
//!
//! A map of `operation_id -> slot`, protected by a mutex, pruned on every
//! verify. The fingerprint is canonical JSON (stable key ordering via
//! `BTreeMap`) of the action's identifying fields, so serialization order
//! never causes a spurious mismatch.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use ayati_domain::ids::OperationId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Build a canonical fingerprint from sorted `(key, value)` pairs.
    pub fn new(fields: &[(&str, &str)]) -> Self {
        let map: BTreeMap<&str, &str> = fields.iter().copied().collect();
        Self(serde_json::to_string(&map).unwrap_or_default())
    }
}

struct Slot {
    fingerprint: Fingerprint,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// Covers unknown operation id, expired slot, and mismatched token
    /// prefix — spec.md's single "distinct error" per mismatch class all
    /// collapse to this one user-facing message.
    ExpiredUnknownOrUsed,
    FingerprintMismatch,
}

impl std::fmt::Display for VerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerifyError::ExpiredUnknownOrUsed => write!(f, "expired, unknown, or already used"),
            VerifyError::FingerprintMismatch => write!(f, "confirmation does not match the pending operation"),
        }
    }
}

pub struct ConfirmationStore {
    slots: Mutex<std::collections::HashMap<OperationId, Slot>>,
    ttl_secs: u64,
    token_prefix: String,
}

impl ConfirmationStore {
    pub fn new(token_prefix: impl Into<String>, ttl_secs: u64) -> Self {
        Self { slots: Mutex::new(std::collections::HashMap::new()), ttl_secs, token_prefix: token_prefix.into() }
    }

    /// Register a pending operation, returning its id and the token the
    /// caller must echo back.
    pub fn challenge(&self, fingerprint: Fingerprint) -> (OperationId, DateTime<Utc>) {
        let operation_id = OperationId::new();
        let expires_at = Utc::now() + chrono::Duration::seconds(self.ttl_secs as i64);
        self.slots.lock().insert(operation_id, Slot { fingerprint, expires_at });
        (operation_id, expires_at)
    }

    pub fn token_for(&self, operation_id: OperationId) -> String {
        format!("{}{}", self.token_prefix, operation_id)
    }

    /// Verify and consume a token against the fingerprint of the action
    /// being retried. Single-use: the slot is removed only once it actually
    /// matches (or has genuinely expired) — a fingerprint mismatch leaves
    /// it in place so a subsequent retry with the correct fingerprint can
    /// still succeed.
    pub fn verify(&self, token: &str, fingerprint: &Fingerprint) -> Result<(), VerifyError> {
        self.prune_expired();

        let raw = match token.strip_prefix(&self.token_prefix) {
            Some(r) => r,
            None => return Err(VerifyError::ExpiredUnknownOrUsed),
        };
        let operation_id: OperationId = match raw.parse::<uuid::Uuid>() {
            Ok(u) => u.into(),
            Err(_) => return Err(VerifyError::ExpiredUnknownOrUsed),
        };

        let mut slots = self.slots.lock();
        let snapshot = slots.get(&operation_id).map(|s| (s.expires_at, s.fingerprint.clone()));
        let (expires_at, stored_fingerprint) = match snapshot {
            Some(v) => v,
            None => return Err(VerifyError::ExpiredUnknownOrUsed),
        };

        if expires_at < Utc::now() {
            slots.remove(&operation_id);
            return Err(VerifyError::ExpiredUnknownOrUsed);
        }
        if stored_fingerprint != *fingerprint {
            return Err(VerifyError::FingerprintMismatch);
        }

        slots.remove(&operation_id);
        Ok(())
    }

    fn prune_expired(&self) {
        let now = Utc::now();
        self.slots.lock().retain(|_, slot| slot.expires_at >= now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_exactly_once() {
        let store = ConfirmationStore::new("CONFIRM:", 60);
        let fp = Fingerprint::new(&[("action", "delete"), ("path", "/tmp/f")]);
        let (op_id, _) = store.challenge(fp.clone());
        let token = store.token_for(op_id);

        assert!(store.verify(&token, &fp).is_ok());
        let second = store.verify(&token, &fp).unwrap_err();
        assert_eq!(second, VerifyError::ExpiredUnknownOrUsed);
    }

    #[test]
    fn fingerprint_mismatch_is_distinct_error() {
        let store = ConfirmationStore::new("CONFIRM:", 60);
        let fp = Fingerprint::new(&[("action", "delete"), ("path", "/tmp/f")]);
        let (op_id, _) = store.challenge(fp.clone());
        let token = store.token_for(op_id);

        let other_fp = Fingerprint::new(&[("action", "delete"), ("path", "/tmp/other")]);
        assert_eq!(store.verify(&token, &other_fp).unwrap_err(), VerifyError::FingerprintMismatch);

        // a mismatching attempt must not consume the slot — retrying with
        // the correct fingerprint afterward still succeeds.
        assert!(store.verify(&token, &fp).is_ok());
    }

    #[test]
    fn expired_slot_fails() {
        let store = ConfirmationStore::new("CONFIRM:", 0);
        let fp = Fingerprint::new(&[("action", "delete")]);
        let (op_id, _) = store.challenge(fp.clone());
        let token = store.token_for(op_id);
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(store.verify(&token, &fp).unwrap_err(), VerifyError::ExpiredUnknownOrUsed);
    }
}
