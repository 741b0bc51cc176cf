//! # Record Signing
//!
//! Both participants sign the canonical encoding of the session record
//! minus the `signatures` and `ledger_proof` fields. Because the
//! canonical encoding is deterministic, both parties, and any later
//! verifier reading the ledger, compute the exact same bytes.
//!
//! Key generation and distribution are outside the substrate; this module
//! consumes the `sign(bytes, key) -> signature` / `verify(bytes,
//! signature, public_key) -> bool` contract and provides an Ed25519
//! implementation of it.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use trustmesh_ledger::canonical;

use crate::models::SessionRecord;
use crate::{Result, SessionError};

/// The bytes a session signature is computed over: the canonical
/// encoding of the record with `signatures` and `ledger_proof` removed.
pub fn signing_bytes(record: &SessionRecord) -> Result<Vec<u8>> {
    let mut value = serde_json::to_value(record)?;
    if let Some(object) = value.as_object_mut() {
        object.remove("signatures");
        object.remove("ledger_proof");
    }
    Ok(canonical::canonicalize(&value).into_bytes())
}

/// An Ed25519 signing identity for one agent.
pub struct Ed25519Signer {
    key: SigningKey,
}

impl Ed25519Signer {
    /// Generates a fresh keypair.
    pub fn generate() -> Self {
        Self {
            key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Restores a signer from its 32-byte secret key.
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(secret),
        }
    }

    /// The hex public key other parties verify against.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.key.verifying_key().to_bytes())
    }

    /// Signs arbitrary bytes, returning the hex signature.
    pub fn sign(&self, bytes: &[u8]) -> String {
        hex::encode(self.key.sign(bytes).to_bytes())
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.debug_struct("Ed25519Signer")
            .field("public_key", &self.public_key_hex())
            .finish()
    }
}

/// Verifies a detached hex signature over bytes against a hex public key.
pub fn verify_detached(bytes: &[u8], signature_hex: &str, public_key_hex: &str) -> bool {
    let Ok(signature_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(signature_array) = <[u8; 64]>::try_from(signature_bytes.as_slice()) else {
        return false;
    };
    let Ok(key_bytes) = hex::decode(public_key_hex) else {
        return false;
    };
    let Ok(key_array) = <[u8; 32]>::try_from(key_bytes.as_slice()) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(&key_array) else {
        return false;
    };
    key.verify(bytes, &Signature::from_bytes(&signature_array))
        .is_ok()
}

/// Verifies one party's stored signature on a record.
///
/// # Errors
///
/// [`SessionError::Signature`] if the signature is absent or does not
/// verify against the given public key.
pub fn verify_record_signature(
    record: &SessionRecord,
    signature: Option<&str>,
    public_key_hex: &str,
) -> Result<()> {
    let signature = signature.ok_or_else(|| SessionError::Signature {
        reason: "signature absent".to_string(),
    })?;
    let bytes = signing_bytes(record)?;
    if verify_detached(&bytes, signature, public_key_hex) {
        Ok(())
    } else {
        Err(SessionError::Signature {
            reason: "signature does not verify against canonical record bytes".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::SessionCoordinator;
    use chrono::Utc;

    fn record() -> SessionRecord {
        SessionCoordinator::new().create("h1", "provider", "requester", "task", 1.0, Utc::now())
    }

    #[test]
    fn test_sign_and_verify_round_trip() {
        let signer = Ed25519Signer::generate();
        let record = record();

        let bytes = signing_bytes(&record).unwrap();
        let signature = signer.sign(&bytes);

        assert!(verify_detached(&bytes, &signature, &signer.public_key_hex()));
        assert!(!verify_detached(b"other bytes", &signature, &signer.public_key_hex()));
    }

    #[test]
    fn test_signing_bytes_exclude_signatures_and_proof() {
        let mut record = record();
        let before = signing_bytes(&record).unwrap();

        record.signatures.provider = Some("aa".repeat(64));
        record.ledger_proof = Some(crate::models::LedgerProof {
            content_id: "cid".to_string(),
            published_at: Utc::now(),
        });
        let after = signing_bytes(&record).unwrap();

        assert_eq!(before, after, "signature fields must not affect signed bytes");
    }

    #[test]
    fn test_signing_bytes_cover_outcome() {
        let mut record = record();
        let before = signing_bytes(&record).unwrap();
        record.outcome.agreed_outcome = Some(0.9);
        let after = signing_bytes(&record).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_verify_record_signature_errors() {
        let record = record();
        // Absent signature.
        let err = verify_record_signature(&record, None, "00").unwrap_err();
        assert!(matches!(err, SessionError::Signature { .. }));

        // Wrong key.
        let signer = Ed25519Signer::generate();
        let other = Ed25519Signer::generate();
        let signature = signer.sign(&signing_bytes(&record).unwrap());
        let err =
            verify_record_signature(&record, Some(&signature), &other.public_key_hex())
                .unwrap_err();
        assert!(matches!(err, SessionError::Signature { .. }));
    }

    #[test]
    fn test_from_secret_is_deterministic() {
        let secret = [7u8; 32];
        let a = Ed25519Signer::from_secret(&secret);
        let b = Ed25519Signer::from_secret(&secret);
        assert_eq!(a.public_key_hex(), b.public_key_hex());
        assert_eq!(a.sign(b"msg"), b.sign(b"msg"));
    }
}
