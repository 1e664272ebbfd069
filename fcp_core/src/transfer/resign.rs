//! Re-signing records under a new signer.
//!
//! The content hash is derived from `data` alone, so it is never recomputed:
//! only `signature` and `signer` change. The record keeps its identity on the
//! hub while its authorship moves to the new key.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::record::{Record, SignatureScheme};

/// What [`resign`] did to a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResignOutcome {
    Resigned,
    /// The record uses a scheme that cannot be resigned and was left as is
    Skipped(SignatureScheme),
}

/// Replace the signature and signer of `record` with ones produced by `key`.
pub fn resign(record: &mut Record, key: &SigningKey) -> ResignOutcome {
    if record.signature_scheme != SignatureScheme::Ed25519 {
        tracing::warn!(
            "Not resigning {}: unsupported signature scheme {}",
            record.hash,
            record.signature_scheme
        );
        return ResignOutcome::Skipped(record.signature_scheme);
    }

    let signature = key.sign(record.hash.as_bytes());
    record.signature = signature.to_bytes().to_vec();
    record.signer = key.verifying_key().to_bytes().to_vec();
    ResignOutcome::Resigned
}

/// Check that `record.signature` is a valid Ed25519 signature of its hash by
/// `record.signer`. Transfers never call this; hub implementations may.
pub fn verify(record: &Record) -> bool {
    if record.signature_scheme != SignatureScheme::Ed25519 {
        return false;
    }
    let Ok(public_key) = <[u8; 32]>::try_from(record.signer.as_slice()) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key) else {
        tracing::trace!("verify: invalid public key bytes");
        return false;
    };
    let Ok(signature) = Signature::from_slice(&record.signature) else {
        return false;
    };
    verifying_key
        .verify(record.hash.as_bytes(), &signature)
        .is_ok()
}
