use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::{Display, IntoStaticStr};

#[cfg(test)]
#[path = "factors_test.rs"]
mod factors_test;

/// TOTP step width in seconds.
const TOTP_STEP_SECS: u64 = 30;
/// Allowed clock skew, in steps, on either side of the current step.
const TOTP_SKEW_STEPS: u64 = 1;

/// The kind of second factor backing an enrollment.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum FactorType {
    Totp,
    Webauthn,
    BackupCode,
    Sms,
}

/// Enrollment lifecycle; only `Active` enrollments can produce proofs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum FactorStatus {
    Pending,
    Active,
    Revoked,
}

/// One enrolled factor of an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorEnrollment {
    pub factor_id: String,
    pub factor_type: FactorType,
    pub status: FactorStatus,
    /// Relative strength; challenge creation prefers the highest.
    pub security_level: u8,
    /// Unix seconds at enrollment.
    pub enrolled_at: u64,
    /// Unix seconds of the last successful verification, if any.
    pub verified_at: Option<u64>,
    /// SHA-256 digest of the factor secret (TOTP seed or backup code).
    pub secret_digest: [u8; 32],
    /// The raw TOTP seed; present for TOTP enrollments only.
    pub totp_seed: Option<Vec<u8>>,
}

impl FactorEnrollment {
    pub fn is_active(&self) -> bool {
        self.status == FactorStatus::Active
    }

    /// Whether `response` proves possession of this factor at `unix_now`.
    pub fn verify_response(&self, response: &[u8], unix_now: u64) -> bool {
        match self.factor_type {
            FactorType::Totp => {
                let Some(seed) = &self.totp_seed else {
                    return false;
                };
                let step = unix_now / TOTP_STEP_SECS;
                (step.saturating_sub(TOTP_SKEW_STEPS)..=step + TOTP_SKEW_STEPS)
                    .any(|s| totp_code(seed, s).as_bytes() == response)
            }
            // Backup codes, SMS codes and WebAuthn assertions are verified
            // against the stored digest of the shared secret.
            FactorType::BackupCode | FactorType::Sms | FactorType::Webauthn => {
                let digest: [u8; 32] = Sha256::digest(response).into();
                digest == self.secret_digest
            }
        }
    }
}

/// The 6-digit HMAC-SHA256 code for a TOTP seed at the given step.
pub fn totp_code(seed: &[u8], step: u64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(seed).expect("hmac accepts any key length");
    mac.update(&step.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // Dynamic truncation per RFC 4226 §5.3.
    let offset = usize::from(digest[digest.len() - 1] & 0x0f);
    let binary = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);
    format!("{:06}", binary % 1_000_000)
}

/// Digest helper for provisioning enrollments.
pub fn secret_digest(secret: &[u8]) -> [u8; 32] {
    Sha256::digest(secret).into()
}
