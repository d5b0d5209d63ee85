use chrono::{DateTime, Utc};
use rand::RngExt;

use rollcall_domain::id::UserId;
use rollcall_domain::purpose::{ATTENDANCE_PREFIX, LOGIN_CODE_DIGITS, Purpose};

use crate::domain::repository::SecretGenerator;
use crate::error::GenerationError;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ATTENDANCE_NONCE_LEN: usize = 20;

/// Thread-local CSPRNG backed generator.
///
/// Attendance secrets embed the issuer and issue instant so a scanned code can be
/// traced back without a lookup; the random tail carries the entropy.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSecretGenerator;

impl SecretGenerator for RandomSecretGenerator {
    fn generate(
        &self,
        purpose: Purpose,
        subject_id: UserId,
        issued_at: DateTime<Utc>,
    ) -> Result<String, GenerationError> {
        let mut rng = rand::rng();
        Ok(match purpose {
            Purpose::Attendance => {
                let nonce: String = (0..ATTENDANCE_NONCE_LEN)
                    .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
                    .collect();
                format!(
                    "{ATTENDANCE_PREFIX}{}_{}_{nonce}",
                    subject_id.0.simple(),
                    issued_at.timestamp_millis()
                )
            }
            Purpose::Login => (0..LOGIN_CODE_DIGITS)
                .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
                .collect(),
        })
    }
}
