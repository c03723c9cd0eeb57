//! Device identity and telemetry salt generation

use crate::effects::RandomEffects;

/// Bytes of entropy in a telemetry salt.
pub const SALT_BYTES: usize = 32;

/// Fresh telemetry salt: 32 random bytes as 64 lowercase hex characters.
pub async fn generate_salt<R: RandomEffects + ?Sized>(random: &R) -> String {
    hex::encode(random.random_bytes(SALT_BYTES).await)
}

/// Fresh device id (hyphenated UUID v4).
pub async fn generate_device_id<R: RandomEffects + ?Sized>(random: &R) -> String {
    random.new_uuid().await.to_string()
}

/// Whether `salt` has the shape produced by [`generate_salt`].
pub fn is_valid_salt(salt: &str) -> bool {
    salt.len() == SALT_BYTES * 2 && salt.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}
