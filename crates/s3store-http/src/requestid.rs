//! Request-id and `x-amz-id-2` generation (`spec.md` §6).

use rand::RngCore;

/// A short printable identifier, one per request. Chosen by the dispatcher
/// and propagated into every response — success or error — as
/// `x-amz-request-id`.
#[must_use]
pub fn generate_request_id() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes).to_uppercase()
}

/// `x-amz-id-2`, of the form `<request-id>-<4digit-random>`.
#[must_use]
pub fn generate_amz_id2(request_id: &str) -> String {
    let suffix = rand::thread_rng().next_u32() % 10_000;
    format!("{request_id}-{suffix:04}")
}
