use chrono::Utc;
use rand::{distributions::Uniform, Rng};

use crate::db_types::OrderNumber;

const PREFIX: &str = "CD";
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SUFFIX_LEN: usize = 6;

/// Generates a new order number: `CD`, the last six digits of the current millisecond timestamp, and six random
/// characters from `[A-Z0-9]`, e.g. `CD482913K7Q2ZD`.
///
/// Numbers are not guaranteed to be unique. The ledger enforces uniqueness and draws again on a collision.
pub fn new_order_number() -> OrderNumber {
    let millis = Utc::now().timestamp_millis().rem_euclid(1_000_000);
    let mut rng = rand::thread_rng();
    let dist = Uniform::from(0..ALPHABET.len());
    let suffix: String = (0..SUFFIX_LEN).map(|_| ALPHABET[rng.sample(dist)] as char).collect();
    OrderNumber(format!("{PREFIX}{millis:06}{suffix}"))
}
