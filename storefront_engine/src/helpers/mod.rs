mod order_number;
mod signature;

pub use order_number::new_order_number;
pub use signature::{sign, sign_payment, SignatureError, SignatureVerifier};
