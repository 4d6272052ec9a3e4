mod paise;

pub mod helpers;
pub mod op;
mod secret;

pub use paise::{Paise, PaiseConversionError, DEFAULT_CURRENCY_CODE};
pub use secret::Secret;
