mod money;
mod secret;

pub use money::{Money, MoneyParseError};
pub use secret::Secret;
