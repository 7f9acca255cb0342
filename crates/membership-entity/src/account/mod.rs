//! Account domain entities.

pub mod ip;
pub mod model;

pub use ip::AccountIp;
pub use model::{Account, CreateAccount, FailureWindow};
