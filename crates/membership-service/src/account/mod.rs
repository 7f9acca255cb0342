//! Account lifecycle services.

pub mod admin;
pub mod service;

pub use admin::AdminAccountService;
pub use service::{
    AccountService, ChangePasswordRequest, ChangePasswordResponse, GENERIC_LOGIN_FAILURE,
    LoginResponse, RegisterRequest, RegisterResponse,
};
