//! Request dispatch by operation key.

pub mod registry;
pub mod types;

pub use registry::{
    Handler, HandlerFuture, OperationRegistry, PERFORM_CHANGE_PASSWORD, PERFORM_LOGIN,
    PERFORM_LOGOUT, PERFORM_REGISTER,
};
pub use types::{Request, Response};
