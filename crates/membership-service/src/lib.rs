//! # membership-service
//!
//! Account lifecycle services for the membership engine. Each service
//! orchestrates the credential, lockout, role, and session components to
//! implement one application-level use case.
//!
//! Services follow constructor injection. All dependencies are provided
//! at construction time via `Arc` references. [`MembershipEngine`] wires
//! the whole graph from a store, an audit sink, a clock, and the
//! configuration.

pub mod account;
pub mod context;
pub mod engine;
pub mod operation;

pub use account::{AccountService, AdminAccountService};
pub use context::RequestContext;
pub use engine::MembershipEngine;
pub use operation::{OperationRegistry, Request, Response};
