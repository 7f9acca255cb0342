//! Roles and temporal role membership.

pub mod registry;

pub use registry::RoleRegistry;
