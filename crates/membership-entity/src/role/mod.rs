//! Role and role assignment entities.

pub mod assignment;
pub mod model;

pub use assignment::RoleAssignment;
pub use model::Role;
