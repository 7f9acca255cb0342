//! Repository implementations for all membership entities.
//!
//! Repositories are stateless: every function takes the executor to run
//! on, so the same query can run on a plain connection or inside a unit of
//! work. Statements use portable `?` placeholders.

pub mod account;
pub mod account_ip;
pub mod audit;
pub mod credential;
pub mod policy;
pub mod role;
pub mod role_assignment;
pub mod signing_key;

pub use account::AccountRepository;
pub use account_ip::AccountIpRepository;
pub use audit::AuditLogRepository;
pub use credential::CredentialRepository;
pub use policy::PolicyRepository;
pub use role::RoleRepository;
pub use role_assignment::RoleAssignmentRepository;
pub use signing_key::SigningKeyRepository;
