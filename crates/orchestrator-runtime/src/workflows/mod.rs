//! # Workflows
//!
//! Inbound entry points. Each returns a [`WorkflowResponse`].

pub mod admin;
pub mod deploy;
pub mod errors;
pub mod response;
pub mod roles;

pub use admin::{AdminRecord, AdminWorkflows, ADMINS};
pub use deploy::{DeployCommand, WorkflowApi, DEPLOYMENTS};
pub use errors::WorkflowError;
pub use response::WorkflowResponse;
pub use roles::ROLE_MANAGER_ABI;
