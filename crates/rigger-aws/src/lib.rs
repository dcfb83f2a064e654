//! AWS adapters for rigger
//!
//! Implements the control-plane seams of `rigger-build` on top of the AWS SDK:
//!
//! - **ECR**: authorization tokens, repository lookup and creation
//! - **SSM Parameter Store**: encrypted source-repository credentials

pub mod config;
pub mod ecr;
pub mod ssm;

pub use config::{DEFAULT_REGION, load_sdk_config};
pub use ecr::EcrRegistry;
pub use ssm::SsmSecretStore;
