//! Resource topology for the S3 Explorer.
//!
//! Builds the desired resource graph for either identity variant, renders it
//! as a CloudFormation template and turns a deployed stack's outputs into the
//! client configuration.
pub mod config;
pub mod outputs;
pub mod props;
pub mod publish;
pub mod resources;
pub mod setup_page;
pub mod stack;

pub use outputs::{ClientConfigDocument, DeployedOutputs, OutputKey, StackOutput};
pub use props::{IdentitySource, StackContext, StackProps};
pub use stack::ExplorerStack;
