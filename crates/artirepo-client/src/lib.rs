//! artirepo Client - Artifactory REST access and the repository lifecycle
//!
//! This crate provides:
//! - Provider configuration from YAML and the environment
//! - Access token, API key and basic credentials
//! - A `RestClient` seam with a reqwest implementation and an in-memory mock
//! - `RepositoryService` for create, read, update and delete of any variant

pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod mock;
pub mod service;

pub use config::ProviderConfig;
pub use credentials::Credentials;
pub use error::{ClientError, Result};
pub use http::{ApiRequest, ApiResponse, HttpRestClient, Method, RestClient};
pub use mock::{MockRestClient, OperationCounts};
pub use service::RepositoryService;
