//! Request-signing core for an AWS-style client: SigV2, SigV3, the SigV4
//! family (including the S3 and S3 Express overlays), and bearer-token
//! auth, behind one uniform [`signer::Signer`] contract.
//!
//! This crate signs requests; it does not build or send them. A caller
//! constructs a [`request::SignableRequest`] from whatever HTTP client type
//! it already has, hands it to a signer chosen via [`registry`], and reads
//! the mutated headers/URL/body back off afterward.

pub mod canonical;
pub mod clock;
pub mod context;
pub mod credentials;
pub mod derive;
pub mod error;
pub mod identity_cache;
pub mod registry;
pub mod request;
pub mod signer;
pub mod timestamp;
pub mod util;

pub use credentials::{AuthToken, Credentials, SecretString};
pub use error::SignerError;
pub use registry::{construct_signer, resolve_auth_type, SignerParams};
pub use request::SignableRequest;
pub use signer::{Signer, SignerCapabilities};
