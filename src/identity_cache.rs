//! Opaque collaborator required by the S3 Express signers.
//!
//! Out of scope per spec §1 ("event/plug-in systems used only to wire
//! signers into the outer client"): this crate only needs to know that an
//! identity cache exists and can be passed through, not how it refreshes
//! S3 Express session credentials.

/// Marker trait for the S3 Express identity-cache collaborator. Signers that
/// declare `requires_identity_cache` take `Arc<dyn IdentityCache>` but never
/// call into it — refreshing S3 Express session credentials is the outer
/// client's job.
pub trait IdentityCache: Send + Sync {}
