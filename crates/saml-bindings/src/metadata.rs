//! Peer metadata resolution.
//!
//! The Artifact binding identifies the artifact's issuer by the SHA-1 hash
//! of its entity ID embedded in the artifact, then needs that peer's
//! ArtifactResolutionService endpoints and trust keys. Metadata storage
//! itself lives elsewhere; this layer only consumes the narrow
//! [`MetadataResolver`] lookup.

use std::path::PathBuf;

use crate::keys::{CertificateProvider, KeyDescriptor};

/// The protocol role a peer entity plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerRole {
    /// An Identity Provider.
    IdentityProvider,
    /// A Service Provider.
    ServiceProvider,
}

/// Service types addressable inside a peer's metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointService {
    /// The `ArtifactResolutionService` of the peer.
    ArtifactResolution,
}

/// An indexed service endpoint from peer metadata.
#[derive(Debug, Clone)]
pub struct EndpointRef {
    /// The declared endpoint index.
    pub index: u16,
    /// The binding URN the endpoint speaks.
    pub binding: String,
    /// The endpoint location URL.
    pub location: String,
}

/// The subset of a peer's metadata the binding layer consumes.
#[derive(Debug, Clone, Default)]
pub struct PeerMetadata {
    /// The peer's entity ID.
    pub entity_id: String,
    /// Declared `ArtifactResolutionService` endpoints.
    pub artifact_resolution_services: Vec<EndpointRef>,
    /// Declared trust keys.
    pub keys: Vec<KeyDescriptor>,
    /// Inline PEM certificate data, when the deployment configures a bare
    /// certificate instead of key descriptors.
    pub certificate_data: Option<String>,
}

impl PeerMetadata {
    /// Returns the endpoints declared for a service type.
    #[must_use]
    pub fn endpoints(&self, service: EndpointService) -> &[EndpointRef] {
        match service {
            EndpointService::ArtifactResolution => &self.artifact_resolution_services,
        }
    }
}

/// Peer metadata doubles as a trust configuration for signature
/// validation.
impl CertificateProvider for PeerMetadata {
    fn keys(&self) -> Option<Vec<KeyDescriptor>> {
        if self.keys.is_empty() {
            None
        } else {
            Some(self.keys.clone())
        }
    }

    fn certificate_data(&self) -> Option<String> {
        self.certificate_data.clone()
    }

    fn certificate_file(&self) -> Option<PathBuf> {
        None
    }
}

/// Resolves a peer's metadata by the SHA-1 hash of its entity ID.
pub trait MetadataResolver: Send + Sync {
    /// Looks up the peer whose entity-ID hash matches `source_id_hex`
    /// (lowercase hex) in the given role, or `None` if unknown.
    fn config_for_sha1(&self, source_id_hex: &str, role: PeerRole) -> Option<PeerMetadata>;
}
