//! SAML binding error types.
//!
//! Errors are grouped by how callers must react: configuration errors are
//! caller misuse and fatal, decode errors reject the inbound message, trust
//! and signature errors fail closed.

use thiserror::Error;

/// Result type for SAML binding operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML binding and trust errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// Caller misconfiguration (no destination, no issuer, no datastore).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64Decode(String),

    /// Deflate compression or decompression error.
    #[error("deflate error: {0}")]
    Deflate(String),

    /// Malformed inbound framing (unknown encoding, invalid UTF-8, missing
    /// parameters).
    #[error("decode error: {0}")]
    Decode(String),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// Unknown or unsupported binding URN.
    #[error("unsupported binding: {0}")]
    UnsupportedBinding(String),

    /// The binding of an inbound exchange could not be determined.
    #[error("unable to determine binding: {0}")]
    BindingDetection(String),

    /// Trust material could not be resolved (no keys found when required,
    /// unresolvable peer metadata, no matching endpoint).
    #[error("trust resolution error: {0}")]
    TrustResolution(String),

    /// Signature verification failed or the key class did not match.
    #[error("signature validation failed: {0}")]
    SignatureInvalid(String),

    /// Signature creation failed.
    #[error("signature creation failed: {0}")]
    SignatureCreation(String),

    /// The artifact resolution round trip reported a non-success status.
    #[error("error from ArtifactResolutionService: {0}")]
    ArtifactResolution(String),

    /// An empty artifact resolution response, typically a replayed artifact.
    #[error("replay suspected: {0}")]
    ReplaySuspected(String),

    /// SOAP transport or envelope error.
    #[error("SOAP error: {0}")]
    Soap(String),

    /// Artifact store backend error.
    #[error("store error: {0}")]
    Store(String),

    /// Cryptographic operation error.
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl SamlError {
    /// Returns the HTTP status code an endpoint should answer with for this
    /// error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::Base64Decode(_)
            | Self::Deflate(_)
            | Self::Decode(_)
            | Self::XmlParse(_)
            | Self::UnsupportedBinding(_)
            | Self::BindingDetection(_) => 400,
            Self::SignatureInvalid(_) | Self::ReplaySuspected(_) => 401,
            Self::TrustResolution(_) => 404,
            Self::Configuration(_)
            | Self::SignatureCreation(_)
            | Self::ArtifactResolution(_)
            | Self::Soap(_)
            | Self::Store(_)
            | Self::Crypto(_) => 500,
        }
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Base64Decode(err.to_string())
    }
}

impl From<std::io::Error> for SamlError {
    fn from(err: std::io::Error) -> Self {
        Self::Deflate(err.to_string())
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<saml_crypto::CryptoError> for SamlError {
    fn from(err: saml_crypto::CryptoError) -> Self {
        Self::Crypto(err.to_string())
    }
}
