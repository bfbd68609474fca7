//! Key and certificate model.
//!
//! Trust configurations expose candidate keys as property mappings
//! ([`KeyDescriptor`]). The loader converts certificate-bearing descriptors
//! into [`X509Key`] values whose certificate text is whitespace-normalized
//! for stable comparison, and collects everything into an ordered
//! [`KeyCollection`].

mod loader;

pub use loader::{CertificateProvider, KeyLoader};

use serde::{Deserialize, Serialize};

use crate::error::{SamlError, SamlResult};

/// The declared key type of an X.509 certificate descriptor.
pub const X509_CERTIFICATE_TYPE: &str = "X509Certificate";

/// Declared purpose of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsage {
    /// Signature creation and verification.
    Signing,
    /// Encryption and decryption.
    Encryption,
}

/// A raw key descriptor from a trust configuration.
///
/// Usage flags are fixed at construction; an absent flag means the key may
/// be used for that purpose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyDescriptor {
    /// The declared key type.
    #[serde(rename = "type", default = "default_key_type")]
    pub key_type: String,

    /// Whether this key may be used for signing.
    #[serde(default)]
    pub signing: Option<bool>,

    /// Whether this key may be used for encryption.
    #[serde(default)]
    pub encryption: Option<bool>,

    /// Inline certificate text, for X.509 descriptors.
    #[serde(rename = "X509Certificate", default)]
    pub x509_certificate: Option<String>,
}

fn default_key_type() -> String {
    X509_CERTIFICATE_TYPE.to_string()
}

impl KeyDescriptor {
    /// Creates a descriptor of the given type with no usage restrictions.
    #[must_use]
    pub fn new(key_type: impl Into<String>) -> Self {
        Self {
            key_type: key_type.into(),
            signing: None,
            encryption: None,
            x509_certificate: None,
        }
    }

    /// Returns true if this key may be used for the given purpose.
    ///
    /// A descriptor with no usage flags at all is usable for everything;
    /// once any flag is declared, undeclared purposes are off.
    #[must_use]
    pub fn can_be_used_for(&self, usage: KeyUsage) -> bool {
        let flag = match usage {
            KeyUsage::Signing => self.signing,
            KeyUsage::Encryption => self.encryption,
        };
        match flag {
            Some(allowed) => allowed,
            None => self.signing.is_none() && self.encryption.is_none(),
        }
    }
}

/// An X.509 certificate key.
///
/// The certificate body is stored with all whitespace removed so that two
/// renderings of the same certificate compare and hash identically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X509Key {
    signing: bool,
    encryption: bool,
    certificate_data: String,
}

impl X509Key {
    /// Builds a key from raw certificate text, tagged for both signing and
    /// encryption use.
    ///
    /// All whitespace runs are removed from the certificate body.
    #[must_use]
    pub fn from_certificate_data(raw: &str) -> Self {
        Self {
            signing: true,
            encryption: true,
            certificate_data: raw.chars().filter(|c| !c.is_whitespace()).collect(),
        }
    }

    /// Builds a key from an X.509 descriptor, preserving its usage flags.
    ///
    /// Returns `None` if the descriptor carries no certificate text.
    #[must_use]
    pub fn from_descriptor(descriptor: &KeyDescriptor) -> Option<Self> {
        let raw = descriptor.x509_certificate.as_deref()?;
        Some(Self {
            signing: descriptor.can_be_used_for(KeyUsage::Signing),
            encryption: descriptor.can_be_used_for(KeyUsage::Encryption),
            certificate_data: raw.chars().filter(|c| !c.is_whitespace()).collect(),
        })
    }

    /// Returns true if this key may be used for the given purpose.
    #[must_use]
    pub const fn can_be_used_for(&self, usage: KeyUsage) -> bool {
        match usage {
            KeyUsage::Signing => self.signing,
            KeyUsage::Encryption => self.encryption,
        }
    }

    /// Returns the whitespace-normalized certificate body.
    #[must_use]
    pub fn certificate_data(&self) -> &str {
        &self.certificate_data
    }

    /// Re-wraps the normalized certificate body into PEM framing for the
    /// crypto collaborator.
    #[must_use]
    pub fn certificate_pem(&self) -> String {
        let mut pem = String::from("-----BEGIN CERTIFICATE-----\n");
        for chunk in self.certificate_data.as_bytes().chunks(64) {
            pem.push_str(std::str::from_utf8(chunk).unwrap_or_default());
            pem.push('\n');
        }
        pem.push_str("-----END CERTIFICATE-----\n");
        pem
    }

    /// Decodes the certificate body into DER.
    pub fn certificate_der(&self) -> SamlResult<Vec<u8>> {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(&self.certificate_data)
            .map_err(|e| SamlError::Base64Decode(format!("Invalid certificate data: {e}")))
    }
}

/// A candidate key produced by the loader.
#[derive(Debug, Clone)]
pub enum CandidateKey {
    /// An X.509 certificate key.
    X509(X509Key),
    /// Any other key type, kept for diagnostics.
    Other(KeyDescriptor),
}

impl CandidateKey {
    /// Returns the declared key type.
    #[must_use]
    pub fn key_type(&self) -> &str {
        match self {
            Self::X509(_) => X509_CERTIFICATE_TYPE,
            Self::Other(descriptor) => &descriptor.key_type,
        }
    }

    /// Returns true if this key may be used for the given purpose.
    #[must_use]
    pub fn can_be_used_for(&self, usage: KeyUsage) -> bool {
        match self {
            Self::X509(key) => key.can_be_used_for(usage),
            Self::Other(descriptor) => descriptor.can_be_used_for(usage),
        }
    }
}

/// An ordered, append-only sequence of candidate keys.
///
/// Iteration order is discovery order: configuration-declared keys first,
/// then inline certificate data, then certificate-file-derived keys.
#[derive(Debug, Clone, Default)]
pub struct KeyCollection {
    keys: Vec<CandidateKey>,
}

impl KeyCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a key.
    pub fn push(&mut self, key: CandidateKey) {
        self.keys.push(key);
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if the collection holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterates the keys in discovery order.
    pub fn iter(&self) -> std::slice::Iter<'_, CandidateKey> {
        self.keys.iter()
    }
}

impl IntoIterator for KeyCollection {
    type Item = CandidateKey;
    type IntoIter = std::vec::IntoIter<CandidateKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.into_iter()
    }
}

impl<'a> IntoIterator for &'a KeyCollection {
    type Item = &'a CandidateKey;
    type IntoIter = std::slice::Iter<'a, CandidateKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_usage_flag_defaults_to_allowed() {
        let descriptor = KeyDescriptor::new(X509_CERTIFICATE_TYPE);
        assert!(descriptor.can_be_used_for(KeyUsage::Signing));
        assert!(descriptor.can_be_used_for(KeyUsage::Encryption));
    }

    #[test]
    fn explicit_usage_flag_is_honored() {
        let descriptor = KeyDescriptor {
            signing: Some(true),
            encryption: Some(false),
            ..KeyDescriptor::new(X509_CERTIFICATE_TYPE)
        };
        assert!(descriptor.can_be_used_for(KeyUsage::Signing));
        assert!(!descriptor.can_be_used_for(KeyUsage::Encryption));
    }

    #[test]
    fn declaring_one_usage_excludes_the_other() {
        let descriptor = KeyDescriptor {
            encryption: Some(true),
            ..KeyDescriptor::new(X509_CERTIFICATE_TYPE)
        };
        assert!(descriptor.can_be_used_for(KeyUsage::Encryption));
        assert!(!descriptor.can_be_used_for(KeyUsage::Signing));
    }

    #[test]
    fn certificate_data_is_whitespace_normalized() {
        let key = X509Key::from_certificate_data("MIIB\n  Cg==\r\n\tQUJD");
        assert_eq!(key.certificate_data(), "MIIBCg==QUJD");
    }

    #[test]
    fn certificate_pem_has_no_internal_whitespace_in_body() {
        let body = "A".repeat(100);
        let key = X509Key::from_certificate_data(&format!("{}\n{}", &body[..50], &body[50..]));
        let pem = key.certificate_pem();

        assert!(pem.starts_with("-----BEGIN CERTIFICATE-----\n"));
        assert!(pem.ends_with("-----END CERTIFICATE-----\n"));
        for line in pem.lines().filter(|l| !l.starts_with("-----")) {
            assert!(line.len() <= 64);
            assert!(!line.contains(char::is_whitespace));
        }
    }

    #[test]
    fn from_certificate_data_tags_both_usages() {
        let key = X509Key::from_certificate_data("QUJD");
        assert!(key.can_be_used_for(KeyUsage::Signing));
        assert!(key.can_be_used_for(KeyUsage::Encryption));
    }

    #[test]
    fn descriptor_deserializes_from_configuration_shape() {
        let descriptor: KeyDescriptor = serde_json::from_str(
            r#"{"type": "X509Certificate", "signing": true, "X509Certificate": "QUJD"}"#,
        )
        .unwrap();
        assert_eq!(descriptor.key_type, X509_CERTIFICATE_TYPE);
        assert_eq!(descriptor.signing, Some(true));
        assert_eq!(descriptor.encryption, None);
        assert_eq!(descriptor.x509_certificate.as_deref(), Some("QUJD"));
    }

    #[test]
    fn collection_preserves_insertion_order() {
        let mut collection = KeyCollection::new();
        collection.push(CandidateKey::Other(KeyDescriptor::new("first")));
        collection.push(CandidateKey::Other(KeyDescriptor::new("second")));

        let types: Vec<&str> = collection.iter().map(CandidateKey::key_type).collect();
        assert_eq!(types, vec!["first", "second"]);
    }
}
