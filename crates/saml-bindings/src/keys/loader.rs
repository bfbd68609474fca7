//! Key loading from trust configurations.
//!
//! Centralizes the precedence between configuration-declared keys, inline
//! certificate data, and certificate files, so callers cannot diverge in
//! how they resolve trust material.

use std::path::{Path, PathBuf};

use crate::error::{SamlError, SamlResult};

use super::{CandidateKey, KeyCollection, KeyDescriptor, KeyUsage, X509Key};

/// A source of trust material.
///
/// Each accessor is optionally absent; the loader queries them in a fixed
/// priority order and stops at the first source that is present.
pub trait CertificateProvider {
    /// Declared key descriptors, if any.
    fn keys(&self) -> Option<Vec<KeyDescriptor>>;

    /// Inline PEM certificate data, if any.
    fn certificate_data(&self) -> Option<String>;

    /// Path to a PEM certificate file, if any.
    fn certificate_file(&self) -> Option<PathBuf>;
}

/// Accumulates candidate keys from one or more sources.
///
/// Accumulation happens through `&mut self`, so a loader cannot be shared
/// across threads while it is being filled.
#[derive(Debug, Default)]
pub struct KeyLoader {
    keys: KeyCollection,
}

impl KeyLoader {
    /// Creates an empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the descriptors whose usage matches, converting
    /// certificate-bearing descriptors into X.509 keys.
    ///
    /// A `None` usage loads every descriptor.
    pub fn load_keys(&mut self, descriptors: &[KeyDescriptor], usage: Option<KeyUsage>) {
        for descriptor in descriptors {
            if let Some(usage) = usage {
                if !descriptor.can_be_used_for(usage) {
                    continue;
                }
            }
            match X509Key::from_descriptor(descriptor) {
                Some(key) => self.keys.push(CandidateKey::X509(key)),
                None => self.keys.push(CandidateKey::Other(descriptor.clone())),
            }
        }
    }

    /// Wraps raw PEM certificate text into a single X.509 key.
    ///
    /// # Errors
    ///
    /// Fails if the text contains no recognizable certificate block or the
    /// body is not valid base64.
    pub fn load_certificate_data(&mut self, raw: &str) -> SamlResult<()> {
        let body = extract_certificate_body(raw)?;
        self.keys
            .push(CandidateKey::X509(X509Key::from_certificate_data(&body)));
        Ok(())
    }

    /// Loads a certificate from a PEM file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or does not contain a certificate.
    pub fn load_certificate_file(&mut self, path: &Path) -> SamlResult<()> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SamlError::Configuration(format!(
                "could not read certificate file {}: {e}",
                path.display()
            ))
        })?;
        self.load_certificate_data(&contents)
    }

    /// Loads keys from a provider, honoring the source precedence:
    /// declared keys, then inline certificate data, then a certificate file.
    ///
    /// # Errors
    ///
    /// Fails if a present source is malformed, or if `required` is true and
    /// no source yielded any key.
    pub fn load_from_provider(
        &mut self,
        provider: &dyn CertificateProvider,
        usage: Option<KeyUsage>,
        required: bool,
    ) -> SamlResult<()> {
        let before = self.keys.len();

        if let Some(descriptors) = provider.keys() {
            self.load_keys(&descriptors, usage);
        } else if let Some(data) = provider.certificate_data() {
            self.load_certificate_data(&data)?;
        } else if let Some(path) = provider.certificate_file() {
            self.load_certificate_file(&path)?;
        }

        if required && self.keys.len() == before {
            return Err(SamlError::TrustResolution(
                "no keys found in configuration".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the accumulated keys in discovery order.
    #[must_use]
    pub fn keys(&self) -> &KeyCollection {
        &self.keys
    }

    /// Returns true if any key has been loaded.
    #[must_use]
    pub fn has_keys(&self) -> bool {
        !self.keys.is_empty()
    }

    /// Consumes the loader, yielding the accumulated keys.
    #[must_use]
    pub fn into_keys(self) -> KeyCollection {
        self.keys
    }
}

/// Extracts the base64 body of the first `BEGIN/END CERTIFICATE` block.
fn extract_certificate_body(raw: &str) -> SamlResult<String> {
    const BEGIN: &str = "-----BEGIN CERTIFICATE-----";
    const END: &str = "-----END CERTIFICATE-----";

    let start = raw
        .find(BEGIN)
        .ok_or_else(|| SamlError::Configuration("could not find a certificate".to_string()))?
        + BEGIN.len();
    let end = raw[start..]
        .find(END)
        .ok_or_else(|| SamlError::Configuration("could not find a certificate".to_string()))?
        + start;

    let body: String = raw[start..end]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    use base64::Engine;
    if body.is_empty()
        || base64::engine::general_purpose::STANDARD
            .decode(&body)
            .is_err()
    {
        return Err(SamlError::Configuration(
            "certificate data is not valid base64".to_string(),
        ));
    }
    Ok(body)
}
