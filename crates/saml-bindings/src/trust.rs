//! Signature trust validation.
//!
//! Decides, given a trust configuration, whether a message's embedded
//! signature is valid. The trust model is any-of-N: deployments rotate
//! keys, so a signature matching any currently-trusted key is sufficient.
//! Absence of a usable key during the search is a normal `false` result,
//! never an error; callers interpret `false` as "reject the message".

use crate::keys::{CandidateKey, CertificateProvider, KeyCollection, KeyLoader, KeyUsage};
use crate::xmlsig;

/// Validates message signatures against configured public keys.
pub struct PublicKeyValidator;

impl PublicKeyValidator {
    /// Gathers the signing keys exposed by a trust configuration.
    ///
    /// Search never fails: a malformed or empty configuration yields an
    /// empty collection.
    #[must_use]
    pub fn extract_public_keys(trust: &dyn CertificateProvider) -> KeyCollection {
        let mut loader = KeyLoader::new();
        if let Err(e) = loader.load_from_provider(trust, Some(KeyUsage::Signing), false) {
            tracing::debug!("Could not load keys from trust configuration: {e}");
        }
        loader.into_keys()
    }

    /// Returns true if the trust configuration exposes at least one
    /// candidate signing key.
    #[must_use]
    pub fn can_validate(trust: &dyn CertificateProvider) -> bool {
        !Self::extract_public_keys(trust).is_empty()
    }

    /// Returns true if any trusted key validates the message's embedded
    /// signature.
    #[must_use]
    pub fn has_valid_signature(message_xml: &str, trust: &dyn CertificateProvider) -> bool {
        let keys = Self::extract_public_keys(trust);

        for key in keys.iter() {
            match key {
                CandidateKey::X509(x509) => {
                    let result = x509
                        .certificate_der()
                        .and_then(|cert_der| xmlsig::verify_enveloped(message_xml, &cert_der));
                    match result {
                        Ok(()) => return true,
                        Err(e) => {
                            tracing::debug!("Signature validation with candidate key failed: {e}");
                        }
                    }
                }
                CandidateKey::Other(descriptor) => {
                    tracing::warn!("Skipping unknown key type: {}", descriptor.key_type);
                }
            }
        }

        tracing::warn!("No configured X509 certificate found to verify the signature with");
        false
    }
}
