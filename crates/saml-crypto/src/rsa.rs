//! RSA PKCS#1 v1.5 signing and verification.
//!
//! SAML 2.0 interoperability requires SHA-256 based RSA signatures, with
//! SHA-1 still seen on inbound messages from legacy peers. SHA-1 is
//! therefore accepted for verification but refused for signing.

use aws_lc_rs::{
    rand::SystemRandom,
    signature::{
        self, RsaKeyPair, UnparsedPublicKey, RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY,
        RSA_PKCS1_2048_8192_SHA256, RSA_PKCS1_2048_8192_SHA384, RSA_PKCS1_2048_8192_SHA512,
    },
};

use crate::algorithm::SignatureAlgorithm;
use crate::error::{CryptoError, CryptoResult};

/// Signs data with an RSA private key.
///
/// # Arguments
///
/// * `key_der` - RSA private key in DER format (PKCS#1 or PKCS#8)
/// * `data` - Data to sign
/// * `algorithm` - Signature algorithm
///
/// # Errors
///
/// Returns an error if the key is invalid, the algorithm is SHA-1 based,
/// or signing fails.
pub fn rsa_sign(
    key_der: &[u8],
    data: &[u8],
    algorithm: SignatureAlgorithm,
) -> CryptoResult<Vec<u8>> {
    let key_pair = RsaKeyPair::from_der(key_der)
        .or_else(|_| RsaKeyPair::from_pkcs8(key_der))
        .map_err(|e| CryptoError::InvalidKey(format!("Invalid RSA key: {e}")))?;

    let padding = match algorithm {
        SignatureAlgorithm::RsaSha256 => &signature::RSA_PKCS1_SHA256,
        SignatureAlgorithm::RsaSha384 => &signature::RSA_PKCS1_SHA384,
        SignatureAlgorithm::RsaSha512 => &signature::RSA_PKCS1_SHA512,
        SignatureAlgorithm::RsaSha1 => {
            return Err(CryptoError::UnsupportedAlgorithm(
                "SHA-1 signature creation is not supported".to_string(),
            ));
        }
    };

    let rng = SystemRandom::new();
    let mut sig = vec![0u8; key_pair.public_modulus_len()];
    key_pair
        .sign(padding, &rng, data, &mut sig)
        .map_err(|e| CryptoError::Signing(format!("RSA signing failed: {e}")))?;

    Ok(sig)
}

/// Verifies an RSA signature.
///
/// # Arguments
///
/// * `public_key_der` - RSA public key in DER format (`RSAPublicKey`)
/// * `data` - Original data that was signed
/// * `sig` - Signature to verify
/// * `algorithm` - Signature algorithm
///
/// # Errors
///
/// Never errors on a failed verification; a bad signature is `Ok(false)`.
pub fn rsa_verify(
    public_key_der: &[u8],
    data: &[u8],
    sig: &[u8],
    algorithm: SignatureAlgorithm,
) -> CryptoResult<bool> {
    let verification_alg: &dyn signature::VerificationAlgorithm = match algorithm {
        SignatureAlgorithm::RsaSha256 => &RSA_PKCS1_2048_8192_SHA256,
        SignatureAlgorithm::RsaSha384 => &RSA_PKCS1_2048_8192_SHA384,
        SignatureAlgorithm::RsaSha512 => &RSA_PKCS1_2048_8192_SHA512,
        SignatureAlgorithm::RsaSha1 => &RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY,
    };

    let public_key = UnparsedPublicKey::new(verification_alg, public_key_der);
    Ok(public_key.verify(data, sig).is_ok())
}

/// An RSA signing credential: private key material plus the algorithm the
/// holder signs with.
#[derive(Clone)]
pub struct RsaSigningKey {
    key_der: Vec<u8>,
    certificate_der: Option<Vec<u8>>,
    algorithm: SignatureAlgorithm,
}

impl RsaSigningKey {
    /// Creates a signing key from DER-encoded private key material.
    pub fn new(key_der: Vec<u8>, algorithm: SignatureAlgorithm) -> CryptoResult<Self> {
        if algorithm.is_deprecated() {
            return Err(CryptoError::UnsupportedAlgorithm(
                "SHA-1 signature creation is not supported".to_string(),
            ));
        }
        RsaKeyPair::from_der(&key_der)
            .or_else(|_| RsaKeyPair::from_pkcs8(&key_der))
            .map_err(|e| CryptoError::InvalidKey(format!("Invalid RSA key: {e}")))?;
        Ok(Self {
            key_der,
            certificate_der: None,
            algorithm,
        })
    }

    /// Creates a signing key from a PEM-encoded private key.
    pub fn from_pem(pem: &str, algorithm: SignatureAlgorithm) -> CryptoResult<Self> {
        let key_der = crate::pem::pem_to_der(pem, "PRIVATE KEY")
            .or_else(|| crate::pem::pem_to_der(pem, "RSA PRIVATE KEY"))
            .ok_or_else(|| CryptoError::InvalidKey("Invalid private key PEM".to_string()))?;
        Self::new(key_der, algorithm)
    }

    /// Attaches the X.509 certificate for this key, DER-encoded.
    #[must_use]
    pub fn with_certificate(mut self, certificate_der: Vec<u8>) -> Self {
        self.certificate_der = Some(certificate_der);
        self
    }

    /// Returns the signature algorithm this credential signs with.
    #[must_use]
    pub const fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Returns the attached certificate, if any.
    #[must_use]
    pub fn certificate_der(&self) -> Option<&[u8]> {
        self.certificate_der.as_deref()
    }

    /// Signs the given data.
    pub fn sign(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        rsa_sign(&self.key_der, data, self.algorithm)
    }
}

impl std::fmt::Debug for RsaSigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaSigningKey")
            .field("algorithm", &self.algorithm)
            .field("has_certificate", &self.certificate_der.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pem::pem_to_der;
    use crate::x509::public_key_from_certificate;

    const KEY_PEM: &str = include_str!("../testdata/test-key.pem");
    const CERT_PEM: &str = include_str!("../testdata/test-cert.pem");

    #[test]
    fn sign_and_verify_roundtrip() {
        let key = RsaSigningKey::from_pem(KEY_PEM, SignatureAlgorithm::RsaSha256).unwrap();
        let sig = key.sign(b"SAMLRequest=abc&SigAlg=xyz").unwrap();

        let cert_der = pem_to_der(CERT_PEM, "CERTIFICATE").unwrap();
        let public_key = public_key_from_certificate(&cert_der).unwrap();

        assert!(rsa_verify(
            &public_key,
            b"SAMLRequest=abc&SigAlg=xyz",
            &sig,
            SignatureAlgorithm::RsaSha256,
        )
        .unwrap());
    }

    #[test]
    fn tampered_data_fails_verification() {
        let key = RsaSigningKey::from_pem(KEY_PEM, SignatureAlgorithm::RsaSha256).unwrap();
        let sig = key.sign(b"original").unwrap();

        let cert_der = pem_to_der(CERT_PEM, "CERTIFICATE").unwrap();
        let public_key = public_key_from_certificate(&cert_der).unwrap();

        assert!(!rsa_verify(&public_key, b"tampered", &sig, SignatureAlgorithm::RsaSha256).unwrap());
    }

    #[test]
    fn wrong_algorithm_fails_verification() {
        let key = RsaSigningKey::from_pem(KEY_PEM, SignatureAlgorithm::RsaSha256).unwrap();
        let sig = key.sign(b"data").unwrap();

        let cert_der = pem_to_der(CERT_PEM, "CERTIFICATE").unwrap();
        let public_key = public_key_from_certificate(&cert_der).unwrap();

        assert!(!rsa_verify(&public_key, b"data", &sig, SignatureAlgorithm::RsaSha512).unwrap());
    }

    #[test]
    fn sha1_signing_is_refused() {
        let result = RsaSigningKey::from_pem(KEY_PEM, SignatureAlgorithm::RsaSha1);
        assert!(matches!(result, Err(CryptoError::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn garbage_key_is_rejected() {
        assert!(RsaSigningKey::new(vec![0u8; 16], SignatureAlgorithm::RsaSha256).is_err());
    }
}
