//! X.509 certificate handling.

use x509_parser::prelude::*;

use crate::error::{CryptoError, CryptoResult};

/// Extracts the RSA public key from an X.509 certificate.
///
/// Returns the DER-encoded `RSAPublicKey` (the `BIT STRING` contents of the
/// certificate's `SubjectPublicKeyInfo`), which is what the verification
/// primitives consume.
pub fn public_key_from_certificate(cert_der: &[u8]) -> CryptoResult<Vec<u8>> {
    let (_, cert) = X509Certificate::from_der(cert_der)
        .map_err(|e| CryptoError::InvalidCertificate(format!("Failed to parse certificate: {e}")))?;

    Ok(cert.public_key().subject_public_key.data.to_vec())
}
