//! # saml-crypto
//!
//! Cryptographic operations for the SAML toolkit, built on aws-lc-rs.
//!
//! This crate is the narrow crypto collaborator consumed by the binding and
//! trust layers: it signs and verifies byte strings, hashes, generates
//! secure random material, and extracts public keys from X.509
//! certificates. It knows nothing about SAML messages or bindings.
//!
//! ## Algorithm support
//!
//! The XML-DSig RSA suite used by SAML deployments:
//!
//! - RSA-SHA256 (default for new signatures)
//! - RSA-SHA384 / RSA-SHA512
//! - RSA-SHA1 (verification only, for legacy peers)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod algorithm;
pub mod error;
pub mod hash;
pub mod pem;
pub mod random;
pub mod rsa;
pub mod x509;

pub use algorithm::SignatureAlgorithm;
pub use error::{CryptoError, CryptoResult};
pub use hash::{sha1, sha256, sha384, sha512};
pub use pem::{der_to_pem, pem_to_der};
pub use random::random_bytes;
pub use rsa::{rsa_sign, rsa_verify, RsaSigningKey};
pub use x509::public_key_from_certificate;
