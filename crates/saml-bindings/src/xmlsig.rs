//! Enveloped XML signature creation and verification.
//!
//! Implements the document-level `ds:Signature` used by the POST, Artifact
//! and SOAP flows: the digest covers the whole document with the signature
//! element removed, and the signature covers the canonicalized
//! `SignedInfo`. Canonicalization is the simplified whitespace-collapse
//! form; both sides of this implementation use the same rules, and the
//! signed content is always produced by this layer.

use base64::Engine;
use saml_crypto::SignatureAlgorithm;

use crate::constants::{ENVELOPED_SIGNATURE, EXCLUSIVE_C14N};
use crate::error::{SamlError, SamlResult};
use crate::message::MessageSigner;

/// An extracted `ds:Signature` element.
#[derive(Debug, Clone)]
pub struct EmbeddedSignature {
    /// The signature algorithm used.
    pub algorithm: SignatureAlgorithm,
    /// The reference URI (the ID of the signed element).
    pub reference_uri: String,
    /// The digest value (base64 encoded).
    pub digest_value: String,
    /// The signature value (base64 encoded).
    pub signature_value: String,
    /// X.509 certificate carried in `KeyInfo`, if any (base64, DER).
    pub x509_certificate: Option<String>,
}

/// Signs an XML document with an enveloped signature.
///
/// The `ds:Signature` element is inserted after the `Issuer` element as
/// the schema requires, falling back to the position before the root
/// element's closing tag when the document has no `Issuer`.
///
/// # Errors
///
/// Fails if the document has no closing root tag or signing fails.
pub fn sign_enveloped(
    xml: &str,
    reference_id: &str,
    signer: &dyn MessageSigner,
) -> SamlResult<String> {
    let algorithm = signer.algorithm();
    let digest = calculate_digest(&canonicalize(xml), algorithm)?;
    let digest_b64 = base64::engine::general_purpose::STANDARD.encode(&digest);

    let reference_uri = format!("#{reference_id}");
    let signed_info = build_signed_info(&reference_uri, &digest_b64, algorithm);

    let signature_value = signer.sign(canonicalize(&signed_info).as_bytes())?;
    let signature_b64 = base64::engine::general_purpose::STANDARD.encode(&signature_value);

    let key_info = signer
        .certificate_der()
        .map(|cert| {
            let cert_b64 = base64::engine::general_purpose::STANDARD.encode(cert);
            format!(
                "<ds:KeyInfo><ds:X509Data><ds:X509Certificate>{cert_b64}</ds:X509Certificate></ds:X509Data></ds:KeyInfo>"
            )
        })
        .unwrap_or_default();

    let signature_element = format!(
        "<ds:Signature xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\">{signed_info}<ds:SignatureValue>{signature_b64}</ds:SignatureValue>{key_info}</ds:Signature>"
    );

    let insert_at = signature_position(xml)?;

    Ok(format!(
        "{}{}{}",
        &xml[..insert_at],
        signature_element,
        &xml[insert_at..]
    ))
}

/// Verifies the enveloped signature of an XML document against a
/// certificate.
///
/// # Errors
///
/// Fails closed on a missing signature, digest mismatch, or verification
/// non-success.
pub fn verify_enveloped(xml: &str, cert_der: &[u8]) -> SamlResult<()> {
    let signature = extract_signature(xml)?;

    // Digest covers the document with the signature element removed.
    let without_signature = remove_signature_element(xml);
    let digest = calculate_digest(&canonicalize(&without_signature), signature.algorithm)?;
    let digest_b64 = base64::engine::general_purpose::STANDARD.encode(&digest);
    if digest_b64 != signature.digest_value {
        return Err(SamlError::SignatureInvalid(
            "Digest value mismatch".to_string(),
        ));
    }

    let signed_info = build_signed_info(
        &signature.reference_uri,
        &signature.digest_value,
        signature.algorithm,
    );
    let signature_bytes = base64::engine::general_purpose::STANDARD
        .decode(&signature.signature_value)
        .map_err(|e| SamlError::SignatureInvalid(format!("Invalid signature encoding: {e}")))?;

    let public_key = saml_crypto::public_key_from_certificate(cert_der)
        .map_err(|e| SamlError::SignatureInvalid(e.to_string()))?;

    let valid = saml_crypto::rsa_verify(
        &public_key,
        canonicalize(&signed_info).as_bytes(),
        &signature_bytes,
        signature.algorithm,
    )
    .map_err(|e| SamlError::SignatureInvalid(e.to_string()))?;

    if valid {
        Ok(())
    } else {
        Err(SamlError::SignatureInvalid(
            "Signature verification failed".to_string(),
        ))
    }
}

/// Extracts signature information from an XML document.
pub fn extract_signature(xml: &str) -> SamlResult<EmbeddedSignature> {
    xml.find("<ds:Signature")
        .or_else(|| xml.find("<Signature"))
        .ok_or_else(|| SamlError::SignatureInvalid("No Signature element found".to_string()))?;

    let algorithm = extract_attribute(xml, "SignatureMethod", "Algorithm")
        .and_then(|uri| SignatureAlgorithm::from_uri(&uri))
        .ok_or_else(|| SamlError::SignatureInvalid("Invalid signature algorithm".to_string()))?;

    let reference_uri = extract_attribute(xml, "Reference", "URI")
        .ok_or_else(|| SamlError::SignatureInvalid("No Reference URI found".to_string()))?;

    let digest_value = extract_element_content(xml, "DigestValue")
        .ok_or_else(|| SamlError::SignatureInvalid("No DigestValue found".to_string()))?;

    let signature_value = extract_element_content(xml, "SignatureValue")
        .ok_or_else(|| SamlError::SignatureInvalid("No SignatureValue found".to_string()))?;

    let x509_certificate = extract_element_content(xml, "X509Certificate");

    Ok(EmbeddedSignature {
        algorithm,
        reference_uri,
        digest_value: digest_value.chars().filter(|c| !c.is_whitespace()).collect(),
        signature_value: signature_value
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect(),
        x509_certificate: x509_certificate
            .map(|s| s.chars().filter(|c| !c.is_whitespace()).collect()),
    })
}

/// Builds the `SignedInfo` element. Signing and verification must produce
/// byte-identical output here.
fn build_signed_info(
    reference_uri: &str,
    digest_value: &str,
    algorithm: SignatureAlgorithm,
) -> String {
    format!(
        "<ds:SignedInfo xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\">\
<ds:CanonicalizationMethod Algorithm=\"{EXCLUSIVE_C14N}\"/>\
<ds:SignatureMethod Algorithm=\"{}\"/>\
<ds:Reference URI=\"{reference_uri}\">\
<ds:Transforms>\
<ds:Transform Algorithm=\"{ENVELOPED_SIGNATURE}\"/>\
<ds:Transform Algorithm=\"{EXCLUSIVE_C14N}\"/>\
</ds:Transforms>\
<ds:DigestMethod Algorithm=\"{}\"/>\
<ds:DigestValue>{digest_value}</ds:DigestValue>\
</ds:Reference>\
</ds:SignedInfo>",
        algorithm.uri(),
        algorithm.digest_uri(),
    )
}

/// Picks where the `ds:Signature` element goes: directly after the
/// `Issuer` element, or before the root closing tag.
fn signature_position(xml: &str) -> SamlResult<usize> {
    for close in ["</saml:Issuer>", "</Issuer>"] {
        if let Some(pos) = xml.find(close) {
            return Ok(pos + close.len());
        }
    }
    xml.rfind("</").ok_or_else(|| {
        SamlError::SignatureCreation("document has no closing root element".to_string())
    })
}

/// Removes the first `Signature` element from XML content.
fn remove_signature_element(xml: &str) -> String {
    let patterns = [
        ("<ds:Signature", "</ds:Signature>"),
        ("<Signature", "</Signature>"),
    ];

    for (open, close) in &patterns {
        if let Some(start) = xml.find(open) {
            if let Some(end_offset) = xml[start..].find(close) {
                let end = start + end_offset + close.len();
                return format!("{}{}", &xml[..start], &xml[end..]);
            }
        }
    }
    xml.to_string()
}

/// Collapses whitespace runs; the simplified canonical form shared by
/// signing and verification.
fn canonicalize(xml: &str) -> String {
    xml.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Calculates the digest of canonical data.
fn calculate_digest(data: &str, algorithm: SignatureAlgorithm) -> SamlResult<Vec<u8>> {
    Ok(match algorithm {
        SignatureAlgorithm::RsaSha256 => saml_crypto::sha256(data.as_bytes()),
        SignatureAlgorithm::RsaSha384 => saml_crypto::sha384(data.as_bytes()),
        SignatureAlgorithm::RsaSha512 => saml_crypto::sha512(data.as_bytes()),
        SignatureAlgorithm::RsaSha1 => saml_crypto::sha1(data.as_bytes()).to_vec(),
    })
}

/// Extracts an attribute value from an XML element.
fn extract_attribute(xml: &str, element: &str, attribute: &str) -> Option<String> {
    let patterns = [format!("<{element}"), format!("<ds:{element}")];

    for pattern in &patterns {
        if let Some(pos) = xml.find(pattern.as_str()) {
            let end = xml[pos..].find('>')?;
            let element_str = &xml[pos..pos + end];

            let attr_pattern = format!("{attribute}=\"");
            if let Some(attr_start) = element_str.find(&attr_pattern) {
                let value_start = attr_start + attr_pattern.len();
                let value_end = element_str[value_start..].find('"')?;
                return Some(element_str[value_start..value_start + value_end].to_string());
            }
        }
    }
    None
}

/// Extracts the text content of an XML element.
fn extract_element_content(xml: &str, element: &str) -> Option<String> {
    let patterns = [
        (format!("<{element}>"), format!("</{element}>")),
        (format!("<ds:{element}>"), format!("</ds:{element}>")),
    ];

    for (open, close) in &patterns {
        if let Some(start) = xml.find(open.as_str()) {
            let content_start = start + open.len();
            if let Some(end) = xml[content_start..].find(close.as_str()) {
                return Some(xml[content_start..content_start + end].to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use saml_crypto::{pem_to_der, RsaSigningKey};

    const KEY_PEM: &str = include_str!("../testdata/sp-key.pem");
    const CERT_PEM: &str = include_str!("../testdata/sp-cert.pem");

    fn test_signer() -> RsaSigningKey {
        let cert_der = pem_to_der(CERT_PEM, "CERTIFICATE").unwrap();
        RsaSigningKey::from_pem(KEY_PEM, SignatureAlgorithm::RsaSha256)
            .unwrap()
            .with_certificate(cert_der)
    }

    const DOC: &str = "<samlp:ArtifactResolve xmlns:samlp=\"urn:oasis:names:tc:SAML:2.0:protocol\" ID=\"_id1\"><saml:Issuer xmlns:saml=\"urn:oasis:names:tc:SAML:2.0:assertion\">https://sp.example.org</saml:Issuer></samlp:ArtifactResolve>";

    #[test]
    fn sign_and_verify_roundtrip() {
        let signer = test_signer();
        let signed = sign_enveloped(DOC, "_id1", &signer).unwrap();

        assert!(signed.contains("<ds:Signature"));
        assert!(signed.contains("<ds:X509Certificate>"));

        let cert_der = pem_to_der(CERT_PEM, "CERTIFICATE").unwrap();
        verify_enveloped(&signed, &cert_der).unwrap();
    }

    #[test]
    fn tampered_document_fails_digest_check() {
        let signer = test_signer();
        let signed = sign_enveloped(DOC, "_id1", &signer).unwrap();
        let tampered = signed.replace("sp.example.org", "sp.evil.example");

        let cert_der = pem_to_der(CERT_PEM, "CERTIFICATE").unwrap();
        let err = verify_enveloped(&tampered, &cert_der).unwrap_err();
        assert!(matches!(err, SamlError::SignatureInvalid(_)));
    }

    #[test]
    fn unsigned_document_is_rejected() {
        let cert_der = pem_to_der(CERT_PEM, "CERTIFICATE").unwrap();
        let err = verify_enveloped(DOC, &cert_der).unwrap_err();
        assert!(matches!(err, SamlError::SignatureInvalid(_)));
    }

    #[test]
    fn signature_insertion_preserves_document_on_removal() {
        let signer = test_signer();
        let signed = sign_enveloped(DOC, "_id1", &signer).unwrap();
        assert_eq!(remove_signature_element(&signed), DOC);
    }

    #[test]
    fn extracted_signature_carries_certificate() {
        let signer = test_signer();
        let signed = sign_enveloped(DOC, "_id1", &signer).unwrap();
        let extracted = extract_signature(&signed).unwrap();

        assert_eq!(extracted.algorithm, SignatureAlgorithm::RsaSha256);
        assert_eq!(extracted.reference_uri, "#_id1");
        assert!(extracted.x509_certificate.is_some());
    }
}
