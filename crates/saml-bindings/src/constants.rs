//! SAML 2.0 constants and URIs.
//!
//! Namespace URIs, binding URNs, and status codes consumed by the binding
//! and trust layers.

/// SAML 2.0 assertion namespace URI.
pub const SAML_NS: &str = "urn:oasis:names:tc:SAML:2.0:assertion";

/// SAML 2.0 protocol namespace URI.
pub const SAMLP_NS: &str = "urn:oasis:names:tc:SAML:2.0:protocol";

/// XML Digital Signature namespace URI.
pub const XMLDSIG_NS: &str = "http://www.w3.org/2000/09/xmldsig#";

/// The only accepted `SAMLEncoding` value for the HTTP-Redirect binding.
pub const SAML_ENCODING_DEFLATE: &str = "urn:oasis:names:tc:SAML:2.0:bindings:URL-Encoding:DEFLATE";

// ============================================================================
// Binding URNs
// ============================================================================

/// Transport binding URNs.
pub mod binding_urns {
    /// HTTP-POST binding.
    pub const HTTP_POST: &str = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST";

    /// HTTP-Redirect binding.
    pub const HTTP_REDIRECT: &str = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect";

    /// HTTP-Artifact binding.
    pub const HTTP_ARTIFACT: &str = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Artifact";

    /// SOAP binding.
    pub const SOAP: &str = "urn:oasis:names:tc:SAML:2.0:bindings:SOAP";

    /// Reverse SOAP (PAOS) binding, carried over the SOAP implementation.
    pub const PAOS: &str = "urn:oasis:names:tc:SAML:2.0:bindings:PAOS";

    /// Holder-of-key web browser SSO profile, carried over HTTP-POST.
    pub const HOK_SSO: &str = "urn:oasis:names:tc:SAML:2.0:profiles:holder-of-key:SSO:browser";
}

// ============================================================================
// Status codes
// ============================================================================

/// Top-level SAML status codes.
pub mod status_codes {
    /// Success status code.
    pub const SUCCESS: &str = "urn:oasis:names:tc:SAML:2.0:status:Success";

    /// Requester error status code.
    pub const REQUESTER: &str = "urn:oasis:names:tc:SAML:2.0:status:Requester";

    /// Responder error status code.
    pub const RESPONDER: &str = "urn:oasis:names:tc:SAML:2.0:status:Responder";
}

// ============================================================================
// Canonicalization and transforms
// ============================================================================

/// Exclusive C14N without comments.
pub const EXCLUSIVE_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

/// Enveloped signature transform.
pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";
