//! Message envelope contract.
//!
//! Bindings consume protocol messages through the narrow [`SamlMessage`]
//! capability and produce [`ReceivedMessage`] values. A message carries at
//! most one signing key; the single signature placed by this layer is
//! either the Redirect query-string signature or an enveloped XML
//! signature, never both. Signatures already embedded in received XML are
//! preserved untouched and validated by the trust layer.

use std::sync::Arc;

use base64::Engine;
use saml_crypto::{RsaSigningKey, SignatureAlgorithm};

use crate::error::{SamlError, SamlResult};
use crate::keys::X509Key;
use crate::xmlsig;

/// SAML message directionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamlMessageType {
    /// A request message (`AuthnRequest`, `LogoutRequest`, ...).
    Request,
    /// A response message.
    Response,
}

impl SamlMessageType {
    /// Returns the query/form parameter name for this message type.
    #[must_use]
    pub const fn form_param(&self) -> &'static str {
        match self {
            Self::Request => "SAMLRequest",
            Self::Response => "SAMLResponse",
        }
    }
}

/// A signing credential held by a message: an algorithm plus a raw
/// byte-string signing operation.
pub trait MessageSigner: Send + Sync {
    /// The algorithm this credential signs with.
    fn algorithm(&self) -> SignatureAlgorithm;

    /// The signer's X.509 certificate, DER-encoded, for embedding in XML
    /// signatures.
    fn certificate_der(&self) -> Option<&[u8]>;

    /// Signs the given bytes.
    fn sign(&self, data: &[u8]) -> SamlResult<Vec<u8>>;
}

impl MessageSigner for RsaSigningKey {
    fn algorithm(&self) -> SignatureAlgorithm {
        RsaSigningKey::algorithm(self)
    }

    fn certificate_der(&self) -> Option<&[u8]> {
        RsaSigningKey::certificate_der(self)
    }

    fn sign(&self, data: &[u8]) -> SamlResult<Vec<u8>> {
        RsaSigningKey::sign(self, data).map_err(SamlError::from)
    }
}

/// The capability set bindings require from an outbound protocol message.
pub trait SamlMessage {
    /// The message directionality, which selects the wire parameter name.
    fn message_type(&self) -> SamlMessageType;

    /// The entity identifier of the sender.
    fn issuer(&self) -> Option<&str>;

    /// The destination URL, unless a binding-level override applies.
    fn destination(&self) -> Option<&str>;

    /// Opaque relay state, round-tripped unmodified.
    fn relay_state(&self) -> Option<&str>;

    /// The signing key; presence triggers signing on send.
    fn signing_key(&self) -> Option<&dyn MessageSigner>;

    /// Renders the message as XML text.
    fn to_xml(&self) -> String;
}

/// A concrete message envelope for callers that hold pre-rendered XML.
#[derive(Clone)]
pub struct MessageEnvelope {
    message_type: SamlMessageType,
    xml: String,
    issuer: Option<String>,
    destination: Option<String>,
    relay_state: Option<String>,
    signing_key: Option<Arc<dyn MessageSigner>>,
}

impl MessageEnvelope {
    /// Creates a request envelope around rendered XML.
    #[must_use]
    pub fn request(xml: impl Into<String>) -> Self {
        Self::new(SamlMessageType::Request, xml)
    }

    /// Creates a response envelope around rendered XML.
    #[must_use]
    pub fn response(xml: impl Into<String>) -> Self {
        Self::new(SamlMessageType::Response, xml)
    }

    fn new(message_type: SamlMessageType, xml: impl Into<String>) -> Self {
        Self {
            message_type,
            xml: xml.into(),
            issuer: None,
            destination: None,
            relay_state: None,
            signing_key: None,
        }
    }

    /// Sets the issuer entity ID.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Sets the relay state.
    #[must_use]
    pub fn with_relay_state(mut self, relay_state: impl Into<String>) -> Self {
        self.relay_state = Some(relay_state.into());
        self
    }

    /// Attaches the signing key. A message carries at most one.
    #[must_use]
    pub fn with_signing_key(mut self, key: Arc<dyn MessageSigner>) -> Self {
        self.signing_key = Some(key);
        self
    }
}

impl SamlMessage for MessageEnvelope {
    fn message_type(&self) -> SamlMessageType {
        self.message_type
    }

    fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    fn relay_state(&self) -> Option<&str> {
        self.relay_state.as_deref()
    }

    fn signing_key(&self) -> Option<&dyn MessageSigner> {
        self.signing_key.as_deref()
    }

    fn to_xml(&self) -> String {
        self.xml.clone()
    }
}

impl std::fmt::Debug for MessageEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageEnvelope")
            .field("message_type", &self.message_type)
            .field("issuer", &self.issuer)
            .field("destination", &self.destination)
            .field("relay_state", &self.relay_state)
            .field("signed", &self.signing_key.is_some())
            .finish_non_exhaustive()
    }
}

/// A message reconstructed from an inbound transport exchange.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    /// The decoded XML message.
    pub xml: String,
    /// The message directionality.
    pub message_type: SamlMessageType,
    /// The relay state, if the exchange carried one.
    pub relay_state: Option<String>,
    /// Deferred signature validation, for bindings that sign out-of-band.
    pub pending_validation: Option<PendingValidation>,
}

/// Signature material captured during `receive`, validated later once the
/// caller has looked up a trust key from peer metadata.
#[derive(Debug, Clone)]
pub enum PendingValidation {
    /// A detached Redirect-binding query signature.
    RedirectQuery {
        /// The exact byte string the sender signed.
        signed_query: Vec<u8>,
        /// The declared signature algorithm URI.
        sig_alg: String,
        /// The base64-encoded signature value.
        signature: String,
    },
    /// An enveloped XML signature on a document whose trust key was not
    /// known at receive time.
    EnvelopedXml {
        /// The signed document.
        document: String,
    },
}

impl PendingValidation {
    /// Validates the captured signature against the given key.
    ///
    /// # Errors
    ///
    /// Fails closed: an unknown algorithm, a non-RSA key class, undecodable
    /// signature bytes, or a verification non-success are all
    /// [`SamlError::SignatureInvalid`].
    pub fn validate(&self, key: &X509Key) -> SamlResult<()> {
        match self {
            Self::RedirectQuery {
                signed_query,
                sig_alg,
                signature,
            } => {
                let algorithm = SignatureAlgorithm::from_uri(sig_alg).ok_or_else(|| {
                    SamlError::SignatureInvalid(format!("Unknown signature algorithm: {sig_alg}"))
                })?;

                let sig = base64::engine::general_purpose::STANDARD
                    .decode(signature)
                    .map_err(|e| {
                        SamlError::SignatureInvalid(format!("Invalid signature encoding: {e}"))
                    })?;

                let cert_der = key.certificate_der()?;
                let public_key = saml_crypto::public_key_from_certificate(&cert_der)
                    .map_err(|e| SamlError::SignatureInvalid(e.to_string()))?;

                let valid = saml_crypto::rsa_verify(&public_key, signed_query, &sig, algorithm)
                    .map_err(|e| SamlError::SignatureInvalid(e.to_string()))?;
                if valid {
                    Ok(())
                } else {
                    Err(SamlError::SignatureInvalid(
                        "query signature verification failed".to_string(),
                    ))
                }
            }
            Self::EnvelopedXml { document } => {
                let cert_der = key.certificate_der()?;
                xmlsig::verify_enveloped(document, &cert_der)
            }
        }
    }
}

/// Guesses the directionality of a decoded message from its root element.
pub(crate) fn detect_message_type(xml: &str) -> SamlMessageType {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                let local = e.local_name();
                let name = std::str::from_utf8(local.as_ref()).unwrap_or("");
                return if name.ends_with("Response") {
                    SamlMessageType::Response
                } else {
                    SamlMessageType::Request
                };
            }
            Ok(Event::Eof) | Err(_) => return SamlMessageType::Request,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_param_by_type() {
        assert_eq!(SamlMessageType::Request.form_param(), "SAMLRequest");
        assert_eq!(SamlMessageType::Response.form_param(), "SAMLResponse");
    }

    #[test]
    fn envelope_builder_roundtrip() {
        let envelope = MessageEnvelope::request("<samlp:AuthnRequest/>")
            .with_issuer("https://sp.example.org")
            .with_destination("https://idp.example.org/sso")
            .with_relay_state("state");

        assert_eq!(envelope.issuer(), Some("https://sp.example.org"));
        assert_eq!(envelope.destination(), Some("https://idp.example.org/sso"));
        assert_eq!(envelope.relay_state(), Some("state"));
        assert!(envelope.signing_key().is_none());
        assert_eq!(envelope.to_xml(), "<samlp:AuthnRequest/>");
    }

    #[test]
    fn message_type_detection_from_root_element() {
        assert_eq!(
            detect_message_type("<samlp:Response ID=\"a\"/>"),
            SamlMessageType::Response
        );
        assert_eq!(
            detect_message_type("<samlp:ArtifactResponse ID=\"a\"/>"),
            SamlMessageType::Response
        );
        assert_eq!(
            detect_message_type("<samlp:AuthnRequest ID=\"a\"/>"),
            SamlMessageType::Request
        );
    }

    #[test]
    fn redirect_validation_rejects_unknown_algorithm() {
        let pending = PendingValidation::RedirectQuery {
            signed_query: b"SAMLRequest=abc".to_vec(),
            sig_alg: "urn:not-an-algorithm".to_string(),
            signature: "QUJD".to_string(),
        };
        let key = X509Key::from_certificate_data("QUJD");
        assert!(matches!(
            pending.validate(&key),
            Err(SamlError::SignatureInvalid(_))
        ));
    }
}
