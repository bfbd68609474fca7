//! HTTP-Artifact binding.
//!
//! Instead of the message itself, the peer receives a short opaque
//! artifact and resolves it out-of-band through the issuer's
//! ArtifactResolutionService over SOAP. Artifacts are stored keyed by
//! their base64 form with a 15-minute expiry and are consumed read-once on
//! the issuing side; an empty second resolution is the protocol's only
//! replay signal.

use std::fmt::Write as _;

use base64::Engine;

use crate::constants::{status_codes, SAMLP_NS, SAML_NS};
use crate::error::{SamlError, SamlResult};
use crate::message::{
    detect_message_type, MessageSigner, PendingValidation, ReceivedMessage, SamlMessage,
};
use crate::metadata::{EndpointService, MetadataResolver, PeerRole};
use crate::store::{unix_now, ArtifactStore};
use crate::xmlsig;

use super::{InboundExchange, SoapClient, TransportDirective};

/// The SAML type code of a type-4 artifact.
pub const ARTIFACT_TYPE_CODE: u16 = 0x0004;

/// How long a stored artifact stays resolvable, in seconds.
pub const ARTIFACT_LIFETIME_SECS: u64 = 15 * 60;

/// Store namespace for pending artifacts.
pub const ARTIFACT_STORE_NAMESPACE: &str = "artifact";

/// A type-4 SAML artifact: type code, endpoint index, the SHA-1 hash of
/// the issuer entity ID, and 20 random bytes of message handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    endpoint_index: u16,
    source_id: [u8; 20],
    message_handle: [u8; 20],
}

impl Artifact {
    /// Mints a fresh artifact for the given issuer with a random message
    /// handle.
    #[must_use]
    pub fn mint(issuer: &str, endpoint_index: u16) -> Self {
        let mut message_handle = [0u8; 20];
        message_handle.copy_from_slice(&saml_crypto::random_bytes(20));
        Self {
            endpoint_index,
            source_id: saml_crypto::sha1(issuer.as_bytes()),
            message_handle,
        }
    }

    /// Parses an artifact from its base64 transit form.
    ///
    /// # Errors
    ///
    /// Fails on invalid base64, a length other than 44 bytes, or an
    /// unsupported type code.
    pub fn from_base64(encoded: &str) -> SamlResult<Self> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| SamlError::Base64Decode(format!("invalid artifact encoding: {e}")))?;
        if bytes.len() != 44 {
            return Err(SamlError::Decode(format!(
                "artifact is {} bytes, expected 44",
                bytes.len()
            )));
        }

        let type_code = u16::from_be_bytes([bytes[0], bytes[1]]);
        if type_code != ARTIFACT_TYPE_CODE {
            return Err(SamlError::Decode(format!(
                "unsupported artifact type code: {type_code:#06x}"
            )));
        }

        let mut source_id = [0u8; 20];
        source_id.copy_from_slice(&bytes[4..24]);
        let mut message_handle = [0u8; 20];
        message_handle.copy_from_slice(&bytes[24..44]);

        Ok(Self {
            endpoint_index: u16::from_be_bytes([bytes[2], bytes[3]]),
            source_id,
            message_handle,
        })
    }

    /// Encodes the 44-byte artifact for transit.
    #[must_use]
    pub fn to_base64(&self) -> String {
        let mut bytes = Vec::with_capacity(44);
        bytes.extend_from_slice(&ARTIFACT_TYPE_CODE.to_be_bytes());
        bytes.extend_from_slice(&self.endpoint_index.to_be_bytes());
        bytes.extend_from_slice(&self.source_id);
        bytes.extend_from_slice(&self.message_handle);
        base64::engine::general_purpose::STANDARD.encode(&bytes)
    }

    /// The declared endpoint index of the issuer's resolution service.
    #[must_use]
    pub const fn endpoint_index(&self) -> u16 {
        self.endpoint_index
    }

    /// The issuer entity-ID hash as lowercase hex, for metadata lookup.
    #[must_use]
    pub fn source_id_hex(&self) -> String {
        self.source_id.iter().fold(
            String::with_capacity(40),
            |mut out, byte| {
                let _ = write!(out, "{byte:02x}");
                out
            },
        )
    }
}

/// Collaborators the Artifact binding needs to resolve an inbound
/// artifact.
pub struct ArtifactResolutionContext<'a> {
    /// This party's own entity ID, used as the `ArtifactResolve` issuer.
    pub issuer: &'a str,
    /// Resolves peer metadata by entity-ID hash.
    pub resolver: &'a dyn MetadataResolver,
    /// Transport for the synchronous resolution call.
    pub soap: &'a dyn SoapClient,
    /// SP credentials used to sign the `ArtifactResolve` request.
    pub signer: &'a dyn MessageSigner,
}

/// HTTP-Artifact binding encoder/resolver.
#[derive(Debug, Default)]
pub struct HttpArtifactBinding {
    destination: Option<String>,
}

impl HttpArtifactBinding {
    /// Creates a binding that sends to the message's own destination.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a binding with an overridden destination.
    #[must_use]
    pub fn with_destination(destination: impl Into<String>) -> Self {
        Self {
            destination: Some(destination.into()),
        }
    }

    /// Mints an artifact for the message, stores the message XML under the
    /// artifact with a 15-minute expiry, and redirects the peer.
    ///
    /// # Errors
    ///
    /// Fails with [`SamlError::Configuration`] when the store, the issuer
    /// or the destination is missing.
    pub async fn send(
        &self,
        message: &dyn SamlMessage,
        store: Option<&dyn ArtifactStore>,
    ) -> SamlResult<TransportDirective> {
        let store = store.ok_or_else(|| {
            SamlError::Configuration("no datastore configured for artifact storage".to_string())
        })?;
        let issuer = message.issuer().ok_or_else(|| {
            SamlError::Configuration("cannot send an artifact without an issuer".to_string())
        })?;
        let destination = self
            .destination
            .as_deref()
            .or_else(|| message.destination())
            .ok_or_else(|| {
                SamlError::Configuration(
                    "no destination available for HTTP-Artifact send".to_string(),
                )
            })?;

        let artifact = Artifact::mint(issuer, 0);
        let artifact_b64 = artifact.to_base64();
        store
            .set(
                ARTIFACT_STORE_NAMESPACE,
                &artifact_b64,
                &message.to_xml(),
                unix_now() + ARTIFACT_LIFETIME_SECS,
            )
            .await?;

        let separator = if destination.contains('?') { '&' } else { '?' };
        let mut url = format!(
            "{destination}{separator}SAMLart={}",
            urlencoding::encode(&artifact_b64)
        );
        if let Some(relay_state) = message.relay_state() {
            url.push_str(&format!("&RelayState={}", urlencoding::encode(relay_state)));
        }

        Ok(TransportDirective::Redirect(url))
    }

    /// Resolves an inbound artifact into the message it references.
    ///
    /// Looks up the artifact issuer's metadata by the source-id hash, picks
    /// the ArtifactResolutionService endpoint whose declared index matches
    /// the artifact, and dispatches a signed `ArtifactResolve` over SOAP.
    /// The response's own signature is attached as a deferred validation,
    /// since the trust key is the caller's to supply.
    ///
    /// # Errors
    ///
    /// Fails closed on unresolvable metadata, a missing endpoint, a
    /// non-success resolution status, and — as the replay heuristic — an
    /// empty `ArtifactResponse`.
    pub async fn receive(
        &self,
        exchange: &InboundExchange,
        context: &ArtifactResolutionContext<'_>,
    ) -> SamlResult<ReceivedMessage> {
        let artifact_b64 = exchange
            .query_param("SAMLart")
            .or_else(|| exchange.form_field("SAMLart").map(String::from))
            .ok_or_else(|| SamlError::Decode("no SAMLart parameter".to_string()))?;
        let artifact = Artifact::from_base64(&artifact_b64)?;

        let source_id = artifact.source_id_hex();
        let metadata = context
            .resolver
            .config_for_sha1(&source_id, PeerRole::IdentityProvider)
            .ok_or_else(|| {
                SamlError::TrustResolution(format!(
                    "could not resolve metadata for artifact source id {source_id}"
                ))
            })?;

        let endpoint = metadata
            .endpoints(EndpointService::ArtifactResolution)
            .iter()
            .find(|endpoint| endpoint.index == artifact.endpoint_index())
            .ok_or_else(|| {
                SamlError::TrustResolution(format!(
                    "no matching ArtifactResolutionService endpoint with index {} for {}",
                    artifact.endpoint_index(),
                    metadata.entity_id
                ))
            })?;

        let (request_id, resolve_xml) = build_artifact_resolve(context.issuer, &artifact_b64);
        let signed_resolve = xmlsig::sign_enveloped(&resolve_xml, &request_id, context.signer)?;

        let response_xml = context.soap.call(&endpoint.location, &signed_resolve).await?;
        let response = parse_artifact_response(&response_xml)?;

        if response.status_code != status_codes::SUCCESS {
            return Err(SamlError::ArtifactResolution(response.status_code));
        }

        let xml = response.message.ok_or_else(|| {
            SamlError::ReplaySuspected("empty ArtifactResponse, maybe a replay".to_string())
        })?;
        let message_type = detect_message_type(&xml);

        let relay_state = exchange
            .query_param("RelayState")
            .or_else(|| exchange.form_field("RelayState").map(String::from));

        Ok(ReceivedMessage {
            xml,
            message_type,
            relay_state,
            pending_validation: Some(PendingValidation::EnvelopedXml {
                document: response_xml,
            }),
        })
    }
}

/// Builds an `ArtifactResolve` request; returns the message ID and XML.
fn build_artifact_resolve(issuer: &str, artifact_b64: &str) -> (String, String) {
    let id = format!("_id{}", uuid::Uuid::new_v4());
    let issue_instant = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    let xml = format!(
        "<samlp:ArtifactResolve xmlns:samlp=\"{SAMLP_NS}\" xmlns:saml=\"{SAML_NS}\" ID=\"{id}\" Version=\"2.0\" IssueInstant=\"{issue_instant}\"><saml:Issuer>{}</saml:Issuer><samlp:Artifact>{artifact_b64}</samlp:Artifact></samlp:ArtifactResolve>",
        xml_escape(issuer)
    );
    (id, xml)
}

/// Builds an `ArtifactResponse` for the issuing side. An already-consumed
/// or expired artifact yields a success response with an empty body.
#[must_use]
pub fn build_artifact_response(
    in_response_to: &str,
    issuer: &str,
    message_xml: Option<&str>,
) -> String {
    let id = format!("_id{}", uuid::Uuid::new_v4());
    let issue_instant = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        "<samlp:ArtifactResponse xmlns:samlp=\"{SAMLP_NS}\" xmlns:saml=\"{SAML_NS}\" ID=\"{id}\" Version=\"2.0\" InResponseTo=\"{}\" IssueInstant=\"{issue_instant}\"><saml:Issuer>{}</saml:Issuer><samlp:Status><samlp:StatusCode Value=\"{}\"/></samlp:Status>{}</samlp:ArtifactResponse>",
        xml_escape(in_response_to),
        xml_escape(issuer),
        status_codes::SUCCESS,
        message_xml.unwrap_or_default()
    )
}

/// Consumes a stored artifact on the issuing side: fetch then delete, so a
/// second resolution comes back empty.
pub async fn resolve_artifact(
    store: &dyn ArtifactStore,
    artifact_b64: &str,
) -> SamlResult<Option<String>> {
    let value = store.get(ARTIFACT_STORE_NAMESPACE, artifact_b64).await?;
    if value.is_some() {
        store.delete(ARTIFACT_STORE_NAMESPACE, artifact_b64).await?;
    }
    Ok(value)
}

struct ParsedArtifactResponse {
    status_code: String,
    message: Option<String>,
}

/// Parses the top-level status code and the embedded message out of an
/// `ArtifactResponse`.
fn parse_artifact_response(xml: &str) -> SamlResult<ParsedArtifactResponse> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    let mut status_code = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                let local = e.local_name();
                if local.as_ref() == b"StatusCode" && status_code.is_none() {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"Value" {
                            status_code =
                                Some(attr.unescape_value().unwrap_or_default().to_string());
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SamlError::XmlParse(format!("ArtifactResponse: {e}"))),
            _ => {}
        }
    }

    let status_code = status_code
        .ok_or_else(|| SamlError::XmlParse("ArtifactResponse has no StatusCode".to_string()))?;

    // The embedded message is whatever follows the Status element inside
    // the ArtifactResponse.
    let status_end = ["</samlp:Status>", "</Status>"]
        .iter()
        .find_map(|close| xml.find(close).map(|pos| pos + close.len()))
        .ok_or_else(|| SamlError::XmlParse("ArtifactResponse has no Status".to_string()))?;
    let response_close = ["</samlp:ArtifactResponse>", "</ArtifactResponse>"]
        .iter()
        .find_map(|close| xml[status_end..].find(close).map(|pos| status_end + pos))
        .ok_or_else(|| {
            SamlError::XmlParse("ArtifactResponse is not properly closed".to_string())
        })?;

    let body = xml[status_end..response_close].trim();
    Ok(ParsedArtifactResponse {
        status_code,
        message: if body.is_empty() {
            None
        } else {
            Some(body.to_string())
        },
    })
}

/// Escapes XML special characters in text content.
fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::X509Key;
    use crate::message::MessageEnvelope;
    use crate::metadata::{EndpointRef, PeerMetadata};
    use crate::store::InMemoryArtifactStore;
    use async_trait::async_trait;
    use saml_crypto::{pem_to_der, RsaSigningKey, SignatureAlgorithm};
    use std::sync::Arc;

    const KEY_PEM: &str = include_str!("../../testdata/sp-key.pem");
    const CERT_PEM: &str = include_str!("../../testdata/sp-cert.pem");

    const IDP_ENTITY_ID: &str = "https://idp.example.org";
    const RESPONSE_XML: &str = "<samlp:Response xmlns:samlp=\"urn:oasis:names:tc:SAML:2.0:protocol\" ID=\"_r1\">payload</samlp:Response>";

    fn test_signer() -> RsaSigningKey {
        let cert_der = pem_to_der(CERT_PEM, "CERTIFICATE").unwrap();
        RsaSigningKey::from_pem(KEY_PEM, SignatureAlgorithm::RsaSha256)
            .unwrap()
            .with_certificate(cert_der)
    }

    fn trust_key() -> X509Key {
        let body: String = CERT_PEM
            .lines()
            .filter(|l| !l.starts_with("-----"))
            .collect();
        X509Key::from_certificate_data(&body)
    }

    struct FixedResolver {
        endpoint_index: u16,
        known: bool,
    }

    impl MetadataResolver for FixedResolver {
        fn config_for_sha1(&self, source_id_hex: &str, role: PeerRole) -> Option<PeerMetadata> {
            assert_eq!(role, PeerRole::IdentityProvider);
            let expected = Artifact::mint(IDP_ENTITY_ID, 0).source_id_hex();
            if !self.known || source_id_hex != expected {
                return None;
            }
            Some(PeerMetadata {
                entity_id: IDP_ENTITY_ID.to_string(),
                artifact_resolution_services: vec![EndpointRef {
                    index: self.endpoint_index,
                    binding: crate::constants::binding_urns::SOAP.to_string(),
                    location: "https://idp.example.org/ars".to_string(),
                }],
                ..PeerMetadata::default()
            })
        }
    }

    /// Plays the issuing side: resolves the artifact from its own store
    /// and answers with a signed ArtifactResponse.
    struct PeerResolutionService {
        store: Arc<InMemoryArtifactStore>,
    }

    #[async_trait]
    impl SoapClient for PeerResolutionService {
        async fn call(&self, _endpoint: &str, xml: &str) -> SamlResult<String> {
            let artifact = element_content(xml, "samlp:Artifact").expect("no Artifact element");
            let request_id = attribute(xml, "ID").expect("no request ID");
            let resolved = resolve_artifact(self.store.as_ref(), &artifact).await?;
            let response =
                build_artifact_response(&request_id, IDP_ENTITY_ID, resolved.as_deref());
            let response_id = attribute(&response, "ID").unwrap();
            xmlsig::sign_enveloped(&response, &response_id, &test_signer())
        }
    }

    fn element_content(xml: &str, element: &str) -> Option<String> {
        let open = format!("<{element}>");
        let close = format!("</{element}>");
        let start = xml.find(&open)? + open.len();
        let end = xml[start..].find(&close)? + start;
        Some(xml[start..end].to_string())
    }

    fn attribute(xml: &str, name: &str) -> Option<String> {
        let marker = format!("{name}=\"");
        let start = xml.find(&marker)? + marker.len();
        let end = xml[start..].find('"')? + start;
        Some(xml[start..end].to_string())
    }

    fn outbound_message() -> MessageEnvelope {
        MessageEnvelope::response(RESPONSE_XML)
            .with_issuer(IDP_ENTITY_ID)
            .with_destination("https://sp.example.org/acs")
            .with_relay_state("rs-1")
    }

    #[test]
    fn artifact_format_roundtrip() {
        let artifact = Artifact::mint(IDP_ENTITY_ID, 3);
        let encoded = artifact.to_base64();

        use base64::Engine;
        let raw = base64::engine::general_purpose::STANDARD
            .decode(&encoded)
            .unwrap();
        assert_eq!(raw.len(), 44);
        assert_eq!(&raw[0..2], &[0x00, 0x04]);
        assert_eq!(&raw[2..4], &[0x00, 0x03]);
        assert_eq!(&raw[4..24], &saml_crypto::sha1(IDP_ENTITY_ID.as_bytes()));

        let parsed = Artifact::from_base64(&encoded).unwrap();
        assert_eq!(parsed, artifact);
        assert_eq!(parsed.endpoint_index(), 3);
        assert_eq!(parsed.source_id_hex().len(), 40);
    }

    #[test]
    fn minted_artifacts_are_unique() {
        let a = Artifact::mint(IDP_ENTITY_ID, 0);
        let b = Artifact::mint(IDP_ENTITY_ID, 0);
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_artifacts_are_rejected() {
        assert!(matches!(
            Artifact::from_base64("!!!"),
            Err(SamlError::Base64Decode(_))
        ));

        use base64::Engine;
        let short = base64::engine::general_purpose::STANDARD.encode([0u8; 20]);
        assert!(matches!(
            Artifact::from_base64(&short),
            Err(SamlError::Decode(_))
        ));

        let mut wrong_type = vec![0x00, 0x02, 0x00, 0x00];
        wrong_type.extend_from_slice(&[0u8; 40]);
        let encoded = base64::engine::general_purpose::STANDARD.encode(&wrong_type);
        assert!(matches!(
            Artifact::from_base64(&encoded),
            Err(SamlError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn send_stores_message_and_redirects() {
        let store = InMemoryArtifactStore::new();
        let TransportDirective::Redirect(url) = HttpArtifactBinding::new()
            .send(&outbound_message(), Some(&store))
            .await
            .unwrap()
        else {
            panic!("expected a redirect directive");
        };

        assert!(url.starts_with("https://sp.example.org/acs?SAMLart="));
        assert!(url.contains("&RelayState=rs-1"));

        let artifact_b64 = {
            let raw = url.split("SAMLart=").nth(1).unwrap();
            let raw = raw.split('&').next().unwrap();
            urlencoding::decode(raw).unwrap().into_owned()
        };
        let stored = store
            .get(ARTIFACT_STORE_NAMESPACE, &artifact_b64)
            .await
            .unwrap();
        assert_eq!(stored.as_deref(), Some(RESPONSE_XML));
    }

    #[tokio::test]
    async fn send_without_store_is_fatal() {
        let err = HttpArtifactBinding::new()
            .send(&outbound_message(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SamlError::Configuration(_)));
    }

    #[tokio::test]
    async fn send_without_issuer_is_fatal() {
        let store = InMemoryArtifactStore::new();
        let message =
            MessageEnvelope::response(RESPONSE_XML).with_destination("https://sp.example.org/acs");
        let err = HttpArtifactBinding::new()
            .send(&message, Some(&store))
            .await
            .unwrap_err();
        assert!(matches!(err, SamlError::Configuration(_)));
    }

    async fn send_and_capture_artifact_query(store: &Arc<InMemoryArtifactStore>) -> String {
        let TransportDirective::Redirect(url) = HttpArtifactBinding::new()
            .send(&outbound_message(), Some(store.as_ref()))
            .await
            .unwrap()
        else {
            panic!("expected a redirect directive");
        };
        url.split_once('?').unwrap().1.to_string()
    }

    #[tokio::test]
    async fn artifact_roundtrip_recovers_stored_message() {
        let store = Arc::new(InMemoryArtifactStore::new());
        let query = send_and_capture_artifact_query(&store).await;

        let signer = test_signer();
        let resolver = FixedResolver {
            endpoint_index: 0,
            known: true,
        };
        let peer = PeerResolutionService {
            store: Arc::clone(&store),
        };
        let context = ArtifactResolutionContext {
            issuer: "https://sp.example.org",
            resolver: &resolver,
            soap: &peer,
            signer: &signer,
        };

        let exchange = InboundExchange::get().with_query(query);
        let received = HttpArtifactBinding::new()
            .receive(&exchange, &context)
            .await
            .unwrap();

        assert_eq!(received.xml, RESPONSE_XML);
        assert_eq!(received.relay_state.as_deref(), Some("rs-1"));

        // The deferred validation re-checks the ArtifactResponse signature.
        received
            .pending_validation
            .unwrap()
            .validate(&trust_key())
            .unwrap();
    }

    #[tokio::test]
    async fn second_resolution_is_a_suspected_replay() {
        let store = Arc::new(InMemoryArtifactStore::new());
        let query = send_and_capture_artifact_query(&store).await;

        let signer = test_signer();
        let resolver = FixedResolver {
            endpoint_index: 0,
            known: true,
        };
        let peer = PeerResolutionService {
            store: Arc::clone(&store),
        };
        let context = ArtifactResolutionContext {
            issuer: "https://sp.example.org",
            resolver: &resolver,
            soap: &peer,
            signer: &signer,
        };

        let exchange = InboundExchange::get().with_query(query);
        HttpArtifactBinding::new()
            .receive(&exchange, &context)
            .await
            .unwrap();

        let err = HttpArtifactBinding::new()
            .receive(&exchange, &context)
            .await
            .unwrap_err();
        assert!(matches!(err, SamlError::ReplaySuspected(_)));
    }

    #[tokio::test]
    async fn expired_artifact_behaves_like_a_replay() {
        let store = Arc::new(InMemoryArtifactStore::new());
        let query = send_and_capture_artifact_query(&store).await;

        // Force-expire the stored entry.
        let artifact_b64 = {
            let raw = query.split("SAMLart=").nth(1).unwrap();
            let raw = raw.split('&').next().unwrap();
            urlencoding::decode(raw).unwrap().into_owned()
        };
        let stored = store
            .get(ARTIFACT_STORE_NAMESPACE, &artifact_b64)
            .await
            .unwrap()
            .unwrap();
        store
            .set(ARTIFACT_STORE_NAMESPACE, &artifact_b64, &stored, 0)
            .await
            .unwrap();

        let signer = test_signer();
        let resolver = FixedResolver {
            endpoint_index: 0,
            known: true,
        };
        let peer = PeerResolutionService {
            store: Arc::clone(&store),
        };
        let context = ArtifactResolutionContext {
            issuer: "https://sp.example.org",
            resolver: &resolver,
            soap: &peer,
            signer: &signer,
        };

        let err = HttpArtifactBinding::new()
            .receive(&InboundExchange::get().with_query(query), &context)
            .await
            .unwrap_err();
        assert!(matches!(err, SamlError::ReplaySuspected(_)));
    }

    #[tokio::test]
    async fn unknown_peer_fails_closed() {
        let store = Arc::new(InMemoryArtifactStore::new());
        let query = send_and_capture_artifact_query(&store).await;

        let signer = test_signer();
        let resolver = FixedResolver {
            endpoint_index: 0,
            known: false,
        };
        let peer = PeerResolutionService {
            store: Arc::clone(&store),
        };
        let context = ArtifactResolutionContext {
            issuer: "https://sp.example.org",
            resolver: &resolver,
            soap: &peer,
            signer: &signer,
        };

        let err = HttpArtifactBinding::new()
            .receive(&InboundExchange::get().with_query(query), &context)
            .await
            .unwrap_err();
        assert!(matches!(err, SamlError::TrustResolution(_)));
    }

    #[tokio::test]
    async fn mismatched_endpoint_index_fails_closed() {
        let store = Arc::new(InMemoryArtifactStore::new());
        let query = send_and_capture_artifact_query(&store).await;

        let signer = test_signer();
        // Metadata declares only endpoint index 5; artifacts are minted
        // with index 0.
        let resolver = FixedResolver {
            endpoint_index: 5,
            known: true,
        };
        let peer = PeerResolutionService {
            store: Arc::clone(&store),
        };
        let context = ArtifactResolutionContext {
            issuer: "https://sp.example.org",
            resolver: &resolver,
            soap: &peer,
            signer: &signer,
        };

        let err = HttpArtifactBinding::new()
            .receive(&InboundExchange::get().with_query(query), &context)
            .await
            .unwrap_err();
        assert!(matches!(err, SamlError::TrustResolution(_)));
    }

    #[tokio::test]
    async fn non_success_status_is_surfaced() {
        struct FailingService;

        #[async_trait]
        impl SoapClient for FailingService {
            async fn call(&self, _endpoint: &str, xml: &str) -> SamlResult<String> {
                let request_id = attribute(xml, "ID").unwrap();
                Ok(format!(
                    "<samlp:ArtifactResponse xmlns:samlp=\"{SAMLP_NS}\" ID=\"_x\" Version=\"2.0\" InResponseTo=\"{request_id}\"><samlp:Status><samlp:StatusCode Value=\"{}\"/></samlp:Status></samlp:ArtifactResponse>",
                    status_codes::RESPONDER
                ))
            }
        }

        let store = Arc::new(InMemoryArtifactStore::new());
        let query = send_and_capture_artifact_query(&store).await;

        let signer = test_signer();
        let resolver = FixedResolver {
            endpoint_index: 0,
            known: true,
        };
        let context = ArtifactResolutionContext {
            issuer: "https://sp.example.org",
            resolver: &resolver,
            soap: &FailingService,
            signer: &signer,
        };

        let err = HttpArtifactBinding::new()
            .receive(&InboundExchange::get().with_query(query), &context)
            .await
            .unwrap_err();
        assert!(matches!(err, SamlError::ArtifactResolution(_)));
    }

    #[test]
    fn artifact_response_parsing() {
        let with_message = build_artifact_response("_req", IDP_ENTITY_ID, Some(RESPONSE_XML));
        let parsed = parse_artifact_response(&with_message).unwrap();
        assert_eq!(parsed.status_code, status_codes::SUCCESS);
        assert_eq!(parsed.message.as_deref(), Some(RESPONSE_XML));

        let empty = build_artifact_response("_req", IDP_ENTITY_ID, None);
        let parsed = parse_artifact_response(&empty).unwrap();
        assert_eq!(parsed.status_code, status_codes::SUCCESS);
        assert!(parsed.message.is_none());
    }
}
