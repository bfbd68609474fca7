//! HTTP-Redirect binding.
//!
//! Messages are DEFLATE-compressed (raw deflate, no zlib framing),
//! base64-encoded and percent-encoded into a query parameter. A signing
//! key produces a detached signature over the exact query-string bytes in
//! the fixed field order `SAMLRequest|SAMLResponse`, `RelayState`,
//! `SigAlg`; the receiver reconstructs that byte sequence from the raw
//! query string and defers verification until a trust key is available.

use std::io::{Read, Write};

use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::constants::SAML_ENCODING_DEFLATE;
use crate::error::{SamlError, SamlResult};
use crate::message::{PendingValidation, ReceivedMessage, SamlMessage, SamlMessageType};

use super::{parse_raw_query, InboundExchange, TransportDirective};

/// HTTP-Redirect binding encoder/decoder.
#[derive(Debug, Default)]
pub struct HttpRedirectBinding {
    destination: Option<String>,
}

impl HttpRedirectBinding {
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

    /// Encodes a message into a redirect URL, signing the query string when
    /// the message carries a signing key.
    ///
    /// # Errors
    ///
    /// Fails with [`SamlError::Configuration`] when no destination is
    /// available, and with decode/signing errors otherwise.
    pub fn send(&self, message: &dyn SamlMessage) -> SamlResult<TransportDirective> {
        let destination = self
            .destination
            .as_deref()
            .or_else(|| message.destination())
            .ok_or_else(|| {
                SamlError::Configuration(
                    "no destination available for HTTP-Redirect send".to_string(),
                )
            })?;

        let compressed = deflate_compress(message.to_xml().as_bytes())?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&compressed);

        let param_name = message.message_type().form_param();
        let mut query = format!("{}={}", param_name, urlencoding::encode(&encoded));

        if let Some(relay_state) = message.relay_state() {
            query.push_str(&format!(
                "&RelayState={}",
                urlencoding::encode(relay_state)
            ));
        }

        if let Some(key) = message.signing_key() {
            // The signature covers the query string bytes built so far plus
            // the SigAlg parameter, in exactly this order.
            query.push_str(&format!(
                "&SigAlg={}",
                urlencoding::encode(key.algorithm().uri())
            ));
            let signature = key.sign(query.as_bytes())?;
            let signature_b64 = base64::engine::general_purpose::STANDARD.encode(&signature);
            query.push_str(&format!(
                "&Signature={}",
                urlencoding::encode(&signature_b64)
            ));
        }

        let separator = if destination.contains('?') { '&' } else { '?' };
        Ok(TransportDirective::Redirect(format!(
            "{destination}{separator}{query}"
        )))
    }

    /// Decodes a message from an inbound redirect exchange.
    ///
    /// The raw query string is parsed manually so each field keeps its
    /// original percent-encoding; when `Signature`/`SigAlg` are present the
    /// reconstructed signed byte sequence is attached as a
    /// [`PendingValidation`] instead of being verified here, since the
    /// trust key is looked up from peer metadata by the caller.
    ///
    /// # Errors
    ///
    /// Any decode failure (missing parameter, unknown `SAMLEncoding`, bad
    /// base64, inflate failure, invalid UTF-8) aborts reconstruction.
    pub fn receive(&self, exchange: &InboundExchange) -> SamlResult<ReceivedMessage> {
        let raw_query = exchange
            .raw_query()
            .ok_or_else(|| SamlError::Decode("no query string present".to_string()))?;
        let params = parse_raw_query(raw_query);

        let (param_name, raw_value, message_type) =
            if let Some(value) = lookup(&params, "SAMLRequest") {
                ("SAMLRequest", value, SamlMessageType::Request)
            } else if let Some(value) = lookup(&params, "SAMLResponse") {
                ("SAMLResponse", value, SamlMessageType::Response)
            } else {
                return Err(SamlError::Decode(
                    "no SAMLRequest or SAMLResponse parameter".to_string(),
                ));
            };

        if let Some(encoding_raw) = lookup(&params, "SAMLEncoding") {
            let encoding = urldecode(encoding_raw)?;
            if encoding != SAML_ENCODING_DEFLATE {
                return Err(SamlError::Decode(format!(
                    "unknown SAMLEncoding: {encoding}"
                )));
            }
        }

        let url_decoded = urldecode(raw_value)?;
        let b64_decoded = base64::engine::general_purpose::STANDARD
            .decode(url_decoded.as_bytes())
            .map_err(|e| SamlError::Base64Decode(e.to_string()))?;
        let xml_bytes = deflate_decompress(&b64_decoded)?;
        let xml = String::from_utf8(xml_bytes)
            .map_err(|e| SamlError::Decode(format!("invalid UTF-8 in message: {e}")))?;

        let relay_state_raw = lookup(&params, "RelayState");
        let relay_state = relay_state_raw.map(urldecode).transpose()?;

        let pending_validation = match (lookup(&params, "Signature"), lookup(&params, "SigAlg")) {
            (Some(signature_raw), Some(sig_alg_raw)) => {
                // Rebuild the exact byte string the sender signed from the
                // raw url-encoded values, in the fixed field order.
                let mut signed_query = format!("{param_name}={raw_value}");
                if let Some(relay_raw) = relay_state_raw {
                    signed_query.push_str(&format!("&RelayState={relay_raw}"));
                }
                signed_query.push_str(&format!("&SigAlg={sig_alg_raw}"));

                Some(PendingValidation::RedirectQuery {
                    signed_query: signed_query.into_bytes(),
                    sig_alg: urldecode(sig_alg_raw)?,
                    signature: urldecode(signature_raw)?,
                })
            }
            _ => None,
        };

        Ok(ReceivedMessage {
            xml,
            message_type,
            relay_state,
            pending_validation,
        })
    }
}

fn lookup<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

fn urldecode(raw: &str) -> SamlResult<String> {
    urlencoding::decode(raw)
        .map(|v| v.into_owned())
        .map_err(|e| SamlError::Decode(format!("URL decode error: {e}")))
}

/// Compresses data using raw DEFLATE (no zlib header).
fn deflate_compress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| SamlError::Deflate(format!("compression error: {e}")))?;
    encoder
        .finish()
        .map_err(|e| SamlError::Deflate(format!("compression finish error: {e}")))
}

/// Decompresses raw DEFLATE data.
fn deflate_decompress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| SamlError::Deflate(format!("decompression error: {e}")))?;
    Ok(decompressed)
}
