//! SOAP binding.
//!
//! A synchronous RPC envelope: the message XML travels as the single child
//! of a SOAP 1.1 `Body`. Used directly for back-channel exchanges and as
//! the transport for artifact resolution. No retry policy lives here; a
//! failed or malformed round trip surfaces as an error and callers own
//! their timeouts.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{SamlError, SamlResult};
use crate::message::{detect_message_type, ReceivedMessage, SamlMessage};

use super::InboundExchange;

/// SOAP 1.1 envelope namespace.
pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Wraps message XML in a SOAP 1.1 envelope.
#[must_use]
pub fn wrap_envelope(xml: &str) -> String {
    format!(
        "<SOAP-ENV:Envelope xmlns:SOAP-ENV=\"{SOAP_ENVELOPE_NS}\"><SOAP-ENV:Body>{xml}</SOAP-ENV:Body></SOAP-ENV:Envelope>"
    )
}

/// Extracts the body content of a SOAP envelope.
///
/// # Errors
///
/// Fails with [`SamlError::Soap`] when no `Body` element is found.
pub fn unwrap_envelope(envelope: &str) -> SamlResult<String> {
    // Body open/close tag pairs seen in the wild.
    let prefixes = ["SOAP-ENV:", "soap:", "soapenv:", "env:", ""];

    for prefix in prefixes {
        let open = format!("<{prefix}Body");
        let close = format!("</{prefix}Body>");
        if let Some(open_start) = envelope.find(open.as_str()) {
            let content_start = match envelope[open_start..].find('>') {
                Some(offset) => open_start + offset + 1,
                None => continue,
            };
            if let Some(close_start) = envelope[content_start..].find(close.as_str()) {
                return Ok(envelope[content_start..content_start + close_start]
                    .trim()
                    .to_string());
            }
        }
    }

    Err(SamlError::Soap(
        "no Body element found in SOAP envelope".to_string(),
    ))
}

/// A synchronous SOAP transport.
#[async_trait]
pub trait SoapClient: Send + Sync {
    /// Sends message XML to an endpoint and returns the peer's response
    /// message, unwrapped from its envelope.
    async fn call(&self, endpoint: &str, xml: &str) -> SamlResult<String>;
}

/// SOAP client over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpSoapClient {
    client: reqwest::Client,
}

impl HttpSoapClient {
    /// Creates a client with a 30 second request timeout.
    ///
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be built.
    pub fn new() -> SamlResult<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Creates a client with the given request timeout.
    ///
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be built.
    pub fn with_timeout(timeout: Duration) -> SamlResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SamlError::Soap(format!("could not build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SoapClient for HttpSoapClient {
    async fn call(&self, endpoint: &str, xml: &str) -> SamlResult<String> {
        let envelope = wrap_envelope(xml);

        let response = self
            .client
            .post(endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", "\"\"")
            .body(envelope)
            .send()
            .await
            .map_err(|e| SamlError::Soap(format!("SOAP call to {endpoint} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SamlError::Soap(format!(
                "SOAP endpoint {endpoint} returned HTTP {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SamlError::Soap(format!("could not read SOAP response: {e}")))?;
        unwrap_envelope(&body)
    }
}

/// SOAP binding send/receive.
#[derive(Debug, Default)]
pub struct SoapBinding {
    destination: Option<String>,
}

impl SoapBinding {
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

    /// Performs the synchronous SOAP round trip and returns the peer's
    /// response message.
    ///
    /// # Errors
    ///
    /// Fails with [`SamlError::Configuration`] when no destination is
    /// available and with [`SamlError::Soap`] on transport errors.
    pub async fn send(
        &self,
        message: &dyn SamlMessage,
        client: &dyn SoapClient,
    ) -> SamlResult<ReceivedMessage> {
        let destination = self
            .destination
            .as_deref()
            .or_else(|| message.destination())
            .ok_or_else(|| {
                SamlError::Configuration("no destination available for SOAP send".to_string())
            })?;

        let response_xml = client.call(destination, &message.to_xml()).await?;
        let message_type = detect_message_type(&response_xml);

        Ok(ReceivedMessage {
            xml: response_xml,
            message_type,
            relay_state: None,
            pending_validation: None,
        })
    }

    /// Decodes an inbound SOAP exchange into the carried message.
    ///
    /// # Errors
    ///
    /// Fails when the exchange has no body or the envelope is malformed.
    pub fn receive(exchange: &InboundExchange) -> SamlResult<ReceivedMessage> {
        let body = exchange
            .body()
            .ok_or_else(|| SamlError::Decode("no request body present".to_string()))?;
        let xml = unwrap_envelope(body)?;
        if xml.is_empty() {
            return Err(SamlError::Decode("empty SOAP body".to_string()));
        }
        let message_type = detect_message_type(&xml);

        Ok(ReceivedMessage {
            xml,
            message_type,
            relay_state: None,
            pending_validation: None,
        })
    }
}
