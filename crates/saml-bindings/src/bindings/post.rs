//! HTTP-POST binding.
//!
//! Messages are base64-encoded (no compression) and delivered as the value
//! of a hidden field in an auto-submitting HTML form. A signature, if any,
//! is an enveloped XML signature inside the message document itself, so
//! validation belongs to the trust validator rather than this binding.

use base64::Engine;

use crate::error::{SamlError, SamlResult};
use crate::message::{ReceivedMessage, SamlMessage, SamlMessageType};

use super::{InboundExchange, TransportDirective};

/// HTTP-POST binding encoder/decoder.
#[derive(Debug, Default)]
pub struct HttpPostBinding {
    destination: Option<String>,
}

impl HttpPostBinding {
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

    /// Encodes a message into an auto-submitting HTML form.
    ///
    /// # Errors
    ///
    /// Fails with [`SamlError::Configuration`] when no destination is
    /// available.
    pub fn send(&self, message: &dyn SamlMessage) -> SamlResult<TransportDirective> {
        let destination = self.resolve_destination(message)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(message.to_xml());
        let param_name = message.message_type().form_param();

        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>SAML POST Binding</title>
</head>
<body onload="document.forms[0].submit()">
    <noscript>
        <p>JavaScript is disabled. Click the button below to continue.</p>
    </noscript>
    <form method="post" action="{}">
        <input type="hidden" name="{}" value="{}"/>
        {}
        <noscript>
            <input type="submit" value="Continue"/>
        </noscript>
    </form>
</body>
</html>"#,
            html_escape(destination),
            param_name,
            encoded,
            relay_state_input(message.relay_state()),
        );

        Ok(TransportDirective::HtmlForm(html))
    }

    /// Encodes a message into a form with a visible submit button and no
    /// auto-submit script, for no-JavaScript flows.
    ///
    /// # Errors
    ///
    /// Fails with [`SamlError::Configuration`] when no destination is
    /// available.
    pub fn send_manual(
        &self,
        message: &dyn SamlMessage,
        button_text: &str,
    ) -> SamlResult<TransportDirective> {
        let destination = self.resolve_destination(message)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(message.to_xml());
        let param_name = message.message_type().form_param();

        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>SAML Authentication</title>
</head>
<body>
    <form method="post" action="{}">
        <input type="hidden" name="{}" value="{}"/>
        {}
        <button type="submit">{}</button>
    </form>
</body>
</html>"#,
            html_escape(destination),
            param_name,
            encoded,
            relay_state_input(message.relay_state()),
            html_escape(button_text),
        );

        Ok(TransportDirective::HtmlForm(html))
    }

    /// Decodes a message from an inbound POST exchange.
    ///
    /// # Errors
    ///
    /// Fails when neither `SAMLRequest` nor `SAMLResponse` is present or
    /// the payload does not decode.
    pub fn receive(&self, exchange: &InboundExchange) -> SamlResult<ReceivedMessage> {
        let (encoded, message_type) = if let Some(value) = exchange.form_field("SAMLRequest") {
            (value, SamlMessageType::Request)
        } else if let Some(value) = exchange.form_field("SAMLResponse") {
            (value, SamlMessageType::Response)
        } else {
            return Err(SamlError::Decode(
                "no SAMLRequest or SAMLResponse parameter".to_string(),
            ));
        };

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| SamlError::Base64Decode(e.to_string()))?;
        let xml = String::from_utf8(decoded)
            .map_err(|e| SamlError::Decode(format!("invalid UTF-8 in message: {e}")))?;

        Ok(ReceivedMessage {
            xml,
            message_type,
            relay_state: exchange.form_field("RelayState").map(String::from),
            // Embedded XML signatures are the trust validator's concern.
            pending_validation: None,
        })
    }

    fn resolve_destination<'a>(&'a self, message: &'a dyn SamlMessage) -> SamlResult<&'a str> {
        self.destination
            .as_deref()
            .or_else(|| message.destination())
            .ok_or_else(|| {
                SamlError::Configuration("no destination available for HTTP-POST send".to_string())
            })
    }
}

fn relay_state_input(relay_state: Option<&str>) -> String {
    relay_state
        .map(|rs| {
            format!(
                r#"<input type="hidden" name="RelayState" value="{}"/>"#,
                html_escape(rs)
            )
        })
        .unwrap_or_default()
}

/// Escapes HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
