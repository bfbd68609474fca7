//! Transport binding abstraction and dispatch.
//!
//! The set of bindings is fixed by the SAML 2.0 specification, so a
//! binding is a tagged variant, resolved either from a binding URN in
//! metadata or from the shape of an inbound HTTP exchange. Inbound
//! requests are always described by an explicit [`InboundExchange`] value,
//! never by ambient request state.

mod artifact;
mod post;
mod redirect;
mod soap;

pub use artifact::{
    build_artifact_response, resolve_artifact, Artifact, ArtifactResolutionContext,
    HttpArtifactBinding, ARTIFACT_LIFETIME_SECS, ARTIFACT_STORE_NAMESPACE, ARTIFACT_TYPE_CODE,
};
pub use post::HttpPostBinding;
pub use redirect::HttpRedirectBinding;
pub use soap::{unwrap_envelope, wrap_envelope, HttpSoapClient, SoapBinding, SoapClient};

use crate::constants::binding_urns;
use crate::error::{SamlError, SamlResult};
use crate::message::ReceivedMessage;

/// HTTP method of an inbound exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// HTTP GET.
    Get,
    /// HTTP POST.
    Post,
}

/// An inbound HTTP exchange, captured as an explicit value.
///
/// The query string is kept raw so that the Redirect binding can
/// reconstruct the exact byte sequence the sender signed; form fields are
/// already decoded by the time a web framework hands them over.
#[derive(Debug, Clone)]
pub struct InboundExchange {
    method: HttpMethod,
    query: Option<String>,
    form: Vec<(String, String)>,
    content_type: Option<String>,
    body: Option<String>,
}

impl InboundExchange {
    /// Describes a GET exchange.
    #[must_use]
    pub fn get() -> Self {
        Self::new(HttpMethod::Get)
    }

    /// Describes a POST exchange.
    #[must_use]
    pub fn post() -> Self {
        Self::new(HttpMethod::Post)
    }

    fn new(method: HttpMethod) -> Self {
        Self {
            method,
            query: None,
            form: Vec::new(),
            content_type: None,
            body: None,
        }
    }

    /// Sets the raw query string (percent-encoding preserved).
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Adds a decoded form field.
    #[must_use]
    pub fn with_form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((name.into(), value.into()));
        self
    }

    /// Sets the Content-Type header value.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sets the raw request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// The HTTP method.
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    /// The raw query string, if any.
    #[must_use]
    pub fn raw_query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// The Content-Type header value, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The raw request body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// A decoded form field by name.
    #[must_use]
    pub fn form_field(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// A query parameter value with percent-encoding still applied.
    #[must_use]
    pub fn raw_query_param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        parse_raw_query(query)
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// A decoded query parameter value.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        let raw = self.raw_query_param(name)?;
        urlencoding::decode(&raw).ok().map(|v| v.into_owned())
    }

    /// Names of all present query parameters and form fields, for
    /// diagnostics.
    #[must_use]
    pub fn parameter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .query
            .as_deref()
            .map(|q| parse_raw_query(q).into_iter().map(|(n, _)| n).collect())
            .unwrap_or_default();
        names.extend(self.form.iter().map(|(n, _)| n.clone()));
        names
    }
}

/// Splits a raw query string into (decoded name, raw value) pairs.
///
/// Values keep their original percent-encoding so signed byte sequences
/// can be reconstructed exactly.
pub(crate) fn parse_raw_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) => (decode_name(name), value.to_string()),
            None => (decode_name(pair), String::new()),
        })
        .collect()
}

fn decode_name(name: &str) -> String {
    urlencoding::decode(name)
        .map(|n| n.into_owned())
        .unwrap_or_else(|_| name.to_string())
}

/// The transport side-effect produced by a `send`.
///
/// Sending ends the calling request's lifecycle; the caller's only job is
/// to emit the described response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportDirective {
    /// Issue an HTTP redirect to this URL.
    Redirect(String),
    /// Render this HTML document (an auto-submitting form).
    HtmlForm(String),
}

/// A transport binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamlBinding {
    /// HTTP-Redirect binding.
    HttpRedirect,
    /// HTTP-POST binding.
    HttpPost,
    /// HTTP-Artifact binding.
    HttpArtifact,
    /// SOAP binding.
    Soap,
}

impl SamlBinding {
    /// Returns the URN for this binding.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::HttpRedirect => binding_urns::HTTP_REDIRECT,
            Self::HttpPost => binding_urns::HTTP_POST,
            Self::HttpArtifact => binding_urns::HTTP_ARTIFACT,
            Self::Soap => binding_urns::SOAP,
        }
    }

    /// Resolves a binding implementation from a binding URN.
    ///
    /// The holder-of-key SSO profile is carried over HTTP-POST and PAOS
    /// over SOAP.
    ///
    /// # Errors
    ///
    /// Unknown URNs fail with [`SamlError::UnsupportedBinding`].
    pub fn resolve(urn: &str) -> SamlResult<Self> {
        match urn {
            binding_urns::HTTP_REDIRECT => Ok(Self::HttpRedirect),
            binding_urns::HTTP_POST | binding_urns::HOK_SSO => Ok(Self::HttpPost),
            binding_urns::HTTP_ARTIFACT => Ok(Self::HttpArtifact),
            binding_urns::PAOS => Ok(Self::Soap),
            _ => Err(SamlError::UnsupportedBinding(urn.to_string())),
        }
    }

    /// Determines the binding used by an inbound exchange.
    ///
    /// # Errors
    ///
    /// Fails with [`SamlError::BindingDetection`] when no rule matches,
    /// after logging the exchange shape for operator troubleshooting.
    pub fn detect(exchange: &InboundExchange) -> SamlResult<Self> {
        match exchange.method() {
            HttpMethod::Get => {
                if exchange.raw_query_param("SAMLRequest").is_some()
                    || exchange.raw_query_param("SAMLResponse").is_some()
                {
                    return Ok(Self::HttpRedirect);
                }
                if exchange.raw_query_param("SAMLart").is_some() {
                    return Ok(Self::HttpArtifact);
                }
            }
            HttpMethod::Post => {
                if exchange.form_field("SAMLRequest").is_some()
                    || exchange.form_field("SAMLResponse").is_some()
                {
                    return Ok(Self::HttpPost);
                }
                if exchange.form_field("SAMLart").is_some() {
                    return Ok(Self::HttpArtifact);
                }
                if let Some(content_type) = exchange.content_type() {
                    let media_type = content_type
                        .split(';')
                        .next()
                        .unwrap_or(content_type)
                        .trim();
                    if media_type == "text/xml" || media_type == "application/soap+xml" {
                        return Ok(Self::Soap);
                    }
                }
            }
        }

        tracing::warn!(
            "Unable to determine binding: method={:?} parameters={:?} content_type={:?}",
            exchange.method(),
            exchange.parameter_names(),
            exchange.content_type()
        );
        Err(SamlError::BindingDetection(
            "no SAML message parameter or recognized content type present".to_string(),
        ))
    }

    /// Detects the binding of an inbound exchange and decodes it.
    ///
    /// The Artifact binding needs an out-of-band resolution context; pass
    /// `None` when artifact exchanges are not expected.
    ///
    /// # Errors
    ///
    /// Propagates detection and decode errors; an artifact exchange with no
    /// context fails with [`SamlError::Configuration`].
    pub async fn receive_any(
        exchange: &InboundExchange,
        artifact_context: Option<&ArtifactResolutionContext<'_>>,
    ) -> SamlResult<ReceivedMessage> {
        match Self::detect(exchange)? {
            Self::HttpRedirect => HttpRedirectBinding::new().receive(exchange),
            Self::HttpPost => HttpPostBinding::new().receive(exchange),
            Self::HttpArtifact => {
                let context = artifact_context.ok_or_else(|| {
                    SamlError::Configuration(
                        "no artifact resolution context configured".to_string(),
                    )
                })?;
                HttpArtifactBinding::new().receive(exchange, context).await
            }
            Self::Soap => SoapBinding::receive(exchange),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_uri_roundtrip() {
        for binding in [
            SamlBinding::HttpRedirect,
            SamlBinding::HttpPost,
            SamlBinding::HttpArtifact,
        ] {
            assert_eq!(SamlBinding::resolve(binding.uri()).unwrap(), binding);
        }
    }

    #[test]
    fn resolve_maps_profile_urns() {
        assert_eq!(
            SamlBinding::resolve(binding_urns::HOK_SSO).unwrap(),
            SamlBinding::HttpPost
        );
        assert_eq!(
            SamlBinding::resolve(binding_urns::PAOS).unwrap(),
            SamlBinding::Soap
        );
    }

    #[test]
    fn resolve_rejects_unknown_urn() {
        let err = SamlBinding::resolve("urn:example:not-a-binding").unwrap_err();
        assert!(matches!(err, SamlError::UnsupportedBinding(_)));
    }

    #[test]
    fn detect_redirect_from_get_query() {
        let exchange = InboundExchange::get().with_query("SAMLRequest=abc&RelayState=xyz");
        assert_eq!(
            SamlBinding::detect(&exchange).unwrap(),
            SamlBinding::HttpRedirect
        );
    }

    #[test]
    fn detect_artifact_from_get_query() {
        let exchange = InboundExchange::get().with_query("SAMLart=abc");
        assert_eq!(
            SamlBinding::detect(&exchange).unwrap(),
            SamlBinding::HttpArtifact
        );
    }

    #[test]
    fn detect_post_from_form_field() {
        let exchange = InboundExchange::post().with_form_field("SAMLResponse", "abc");
        assert_eq!(
            SamlBinding::detect(&exchange).unwrap(),
            SamlBinding::HttpPost
        );
    }

    #[test]
    fn detect_artifact_from_form_field() {
        let exchange = InboundExchange::post().with_form_field("SAMLart", "abc");
        assert_eq!(
            SamlBinding::detect(&exchange).unwrap(),
            SamlBinding::HttpArtifact
        );
    }

    #[test]
    fn detect_soap_from_content_type() {
        let exchange = InboundExchange::post().with_content_type("text/xml; charset=utf-8");
        assert_eq!(SamlBinding::detect(&exchange).unwrap(), SamlBinding::Soap);

        let exchange = InboundExchange::post().with_content_type("application/soap+xml");
        assert_eq!(SamlBinding::detect(&exchange).unwrap(), SamlBinding::Soap);
    }

    #[test]
    fn detection_failure_is_diagnosable() {
        let exchange = InboundExchange::post()
            .with_form_field("username", "alice")
            .with_content_type("application/x-www-form-urlencoded");
        let err = SamlBinding::detect(&exchange).unwrap_err();
        assert!(matches!(err, SamlError::BindingDetection(_)));
    }

    #[test]
    fn raw_query_values_keep_percent_encoding() {
        let exchange = InboundExchange::get().with_query("SAMLRequest=a%2Bb&RelayState=x%20y");
        assert_eq!(
            exchange.raw_query_param("SAMLRequest").as_deref(),
            Some("a%2Bb")
        );
        assert_eq!(exchange.query_param("SAMLRequest").as_deref(), Some("a+b"));
        assert_eq!(exchange.query_param("RelayState").as_deref(), Some("x y"));
    }

    #[test]
    fn parameter_names_cover_query_and_form() {
        let exchange = InboundExchange::post()
            .with_query("SAMLart=abc")
            .with_form_field("RelayState", "xyz");
        let names = exchange.parameter_names();
        assert!(names.contains(&"SAMLart".to_string()));
        assert!(names.contains(&"RelayState".to_string()));
    }
}
