//! SAML 2.0 transport bindings and signature trust validation.
//!
//! This crate implements the wire layer of a SAML 2.0 deployment:
//!
//! - **HTTP-Redirect binding** - DEFLATE + base64 + query-string signatures
//! - **HTTP-POST binding** - base64 in an auto-submitting HTML form
//! - **HTTP-Artifact binding** - opaque artifact references resolved
//!   out-of-band over SOAP
//! - **SOAP binding** - synchronous RPC envelope
//! - **Key loading and signature trust** - gathering candidate keys from a
//!   trust configuration and deciding whether a message signature is valid
//!
//! The XML object model for protocol messages is deliberately out of scope:
//! bindings consume messages through the narrow [`SamlMessage`] capability
//! and produce [`ReceivedMessage`] values carrying the decoded XML text.
//!
//! # Architecture
//!
//! - [`keys`] - Key/certificate model and the key loader
//! - [`trust`] - The signature trust validator
//! - [`message`] - Message envelope contract and deferred validation
//! - [`bindings`] - Binding dispatch and the four concrete bindings
//! - [`metadata`] - Peer metadata resolver interface
//! - [`store`] - Artifact storage interface
//! - [`xmlsig`] - Enveloped XML signature creation and verification
//! - [`error`] - Error types
//!
//! # SAML Specifications
//!
//! - [SAML 2.0 Core](https://docs.oasis-open.org/security/saml/v2.0/saml-core-2.0-os.pdf)
//! - [SAML 2.0 Bindings](https://docs.oasis-open.org/security/saml/v2.0/saml-bindings-2.0-os.pdf)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod constants;
pub mod error;
pub mod keys;
pub mod message;
pub mod metadata;
pub mod store;
pub mod trust;
pub mod xmlsig;

pub use bindings::{InboundExchange, SamlBinding, TransportDirective};
pub use error::{SamlError, SamlResult};
pub use message::{MessageEnvelope, PendingValidation, ReceivedMessage, SamlMessage, SamlMessageType};
