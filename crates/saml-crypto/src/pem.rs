//! PEM framing helpers.

use base64::Engine;

/// Extracts DER data from a PEM string.
///
/// Returns `None` if no `BEGIN <label>` / `END <label>` block is present or
/// the base64 body does not decode.
#[must_use]
pub fn pem_to_der(pem: &str, label: &str) -> Option<Vec<u8>> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");

    let start = pem.find(&begin)? + begin.len();
    let end_pos = pem.find(&end)?;
    if end_pos < start {
        return None;
    }

    let b64_data: String = pem[start..end_pos]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    base64::engine::general_purpose::STANDARD
        .decode(&b64_data)
        .ok()
}

/// Wraps DER data into PEM framing with 64-column base64 lines.
#[must_use]
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let b64 = base64::engine::general_purpose::STANDARD.encode(der);
    let mut out = format!("-----BEGIN {label}-----\n");
    for chunk in b64.as_bytes().chunks(64) {
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        out.push('\n');
    }
    out.push_str(&format!("-----END {label}-----\n"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const CERT_PEM: &str = include_str!("../testdata/test-cert.pem");

    #[test]
    fn pem_to_der_extracts_certificate() {
        let der = pem_to_der(CERT_PEM, "CERTIFICATE").unwrap();
        // DER SEQUENCE tag
        assert_eq!(der[0], 0x30);
    }

    #[test]
    fn pem_to_der_rejects_wrong_label() {
        assert!(pem_to_der(CERT_PEM, "PRIVATE KEY").is_none());
    }

    #[test]
    fn pem_roundtrip() {
        let der = pem_to_der(CERT_PEM, "CERTIFICATE").unwrap();
        let pem = der_to_pem(&der, "CERTIFICATE");
        assert_eq!(pem_to_der(&pem, "CERTIFICATE").unwrap(), der);
        // 64-column body lines
        for line in pem.lines().filter(|l| !l.starts_with("-----")) {
            assert!(line.len() <= 64);
        }
    }
}
