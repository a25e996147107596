//! Conversions between certificates/keys and their PEM, DER and base64 forms.
//!
//! Everything here is pure: byte buffers in, byte buffers out.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::cert::{CERTIFICATE_PEM_LABEL, Certificate};
use crate::error::{CertGenError, Result};
use crate::key::KeyPair;

/// PEM label of a PKCS#8 private key.
pub const PRIVATE_KEY_PEM_LABEL: &str = "PRIVATE KEY";

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
///
/// Lines are wrapped at 64 characters and end in `\n`.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(
        &pem,
        pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
    )
}

/// Parses the first PEM block in `input` and checks its label.
///
/// A missing or broken envelope is [`CertGenError::MalformedPem`]; a
/// well-formed envelope with another label is [`CertGenError::ParseFailed`].
pub fn pem_to_der_with_label(input: impl AsRef<[u8]>, label: &str) -> Result<Vec<u8>> {
    let block = pem::parse(input)?;
    if block.tag() != label {
        return Err(CertGenError::parse(
            "PEM block",
            format!("expected {label:?}, found {:?}", block.tag()),
        ));
    }
    Ok(block.into_contents())
}

/// Wraps the certificate's raw signed bytes in a `CERTIFICATE` envelope.
pub fn encode_certificate_to_pem(cert: &Certificate) -> String {
    cert.to_pem()
}

/// Serializes the key as PKCS#8 and wraps it in a `PRIVATE KEY` envelope.
pub fn encode_private_key_to_pem(key: &KeyPair) -> Result<String> {
    Ok(der_to_pem(&key.to_pkcs8_der()?, PRIVATE_KEY_PEM_LABEL))
}

/// Strips the PEM envelope of the first block, whatever its label.
pub fn convert_pem_to_der(input: impl AsRef<[u8]>) -> Result<Vec<u8>> {
    Ok(pem::parse(input)?.into_contents())
}

/// Standard-alphabet base64 with padding and no line breaks.
pub fn encode_der_to_base64(der: &[u8]) -> String {
    STANDARD.encode(der)
}

/// Base64 of the certificate's raw DER bytes.
pub fn convert_certificate_to_base64_der(cert: &Certificate) -> String {
    encode_der_to_base64(cert.as_der())
}

/// Inverse of [`encode_certificate_to_pem`].
pub fn decode_pem_certificate(input: impl AsRef<[u8]>) -> Result<Certificate> {
    let der = pem_to_der_with_label(input, CERTIFICATE_PEM_LABEL)?;
    Certificate::from_der(&der)
}

/// Inverse of [`encode_private_key_to_pem`].
///
/// Fails with [`CertGenError::WrongKeyType`] when the PKCS#8 document holds
/// a key other than RSA.
pub fn decode_pem_private_key(input: impl AsRef<[u8]>) -> Result<KeyPair> {
    let der = pem_to_der_with_label(input, PRIVATE_KEY_PEM_LABEL)?;
    KeyPair::from_pkcs8_der(&der)
}
