//! PEM armor for keys, certificates and certificate requests.
//!
//! Decoding takes the first block of the input and ignores its label.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pkcs8::EncodePublicKey;
use rsa::RsaPublicKey;

use crate::cert::Certificate;
use crate::cert::request::CertificateSigningRequest;
use crate::error::{CertError, Result};
use crate::key::KeyPair;

pub const PRIVATE_KEY_LABEL: &str = "RSA PRIVATE KEY";
pub const PUBLIC_KEY_LABEL: &str = "RSA PUBLIC KEY";
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";
pub const CERTIFICATE_REQUEST_LABEL: &str = "CERTIFICATE REQUEST";

/// Convert DER-encoded data into a PEM-encoded string with the provided label.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(
        &pem,
        pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
    )
}

/// Convert the first PEM block of `input` to DER-encoded bytes.
///
/// `what` names the input in the error message.
pub fn pem_to_der(input: &[u8], what: &str) -> Result<Vec<u8>> {
    let pem = pem::parse(input).map_err(|e| {
        tracing::debug!(error = %e, what, "no PEM block found");
        CertError::PemDecode(what.to_string())
    })?;
    Ok(pem.contents().to_vec())
}

pub fn private_key_to_pem(key: &KeyPair) -> String {
    der_to_pem(key.to_pkcs1_der(), PRIVATE_KEY_LABEL)
}

pub fn certificate_to_pem(cert: &Certificate) -> String {
    der_to_pem(cert.to_der(), CERTIFICATE_LABEL)
}

pub fn csr_to_pem(csr: &CertificateSigningRequest) -> String {
    der_to_pem(csr.to_der(), CERTIFICATE_REQUEST_LABEL)
}

/// Encodes the public key as a PKIX `SubjectPublicKeyInfo` under the
/// `RSA PUBLIC KEY` label.
pub fn public_key_to_pem(key: &RsaPublicKey) -> Result<String> {
    let der = key
        .to_public_key_der()
        .map_err(|e| CertError::Encoding(format!("public key: {e}")))?;
    Ok(der_to_pem(der.as_bytes(), PUBLIC_KEY_LABEL))
}

pub fn pem_to_private_key(input: &[u8]) -> Result<KeyPair> {
    KeyPair::from_pkcs1_der(&pem_to_der(input, "private key")?)
}

pub fn pem_to_certificate(input: &[u8]) -> Result<Certificate> {
    Certificate::from_der(&pem_to_der(input, "certificate")?)
}

pub fn pem_to_csr(input: &[u8]) -> Result<CertificateSigningRequest> {
    CertificateSigningRequest::from_der(&pem_to_der(input, "certificate request")?)
}

/// Standard, padded base64.
pub fn base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}
