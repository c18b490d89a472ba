pub mod extensions;
pub mod params;
pub mod request;

use std::net::IpAddr;

use der::{Decode, Encode};
use extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, ExtendedKeyUsageOption, FlagSet,
    KeyUsage, KeyUsages, SubjectAltName, SubjectKeyIdentifier, ToAndFromX509Extension,
};
use params::{CertificateConfig, CertificateTemplate, DistinguishedName};
use request::CertificateSigningRequest;
use time::OffsetDateTime;
use x509_cert::certificate::CertificateInner;

use crate::error::{BuildStage, CertError, Result};
use crate::issuer::{CertificateAuthority, Issuer, SelfIssuer};
use crate::key::{KeyPair, PublicKey, generate_key};
use crate::pki;
use crate::tbs_certificate::from_x509_time;

/// Represents a parsed X.509 certificate.
///
/// The DER encoding is kept next to the decoded structure, together with the
/// fields that issuance and validation care about.
#[derive(Debug, Clone)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
    der: Vec<u8>,
    subject: DistinguishedName,
    issuer: DistinguishedName,
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
    dns_names: Vec<String>,
    ip_addresses: Vec<IpAddr>,
    key_usages: FlagSet<KeyUsages>,
    ext_key_usages: Vec<ExtendedKeyUsageOption>,
    basic_constraints_valid: bool,
    is_ca: bool,
    subject_key_id: Vec<u8>,
    authority_key_id: Vec<u8>,
}

impl Certificate {
    /// Parses a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = CertificateInner::from_der(der)?;
        let tbs = &inner.tbs_certificate;

        let mut cert = Certificate {
            subject: DistinguishedName::from_x509_name(&tbs.subject)?,
            issuer: DistinguishedName::from_x509_name(&tbs.issuer)?,
            not_before: from_x509_time(&tbs.validity.not_before),
            not_after: from_x509_time(&tbs.validity.not_after),
            der: der.to_vec(),
            dns_names: Vec::new(),
            ip_addresses: Vec::new(),
            key_usages: FlagSet::default(),
            ext_key_usages: Vec::new(),
            basic_constraints_valid: false,
            is_ca: false,
            subject_key_id: Vec::new(),
            authority_key_id: Vec::new(),
            inner: inner.clone(),
        };

        for ext in inner.tbs_certificate.extensions.iter().flatten() {
            let value = ext.extn_value.as_bytes();
            if ext.extn_id == SubjectAltName::OID {
                let san = SubjectAltName::from_x509_extension_value(value)?;
                cert.dns_names = san.dns_names;
                cert.ip_addresses = san.ip_addresses;
            } else if ext.extn_id == KeyUsage::OID {
                cert.key_usages = KeyUsage::from_x509_extension_value(value)?.0;
            } else if ext.extn_id == ExtendedKeyUsage::OID {
                cert.ext_key_usages = ExtendedKeyUsage::from_x509_extension_value(value)?.usage;
            } else if ext.extn_id == BasicConstraints::OID {
                cert.is_ca = BasicConstraints::from_x509_extension_value(value)?.is_ca;
                cert.basic_constraints_valid = true;
            } else if ext.extn_id == SubjectKeyIdentifier::OID {
                cert.subject_key_id = SubjectKeyIdentifier::from_x509_extension_value(value)?.0;
            } else if ext.extn_id == AuthorityKeyIdentifier::OID {
                cert.authority_key_id =
                    AuthorityKeyIdentifier::from_x509_extension_value(value)?.key_identifier;
            }
        }

        Ok(cert)
    }

    /// The DER encoding the certificate was parsed from.
    pub fn to_der(&self) -> &[u8] {
        &self.der
    }

    pub fn serial_number(&self) -> &[u8] {
        self.inner.tbs_certificate.serial_number.as_bytes()
    }

    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    pub fn issuer(&self) -> &DistinguishedName {
        &self.issuer
    }

    pub fn not_before(&self) -> OffsetDateTime {
        self.not_before
    }

    pub fn not_after(&self) -> OffsetDateTime {
        self.not_after
    }

    pub fn dns_names(&self) -> &[String] {
        &self.dns_names
    }

    pub fn ip_addresses(&self) -> &[IpAddr] {
        &self.ip_addresses
    }

    pub fn key_usages(&self) -> FlagSet<KeyUsages> {
        self.key_usages
    }

    pub fn ext_key_usages(&self) -> &[ExtendedKeyUsageOption] {
        &self.ext_key_usages
    }

    pub fn basic_constraints_valid(&self) -> bool {
        self.basic_constraints_valid
    }

    pub fn is_ca(&self) -> bool {
        self.is_ca
    }

    pub fn subject_key_id(&self) -> &[u8] {
        &self.subject_key_id
    }

    pub fn authority_key_id(&self) -> &[u8] {
        &self.authority_key_id
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    /// Checks that `issuer` signed this certificate.
    pub fn verify_signed_by(&self, issuer: &Certificate) -> Result<()> {
        let PublicKey::Rsa(issuer_key) = issuer.public_key()? else {
            return Err(CertError::UnsupportedKeyAlgorithm(
                "issuer certificate does not have a RSA public key".to_string(),
            ));
        };
        let signature = self
            .inner
            .signature
            .as_bytes()
            .ok_or_else(|| CertError::Asn1Parse("unaligned certificate signature".to_string()))?;
        pki::verify_signature(&self.inner.tbs_certificate.to_der()?, signature, &issuer_key)
            .map_err(|e| CertError::Asn1Parse(format!("certificate signature: {e}")))
    }
}

/// Creates a self-signed certificate for `key`.
///
/// The subject doubles as the issuer, the validity window starts now, and the
/// subject key identifier is derived from `key`.
///
/// # Errors
/// [`CertError::InvalidSubject`] when the configured subject lacks a common
/// name or an organizational unit.
pub fn self_signed_certificate(config: &CertificateConfig, key: &KeyPair) -> Result<Certificate> {
    let subject = &config.subject;
    if subject.common_name.is_empty() || subject.organizational_unit.iter().all(String::is_empty) {
        return Err(CertError::InvalidSubject(format!(
            "common name {:?} and organizational unit {:?} must both be set",
            subject.common_name, subject.organizational_unit
        )));
    }

    let name = subject
        .as_x509_name()
        .map_err(|e| CertError::build(BuildStage::CertificateCreation, e))?;
    let subject_public_key = key
        .as_spki()
        .map_err(|e| CertError::build(BuildStage::CertificateCreation, e))?;
    let template = CertificateTemplate {
        subject: name.clone(),
        subject_public_key,
        dns_names: config.dns_names.clone(),
        ip_addresses: config.ip_addresses.clone(),
        usages: config.ext_key_usages.clone(),
        key_usages: config.key_usages,
        is_ca: config.is_ca,
        validity: config.validity,
    };

    SelfIssuer { name, key }.issue(&template)
}

/// Creates a certificate for the subject of `csr`, signed by the CA.
///
/// Subject, alternative names and public key come from the request; usages,
/// the CA flag and the lifetime come from `config`. The validity window starts
/// at the CA certificate's `notBefore`.
pub fn signed_certificate(
    config: &CertificateConfig,
    csr: &CertificateSigningRequest,
    ca_key: &KeyPair,
    ca_cert: &Certificate,
) -> Result<Certificate> {
    let template = CertificateTemplate {
        subject: csr.subject().clone(),
        subject_public_key: csr.public_key_info().clone(),
        dns_names: csr.dns_names().to_vec(),
        ip_addresses: csr.ip_addresses().to_vec(),
        usages: config.ext_key_usages.clone(),
        key_usages: config.key_usages,
        is_ca: config.is_ca,
        validity: config.validity,
    };

    CertificateAuthority::new(ca_cert, ca_key)?.issue(&template)
}

/// Generates a key and a self-signed certificate for it.
pub fn generate_self_signed_certificate(config: &CertificateConfig) -> Result<(KeyPair, Certificate)> {
    let key = generate_key().map_err(|e| CertError::build(BuildStage::KeyGeneration, e))?;
    let cert = self_signed_certificate(config, &key)?;
    Ok((key, cert))
}

/// Generates a key and a certificate for it signed by the CA.
///
/// The key signs a request built from the configured subject and alternative
/// names; the request is encoded and parsed back before the CA signs it.
pub fn generate_signed_certificate(
    ca_key: &KeyPair,
    ca_cert: &Certificate,
    config: &CertificateConfig,
) -> Result<(KeyPair, Certificate)> {
    let key = generate_key().map_err(|e| CertError::build(BuildStage::KeyGeneration, e))?;
    let csr = CertificateSigningRequest::new(
        &config.subject,
        &config.dns_names,
        &config.ip_addresses,
        &key,
    )?;
    let cert = signed_certificate(config, &csr, ca_key, ca_cert)?;
    Ok((key, cert))
}
