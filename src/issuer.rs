use der::Encode;
use rand::Rng;
use rsa::traits::PublicKeyParts;
use time::OffsetDateTime;
use x509_cert::name::Name;
use x509_cert::time::{Time, Validity};

use crate::cert::Certificate;
use crate::cert::extensions::AuthorityKeyIdentifier;
use crate::cert::extensions::BasicConstraints;
use crate::cert::extensions::ExtendedKeyUsage;
use crate::cert::extensions::KeyUsage;
use crate::cert::extensions::SubjectAltName;
use crate::cert::extensions::SubjectKeyIdentifier;
use crate::cert::params::{CertificateTemplate, ExtensionParam};
use crate::error::{BuildStage, CertError, Result};
use crate::key::{KeyPair, PublicKey, compute_subject_key_id};
use crate::pki;
use crate::tbs_certificate::{TbsCertificate, to_x509_time};

fn creation_failed(err: impl std::fmt::Display) -> CertError {
    CertError::build(BuildStage::CertificateCreation, err)
}

/// Represents an entity capable of issuing certificates.
///
/// Implementors decide the issuer name, the start of the validity window and
/// which key the subject key identifier is computed from; [`Issuer::issue`]
/// does the rest.
pub trait Issuer {
    /// Returns the distinguished name of the issuer.
    fn issuer_name(&self) -> &Name;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// The `notBefore` of a certificate issued at `now`.
    fn not_before(&self, now: OffsetDateTime) -> Result<Time>;

    /// The subject key identifier embedded into issued certificates.
    fn subject_key_id(&self) -> Result<[u8; 20]>;

    /// The key identifier of the issuer itself, if it has one.
    fn authority_key_id(&self) -> Option<&[u8]> {
        None
    }

    /// Issues a certificate for the template, signed by [`Issuer::signing_key`].
    ///
    /// The serial number is drawn uniformly from `[0, 2^63 - 1)`; `notAfter`
    /// is the template validity counted from now.
    fn issue(&self, template: &CertificateTemplate) -> Result<Certificate> {
        let now = OffsetDateTime::now_utc();
        let serial_number = rand::rng().random_range(0..i64::MAX as u64);

        let validity = Validity {
            not_before: self.not_before(now).map_err(creation_failed)?,
            not_after: now
                .checked_add(template.validity)
                .ok_or_else(|| creation_failed("validity overflows the certificate time range"))
                .and_then(|not_after| to_x509_time(not_after).map_err(creation_failed))?,
        };

        let key_id = self.subject_key_id().map_err(creation_failed)?;

        let mut extensions = Vec::new();
        if !template.key_usages.is_empty() {
            extensions.push(ExtensionParam::from_extension(
                KeyUsage(template.key_usages),
                true,
            ));
        }
        if !template.usages.is_empty() {
            extensions.push(ExtensionParam::from_extension(
                ExtendedKeyUsage {
                    usage: template.usages.clone(),
                },
                false,
            ));
        }
        extensions.push(ExtensionParam::from_extension(
            BasicConstraints {
                is_ca: template.is_ca,
            },
            true,
        ));
        extensions.push(ExtensionParam::from_extension(
            SubjectKeyIdentifier(key_id.to_vec()),
            false,
        ));
        if let Some(key_identifier) = self.authority_key_id() {
            extensions.push(ExtensionParam::from_extension(
                AuthorityKeyIdentifier {
                    key_identifier: key_identifier.to_vec(),
                },
                false,
            ));
        }
        let san = SubjectAltName {
            dns_names: template.dns_names.clone(),
            ip_addresses: template.ip_addresses.clone(),
        };
        if !san.is_empty() {
            // RFC 5280 4.2.1.6: critical when the subject is empty.
            let critical = template.subject.0.is_empty();
            extensions.push(ExtensionParam::from_extension(san, critical));
        }
        let extensions = extensions
            .into_iter()
            .collect::<Result<Vec<_>>>()
            .map_err(creation_failed)?;

        let tbs_cert = TbsCertificate {
            serial_number,
            issuer: self.issuer_name().clone(),
            validity,
            subject: template.subject.clone(),
            subject_public_key_info: template.subject_public_key.clone(),
            extensions,
        };

        let tbs_cert_inner = tbs_cert
            .to_tbs_certificate_inner()
            .map_err(creation_failed)?;
        let tbs_der = tbs_cert_inner.to_der().map_err(creation_failed)?;
        let signature = pki::sign_data(&tbs_der, self.signing_key()).map_err(creation_failed)?;
        let cert_inner =
            pki::assemble_certificate(tbs_cert_inner, &signature).map_err(creation_failed)?;
        let der = cert_inner.to_der().map_err(creation_failed)?;

        let cert = Certificate::from_der(&der)
            .map_err(|e| CertError::build(BuildStage::CertificateParse, e))?;
        tracing::debug!(
            subject = %cert.inner.tbs_certificate.subject,
            issuer = %cert.inner.tbs_certificate.issuer,
            not_after = %cert.not_after(),
            is_ca = cert.is_ca(),
            "issued certificate"
        );
        Ok(cert)
    }
}

/// Issues the certificate of `key` to itself.
pub(crate) struct SelfIssuer<'a> {
    pub(crate) name: Name,
    pub(crate) key: &'a KeyPair,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> &Name {
        &self.name
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }

    fn not_before(&self, now: OffsetDateTime) -> Result<Time> {
        to_x509_time(now)
    }

    fn subject_key_id(&self) -> Result<[u8; 20]> {
        PublicKey::from_key_pair(self.key).subject_key_id()
    }
}

/// A CA certificate with its private key.
///
/// Certificates issued by it share the CA's `notBefore`, and their subject key
/// identifier is computed from the CA certificate's public key, not from the
/// subject's.
#[derive(Debug, Clone, Copy)]
pub struct CertificateAuthority<'a> {
    cert: &'a Certificate,
    key: &'a KeyPair,
}

impl<'a> CertificateAuthority<'a> {
    /// Pairs a CA certificate with its key.
    ///
    /// # Errors
    /// [`CertError::CertificateBuild`] when the key does not belong to the certificate.
    pub fn new(cert: &'a Certificate, key: &'a KeyPair) -> Result<Self> {
        let matches = match cert.public_key().map_err(creation_failed)? {
            PublicKey::Rsa(public) => public.n() == key.public_key().n(),
            _ => false,
        };
        if !matches {
            return Err(creation_failed(
                "provided private key does not match the CA certificate's public key",
            ));
        }
        Ok(Self { cert, key })
    }
}

impl Issuer for CertificateAuthority<'_> {
    fn issuer_name(&self) -> &Name {
        &self.cert.inner.tbs_certificate.subject
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }

    fn not_before(&self, _now: OffsetDateTime) -> Result<Time> {
        Ok(self.cert.inner.tbs_certificate.validity.not_before)
    }

    fn subject_key_id(&self) -> Result<[u8; 20]> {
        compute_subject_key_id(&self.cert.inner.tbs_certificate.subject_public_key_info)
    }

    fn authority_key_id(&self) -> Option<&[u8]> {
        Some(self.cert.subject_key_id()).filter(|id| !id.is_empty())
    }
}
