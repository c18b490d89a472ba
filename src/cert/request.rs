//! PKCS#10 certificate signing requests.
//!
//! A request carries the subject, the subject public key and the DNS/IP
//! alternative names (inside an `extensionRequest` attribute). CA-signed
//! issuance builds one from the configuration, encodes it, and parses it back
//! before signing so that anything that cannot be expressed in ASN.1 fails
//! before the CA key is used.

use std::net::IpAddr;

use const_oid::ObjectIdentifier;
use der::asn1::{Any, BitString, SetOfVec};
use der::{Decode, Encode};
use rsa::RsaPublicKey;
use x509_cert::attr::Attribute;
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::request::{CertReq, CertReqInfo, Version};
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use super::extensions::{SubjectAltName, ToAndFromX509Extension};
use super::params::{DistinguishedName, ExtensionParam};
use crate::error::{BuildStage, CertError, Result};
use crate::key::{KeyPair, PublicKey};
use crate::pki;

/// PKCS#9 extensionRequest (1.2.840.113549.1.9.14)
const OID_EXTENSION_REQUEST: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.14");

/// A parsed certificate signing request together with its DER encoding.
#[derive(Debug, Clone)]
pub struct CertificateSigningRequest {
    pub inner: CertReq,
    der: Vec<u8>,
    dns_names: Vec<String>,
    ip_addresses: Vec<IpAddr>,
}

impl CertificateSigningRequest {
    /// Builds a request for `subject` and the alternative names, signed by `key`,
    /// and parses it back.
    ///
    /// # Errors
    /// [`CertError::CertificateBuild`] naming either the request creation or the
    /// request parse stage.
    pub fn new(
        subject: &DistinguishedName,
        dns_names: &[String],
        ip_addresses: &[IpAddr],
        key: &KeyPair,
    ) -> Result<Self> {
        let der = create_request(subject, dns_names, ip_addresses, key)
            .map_err(|e| CertError::build(BuildStage::RequestCreation, e))?;
        Self::from_der(&der).map_err(|e| CertError::build(BuildStage::RequestParse, e))
    }

    /// Parses a DER-encoded request and checks its self-signature.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = CertReq::from_der(der)?;

        let mut san = SubjectAltName::default();
        for attr in inner.info.attributes.iter() {
            if attr.oid != OID_EXTENSION_REQUEST {
                continue;
            }
            for value in attr.values.iter() {
                let extensions = Vec::<Extension>::from_der(&value.to_der()?)?;
                for ext in extensions.iter().filter(|ext| ext.extn_id == SubjectAltName::OID) {
                    let names = SubjectAltName::from_x509_extension_value(ext.extn_value.as_bytes())?;
                    san.dns_names.extend(names.dns_names);
                    san.ip_addresses.extend(names.ip_addresses);
                }
            }
        }

        let public_key = match PublicKey::from_x509spki(&inner.info.public_key)? {
            PublicKey::Rsa(public_key) => public_key,
            _ => {
                return Err(CertError::UnsupportedKeyAlgorithm(
                    "certificate request with a non-RSA key".to_string(),
                ));
            }
        };
        check_signature(&inner, &public_key)?;

        Ok(Self {
            inner,
            der: der.to_vec(),
            dns_names: san.dns_names,
            ip_addresses: san.ip_addresses,
        })
    }

    pub fn to_der(&self) -> &[u8] {
        &self.der
    }

    pub fn subject(&self) -> &Name {
        &self.inner.info.subject
    }

    pub fn public_key_info(&self) -> &SubjectPublicKeyInfoOwned {
        &self.inner.info.public_key
    }

    pub fn dns_names(&self) -> &[String] {
        &self.dns_names
    }

    pub fn ip_addresses(&self) -> &[IpAddr] {
        &self.ip_addresses
    }
}

fn create_request(
    subject: &DistinguishedName,
    dns_names: &[String],
    ip_addresses: &[IpAddr],
    key: &KeyPair,
) -> Result<Vec<u8>> {
    let subject = subject.as_x509_name()?;

    let san = SubjectAltName {
        dns_names: dns_names.to_vec(),
        ip_addresses: ip_addresses.to_vec(),
    };
    let mut attributes = Vec::new();
    if !san.is_empty() {
        let critical = subject.0.is_empty();
        let param = ExtensionParam::from_extension(san, critical)?;
        let extensions = vec![Extension {
            extn_id: param.oid,
            critical: param.critical,
            extn_value: der::asn1::OctetString::new(param.value)?,
        }];
        attributes.push(Attribute {
            oid: OID_EXTENSION_REQUEST,
            values: SetOfVec::try_from(vec![Any::encode_from(&extensions)?])?,
        });
    }

    let info = CertReqInfo {
        version: Version::V1,
        subject,
        public_key: key.as_spki()?,
        attributes: SetOfVec::try_from(attributes)?,
    };
    let signature = pki::sign_data(&info.to_der()?, key)
        .map_err(|e| CertError::Encoding(format!("signing certificate request: {e}")))?;
    let request = CertReq {
        info,
        algorithm: pki::signature_algorithm(),
        signature: BitString::from_bytes(&signature)?,
    };
    Ok(request.to_der()?)
}

fn check_signature(request: &CertReq, public_key: &RsaPublicKey) -> Result<()> {
    if request.algorithm.oid != pki::signature_algorithm().oid {
        return Err(CertError::Asn1Parse(format!(
            "unsupported certificate request signature algorithm {}",
            request.algorithm.oid
        )));
    }
    let signature = request
        .signature
        .as_bytes()
        .ok_or_else(|| CertError::Asn1Parse("unaligned request signature".to_string()))?;
    pki::verify_signature(&request.info.to_der()?, signature, public_key)
        .map_err(|e| CertError::Asn1Parse(format!("certificate request signature: {e}")))
}
