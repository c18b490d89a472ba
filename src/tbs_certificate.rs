use std::time::SystemTime;

use der::asn1::{GeneralizedTime, OctetString, UtcTime};
use time::OffsetDateTime;
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::time::{Time, Validity};

use crate::cert::params::ExtensionParam;
use crate::error::{CertError, Result};
use crate::pki;

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
///
/// # Fields
/// * `serial_number` - The serial number, encoded as a positive INTEGER.
/// * `issuer` - The distinguished name of the certificate issuer.
/// * `validity` - The `notBefore`/`notAfter` window, already in ASN.1 form.
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key_info` - The public key of the certificate subject.
/// * `extensions` - Additional X.509 extensions for the certificate.
pub struct TbsCertificate {
    pub serial_number: u64,
    pub issuer: Name,
    pub validity: Validity,
    pub subject: Name,
    pub subject_public_key_info: SubjectPublicKeyInfoOwned,
    pub extensions: Vec<ExtensionParam>,
}

impl TbsCertificate {
    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        let extensions = self
            .extensions
            .iter()
            .map(|ext| -> Result<Extension> {
                Ok(Extension {
                    extn_id: ext.oid,
                    critical: ext.critical,
                    extn_value: OctetString::new(ext.value.clone())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number: serial_number(self.serial_number)?,
            signature: pki::signature_algorithm(),
            issuer: self.issuer.clone(),
            validity: self.validity,
            subject: self.subject.clone(),
            subject_public_key_info: self.subject_public_key_info.clone(),
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: Some(extensions),
        })
    }
}

/// Encodes `value` as a positive DER INTEGER: no redundant leading zeros, and
/// a zero byte in front when the high bit would otherwise make it negative.
fn serial_number(value: u64) -> Result<SerialNumber> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    let mut encoded = Vec::with_capacity(9);
    if bytes[first] & 0x80 != 0 {
        encoded.push(0);
    }
    encoded.extend_from_slice(&bytes[first..]);
    Ok(SerialNumber::new(&encoded)?)
}

/// UTCTime until 2049, GeneralizedTime afterwards, as RFC 5280 requires.
pub fn to_x509_time(at: OffsetDateTime) -> Result<Time> {
    let system_time = SystemTime::from(at);
    UtcTime::from_system_time(system_time)
        .map(Time::UtcTime)
        .or_else(|_| GeneralizedTime::from_system_time(system_time).map(Time::GeneralTime))
        .map_err(|e| CertError::Encoding(format!("certificate time {at}: {e}")))
}

pub fn from_x509_time(at: &Time) -> OffsetDateTime {
    match at {
        Time::UtcTime(ut) => OffsetDateTime::from(ut.to_system_time()),
        Time::GeneralTime(gt) => OffsetDateTime::from(gt.to_system_time()),
    }
}
