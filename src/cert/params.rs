use std::collections::BTreeSet;
use std::net::IpAddr;

use bon::Builder;
use const_oid::ObjectIdentifier;
use der::asn1::{Any, SetOfVec};
use der::{Tag, Tagged};
use time::Duration;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use super::extensions::ToAndFromX509Extension;
pub use crate::cert::extensions::ExtendedKeyUsageOption;
pub use crate::cert::extensions::{FlagSet, KeyUsages};
use crate::error::{CertError, Result};

/// Certificates that must be rotated daily.
pub const VALIDITY_ONE_DAY: Duration = Duration::days(1);
/// The default lifetime of serving certificates.
pub const VALIDITY_ONE_YEAR: Duration = Duration::days(365);
/// The lifetime of root certificate authorities.
pub const VALIDITY_TEN_YEARS: Duration = Duration::days(10 * 365);

/// Everything needed to configure a new certificate, and the expectation a
/// stored certificate is later validated against.
///
/// # Fields
/// * `dns_names` - DNS subject alternative names.
/// * `ext_key_usages` - Extended key usage purposes.
/// * `ip_addresses` - IP subject alternative names.
/// * `key_usages` - The key usage bitmask.
/// * `subject` - The distinguished name of the certificate subject.
/// * `validity` - How long the certificate stays valid after issuance.
/// * `is_ca` - Indicates if the certificate is a CA.
#[derive(Clone, Debug, Builder)]
pub struct CertificateConfig {
    #[builder(default)]
    pub dns_names: Vec<String>,
    #[builder(default)]
    pub ext_key_usages: Vec<ExtendedKeyUsageOption>,
    #[builder(default)]
    pub ip_addresses: Vec<IpAddr>,
    #[builder(default)]
    pub key_usages: FlagSet<KeyUsages>,
    pub subject: DistinguishedName,
    pub validity: Duration,
    #[builder(default)]
    pub is_ca: bool,
}

const OID_COUNTRY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
const OID_PROVINCE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
const OID_LOCALITY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
const OID_STREET_ADDRESS: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.9");
const OID_POSTAL_CODE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.17");
const OID_ORGANIZATION: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
const OID_ORGANIZATIONAL_UNIT: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");
const OID_COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
const OID_SERIAL_NUMBER: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.5");

/// Distinguished name of a certificate subject or issuer.
///
/// Multi-valued attributes are encoded into a single RDN each, in the order
/// C, ST, L, STREET, POSTALCODE, O, OU, CN, SERIALNUMBER.
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    #[builder(default, into)]
    pub common_name: String,
    #[builder(default, into)]
    pub serial_number: String,
    #[builder(default)]
    pub country: Vec<String>,
    #[builder(default)]
    pub province: Vec<String>,
    #[builder(default)]
    pub locality: Vec<String>,
    #[builder(default)]
    pub street_address: Vec<String>,
    #[builder(default)]
    pub postal_code: Vec<String>,
    #[builder(default)]
    pub organization: Vec<String>,
    #[builder(default)]
    pub organizational_unit: Vec<String>,
}

impl DistinguishedName {
    /// Converts the distinguished name to an X.509 name.
    pub fn as_x509_name(&self) -> Result<Name> {
        let multi_valued: [(ObjectIdentifier, &[String]); 7] = [
            (OID_COUNTRY, &self.country),
            (OID_PROVINCE, &self.province),
            (OID_LOCALITY, &self.locality),
            (OID_STREET_ADDRESS, &self.street_address),
            (OID_POSTAL_CODE, &self.postal_code),
            (OID_ORGANIZATION, &self.organization),
            (OID_ORGANIZATIONAL_UNIT, &self.organizational_unit),
        ];

        let mut rdns = Vec::new();
        for (oid, values) in multi_valued {
            if let Some(rdn) = rdn(oid, values)? {
                rdns.push(rdn);
            }
        }
        for (oid, value) in [
            (OID_COMMON_NAME, &self.common_name),
            (OID_SERIAL_NUMBER, &self.serial_number),
        ] {
            if let Some(rdn) = rdn(oid, std::slice::from_ref(value))? {
                rdns.push(rdn);
            }
        }
        Ok(RdnSequence(rdns))
    }

    /// Creates a `DistinguishedName` from an X.509 name.
    ///
    /// Attributes of other types are skipped.
    pub fn from_x509_name(x509dn: &Name) -> Result<Self> {
        let mut dn = DistinguishedName::default();
        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                let values = match attr.oid {
                    OID_COUNTRY => &mut dn.country,
                    OID_PROVINCE => &mut dn.province,
                    OID_LOCALITY => &mut dn.locality,
                    OID_STREET_ADDRESS => &mut dn.street_address,
                    OID_POSTAL_CODE => &mut dn.postal_code,
                    OID_ORGANIZATION => &mut dn.organization,
                    OID_ORGANIZATIONAL_UNIT => &mut dn.organizational_unit,
                    OID_COMMON_NAME => {
                        dn.common_name = attribute_string(attr)?;
                        continue;
                    }
                    OID_SERIAL_NUMBER => {
                        dn.serial_number = attribute_string(attr)?;
                        continue;
                    }
                    _ => continue,
                };
                values.push(attribute_string(attr)?);
            }
        }
        Ok(dn)
    }

    /// A copy with every multi-valued attribute sorted, deduplicated and
    /// stripped of empty values, the form it takes once encoded.
    pub fn normalized(&self) -> Self {
        let mut dn = self.clone();
        for values in [
            &mut dn.country,
            &mut dn.province,
            &mut dn.locality,
            &mut dn.street_address,
            &mut dn.postal_code,
            &mut dn.organization,
            &mut dn.organizational_unit,
        ] {
            values.retain(|value| !value.is_empty());
            values.sort();
            values.dedup();
        }
        dn
    }
}

/// Empty values are skipped; repeated values collapse into one, since a SET
/// cannot hold duplicates.
fn rdn(oid: ObjectIdentifier, values: &[String]) -> Result<Option<RelativeDistinguishedName>> {
    let attrs = values
        .iter()
        .filter(|value| !value.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|value| -> Result<AttributeTypeAndValue> {
            let tag = if is_printable(value) {
                Tag::PrintableString
            } else {
                Tag::Utf8String
            };
            Ok(AttributeTypeAndValue {
                oid,
                value: Any::new(tag, value.as_bytes())?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    if attrs.is_empty() {
        return Ok(None);
    }
    let set = SetOfVec::try_from(attrs)
        .map_err(|e| CertError::Encoding(format!("attribute {oid}: {e}")))?;
    Ok(Some(RelativeDistinguishedName::from(set)))
}

fn attribute_string(attr: &AttributeTypeAndValue) -> Result<String> {
    match attr.value.tag() {
        Tag::PrintableString | Tag::Utf8String | Tag::Ia5String | Tag::TeletexString => {
            std::str::from_utf8(attr.value.value())
                .map(str::to_owned)
                .map_err(|e| CertError::Asn1Parse(format!("attribute {}: {e}", attr.oid)))
        }
        tag => Err(CertError::Asn1Parse(format!(
            "attribute {} has unsupported string type {tag}",
            attr.oid
        ))),
    }
}

/// PrintableString alphabet from X.680.
fn is_printable(value: &str) -> bool {
    value.bytes().all(|b| {
        b.is_ascii_alphanumeric()
            || matches!(
                b,
                b' ' | b'\'' | b'(' | b')' | b'+' | b',' | b'-' | b'.' | b'/' | b':' | b'=' | b'?'
            )
    })
}

/// The fields of a certificate before an issuer signs it.
///
/// Subject, public key and alternative names come from the configuration for
/// self-signed certificates and from the signing request for CA-signed ones.
#[derive(Clone, Debug)]
pub struct CertificateTemplate {
    pub subject: Name,
    pub subject_public_key: SubjectPublicKeyInfoOwned,
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
    pub usages: Vec<ExtendedKeyUsageOption>,
    pub key_usages: FlagSet<KeyUsages>,
    pub is_ca: bool,
    pub validity: Duration,
}

/// Represents an X.509 extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: E, critical: bool) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_name() -> DistinguishedName {
        DistinguishedName::builder()
            .common_name("api.cluster.local")
            .country(vec!["US".to_string()])
            .organization(vec!["Example Corp".to_string(), "Ops".to_string()])
            .organizational_unit(vec!["infra".to_string(), "näme".to_string()])
            .locality(vec!["Berlin".to_string()])
            .build()
    }

    #[test]
    fn test_distinguished_name_roundtrip() {
        let dn = full_name();
        let decoded = DistinguishedName::from_x509_name(&dn.as_x509_name().unwrap()).unwrap();
        assert_eq!(decoded.normalized(), dn.normalized());
    }

    #[test]
    fn test_distinguished_name_rdn_order() {
        let name = full_name().as_x509_name().unwrap();
        let oids: Vec<_> = name.0.iter().map(|rdn| rdn.0.iter().next().unwrap().oid).collect();
        assert_eq!(
            oids,
            vec![
                OID_COUNTRY,
                OID_LOCALITY,
                OID_ORGANIZATION,
                OID_ORGANIZATIONAL_UNIT,
                OID_COMMON_NAME
            ]
        );
        // Both organizations share one multi-valued RDN.
        assert_eq!(name.0[2].0.len(), 2);
    }

    #[test]
    fn test_non_printable_value_uses_utf8_string() {
        let name = full_name().as_x509_name().unwrap();
        let tags: Vec<_> = name.0[3].0.iter().map(|attr| attr.value.tag()).collect();
        assert!(tags.contains(&Tag::Utf8String));
        assert!(tags.contains(&Tag::PrintableString));
    }

    #[test]
    fn test_normalized_ignores_value_order() {
        let a = DistinguishedName::builder()
            .common_name("test")
            .organizational_unit(vec!["b".to_string(), "a".to_string()])
            .build();
        let b = DistinguishedName::builder()
            .common_name("test")
            .organizational_unit(vec!["a".to_string(), "b".to_string()])
            .build();
        assert_ne!(a, b);
        assert_eq!(a.normalized(), b.normalized());
    }

    #[test]
    fn test_repeated_values_collapse_into_one() {
        let dn = DistinguishedName::builder()
            .common_name("test")
            .organizational_unit(vec!["ou".to_string(), "ou".to_string()])
            .build();
        let name = dn.as_x509_name().unwrap();
        assert_eq!(name.0[0].0.len(), 1);

        let decoded = DistinguishedName::from_x509_name(&name).unwrap();
        assert_eq!(decoded.organizational_unit, vec!["ou".to_string()]);
        assert_eq!(decoded.normalized(), dn.normalized());
    }

    #[test]
    fn test_empty_values_are_dropped() {
        let dn = DistinguishedName::builder()
            .common_name("test")
            .organizational_unit(vec!["a".to_string(), String::new()])
            .build();
        let decoded = DistinguishedName::from_x509_name(&dn.as_x509_name().unwrap()).unwrap();
        assert_eq!(decoded.organizational_unit, vec!["a".to_string()]);
        assert_eq!(decoded.normalized(), dn.normalized());
    }

    #[test]
    fn test_empty_name_has_no_rdns() {
        let name = DistinguishedName::default().as_x509_name().unwrap();
        assert!(name.0.is_empty());
    }

    #[test]
    fn test_validity_constants() {
        assert_eq!(VALIDITY_ONE_DAY, Duration::hours(24));
        assert_eq!(VALIDITY_TEN_YEARS, VALIDITY_ONE_YEAR * 10);
    }
}
