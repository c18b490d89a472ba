mod util;

use std::net::IpAddr;

use certforge::cert::extensions::{ExtendedKeyUsageOption, KeyUsages};
use certforge::cert::params::{CertificateConfig, DistinguishedName, VALIDITY_ONE_DAY};
use certforge::cert::request::CertificateSigningRequest;
use certforge::cert::{
    generate_self_signed_certificate, generate_signed_certificate, self_signed_certificate,
    signed_certificate,
};
use certforge::error::{BuildStage, CertError, Result};
use certforge::key::{PublicKey, generate_key};
use certforge::pem_utils::{
    certificate_to_pem, pem_to_certificate, pem_to_private_key, private_key_to_pem,
};
use time::{Duration, OffsetDateTime};
use x509_cert::time::Time;

fn assert_close(actual: Duration, expected: Duration) {
    assert!(
        (actual - expected).abs() <= Duration::seconds(1),
        "{actual} is not within a second of {expected}"
    );
}

#[test]
fn generate_ca_cert() -> Result<()> {
    let (ca_key, ca_cert) = util::generate_ca_cert();

    assert_eq!(ca_cert.subject(), ca_cert.issuer());
    assert_eq!(ca_cert.subject().common_name, "myca.local");
    assert!(ca_cert.is_ca());
    assert!(ca_cert.basic_constraints_valid());
    assert_eq!(
        ca_cert.key_usages(),
        KeyUsages::KeyCertSign | KeyUsages::CRLSign | KeyUsages::DigitalSignature
    );
    assert_eq!(
        ca_cert.subject_key_id(),
        PublicKey::from_key_pair(&ca_key).subject_key_id()?.as_slice()
    );
    assert!(ca_cert.authority_key_id().is_empty());
    assert_close(
        ca_cert.not_after() - ca_cert.not_before(),
        Duration::days(3650),
    );
    ca_cert.verify_signed_by(&ca_cert)?;
    Ok(())
}

#[test]
fn generate_server_cert() -> Result<()> {
    let (ca_key, ca_cert) = util::generate_ca_cert();
    let config = util::server_config();

    let issued_at = OffsetDateTime::now_utc();
    let (key, cert) = generate_signed_certificate(&ca_key, &ca_cert, &config)?;

    assert_eq!(cert.issuer(), ca_cert.subject());
    assert_eq!(cert.subject().normalized(), config.subject.normalized());
    assert_eq!(cert.dns_names(), config.dns_names.as_slice());
    assert_eq!(cert.ip_addresses(), config.ip_addresses.as_slice());
    assert_eq!(cert.ext_key_usages(), config.ext_key_usages.as_slice());
    assert_eq!(cert.key_usages(), config.key_usages);
    assert!(!cert.is_ca());
    assert_eq!(
        cert.public_key()?,
        PublicKey::from_key_pair(&key),
        "certificate must carry the generated key"
    );
    assert_close(cert.not_after() - issued_at, Duration::days(365));
    cert.verify_signed_by(&ca_cert)?;
    Ok(())
}

#[test]
fn signed_certificate_inherits_ca_not_before() -> Result<()> {
    let (ca_key, ca_cert) = util::generate_ca_cert();
    std::thread::sleep(std::time::Duration::from_millis(1100));

    let (_, cert) = generate_signed_certificate(&ca_key, &ca_cert, &util::server_config())?;
    assert_eq!(cert.not_before(), ca_cert.not_before());
    assert_eq!(
        cert.inner.tbs_certificate.validity.not_before,
        ca_cert.inner.tbs_certificate.validity.not_before
    );
    Ok(())
}

#[test]
fn signed_certificate_key_identifiers_come_from_ca() -> Result<()> {
    let (ca_key, ca_cert) = util::generate_ca_cert();
    let (key, cert) = generate_signed_certificate(&ca_key, &ca_cert, &util::server_config())?;

    assert_eq!(cert.subject_key_id(), ca_cert.subject_key_id());
    assert_ne!(
        cert.subject_key_id(),
        PublicKey::from_key_pair(&key).subject_key_id()?.as_slice()
    );
    assert_eq!(cert.authority_key_id(), ca_cert.subject_key_id());
    Ok(())
}

#[test]
fn signed_certificate_from_request() -> Result<()> {
    let (ca_key, ca_cert) = util::generate_ca_cert();
    let key = generate_key()?;
    let subject = DistinguishedName::builder()
        .common_name("system:node:worker-0")
        .organization(vec!["system:nodes".to_string()])
        .build();
    let csr = CertificateSigningRequest::new(
        &subject,
        &["worker-0".to_string()],
        &["10.0.0.7".parse().unwrap()],
        &key,
    )?;

    // Names and subject come from the request, not from the configuration.
    let config = CertificateConfig::builder()
        .subject(DistinguishedName::builder().common_name("ignored").build())
        .dns_names(vec!["ignored.local".to_string()])
        .ext_key_usages(vec![ExtendedKeyUsageOption::ClientAuth])
        .validity(VALIDITY_ONE_DAY)
        .build();
    let cert = signed_certificate(&config, &csr, &ca_key, &ca_cert)?;

    assert_eq!(cert.subject(), &subject);
    assert_eq!(cert.dns_names(), ["worker-0".to_string()].as_slice());
    assert_eq!(cert.ip_addresses(), [IpAddr::from([10, 0, 0, 7])].as_slice());
    assert_eq!(cert.ext_key_usages(), [ExtendedKeyUsageOption::ClientAuth].as_slice());
    assert_eq!(cert.public_key()?, PublicKey::from_key_pair(&key));
    Ok(())
}

#[test]
fn signed_certificate_rejects_foreign_ca_key() -> Result<()> {
    let (_, ca_cert) = util::generate_ca_cert();
    let other_key = generate_key()?;

    let err = generate_signed_certificate(&other_key, &ca_cert, &util::server_config())
        .unwrap_err();
    assert!(
        matches!(
            err,
            CertError::CertificateBuild {
                stage: BuildStage::CertificateCreation,
                ..
            }
        ),
        "{err}"
    );
    Ok(())
}

#[test]
fn serial_numbers_are_positive_and_fit_63_bits() -> Result<()> {
    let (ca_key, ca_cert) = util::generate_ca_cert();
    let (_, first) = generate_signed_certificate(&ca_key, &ca_cert, &util::server_config())?;
    let (_, second) = generate_signed_certificate(&ca_key, &ca_cert, &util::server_config())?;

    for serial in [first.serial_number(), second.serial_number()] {
        assert!(serial.len() <= 8, "serial {serial:02x?} is wider than 63 bits");
        assert_eq!(serial[0] & 0x80, 0, "serial {serial:02x?} is negative");
    }
    assert_ne!(first.serial_number(), second.serial_number());
    Ok(())
}

#[test]
fn subject_key_id_is_deterministic_and_distinct() -> Result<()> {
    let first = generate_key()?;
    let second = generate_key()?;

    let id = PublicKey::from_key_pair(&first).subject_key_id()?;
    assert_eq!(id, PublicKey::from_key_pair(&first).subject_key_id()?);
    assert_ne!(id, PublicKey::from_key_pair(&second).subject_key_id()?);
    Ok(())
}

/// A one-day self-signed CA survives PEM encoding with its CA flag and lifetime.
#[test]
fn self_signed_one_day_ca_through_pem() -> Result<()> {
    let config = CertificateConfig::builder()
        .subject(
            DistinguishedName::builder()
                .common_name("test")
                .organizational_unit(vec!["ou".to_string()])
                .build(),
        )
        .validity(VALIDITY_ONE_DAY)
        .is_ca(true)
        .build();
    let (key, cert) = generate_self_signed_certificate(&config)?;

    let key_pem = private_key_to_pem(&key);
    let cert_pem = certificate_to_pem(&cert);

    let decoded_key = pem_to_private_key(key_pem.as_bytes())?;
    let decoded = pem_to_certificate(cert_pem.as_bytes())?;
    assert_eq!(decoded_key.to_pkcs1_der(), key.to_pkcs1_der());
    assert_eq!(decoded.to_der(), cert.to_der());
    assert!(decoded.is_ca());
    assert_close(decoded.not_after() - decoded.not_before(), Duration::hours(24));
    Ok(())
}

#[test]
fn self_signed_requires_subject() -> Result<()> {
    let key = generate_key()?;
    let config = CertificateConfig::builder()
        .subject(DistinguishedName::builder().common_name("no-ou").build())
        .validity(VALIDITY_ONE_DAY)
        .build();

    let err = self_signed_certificate(&config, &key).unwrap_err();
    assert!(matches!(err, CertError::InvalidSubject(_)), "{err}");
    Ok(())
}

#[test]
fn long_lived_certificate_uses_generalized_time() -> Result<()> {
    let mut config = util::ca_config();
    config.validity = Duration::days(50 * 365);
    let (_, cert) = generate_self_signed_certificate(&config)?;

    let validity = &cert.inner.tbs_certificate.validity;
    assert!(matches!(validity.not_before, Time::UtcTime(_)));
    assert!(matches!(validity.not_after, Time::GeneralTime(_)));
    assert_close(cert.not_after() - cert.not_before(), Duration::days(50 * 365));
    Ok(())
}

#[test]
fn validity_past_year_9999_is_an_error() -> Result<()> {
    let (ca_key, ca_cert) = util::generate_ca_cert();
    let key = generate_key()?;

    let mut ca_config = util::ca_config();
    ca_config.validity = Duration::days(365 * 8000);
    let mut server_config = util::server_config();
    server_config.validity = Duration::days(365 * 8000);

    let self_signed = self_signed_certificate(&ca_config, &key).map(|_| ());
    let signed = generate_signed_certificate(&ca_key, &ca_cert, &server_config).map(|_| ());
    for result in [self_signed, signed] {
        let err = result.unwrap_err();
        assert!(
            matches!(
                err,
                CertError::CertificateBuild {
                    stage: BuildStage::CertificateCreation,
                    ..
                }
            ),
            "{err}"
        );
    }
    Ok(())
}
