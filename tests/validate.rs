mod util;

use certforge::cert::extensions::{ExtendedKeyUsageOption, KeyUsages};
use certforge::cert::params::{CertificateConfig, DistinguishedName};
use certforge::cert::{generate_self_signed_certificate, generate_signed_certificate};
use certforge::error::{CertError, ValidationFailure};
use certforge::key::generate_key;
use certforge::pem_utils::{certificate_to_pem, private_key_to_pem};
use certforge::validate::{validate_key_pair, validate_key_pair_at};
use time::Duration;

struct Issued {
    key_pem: String,
    cert_pem: String,
    not_after: time::OffsetDateTime,
}

fn issue_server_cert() -> Issued {
    let (ca_key, ca_cert) = util::generate_ca_cert();
    let (key, cert) =
        generate_signed_certificate(&ca_key, &ca_cert, &util::server_config()).unwrap();
    Issued {
        key_pem: private_key_to_pem(&key),
        cert_pem: certificate_to_pem(&cert),
        not_after: cert.not_after(),
    }
}

fn self_sign(config: &CertificateConfig) -> Issued {
    let (key, cert) = generate_self_signed_certificate(config).unwrap();
    Issued {
        key_pem: private_key_to_pem(&key),
        cert_pem: certificate_to_pem(&cert),
        not_after: cert.not_after(),
    }
}

fn validation_failures(err: CertError) -> Vec<ValidationFailure> {
    match err {
        CertError::Validation(errors) => errors.into_iter().collect(),
        other => panic!("expected validation failures, got {other}"),
    }
}

#[test]
fn matching_key_pair_is_valid() {
    let issued = issue_server_cert();
    validate_key_pair(
        issued.key_pem.as_bytes(),
        issued.cert_pem.as_bytes(),
        &util::server_config(),
        Duration::ZERO,
    )
    .unwrap();
}

#[test]
fn field_order_does_not_matter() {
    let issued = issue_server_cert();
    let mut config = util::server_config();
    config.dns_names.reverse();
    config.ip_addresses.reverse();
    config.ext_key_usages.reverse();
    config.subject.organizational_unit.reverse();

    validate_key_pair(
        issued.key_pem.as_bytes(),
        issued.cert_pem.as_bytes(),
        &config,
        Duration::ZERO,
    )
    .unwrap();
}

#[test]
fn every_drifted_field_is_reported() {
    let issued = issue_server_cert();
    let mut config = util::server_config();
    config.dns_names = vec!["other.myca.local".to_string()];
    config.ip_addresses = vec!["10.1.2.3".parse().unwrap()];
    config.key_usages = KeyUsages::DigitalSignature.into();
    config.ext_key_usages = vec![ExtendedKeyUsageOption::CodeSigning];
    config.subject = DistinguishedName::builder().common_name("other").build();
    config.is_ca = true;

    let err = validate_key_pair(
        issued.key_pem.as_bytes(),
        issued.cert_pem.as_bytes(),
        &config,
        Duration::ZERO,
    )
    .unwrap_err();

    let failures = validation_failures(err);
    assert!(failures.len() >= 6, "{failures:?}");
    assert!(matches!(failures[0], ValidationFailure::DnsNames { .. }));
    assert!(matches!(failures[1], ValidationFailure::ExtendedKeyUsages { .. }));
    assert!(matches!(failures[2], ValidationFailure::IpAddresses { .. }));
    assert!(matches!(failures[3], ValidationFailure::KeyUsage { .. }));
    assert!(matches!(failures[4], ValidationFailure::Subject { .. }));
    assert!(matches!(
        failures[5],
        ValidationFailure::IsCa {
            actual: false,
            expected: true
        }
    ));
}

#[test]
fn unrelated_key_only_reports_mismatch() {
    let issued = issue_server_cert();
    let other_key = private_key_to_pem(&generate_key().unwrap());

    let mut config = util::server_config();
    config.is_ca = true;
    let err = validate_key_pair(
        other_key.as_bytes(),
        issued.cert_pem.as_bytes(),
        &config,
        Duration::ZERO,
    )
    .unwrap_err();
    assert!(matches!(err, CertError::KeyCertificateMismatch), "{err}");
}

#[test]
fn remaining_validity_boundary() {
    let issued = issue_server_cert();
    let config = util::server_config();
    let minimum = Duration::days(30);
    let at_boundary = issued.not_after - minimum;

    validate_key_pair_at(
        issued.key_pem.as_bytes(),
        issued.cert_pem.as_bytes(),
        &config,
        minimum,
        at_boundary,
    )
    .unwrap();

    let err = validate_key_pair_at(
        issued.key_pem.as_bytes(),
        issued.cert_pem.as_bytes(),
        &config,
        minimum,
        at_boundary + Duration::seconds(1),
    )
    .unwrap_err();
    let failures = validation_failures(err);
    assert_eq!(
        failures,
        vec![ValidationFailure::RemainingValidity {
            remaining: minimum - Duration::seconds(1),
            minimum,
        }]
    );
}

#[test]
fn malformed_input_fails_fast() {
    let issued = issue_server_cert();
    let config = util::server_config();

    let err = validate_key_pair(b"garbage", issued.cert_pem.as_bytes(), &config, Duration::ZERO)
        .unwrap_err();
    assert!(matches!(err, CertError::PemDecode(_)), "{err}");

    let err = validate_key_pair(issued.key_pem.as_bytes(), b"garbage", &config, Duration::ZERO)
        .unwrap_err();
    assert_eq!(err.to_string(), "could not find a PEM block in the certificate");
}

#[test]
fn self_signed_key_pair_is_valid() {
    let config = util::server_config();
    assert!(!config.dns_names.is_empty());
    assert!(!config.ip_addresses.is_empty());
    assert!(!config.ext_key_usages.is_empty());

    let issued = self_sign(&config);
    validate_key_pair(
        issued.key_pem.as_bytes(),
        issued.cert_pem.as_bytes(),
        &config,
        Duration::ZERO,
    )
    .unwrap();
}

#[test]
fn repeated_and_empty_subject_values_validate() {
    let mut config = util::server_config();
    config.subject.organizational_unit = vec!["ou".to_string(), "ou".to_string(), String::new()];

    let issued = self_sign(&config);
    validate_key_pair(
        issued.key_pem.as_bytes(),
        issued.cert_pem.as_bytes(),
        &config,
        Duration::ZERO,
    )
    .unwrap();
}
