//! Checks that a stored key pair still matches the configuration it was
//! issued from.
//!
//! Every field check runs, and every difference is reported, so that a caller
//! deciding whether to reissue sees the whole drift at once.

use std::net::IpAddr;

use rsa::traits::PublicKeyParts;
use time::{Duration, OffsetDateTime};

use crate::cert::Certificate;
use crate::cert::extensions::ip_octets;
use crate::cert::params::CertificateConfig;
use crate::error::{CertError, Result, ValidationErrors, ValidationFailure};
use crate::key::PublicKey;
use crate::pem_utils::{pem_to_certificate, pem_to_private_key};

/// Validates a PEM-encoded key and certificate against `config`, requiring at
/// least `minimum_remaining_validity` before the certificate expires.
///
/// # Errors
/// Malformed input, a non-RSA certificate key and a key that does not belong
/// to the certificate fail immediately. Otherwise every differing field is
/// collected into a single [`CertError::Validation`].
pub fn validate_key_pair(
    pem_key: &[u8],
    pem_cert: &[u8],
    config: &CertificateConfig,
    minimum_remaining_validity: Duration,
) -> Result<()> {
    validate_key_pair_at(
        pem_key,
        pem_cert,
        config,
        minimum_remaining_validity,
        OffsetDateTime::now_utc(),
    )
}

/// [`validate_key_pair`] with an explicit current time.
pub fn validate_key_pair_at(
    pem_key: &[u8],
    pem_cert: &[u8],
    config: &CertificateConfig,
    minimum_remaining_validity: Duration,
    now: OffsetDateTime,
) -> Result<()> {
    let cert = parse_key_pair(pem_key, pem_cert)?;

    let failures = check_fields(&cert, config, minimum_remaining_validity, now);
    match ValidationErrors::from_failures(failures) {
        None => {
            tracing::debug!(subject = ?cert.subject().common_name, "key pair is valid");
            Ok(())
        }
        Some(errors) => {
            tracing::debug!(
                subject = ?cert.subject().common_name,
                failures = errors.len(),
                "key pair does not match configuration"
            );
            Err(CertError::Validation(errors))
        }
    }
}

fn parse_key_pair(pem_key: &[u8], pem_cert: &[u8]) -> Result<Certificate> {
    let key = pem_to_private_key(pem_key)?;
    let cert = pem_to_certificate(pem_cert)?;

    match cert.public_key()? {
        PublicKey::Rsa(public) if public.n() == key.public_key().n() => Ok(cert),
        PublicKey::Rsa(_) => Err(CertError::KeyCertificateMismatch),
        _ => Err(CertError::UnsupportedKeyAlgorithm(
            "certificate public key is not RSA".to_string(),
        )),
    }
}

fn check_fields(
    cert: &Certificate,
    config: &CertificateConfig,
    minimum_remaining_validity: Duration,
    now: OffsetDateTime,
) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();

    if let Some((actual, expected)) = diff_as_sets(cert.dns_names(), &config.dns_names, Ord::cmp) {
        failures.push(ValidationFailure::DnsNames { actual, expected });
    }

    if let Some((actual, expected)) =
        diff_as_sets(cert.ext_key_usages(), &config.ext_key_usages, Ord::cmp)
    {
        failures.push(ValidationFailure::ExtendedKeyUsages { actual, expected });
    }

    let canonical = |ips: &[IpAddr]| ips.iter().map(IpAddr::to_canonical).collect::<Vec<_>>();
    if let Some((actual, expected)) = diff_as_sets(
        &canonical(cert.ip_addresses()),
        &canonical(&config.ip_addresses),
        |a, b| ip_octets(a).cmp(&ip_octets(b)),
    ) {
        failures.push(ValidationFailure::IpAddresses { actual, expected });
    }

    if cert.key_usages() != config.key_usages {
        failures.push(ValidationFailure::KeyUsage {
            actual: cert.key_usages(),
            expected: config.key_usages,
        });
    }

    let actual_subject = cert.subject().normalized();
    let expected_subject = config.subject.normalized();
    if actual_subject != expected_subject {
        failures.push(ValidationFailure::Subject {
            actual: Box::new(actual_subject),
            expected: Box::new(expected_subject),
        });
    }

    let remaining = cert.not_after() - now;
    if remaining < minimum_remaining_validity {
        failures.push(ValidationFailure::RemainingValidity {
            remaining,
            minimum: minimum_remaining_validity,
        });
    }

    if cert.is_ca() != config.is_ca {
        failures.push(ValidationFailure::IsCa {
            actual: cert.is_ca(),
            expected: config.is_ca,
        });
    }

    failures
}

/// Compares two slices as multisets, returning both sorted when they differ.
fn diff_as_sets<T, F>(actual: &[T], expected: &[T], compare: F) -> Option<(Vec<T>, Vec<T>)>
where
    T: Clone + PartialEq,
    F: Fn(&T, &T) -> std::cmp::Ordering,
{
    let mut actual = actual.to_vec();
    let mut expected = expected.to_vec();
    actual.sort_by(&compare);
    expected.sort_by(&compare);
    (actual != expected).then_some((actual, expected))
}
