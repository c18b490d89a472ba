//! Errors returned by key generation, issuance, PEM decoding and validation.

use std::fmt;
use std::net::IpAddr;

use thiserror::Error;

use crate::cert::extensions::{ExtendedKeyUsageOption, FlagSet, KeyUsages};
use crate::cert::params::DistinguishedName;

pub type Result<T> = std::result::Result<T, CertError>;

/// Represents errors that can occur while issuing or validating certificates.
#[derive(Debug, Error, Clone)]
pub enum CertError {
    /// The random source or the RSA implementation failed.
    #[error("Key generation error: {0}")]
    KeyGeneration(String),

    /// The subject is missing its common name or organizational unit.
    #[error("certificate subject is not set, or invalid: {0}")]
    InvalidSubject(String),

    /// A subject key identifier was requested for a key that is neither RSA nor EC.
    #[error("only RSA and ECDSA public keys are supported, got algorithm {0}")]
    UnsupportedKeyAlgorithm(String),

    /// A stage of certificate issuance failed.
    #[error("failed during {stage}: {message}")]
    CertificateBuild { stage: BuildStage, message: String },

    /// No PEM block could be found in the input.
    #[error("could not find a PEM block in the {0}")]
    PemDecode(String),

    /// The PEM body is not the expected ASN.1 structure.
    #[error("Failed to parse ASN.1 structure: {0}")]
    Asn1Parse(String),

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    Encoding(String),

    /// The private key does not belong to the certificate.
    #[error("private key does not match certificate")]
    KeyCertificateMismatch,

    /// One or more fields of a certificate drifted from the expected configuration.
    #[error("{0}")]
    Validation(ValidationErrors),
}

impl CertError {
    pub(crate) fn build(stage: BuildStage, err: impl fmt::Display) -> Self {
        CertError::CertificateBuild {
            stage,
            message: err.to_string(),
        }
    }
}

impl From<der::Error> for CertError {
    fn from(err: der::Error) -> Self {
        CertError::Asn1Parse(err.to_string())
    }
}

/// The step of the issuance workflow that produced a [`CertError::CertificateBuild`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    KeyGeneration,
    RequestCreation,
    RequestParse,
    CertificateCreation,
    CertificateParse,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            BuildStage::KeyGeneration => "key generation",
            BuildStage::RequestCreation => "certificate request creation",
            BuildStage::RequestParse => "certificate request parse",
            BuildStage::CertificateCreation => "certificate creation",
            BuildStage::CertificateParse => "certificate parse",
        };
        f.write_str(stage)
    }
}

/// A single field of a stored certificate that differs from the expected configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationFailure {
    #[error("actual dns names {actual:?} differ from expected {expected:?}")]
    DnsNames {
        actual: Vec<String>,
        expected: Vec<String>,
    },

    #[error("actual extended key usages {actual:?} differ from expected {expected:?}")]
    ExtendedKeyUsages {
        actual: Vec<ExtendedKeyUsageOption>,
        expected: Vec<ExtendedKeyUsageOption>,
    },

    #[error("actual ip addresses {actual:?} differ from expected {expected:?}")]
    IpAddresses {
        actual: Vec<IpAddr>,
        expected: Vec<IpAddr>,
    },

    #[error("actual key usage {:#06x} differs from expected {:#06x}", .actual.bits(), .expected.bits())]
    KeyUsage {
        actual: FlagSet<KeyUsages>,
        expected: FlagSet<KeyUsages>,
    },

    #[error("actual subject {actual:?} differs from expected {expected:?}")]
    Subject {
        actual: Box<DistinguishedName>,
        expected: Box<DistinguishedName>,
    },

    #[error("remaining validity {remaining} is smaller than the minimum remaining validity {minimum}")]
    RemainingValidity {
        remaining: time::Duration,
        minimum: time::Duration,
    },

    #[error("actual isCA {actual} does not match expected {expected}")]
    IsCa { actual: bool, expected: bool },
}

/// Every failure found during one validation pass, in check order.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors(Vec<ValidationFailure>);

impl ValidationErrors {
    /// Wraps the collected failures, or returns `None` when nothing failed.
    pub fn from_failures(failures: Vec<ValidationFailure>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self(failures))
        }
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [single] = self.0.as_slice() {
            return write!(f, "{single}");
        }
        f.write_str("[")?;
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{failure}")?;
        }
        f.write_str("]")
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationFailure;
    type IntoIter = std::vec::IntoIter<ValidationFailure>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
