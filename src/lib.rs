//! # certforge - RSA Certificate Issuance and Key-Pair Validation
//!
//! certforge issues X.509 certificates for cluster components and checks that
//! stored key material still matches the configuration it was issued from. It
//! is built entirely on RustCrypto libraries; OpenSSL is only used by the tests
//! to cross-check the output.
//!
//! ## Key Features
//!
//! - **RSA 2048**: every generated key is a [`key::KEY_SIZE`]-bit RSA key
//! - **Self-Signed CAs**: root certificates whose `notBefore` starts now
//! - **CA-Signed Certificates**: issued from a PKCS#10 request, inheriting the CA's `notBefore`
//! - **Subject Key Identifiers**: SHA-1 over the RSA or EC public key
//! - **PEM Armor**: keys, certificates, requests and public keys
//! - **Drift Validation**: every differing field is reported at once
//!
//! ## Quick Start
//!
//! ### Creating a CA and a Serving Certificate
//!
//! ```rust,no_run
//! use certforge::cert::extensions::{ExtendedKeyUsageOption, KeyUsages};
//! use certforge::cert::params::{
//!     CertificateConfig, DistinguishedName, VALIDITY_ONE_YEAR, VALIDITY_TEN_YEARS,
//! };
//! use certforge::cert::{generate_self_signed_certificate, generate_signed_certificate};
//! use certforge::pem_utils::{certificate_to_pem, private_key_to_pem};
//!
//! # fn main() -> certforge::error::Result<()> {
//! let ca_config = CertificateConfig::builder()
//!     .subject(
//!         DistinguishedName::builder()
//!             .common_name("etcd-ca")
//!             .organizational_unit(vec!["openshift".to_string()])
//!             .build(),
//!     )
//!     .key_usages(KeyUsages::KeyCertSign | KeyUsages::CRLSign)
//!     .validity(VALIDITY_TEN_YEARS)
//!     .is_ca(true)
//!     .build();
//! let (ca_key, ca_cert) = generate_self_signed_certificate(&ca_config)?;
//!
//! let server_config = CertificateConfig::builder()
//!     .subject(
//!         DistinguishedName::builder()
//!             .common_name("etcd-0")
//!             .organization(vec!["etcd".to_string()])
//!             .build(),
//!     )
//!     .dns_names(vec!["etcd-0.example.com".to_string()])
//!     .ext_key_usages(vec![ExtendedKeyUsageOption::ServerAuth])
//!     .key_usages(KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment)
//!     .validity(VALIDITY_ONE_YEAR)
//!     .build();
//! let (key, cert) = generate_signed_certificate(&ca_key, &ca_cert, &server_config)?;
//!
//! println!("{}", private_key_to_pem(&key));
//! println!("{}", certificate_to_pem(&cert));
//! # Ok(())
//! # }
//! ```
//!
//! ### Validating a Stored Key Pair
//!
//! ```rust,no_run
//! use certforge::cert::params::{CertificateConfig, DistinguishedName, VALIDITY_ONE_DAY};
//! use certforge::error::CertError;
//! use certforge::validate::validate_key_pair;
//!
//! # fn check(key_pem: &[u8], cert_pem: &[u8]) -> certforge::error::Result<()> {
//! let config = CertificateConfig::builder()
//!     .subject(DistinguishedName::builder().common_name("etcd-0").build())
//!     .validity(VALIDITY_ONE_DAY)
//!     .build();
//!
//! match validate_key_pair(key_pem, cert_pem, &config, time::Duration::hours(1)) {
//!     Ok(()) => println!("certificate is current"),
//!     Err(CertError::Validation(failures)) => {
//!         for failure in failures {
//!             println!("reissue needed: {failure}");
//!         }
//!     }
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`key`]: Key generation and subject key identifiers
//! - [`cert`]: Certificate configuration, requests and issuance
//! - [`issuer`]: Self-signed and CA-backed issuers
//! - [`pem_utils`]: PEM encoding and decoding
//! - [`validate`]: Key-pair validation against a configuration
//! - [`error`]: Error types
//! - [`tbs_certificate`]: Low-level certificate structure manipulation

pub mod cert;
pub mod error;
pub mod issuer;
pub mod key;
pub mod pem_utils;
pub(crate) mod pki;
pub mod tbs_certificate;
pub mod validate;
