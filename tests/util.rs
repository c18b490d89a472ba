#![allow(dead_code)]

use certforge::cert::extensions::{ExtendedKeyUsageOption, KeyUsages};
use certforge::cert::params::{
    CertificateConfig, DistinguishedName, VALIDITY_ONE_YEAR, VALIDITY_TEN_YEARS,
};
use certforge::cert::{Certificate, generate_self_signed_certificate};
use certforge::key::KeyPair;

pub fn ca_config() -> CertificateConfig {
    CertificateConfig::builder()
        .subject(
            DistinguishedName::builder()
                .common_name("myca.local")
                .organizational_unit(vec!["certforge".to_string()])
                .build(),
        )
        .key_usages(KeyUsages::KeyCertSign | KeyUsages::CRLSign | KeyUsages::DigitalSignature)
        .validity(VALIDITY_TEN_YEARS)
        .is_ca(true)
        .build()
}

pub fn generate_ca_cert() -> (KeyPair, Certificate) {
    generate_self_signed_certificate(&ca_config()).unwrap()
}

pub fn server_config() -> CertificateConfig {
    CertificateConfig::builder()
        .subject(
            DistinguishedName::builder()
                .common_name("server.myca.local")
                .organization(vec!["myca".to_string()])
                .organizational_unit(vec!["servers".to_string(), "etcd".to_string()])
                .country(vec!["US".to_string()])
                .build(),
        )
        .dns_names(vec![
            "server.myca.local".to_string(),
            "localhost".to_string(),
        ])
        .ip_addresses(vec!["127.0.0.1".parse().unwrap(), "::1".parse().unwrap()])
        .ext_key_usages(vec![
            ExtendedKeyUsageOption::ServerAuth,
            ExtendedKeyUsageOption::ClientAuth,
        ])
        .key_usages(KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment)
        .validity(VALIDITY_ONE_YEAR)
        .build()
}
