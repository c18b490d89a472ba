use certforge::cert::extensions::{ExtendedKeyUsageOption, KeyUsages};
use certforge::cert::params::{
    CertificateConfig, DistinguishedName, VALIDITY_ONE_YEAR, VALIDITY_TEN_YEARS,
};
use certforge::cert::{generate_self_signed_certificate, generate_signed_certificate};
use certforge::pem_utils::{certificate_to_pem, private_key_to_pem};
use certforge::validate::validate_key_pair;

fn main() -> certforge::error::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // Self-signed CA
    let ca_config = CertificateConfig::builder()
        .subject(
            DistinguishedName::builder()
                .common_name("demo-ca")
                .organizational_unit(vec!["certforge".to_string()])
                .build(),
        )
        .key_usages(KeyUsages::KeyCertSign | KeyUsages::CRLSign | KeyUsages::DigitalSignature)
        .validity(VALIDITY_TEN_YEARS)
        .is_ca(true)
        .build();
    let (ca_key, ca_cert) = generate_self_signed_certificate(&ca_config)?;
    println!("CA Certificate PEM:\n{}", certificate_to_pem(&ca_cert));

    // Serving certificate signed by the CA
    let server_config = CertificateConfig::builder()
        .subject(
            DistinguishedName::builder()
                .common_name("server.demo.local")
                .organization(vec!["demo".to_string()])
                .build(),
        )
        .dns_names(vec![
            "server.demo.local".to_string(),
            "localhost".to_string(),
        ])
        .ip_addresses(vec![std::net::Ipv4Addr::LOCALHOST.into()])
        .ext_key_usages(vec![ExtendedKeyUsageOption::ServerAuth])
        .key_usages(KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment)
        .validity(VALIDITY_ONE_YEAR)
        .build();
    let (server_key, server_cert) =
        generate_signed_certificate(&ca_key, &ca_cert, &server_config)?;

    let key_pem = private_key_to_pem(&server_key);
    let cert_pem = certificate_to_pem(&server_cert);
    println!("Server Certificate PEM:\n{cert_pem}");

    validate_key_pair(
        key_pem.as_bytes(),
        cert_pem.as_bytes(),
        &server_config,
        time::Duration::days(30),
    )?;
    println!("Server key pair matches its configuration");

    Ok(())
}
