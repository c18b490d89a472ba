use der::asn1::{AnyRef, BitString};
use rsa::RsaPublicKey;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use sha2::Sha256;
use x509_cert::certificate::{CertificateInner, TbsCertificateInner};
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::key::KeyPair;

/// The algorithm every certificate and request is signed with:
/// sha256WithRSAEncryption with explicit NULL parameters.
pub fn signature_algorithm() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
        parameters: Some(AnyRef::NULL.into()),
    }
}

/// Signs the provided data with RSASSA-PKCS1-v1_5 over SHA-256.
pub fn sign_data(data: &[u8], key: &KeyPair) -> Result<Vec<u8>, rsa::signature::Error> {
    let signing_key = SigningKey::<Sha256>::new(key.private_key().clone());
    let signature = signing_key.try_sign(data)?;
    Ok(signature.to_vec())
}

/// Verifies an RSASSA-PKCS1-v1_5 SHA-256 signature.
pub fn verify_signature(
    data: &[u8],
    signature: &[u8],
    public_key: &RsaPublicKey,
) -> Result<(), rsa::signature::Error> {
    let verifying_key = VerifyingKey::<Sha256>::new(public_key.clone());
    let signature = Signature::try_from(signature)?;
    verifying_key.verify(data, &signature)
}

/// Assembles the final certificate from the TBS portion and its signature.
pub fn assemble_certificate(
    tbs_certificate: TbsCertificateInner,
    signature: &[u8],
) -> Result<CertificateInner, der::Error> {
    Ok(CertificateInner {
        signature_algorithm: tbs_certificate.signature.clone(),
        tbs_certificate,
        signature: BitString::from_bytes(signature)?,
    })
}
