use std::fmt;

use const_oid::ObjectIdentifier;
use const_oid::db::rfc5912;
use der::zeroize::Zeroizing;
use der::{Decode, Encode};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use pkcs8::DecodePublicKey;
use rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey, EncodeRsaPublicKey},
};
use sha1::{Digest, Sha1};
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::error::{CertError, Result};

/// Modulus size of every generated RSA key, in bits.
pub const KEY_SIZE: usize = 2048;

/// An RSA private key, its public half, and the PKCS#1 DER it round-trips through.
#[derive(Clone)]
pub struct KeyPair {
    private: Box<RsaPrivateKey>,
    public: RsaPublicKey,
    pkcs1_der: Zeroizing<Vec<u8>>,
}

/// Generate an RSA key pair of [`KEY_SIZE`] bits from the operating system RNG.
pub fn generate_key() -> Result<KeyPair> {
    let mut rng = OsRng;
    let private = RsaPrivateKey::new(&mut rng, KEY_SIZE)
        .map_err(|e| CertError::KeyGeneration(e.to_string()))?;
    let pkcs1_der = private
        .to_pkcs1_der()
        .map_err(|e| CertError::KeyGeneration(e.to_string()))?;
    tracing::debug!(bits = KEY_SIZE, "generated RSA private key");
    Ok(KeyPair::from_parts(
        private,
        Zeroizing::new(pkcs1_der.as_bytes().to_vec()),
    ))
}

impl KeyPair {
    fn from_parts(private: RsaPrivateKey, pkcs1_der: Zeroizing<Vec<u8>>) -> Self {
        let public = RsaPublicKey::from(&private);
        KeyPair {
            private: Box::new(private),
            public,
            pkcs1_der,
        }
    }

    /// Parse a PKCS#1 `RSAPrivateKey` structure.
    pub fn from_pkcs1_der(der: &[u8]) -> Result<Self> {
        let private = RsaPrivateKey::from_pkcs1_der(der)
            .map_err(|e| CertError::Asn1Parse(format!("private key: {e}")))?;
        Ok(Self::from_parts(private, Zeroizing::new(der.to_vec())))
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// The PKCS#1 DER encoding of the private key.
    pub fn to_pkcs1_der(&self) -> &[u8] {
        &self.pkcs1_der
    }

    /// The subject public key info embedded in certificates and requests for this key.
    pub fn as_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        PublicKey::Rsa(self.public.clone()).to_spki()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("bits", &(self.public.size() * 8))
            .finish_non_exhaustive()
    }
}

/// A public key whose subject key identifier can be computed.
///
/// Every variant carries the wire encoding that RFC 5280 method (1) hashes:
/// the PKCS#1 `RSAPublicKey` sequence for RSA, the SEC1 uncompressed point for
/// elliptic curves.
#[derive(Clone, Debug, PartialEq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    EcdsaP256(p256::PublicKey),
    EcdsaP384(p384::PublicKey),
    EcdsaP521(p521::PublicKey),
}

impl PublicKey {
    pub fn from_key_pair(key_pair: &KeyPair) -> Self {
        PublicKey::Rsa(key_pair.public.clone())
    }

    /// Extracts the public key from a certificate or request SPKI.
    ///
    /// # Errors
    /// [`CertError::UnsupportedKeyAlgorithm`] for anything other than RSA or
    /// the NIST P-256/P-384/P-521 curves.
    pub fn from_x509spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        let der = spki.to_der()?;
        match spki.algorithm.oid {
            rfc5912::RSA_ENCRYPTION => RsaPublicKey::from_public_key_der(&der)
                .map(PublicKey::Rsa)
                .map_err(|e| CertError::Asn1Parse(format!("RSA public key: {e}"))),
            rfc5912::ID_EC_PUBLIC_KEY => {
                let curve = spki
                    .algorithm
                    .parameters
                    .as_ref()
                    .map(|params| params.decode_as::<ObjectIdentifier>())
                    .transpose()?;
                let parsed = match curve {
                    Some(rfc5912::SECP_256_R_1) => {
                        p256::PublicKey::from_public_key_der(&der).map(PublicKey::EcdsaP256)
                    }
                    Some(rfc5912::SECP_384_R_1) => {
                        p384::PublicKey::from_public_key_der(&der).map(PublicKey::EcdsaP384)
                    }
                    Some(rfc5912::SECP_521_R_1) => {
                        p521::PublicKey::from_public_key_der(&der).map(PublicKey::EcdsaP521)
                    }
                    Some(other) => {
                        return Err(CertError::UnsupportedKeyAlgorithm(format!(
                            "elliptic curve {other}"
                        )));
                    }
                    None => {
                        return Err(CertError::Asn1Parse(
                            "EC public key without named curve".to_string(),
                        ));
                    }
                };
                parsed.map_err(|e| CertError::Asn1Parse(format!("EC public key: {e}")))
            }
            other => Err(CertError::UnsupportedKeyAlgorithm(other.to_string())),
        }
    }

    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        use pkcs8::EncodePublicKey;

        let document = match self {
            PublicKey::Rsa(key) => key.to_public_key_der(),
            PublicKey::EcdsaP256(key) => key.to_public_key_der(),
            PublicKey::EcdsaP384(key) => key.to_public_key_der(),
            PublicKey::EcdsaP521(key) => key.to_public_key_der(),
        }
        .map_err(|e| CertError::Encoding(e.to_string()))?;
        Ok(SubjectPublicKeyInfoOwned::from_der(document.as_bytes())?)
    }

    /// SHA-1 over the algorithm-specific encoding of the key.
    pub fn subject_key_id(&self) -> Result<[u8; 20]> {
        let encoded = match self {
            PublicKey::Rsa(key) => key
                .to_pkcs1_der()
                .map_err(|e| CertError::Encoding(e.to_string()))?
                .as_bytes()
                .to_vec(),
            PublicKey::EcdsaP256(key) => key.to_encoded_point(false).as_bytes().to_vec(),
            PublicKey::EcdsaP384(key) => key.to_encoded_point(false).as_bytes().to_vec(),
            PublicKey::EcdsaP521(key) => key.to_encoded_point(false).as_bytes().to_vec(),
        };
        Ok(Sha1::digest(&encoded).into())
    }
}

/// Computes the subject key identifier of the key carried in `spki`.
pub fn compute_subject_key_id(spki: &SubjectPublicKeyInfoOwned) -> Result<[u8; 20]> {
    PublicKey::from_x509spki(spki)?.subject_key_id()
}
