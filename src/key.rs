use der::{Decode, Encode};
use pkcs8::{DecodePrivateKey, EncodePrivateKey};
use rsa::pkcs1v15::{Signature as RsaSignature, SigningKey as RsaSigningKey};
use rsa::pkcs1v15::VerifyingKey as RsaVerifyingKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::{SignatureEncoding, Signer as RsaSigner, Verifier as RsaVerifier};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::cert::SignatureAlgorithm;
use crate::error::{CertGenError, Result};

/// Smallest RSA modulus the generator will produce. This is a policy floor,
/// not a security recommendation.
pub const MIN_KEY_SIZE: usize = 1024;

/// Modulus size used when the configuration does not override it.
pub const DEFAULT_KEY_SIZE: usize = 4096;

/// Supported key types for certificate operations.
///
/// Only RSA is issued today; the enum stays closed over algorithms so that a
/// new variant does not change any signature that takes a `KeyPair`.
#[derive(Clone, Debug)]
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
}

impl KeyPair {
    /// Generate an RSA key pair with exactly `bits` bits of modulus.
    ///
    /// Fails with [`CertGenError::InvalidKeySize`] below [`MIN_KEY_SIZE`].
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        if bits < MIN_KEY_SIZE {
            return Err(CertGenError::InvalidKeySize {
                requested: bits,
                minimum: MIN_KEY_SIZE,
            });
        }

        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits).map_err(CertGenError::KeyGenerationFailed)?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair::Rsa {
            private: Box::new(private),
            public,
        })
    }

    /// Bit length of the key. For RSA this is the modulus length.
    pub fn bits(&self) -> usize {
        match self {
            KeyPair::Rsa { public, .. } => public.n().bits(),
        }
    }

    /// Signature algorithm this key produces.
    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        match self {
            KeyPair::Rsa { .. } => SignatureAlgorithm::Sha256WithRSA,
        }
    }

    /// Signs `data` with the private half of the pair.
    pub fn sign_data(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            KeyPair::Rsa { private, .. } => {
                let signing_key = RsaSigningKey::<Sha256>::new(private.as_ref().clone());
                let signature = signing_key
                    .try_sign(data)
                    .map_err(|e| CertGenError::signing("data", e))?;
                Ok(signature.to_vec())
            }
        }
    }

    /// Subject public key info of the public half.
    pub fn as_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        PublicKey::from_key_pair(self).to_spki()
    }

    /// Serializes the private key as a PKCS#8 `PrivateKeyInfo` document.
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>> {
        match self {
            KeyPair::Rsa { private, .. } => private
                .to_pkcs8_der()
                .map(|doc| doc.as_bytes().to_vec())
                .map_err(|e| CertGenError::encoding("private key", e)),
        }
    }

    /// Parses a PKCS#8 `PrivateKeyInfo` document.
    ///
    /// Documents that carry anything other than an RSA key fail with
    /// [`CertGenError::WrongKeyType`].
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let info = pkcs8::PrivateKeyInfo::from_der(der)
            .map_err(|e| CertGenError::parse("private key", e))?;
        if info.algorithm.oid != const_oid::db::rfc5912::RSA_ENCRYPTION {
            return Err(CertGenError::WrongKeyType {
                found: info.algorithm.oid.to_string(),
            });
        }

        let private = RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|e| CertGenError::parse("private key", e))?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair::Rsa {
            private: Box::new(private),
            public,
        })
    }
}

/// The public half of a [`KeyPair`], or the key found in a certificate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
}

impl PublicKey {
    pub fn from_key_pair(key_pair: &KeyPair) -> Self {
        match key_pair {
            KeyPair::Rsa { public, .. } => PublicKey::Rsa(public.clone()),
        }
    }

    /// Reads the key out of a subject public key info structure.
    pub fn from_x509spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        if spki.algorithm.oid != const_oid::db::rfc5912::RSA_ENCRYPTION {
            return Err(CertGenError::WrongKeyType {
                found: spki.algorithm.oid.to_string(),
            });
        }

        let der = spki
            .to_der()
            .map_err(|e| CertGenError::encoding("public key", e))?;
        let public = RsaPublicKey::from_public_key_der(&der)
            .map_err(|e| CertGenError::parse("public key", e))?;
        Ok(PublicKey::Rsa(public))
    }

    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        match self {
            PublicKey::Rsa(public) => SubjectPublicKeyInfoOwned::from_key(public.clone())
                .map_err(|e| CertGenError::encoding("public key", e)),
        }
    }

    /// Bit length of the key.
    pub fn bits(&self) -> usize {
        match self {
            PublicKey::Rsa(public) => public.n().bits(),
        }
    }

    /// Verifies `signature` over `data` under `algorithm`.
    pub fn verify(
        &self,
        algorithm: &AlgorithmIdentifierOwned,
        data: &[u8],
        signature: &[u8],
    ) -> Result<()> {
        match self {
            PublicKey::Rsa(public) => {
                if algorithm.oid != const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION {
                    return Err(CertGenError::VerificationFailed(format!(
                        "unsupported signature algorithm {}",
                        algorithm.oid
                    )));
                }
                let verifying_key = RsaVerifyingKey::<Sha256>::new(public.clone());
                let signature = RsaSignature::try_from(signature)
                    .map_err(|e| CertGenError::VerificationFailed(e.to_string()))?;
                verifying_key
                    .verify(data, &signature)
                    .map_err(|e| CertGenError::VerificationFailed(e.to_string()))
            }
        }
    }
}
