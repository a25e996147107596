//! use certgen::error::CertGenError;

use std::path::PathBuf;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Represents errors that can occur while issuing and encoding certificates.
///
/// The generation core never logs; every failure is returned as one of these
/// variants with the lower-level cause attached as its source.
#[derive(Debug, Error)]
pub enum CertGenError {
    /// The generator was asked to work without a configuration.
    #[error("configuration is missing")]
    MissingConfig,

    /// The configuration holds values outside the accepted ranges.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The requested RSA modulus is below the policy floor.
    #[error("key size must be at least {minimum} bits, got {requested}")]
    InvalidKeySize { requested: usize, minimum: usize },

    /// The random source or the RSA prime search failed.
    #[error("failed to generate private key: {0}")]
    KeyGenerationFailed(#[source] rsa::Error),

    /// Signing a certificate or request body failed.
    #[error("failed to sign {what}: {source}")]
    SigningFailed {
        what: &'static str,
        #[source]
        source: BoxError,
    },

    /// DER encoding of a structure failed.
    #[error("failed to encode {what}: {source}")]
    EncodingFailed {
        what: &'static str,
        #[source]
        source: BoxError,
    },

    /// The bytes did not parse as the expected structure.
    #[error("failed to parse {what}: {source}")]
    ParseFailed {
        what: &'static str,
        #[source]
        source: BoxError,
    },

    /// No PEM envelope could be found in the input.
    #[error("failed to parse PEM block: {0}")]
    MalformedPem(#[source] pem::PemError),

    /// The private key is not an RSA key.
    #[error("key is not an RSA private key (algorithm {found})")]
    WrongKeyType { found: String },

    /// A signature did not verify against the presented parent.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// The external bundling mechanism did not produce an archive.
    #[error("failed to generate PKCS#12 bundle: {0}")]
    BundleGenerationFailed(String),

    /// Reading or writing an artifact on disk failed.
    #[error("file operation failed for {path}: {source}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CertGenError {
    pub(crate) fn signing(what: &'static str, source: impl Into<BoxError>) -> Self {
        CertGenError::SigningFailed {
            what,
            source: source.into(),
        }
    }

    pub(crate) fn encoding(what: &'static str, source: impl Into<BoxError>) -> Self {
        CertGenError::EncodingFailed {
            what,
            source: source.into(),
        }
    }

    pub(crate) fn parse(what: &'static str, source: impl Into<BoxError>) -> Self {
        CertGenError::ParseFailed {
            what,
            source: source.into(),
        }
    }
}

impl From<pem::PemError> for CertGenError {
    fn from(err: pem::PemError) -> Self {
        CertGenError::MalformedPem(err)
    }
}

pub type Result<T> = std::result::Result<T, CertGenError>;
