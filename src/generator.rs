//! Key, root CA, leaf and request generation driven by a [`CertificateConfig`].

use crate::cert::params::CertificateTemplate;
use crate::cert::request::CertificateSigningRequest;
use crate::cert::{Certificate, CertificateWithPrivateKey};
use crate::config::{CertificateConfig, CertificateOptions};
use crate::error::{CertGenError, Result};
use crate::issuer::Issuer;
use crate::key::{KeyPair, PublicKey};

/// Issues a root CA and leaf certificates from one configuration.
///
/// Each call is independent: keys are fresh per certificate and every
/// certificate draws its own random serial number.
#[derive(Clone, Debug, Default)]
pub struct Generator {
    config: Option<CertificateConfig>,
}

/// Everything one pipeline run produces.
#[derive(Clone, Debug)]
pub struct IssuedBundle {
    pub ca_cert: Certificate,
    pub ca_key: KeyPair,
    pub leaf_cert: Certificate,
    pub leaf_key: KeyPair,
    pub csr: Option<CertificateSigningRequest>,
}

impl Generator {
    pub fn new(config: CertificateConfig) -> Self {
        Self {
            config: Some(config),
        }
    }

    pub fn config(&self) -> Result<&CertificateConfig> {
        self.config.as_ref().ok_or(CertGenError::MissingConfig)
    }

    /// Generates an RSA key of `key_size` bits.
    pub fn generate_private_key(&self, key_size: usize) -> Result<KeyPair> {
        self.config()?;
        KeyPair::generate_rsa(key_size)
    }

    /// Generates a key and self-signs a root CA certificate with it.
    pub fn generate_root_ca(&self) -> Result<(Certificate, KeyPair)> {
        let config = self.config()?;
        let key = self.generate_private_key(config.key_size)?;
        let template = template_from_options(&config.root_ca_options(), &key);
        let cert = Certificate::new_self_signed(&template, &key)?;
        Ok((cert, key))
    }

    /// Generates a fresh key and issues a leaf certificate for it, signed by
    /// `ca_key` on behalf of `ca_cert`.
    pub fn generate_leaf_certificate(
        &self,
        ca_cert: &Certificate,
        ca_key: &KeyPair,
    ) -> Result<(Certificate, KeyPair)> {
        let config = self.config()?;
        let key = self.generate_private_key(config.key_size)?;
        let cert = self.issue_leaf_certificate(&key, ca_cert, ca_key)?;
        Ok((cert, key))
    }

    /// Issues a leaf certificate for an existing key.
    pub fn issue_leaf_certificate(
        &self,
        leaf_key: &KeyPair,
        ca_cert: &Certificate,
        ca_key: &KeyPair,
    ) -> Result<Certificate> {
        let config = self.config()?;
        let template = template_from_options(&config.leaf_options(), leaf_key);
        let issuer = CertificateWithPrivateKey {
            cert: ca_cert.clone(),
            key: ca_key.clone(),
        };
        issuer.issue(&template)
    }

    /// Builds a request for the leaf subject and DNS names, signed by `key`.
    pub fn generate_certificate_request(&self, key: &KeyPair) -> Result<CertificateSigningRequest> {
        let options = self.config()?.leaf_options();
        CertificateSigningRequest::new(&options.subject, &options.dns_names, key)
    }

    /// Runs the whole pipeline: root CA, leaf, and optionally a request for the
    /// leaf key.
    ///
    /// The configuration is validated first so that nothing is generated for
    /// input the command surface would reject.
    pub fn issue_all(&self, with_csr: bool) -> Result<IssuedBundle> {
        self.config()?.validate()?;

        let (ca_cert, ca_key) = self.generate_root_ca()?;
        let (leaf_cert, leaf_key) = self.generate_leaf_certificate(&ca_cert, &ca_key)?;
        let csr = if with_csr {
            Some(self.generate_certificate_request(&leaf_key)?)
        } else {
            None
        };

        Ok(IssuedBundle {
            ca_cert,
            ca_key,
            leaf_cert,
            leaf_key,
            csr,
        })
    }
}

fn template_from_options(options: &CertificateOptions, key: &KeyPair) -> CertificateTemplate {
    CertificateTemplate::builder()
        .subject(options.subject.clone())
        .subject_public_key(PublicKey::from_key_pair(key))
        .dns_names(options.dns_names.clone())
        .is_ca(options.is_ca)
        .key_usage(options.key_usage)
        .extended_key_usage(options.extended_key_usage.clone())
        .validity(options.validity())
        .build()
}
