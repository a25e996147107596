pub mod extensions;
pub mod params;
pub mod request;

use der::asn1::{Any, AnyRef};
use der::{Decode, Encode};
use extensions::{
    BasicConstraints, ExtendedKeyUsage, ExtendedKeyUsageOption, FlagSet, KeyUsage, KeyUsages,
    SubjectAltName, SubjectKeyIdentifier, ToAndFromX509Extension,
};
use params::DistinguishedName;
use time::OffsetDateTime;
use x509_cert::name::Name;

use crate::error::{CertGenError, Result};
use crate::issuer::Issuer;
use crate::key::{KeyPair, PublicKey};

/// PEM label of an X.509 certificate.
pub const CERTIFICATE_PEM_LABEL: &str = "CERTIFICATE";

/// Represents the supported signature algorithms for certificates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption (PKCS#1 v1.5).
    Sha256WithRSA,
}

impl From<SignatureAlgorithm> for x509_cert::spki::AlgorithmIdentifierOwned {
    /// Converts a `SignatureAlgorithm` into an `AlgorithmIdentifierOwned`.
    ///
    /// RSA algorithms carry an explicit NULL parameter (RFC 4055 section 5).
    fn from(value: SignatureAlgorithm) -> Self {
        match value {
            SignatureAlgorithm::Sha256WithRSA => x509_cert::spki::AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
                parameters: Some(Any::from(AnyRef::NULL)),
            },
        }
    }
}

/// Represents a signed X.509 certificate.
///
/// The DER bytes produced by the signer (or handed to [`Certificate::from_der`])
/// are authoritative; every other view is derived from them.
#[derive(Debug, Clone)]
pub struct Certificate {
    /// The parsed representation of the certificate.
    pub inner: x509_cert::Certificate,
    der: Vec<u8>,
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl Certificate {
    /// Parses a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = x509_cert::Certificate::from_der(der)
            .map_err(|e| CertGenError::parse("certificate", e))?;
        Ok(Self {
            inner,
            der: der.to_vec(),
        })
    }

    pub(crate) fn from_inner(inner: x509_cert::Certificate) -> Result<Self> {
        let der = inner
            .to_der()
            .map_err(|e| CertGenError::encoding("certificate", e))?;
        Ok(Self { inner, der })
    }

    /// The raw signed encoding.
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Vec<u8> {
        self.der.clone()
    }

    /// Wraps the raw signed bytes in a `CERTIFICATE` PEM envelope.
    pub fn to_pem(&self) -> String {
        crate::encoding::der_to_pem(&self.der, CERTIFICATE_PEM_LABEL)
    }

    /// Parses the first PEM block of `input`, which must be labelled `CERTIFICATE`.
    pub fn from_pem(input: impl AsRef<[u8]>) -> Result<Self> {
        let der = crate::encoding::pem_to_der_with_label(input, CERTIFICATE_PEM_LABEL)?;
        Self::from_der(&der)
    }

    /// Creates a new self-signed certificate.
    ///
    /// The template subject doubles as the issuer and `key` signs it.
    pub fn new_self_signed(
        template: &params::CertificateTemplate,
        key: &KeyPair,
    ) -> Result<Self> {
        let self_issuer = SelfIssuer {
            name: template.subject.as_x509_name()?,
            key,
        };
        self_issuer.issue(template)
    }

    /// Serial number as big-endian two's complement bytes.
    pub fn serial_number(&self) -> &[u8] {
        self.inner.tbs_certificate.serial_number.as_bytes()
    }

    pub fn subject_name(&self) -> &Name {
        &self.inner.tbs_certificate.subject
    }

    pub fn issuer_name(&self) -> &Name {
        &self.inner.tbs_certificate.issuer
    }

    pub fn subject(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(self.subject_name())
    }

    pub fn issuer(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(self.issuer_name())
    }

    pub fn not_before(&self) -> OffsetDateTime {
        OffsetDateTime::from(
            self.inner
                .tbs_certificate
                .validity
                .not_before
                .to_system_time(),
        )
    }

    pub fn not_after(&self) -> OffsetDateTime {
        OffsetDateTime::from(
            self.inner
                .tbs_certificate
                .validity
                .not_after
                .to_system_time(),
        )
    }

    /// `notAfter - notBefore`.
    pub fn validity_span(&self) -> time::Duration {
        self.not_after() - self.not_before()
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    /// Decodes the extension `E`, if the certificate carries it.
    pub fn extension<E: ToAndFromX509Extension>(&self) -> Result<Option<E>> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .find(|ext| ext.extn_id == E::OID)
            .map(|ext| E::from_x509_extension_value(ext.extn_value.as_bytes()))
            .transpose()
    }

    /// Whether basic constraints mark this certificate as a CA.
    pub fn is_ca(&self) -> bool {
        matches!(
            self.extension::<BasicConstraints>(),
            Ok(Some(BasicConstraints { is_ca: true, .. }))
        )
    }

    /// Key usage bits; empty when the extension is absent.
    pub fn key_usage(&self) -> FlagSet<KeyUsages> {
        match self.extension::<KeyUsage>() {
            Ok(Some(KeyUsage(flags))) => flags,
            _ => FlagSet::default(),
        }
    }

    pub fn extended_key_usage(&self) -> Vec<ExtendedKeyUsageOption> {
        match self.extension::<ExtendedKeyUsage>() {
            Ok(Some(eku)) => eku.usage,
            _ => Vec::new(),
        }
    }

    pub fn dns_names(&self) -> Vec<String> {
        match self.extension::<SubjectAltName>() {
            Ok(Some(san)) => san.names,
            _ => Vec::new(),
        }
    }

    pub fn subject_key_id(&self) -> Option<Vec<u8>> {
        match self.extension::<SubjectKeyIdentifier>() {
            Ok(Some(SubjectKeyIdentifier(id))) => Some(id),
            _ => None,
        }
    }

    /// Checks that `parent` issued this certificate.
    ///
    /// `parent` must be a CA, must allow certificate signing when it carries a
    /// key usage extension, and its public key must verify the signature over
    /// the TBS bytes. A self-signed root passes with `parent == self`.
    pub fn check_signature_from(&self, parent: &Certificate) -> Result<()> {
        if !parent.is_ca() {
            return Err(CertGenError::VerificationFailed(
                "parent certificate is not a CA".to_string(),
            ));
        }

        if parent.extension::<KeyUsage>()?.is_some()
            && !parent.key_usage().contains(KeyUsages::KeyCertSign)
        {
            return Err(CertGenError::VerificationFailed(
                "parent certificate may not sign certificates".to_string(),
            ));
        }

        let tbs = self
            .inner
            .tbs_certificate
            .to_der()
            .map_err(|e| CertGenError::encoding("certificate body", e))?;
        let signature = self.inner.signature.as_bytes().ok_or_else(|| {
            CertGenError::VerificationFailed("signature has unused bits".to_string())
        })?;

        parent
            .public_key()?
            .verify(&self.inner.signature_algorithm, &tbs, signature)
    }
}

// Helper struct for self-signed certificates
struct SelfIssuer<'a> {
    name: Name,
    key: &'a KeyPair,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> Result<Name> {
        Ok(self.name.clone())
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }

    fn authority_key_id(&self) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
}

/// A CA certificate together with the key that signs on its behalf.
#[derive(Debug, Clone)]
pub struct CertificateWithPrivateKey {
    pub cert: Certificate,
    pub key: KeyPair,
}

impl Issuer for CertificateWithPrivateKey {
    fn issuer_name(&self) -> Result<Name> {
        // The name of the issuer is the subject of the certificate
        Ok(self.cert.subject_name().clone())
    }

    fn signing_key(&self) -> &KeyPair {
        &self.key
    }

    fn authority_key_id(&self) -> Result<Option<Vec<u8>>> {
        if let Some(id) = self.cert.subject_key_id() {
            return Ok(Some(id));
        }
        let spki = &self.cert.inner.tbs_certificate.subject_public_key_info;
        Ok(Some(crate::issuer::key_identifier(spki)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::params::{CertificateTemplate, Validity};

    fn ca_template(key: &KeyPair) -> CertificateTemplate {
        CertificateTemplate::builder()
            .subject(
                DistinguishedName::builder()
                    .organization("Crab widgits SE")
                    .common_name("myca.local")
                    .build(),
            )
            .subject_public_key(PublicKey::from_key_pair(key))
            .dns_names(vec!["myca.local".to_string()])
            .is_ca(true)
            .key_usage(KeyUsages::KeyCertSign | KeyUsages::CRLSign)
            .validity(Validity::for_days(30))
            .build()
    }

    #[test]
    fn test_self_signed_certificate_verifies() {
        let key = KeyPair::generate_rsa(1024).unwrap();
        let cert = Certificate::new_self_signed(&ca_template(&key), &key).unwrap();

        assert!(cert.is_ca());
        assert_eq!(cert.subject(), cert.issuer());
        assert_eq!(cert.dns_names(), vec!["myca.local".to_string()]);
        assert_eq!(cert.validity_span(), time::Duration::days(30));
        assert!(cert.subject_key_id().is_some());
        cert.check_signature_from(&cert).unwrap();
    }

    #[test]
    fn test_der_is_preserved() {
        let key = KeyPair::generate_rsa(1024).unwrap();
        let cert = Certificate::new_self_signed(&ca_template(&key), &key).unwrap();
        let reparsed = Certificate::from_der(cert.as_der()).unwrap();
        assert_eq!(reparsed, cert);
        assert_eq!(reparsed.serial_number(), cert.serial_number());
    }

    #[test]
    fn test_non_ca_parent_is_rejected() {
        let key = KeyPair::generate_rsa(1024).unwrap();
        let mut template = ca_template(&key);
        template.is_ca = false;
        template.key_usage = KeyUsages::DigitalSignature.into();
        let cert = Certificate::new_self_signed(&template, &key).unwrap();

        assert!(matches!(
            cert.check_signature_from(&cert),
            Err(CertGenError::VerificationFailed(_))
        ));
    }

    #[test]
    fn test_tampered_certificate_fails_verification() {
        let key = KeyPair::generate_rsa(1024).unwrap();
        let cert = Certificate::new_self_signed(&ca_template(&key), &key).unwrap();

        let mut inner = cert.inner.clone();
        inner.tbs_certificate.subject = DistinguishedName::builder()
            .common_name("mallory.local")
            .build()
            .as_x509_name()
            .unwrap();
        let tampered = Certificate::from_inner(inner).unwrap();

        assert!(tampered.check_signature_from(&cert).is_err());
    }
}
