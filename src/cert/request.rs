//! PKCS#10 certificate signing requests.

use const_oid::AssociatedOid;
use der::asn1::{Any, BitString, SetOfVec};
use der::{Decode, Encode};
use x509_cert::attr::Attribute;
use x509_cert::request::{CertReq, CertReqInfo, ExtensionReq};

use super::extensions::{SubjectAltName, ToAndFromX509Extension};
use super::params::{DistinguishedName, ExtensionParam};
use crate::error::{CertGenError, Result};
use crate::key::{KeyPair, PublicKey};

/// PEM label of a PKCS#10 request.
pub const CSR_PEM_LABEL: &str = "CERTIFICATE REQUEST";

/// A self-attested request: subject, DNS names and a signature made with the
/// requester's own key.
#[derive(Debug, Clone)]
pub struct CertificateSigningRequest {
    pub inner: CertReq,
    der: Vec<u8>,
}

impl PartialEq for CertificateSigningRequest {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for CertificateSigningRequest {}

impl CertificateSigningRequest {
    /// Builds and signs a request for `subject` and `dns_names` with `key`.
    ///
    /// The DNS names travel as a subject alternative name inside a PKCS#9
    /// extensionRequest attribute.
    pub fn new(subject: &DistinguishedName, dns_names: &[String], key: &KeyPair) -> Result<Self> {
        let mut attributes = SetOfVec::new();
        if !dns_names.is_empty() {
            let san = ExtensionParam::from_extension(
                SubjectAltName {
                    names: dns_names.to_vec(),
                },
                false,
            )?;
            let request = ExtensionReq(vec![san.to_x509_extension()?]);
            let value = Any::from_der(
                &request
                    .to_der()
                    .map_err(|e| CertGenError::encoding("extension request", e))?,
            )
            .map_err(|e| CertGenError::encoding("extension request", e))?;
            let attribute = Attribute {
                oid: ExtensionReq::OID,
                values: SetOfVec::try_from(vec![value])
                    .map_err(|e| CertGenError::encoding("extension request", e))?,
            };
            attributes
                .insert(attribute)
                .map_err(|e| CertGenError::encoding("extension request", e))?;
        }

        let info = CertReqInfo {
            version: x509_cert::request::Version::V1,
            subject: subject.as_x509_name()?,
            public_key: key.as_spki()?,
            attributes,
        };

        let body = info
            .to_der()
            .map_err(|e| CertGenError::encoding("certificate request", e))?;
        let signature = key.sign_data(&body)?;

        let inner = CertReq {
            info,
            algorithm: key.signature_algorithm().into(),
            signature: BitString::from_bytes(&signature)
                .map_err(|e| CertGenError::encoding("certificate request", e))?,
        };
        let der = inner
            .to_der()
            .map_err(|e| CertGenError::encoding("certificate request", e))?;

        Ok(Self { inner, der })
    }

    /// Parses a DER-encoded request.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner =
            CertReq::from_der(der).map_err(|e| CertGenError::parse("certificate request", e))?;
        Ok(Self {
            inner,
            der: der.to_vec(),
        })
    }

    /// Parses the first PEM block of `input`, which must be labelled `CERTIFICATE REQUEST`.
    pub fn from_pem(input: impl AsRef<[u8]>) -> Result<Self> {
        let der = crate::encoding::pem_to_der_with_label(input, CSR_PEM_LABEL)?;
        Self::from_der(&der)
    }

    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    pub fn to_pem(&self) -> String {
        crate::encoding::der_to_pem(&self.der, CSR_PEM_LABEL)
    }

    pub fn subject(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(&self.inner.info.subject)
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.info.public_key)
    }

    /// DNS names requested through the extensionRequest attribute.
    pub fn dns_names(&self) -> Result<Vec<String>> {
        for attribute in self.inner.info.attributes.iter() {
            if attribute.oid != ExtensionReq::OID {
                continue;
            }
            for value in attribute.values.iter() {
                let request = value
                    .to_der()
                    .and_then(|der| ExtensionReq::from_der(&der))
                    .map_err(|e| CertGenError::parse("extension request", e))?;
                if let Some(ext) = request.0.iter().find(|ext| ext.extn_id == SubjectAltName::OID)
                {
                    let san = SubjectAltName::from_x509_extension_value(ext.extn_value.as_bytes())?;
                    return Ok(san.names);
                }
            }
        }
        Ok(Vec::new())
    }

    /// Verifies the request signature against the key it carries.
    pub fn check_signature(&self) -> Result<()> {
        let body = self
            .inner
            .info
            .to_der()
            .map_err(|e| CertGenError::encoding("certificate request", e))?;
        let signature = self.inner.signature.as_bytes().ok_or_else(|| {
            CertGenError::VerificationFailed("signature has unused bits".to_string())
        })?;
        self.public_key()?
            .verify(&self.inner.algorithm, &body, signature)
    }
}
