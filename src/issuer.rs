use der::Encode;
use sha1::Sha1;
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::cert::Certificate;
use crate::cert::extensions::AuthorityKeyIdentifier;
use crate::cert::extensions::BasicConstraints;
use crate::cert::extensions::ExtendedKeyUsage;
use crate::cert::extensions::KeyUsage;
use crate::cert::extensions::SubjectAltName;
use crate::cert::extensions::SubjectKeyIdentifier;
use crate::cert::params::{CertificateTemplate, ExtensionParam};
use crate::error::{CertGenError, Result};
use crate::key::KeyPair;
use crate::tbs_certificate::TbsCertificate;

/// SHA-1 over the subject public key bits (RFC 5280 4.2.1.2, method 1).
pub fn key_identifier(spki: &SubjectPublicKeyInfoOwned) -> Vec<u8> {
    <Sha1 as sha1::Digest>::digest(spki.subject_public_key.raw_bytes()).to_vec()
}

/// Represents an entity capable of issuing certificates.
///
/// This trait provides methods to retrieve issuer details and issue certificates.
pub trait Issuer {
    /// Returns the encoded name of the issuer, copied into issued certificates.
    fn issuer_name(&self) -> Result<Name>;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// Key identifier written to the authority key identifier extension, or
    /// `None` for self-issued certificates.
    fn authority_key_id(&self) -> Result<Option<Vec<u8>>>;

    /// Signs `template` and returns the resulting certificate.
    ///
    /// Extensions are written in this order: key usage (critical), extended
    /// key usage, basic constraints (critical, CAs only), subject key
    /// identifier, authority key identifier, subject alternative name. The SAN
    /// is marked critical when the subject name is empty.
    fn issue(&self, template: &CertificateTemplate) -> Result<Certificate> {
        let signature_algo = self.signing_key().signature_algorithm();
        let subject = template.subject.as_x509_name()?;
        let subject_public_key_info = template.subject_public_key.to_spki()?;

        let mut extensions: Vec<ExtensionParam> = Vec::new();

        if !template.key_usage.is_empty() {
            extensions.push(ExtensionParam::from_extension(
                KeyUsage(template.key_usage),
                true,
            )?);
        }

        if !template.extended_key_usage.is_empty() {
            let extended_key_usage = ExtendedKeyUsage {
                usage: template.extended_key_usage.clone(),
            };
            extensions.push(ExtensionParam::from_extension(extended_key_usage, false)?);
        }

        if template.is_ca {
            let basic_constraints = BasicConstraints {
                is_ca: true,
                max_path_length: None,
            };
            extensions.push(ExtensionParam::from_extension(basic_constraints, true)?);
        }

        // Without a distinct key id, a leaf sharing its issuer's name looks
        // self-signed.
        let subject_key_id = SubjectKeyIdentifier(key_identifier(&subject_public_key_info));
        extensions.push(ExtensionParam::from_extension(subject_key_id, false)?);

        if let Some(key_identifier) = self.authority_key_id()? {
            let authority_key_id = AuthorityKeyIdentifier { key_identifier };
            extensions.push(ExtensionParam::from_extension(authority_key_id, false)?);
        }

        if !template.dns_names.is_empty() {
            let san = SubjectAltName {
                names: template.dns_names.clone(),
            };
            extensions.push(ExtensionParam::from_extension(san, subject.0.is_empty())?);
        }

        let tbs_cert = TbsCertificate {
            serial_number: template.serial_number,
            signature_algorithm: signature_algo.clone(),
            issuer: self.issuer_name()?,
            not_before: template.validity.not_before,
            not_after: template.validity.not_after,
            subject,
            subject_public_key: template.subject_public_key.clone(),
            extensions,
        };

        let tbs_cert_inner = tbs_cert.to_tbs_certificate_inner()?;
        let tbs_der = tbs_cert_inner
            .to_der()
            .map_err(|e| CertGenError::encoding("certificate body", e))?;

        let signature = self.signing_key().sign_data(&tbs_der)?;

        let cert_inner = CertificateInner {
            tbs_certificate: tbs_cert_inner,
            signature_algorithm: signature_algo.into(),
            signature: der::asn1::BitString::from_bytes(&signature)
                .map_err(|e| CertGenError::signing("certificate", e))?,
        };

        Certificate::from_inner(cert_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::CertificateWithPrivateKey;
    use crate::cert::extensions::{ExtendedKeyUsageOption, KeyUsages, ToAndFromX509Extension};
    use crate::cert::params::{DistinguishedName, Validity};
    use crate::key::PublicKey;

    fn generate_ca() -> CertificateWithPrivateKey {
        let key = KeyPair::generate_rsa(1024).unwrap();
        let template = CertificateTemplate::builder()
            .subject(DistinguishedName::builder().common_name("myca.local").build())
            .subject_public_key(PublicKey::from_key_pair(&key))
            .is_ca(true)
            .key_usage(KeyUsages::KeyCertSign | KeyUsages::CRLSign)
            .validity(Validity::for_days(10))
            .build();
        CertificateWithPrivateKey {
            cert: Certificate::new_self_signed(&template, &key).unwrap(),
            key,
        }
    }

    #[test]
    fn test_issued_certificate_chains_to_issuer() {
        let ca = generate_ca();
        let server_key = KeyPair::generate_rsa(1024).unwrap();
        let template = CertificateTemplate::builder()
            .subject(
                DistinguishedName::builder()
                    .common_name("server.myca.local")
                    .build(),
            )
            .subject_public_key(PublicKey::from_key_pair(&server_key))
            .dns_names(vec!["server.myca.local".to_string()])
            .key_usage(KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment)
            .extended_key_usage(vec![ExtendedKeyUsageOption::ServerAuth])
            .validity(Validity::for_days(5))
            .build();

        let cert = ca.issue(&template).unwrap();

        assert!(!cert.is_ca());
        assert_eq!(cert.issuer_name(), ca.cert.subject_name());
        assert_eq!(
            cert.extended_key_usage(),
            vec![ExtendedKeyUsageOption::ServerAuth]
        );
        let aki = cert.extension::<AuthorityKeyIdentifier>().unwrap().unwrap();
        assert_eq!(Some(aki.key_identifier), ca.cert.subject_key_id());
        assert_ne!(cert.subject_key_id(), ca.cert.subject_key_id());
        cert.check_signature_from(&ca.cert).unwrap();
    }

    #[test]
    fn test_self_signed_certificate_has_no_authority_key_id() {
        let ca = generate_ca();
        assert!(
            ca.cert
                .extension::<AuthorityKeyIdentifier>()
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_san_is_critical_for_empty_subject() {
        let ca = generate_ca();
        let key = KeyPair::generate_rsa(1024).unwrap();
        let template = CertificateTemplate::builder()
            .subject(DistinguishedName::default())
            .subject_public_key(PublicKey::from_key_pair(&key))
            .dns_names(vec!["anonymous.myca.local".to_string()])
            .validity(Validity::for_days(1))
            .build();

        let cert = ca.issue(&template).unwrap();
        let san = cert
            .inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .find(|ext| ext.extn_id == SubjectAltName::OID)
            .unwrap();
        assert!(san.critical);
    }
}
