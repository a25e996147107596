use bon::Builder;
use const_oid::ObjectIdentifier;
use der::{Tag, Tagged};
use der::asn1::{Any, Ia5StringRef, PrintableStringRef, SetOfVec, Utf8StringRef};
use time::Duration;
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};

use super::extensions::ToAndFromX509Extension;
pub use crate::cert::extensions::ExtendedKeyUsageOption;
pub use crate::cert::extensions::{FlagSet, KeyUsages};
use crate::error::{CertGenError, Result};
use crate::key::PublicKey;

/// Everything needed to sign one certificate.
///
/// # Fields
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The public key bound into the certificate.
/// * `dns_names` - DNS names written to the subject alternative name extension.
/// * `is_ca` - Indicates if the certificate is a CA.
/// * `key_usage` - Key usage bits; the extension is omitted when empty.
/// * `extended_key_usage` - Purposes; the extension is omitted when empty.
/// * `validity` - The `notBefore`/`notAfter` window.
/// * `serial_number` - Uniformly random in `[0, 2^128)`, drawn when the template is built.
#[derive(Clone, Debug, Builder)]
pub struct CertificateTemplate {
    pub subject: DistinguishedName,
    pub subject_public_key: PublicKey,
    #[builder(default)]
    pub dns_names: Vec<String>,
    #[builder(default)]
    pub is_ca: bool,
    #[builder(default)]
    pub key_usage: FlagSet<KeyUsages>,
    #[builder(default)]
    pub extended_key_usage: Vec<ExtendedKeyUsageOption>,
    pub validity: Validity,
    #[builder(default = crate::tbs_certificate::random_serial_number())]
    pub serial_number: u128,
}

/// Distinguished name of a certificate subject or issuer.
///
/// All attributes are plain strings and may be empty. Empty attributes are
/// left out of the encoded name.
///
/// # Fields
/// * `country` - The country (C).
/// * `state` - The state or province (ST).
/// * `locality` - The locality or city (L).
/// * `organization` - The organization (O).
/// * `organization_unit` - The organizational unit (OU).
/// * `common_name` - The common name (CN), usually the certified domain.
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
#[builder(on(String, into))]
pub struct DistinguishedName {
    #[builder(default)]
    pub country: String,
    #[builder(default)]
    pub state: String,
    #[builder(default)]
    pub locality: String,
    #[builder(default)]
    pub organization: String,
    #[builder(default)]
    pub organization_unit: String,
    #[builder(default)]
    pub common_name: String,
}

impl DistinguishedName {
    /// Converts the distinguished name to an X.509 name.
    ///
    /// Attributes are written in the order C, ST, L, O, OU, CN. The country is
    /// a PrintableString when its characters allow it, every other attribute is
    /// a UTF8String. Empty attributes are left out.
    pub fn as_x509_name(&self) -> Result<Name> {
        let attributes = [
            (const_oid::db::rfc4519::C, self.country.as_str()),
            (const_oid::db::rfc4519::ST, self.state.as_str()),
            (const_oid::db::rfc4519::L, self.locality.as_str()),
            (const_oid::db::rfc4519::O, self.organization.as_str()),
            (const_oid::db::rfc4519::OU, self.organization_unit.as_str()),
            (const_oid::db::rfc4519::CN, self.common_name.as_str()),
        ];

        let mut rdns = Vec::new();
        for (oid, value) in attributes {
            if value.is_empty() {
                continue;
            }
            let tag = if oid == const_oid::db::rfc4519::C && PrintableStringRef::new(value).is_ok()
            {
                Tag::PrintableString
            } else {
                Tag::Utf8String
            };
            let value = Any::new(tag, value.as_bytes())
                .map_err(|e| CertGenError::encoding("distinguished name", e))?;
            let set = SetOfVec::try_from(vec![AttributeTypeAndValue { oid, value }])
                .map_err(|e| CertGenError::encoding("distinguished name", e))?;
            rdns.push(RelativeDistinguishedName(set));
        }

        Ok(RdnSequence(rdns))
    }

    /// Creates a `DistinguishedName` from an X.509 name.
    ///
    /// Attributes this type does not model are skipped. When an attribute
    /// repeats, the last value wins.
    pub fn from_x509_name(x509dn: &Name) -> Self {
        let mut dn = DistinguishedName::default();

        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                let Some(value) = attribute_string(&attr.value) else {
                    continue;
                };
                match attr.oid {
                    const_oid::db::rfc4519::C => dn.country = value,
                    const_oid::db::rfc4519::ST => dn.state = value,
                    const_oid::db::rfc4519::L => dn.locality = value,
                    const_oid::db::rfc4519::O => dn.organization = value,
                    const_oid::db::rfc4519::OU => dn.organization_unit = value,
                    const_oid::db::rfc4519::CN => dn.common_name = value,
                    _ => {}
                }
            }
        }

        dn
    }
}

fn attribute_string(value: &Any) -> Option<String> {
    match value.tag() {
        Tag::Utf8String => value
            .decode_as::<Utf8StringRef<'_>>()
            .ok()
            .map(|s| s.to_string()),
        Tag::PrintableString => value
            .decode_as::<PrintableStringRef<'_>>()
            .ok()
            .map(|s| s.to_string()),
        Tag::Ia5String => value
            .decode_as::<Ia5StringRef<'_>>()
            .ok()
            .map(|s| s.to_string()),
        _ => None,
    }
}

/// Certificate validity period.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period starting now for the given number of days.
    pub fn for_days(days: i64) -> Self {
        Self::starting_at(OffsetDateTime::now_utc(), Duration::days(days))
    }

    /// Creates a validity period of `length` starting at `not_before`.
    ///
    /// X.509 times carry whole seconds, so `not_before` is truncated first and
    /// `not_after - not_before == length` holds exactly after encoding.
    pub fn starting_at(not_before: OffsetDateTime, length: Duration) -> Self {
        let not_before = not_before
            .replace_nanosecond(0)
            .unwrap_or(not_before);
        Self {
            not_before,
            not_after: not_before + length,
        }
    }

    pub fn length(&self) -> Duration {
        self.not_after - self.not_before
    }
}

/// Represents an X.509 extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: E, critical: bool) -> Result<Self> {
        let value = extension.to_x509_extension_value()?;
        Ok(Self {
            oid: E::OID,
            critical,
            value,
        })
    }

    pub fn to_x509_extension(&self) -> Result<x509_cert::ext::Extension> {
        Ok(x509_cert::ext::Extension {
            extn_id: self.oid,
            critical: self.critical,
            extn_value: der::asn1::OctetString::new(self.value.clone())
                .map_err(|e| CertGenError::encoding("extension", e))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinguished_name_round_trip() {
        let dn = DistinguishedName::builder()
            .country("SG")
            .state("Singapore")
            .locality("Singapore")
            .organization("Erfi Corp, Ltd.")
            .organization_unit("Erfi Proxy")
            .common_name("example.com")
            .build();

        let name = dn.as_x509_name().unwrap();
        assert_eq!(name.0.len(), 6);
        assert_eq!(DistinguishedName::from_x509_name(&name), dn);
    }

    #[test]
    fn test_empty_attributes_are_omitted() {
        let dn = DistinguishedName::builder().organization("Crab widgits SE").build();
        let name = dn.as_x509_name().unwrap();
        assert_eq!(name.0.len(), 1);

        let decoded = DistinguishedName::from_x509_name(&name);
        assert_eq!(decoded.common_name, "");
        assert_eq!(decoded.organization, "Crab widgits SE");
    }

    #[test]
    fn test_country_uses_printable_string() {
        let dn = DistinguishedName::builder().country("US").build();
        let name = dn.as_x509_name().unwrap();
        let attr = name.0[0].0.iter().next().unwrap();
        assert_eq!(attr.value.tag(), Tag::PrintableString);
    }

    #[test]
    fn test_validity_length_is_exact() {
        let validity = Validity::for_days(90);
        assert_eq!(validity.length(), Duration::days(90));
        assert_eq!(validity.not_before.nanosecond(), 0);
    }
}
