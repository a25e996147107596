//! Issuance parameters and the two option sets derived from them.

use time::{Duration, OffsetDateTime};

use crate::cert::extensions::{ExtendedKeyUsageOption, FlagSet, KeyUsages};
use crate::cert::params::{DistinguishedName, Validity};
use crate::error::{CertGenError, Result};
use crate::key::{DEFAULT_KEY_SIZE, MIN_KEY_SIZE};

/// Lifetime of the root CA, independent of the configured leaf lifetime.
pub const ROOT_CA_VALIDITY_DAYS: i64 = 1024;

/// Longest leaf lifetime the command surface accepts (100 years).
pub const MAX_VALIDITY_DAYS: u32 = 36500;

/// Placeholder archive password. Not a secret; override it.
pub const DEFAULT_PKCS12_PASSWORD: &str = "yourPKCS12Password";

/// Identity, validity and key parameters for one issuance run.
///
/// Built once through [`Default`] and then overridden field by field. Read-only
/// while certificates are generated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateConfig {
    pub domain: String,
    pub country: String,
    pub state: String,
    pub locality: String,
    pub organization: String,
    pub organizational_unit: String,
    /// Leaf lifetime in days.
    pub validity_days: u32,
    /// RSA modulus size in bits, used for both the CA and the leaf key.
    pub key_size: usize,
    pub pkcs12_password: String,
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            country: "SG".to_string(),
            state: "Singapore".to_string(),
            locality: "Singapore".to_string(),
            organization: "Erfi Corp".to_string(),
            organizational_unit: "Erfi Proxy".to_string(),
            validity_days: 3650,
            key_size: DEFAULT_KEY_SIZE,
            pkcs12_password: DEFAULT_PKCS12_PASSWORD.to_string(),
        }
    }
}

/// Parameters for one certificate, derived from a [`CertificateConfig`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateOptions {
    pub subject: DistinguishedName,
    pub dns_names: Vec<String>,
    /// Captured when the options are built, not when the process started.
    pub valid_from: OffsetDateTime,
    pub valid_for: Duration,
    pub is_ca: bool,
    pub key_usage: FlagSet<KeyUsages>,
    pub extended_key_usage: Vec<ExtendedKeyUsageOption>,
}

impl CertificateOptions {
    pub fn validity(&self) -> Validity {
        Validity::starting_at(self.valid_from, self.valid_for)
    }
}

impl CertificateConfig {
    /// Checks the rules the command surface enforces before any generation.
    pub fn validate(&self) -> Result<()> {
        if self.domain.is_empty() {
            return Err(CertGenError::InvalidConfig(
                "domain is required".to_string(),
            ));
        }
        if !(1..=MAX_VALIDITY_DAYS).contains(&self.validity_days) {
            return Err(CertGenError::InvalidConfig(format!(
                "validity days must be between 1 and {MAX_VALIDITY_DAYS}, got {}",
                self.validity_days
            )));
        }
        if self.key_size < MIN_KEY_SIZE {
            return Err(CertGenError::InvalidKeySize {
                requested: self.key_size,
                minimum: MIN_KEY_SIZE,
            });
        }
        Ok(())
    }

    /// Subject shared by the CA and the leaf: the configured identity with the
    /// domain as common name.
    pub fn subject(&self) -> DistinguishedName {
        DistinguishedName {
            country: self.country.clone(),
            state: self.state.clone(),
            locality: self.locality.clone(),
            organization: self.organization.clone(),
            organization_unit: self.organizational_unit.clone(),
            common_name: self.domain.clone(),
        }
    }

    /// Options for the self-signed root CA.
    pub fn root_ca_options(&self) -> CertificateOptions {
        CertificateOptions {
            subject: self.subject(),
            dns_names: vec![self.domain.clone()],
            valid_from: OffsetDateTime::now_utc(),
            valid_for: Duration::days(ROOT_CA_VALIDITY_DAYS),
            is_ca: true,
            key_usage: KeyUsages::KeyCertSign | KeyUsages::CRLSign,
            extended_key_usage: vec![ExtendedKeyUsageOption::ServerAuth],
        }
    }

    /// Options for the CA-signed leaf certificate.
    pub fn leaf_options(&self) -> CertificateOptions {
        CertificateOptions {
            subject: self.subject(),
            dns_names: vec![self.domain.clone()],
            valid_from: OffsetDateTime::now_utc(),
            valid_for: Duration::days(i64::from(self.validity_days)),
            is_ca: false,
            key_usage: KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment,
            extended_key_usage: vec![
                ExtendedKeyUsageOption::ServerAuth,
                ExtendedKeyUsageOption::ClientAuth,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = CertificateConfig::default();
        assert_eq!(cfg.domain, "");
        assert_eq!(cfg.country, "SG");
        assert_eq!(cfg.state, "Singapore");
        assert_eq!(cfg.locality, "Singapore");
        assert_eq!(cfg.organization, "Erfi Corp");
        assert_eq!(cfg.organizational_unit, "Erfi Proxy");
        assert_eq!(cfg.validity_days, 3650);
        assert_eq!(cfg.key_size, 4096);
        assert_eq!(cfg.pkcs12_password, "yourPKCS12Password");
    }

    #[test]
    fn test_root_ca_options_ignore_configured_validity() {
        let cfg = CertificateConfig {
            domain: "ca.example.com".to_string(),
            validity_days: 30,
            ..Default::default()
        };
        let opts = cfg.root_ca_options();
        assert!(opts.is_ca);
        assert_eq!(opts.valid_for, Duration::days(1024));
        assert_eq!(opts.key_usage, KeyUsages::KeyCertSign | KeyUsages::CRLSign);
        assert_eq!(opts.dns_names, vec!["ca.example.com".to_string()]);
        assert_eq!(opts.subject.common_name, "ca.example.com");
    }

    #[test]
    fn test_leaf_options() {
        let cfg = CertificateConfig {
            domain: "example.com".to_string(),
            organization: "Test Org".to_string(),
            validity_days: 90,
            ..Default::default()
        };
        let opts = cfg.leaf_options();
        assert!(!opts.is_ca);
        assert_eq!(opts.valid_for, Duration::days(90));
        assert_eq!(
            opts.key_usage,
            KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment
        );
        assert_eq!(
            opts.extended_key_usage,
            vec![
                ExtendedKeyUsageOption::ServerAuth,
                ExtendedKeyUsageOption::ClientAuth
            ]
        );
        assert_eq!(opts.subject.organization, "Test Org");
    }

    #[test]
    fn test_valid_from_is_captured_per_call() {
        let cfg = CertificateConfig::default();
        let first = cfg.leaf_options();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = cfg.leaf_options();
        assert!(second.valid_from > first.valid_from);
    }

    #[test]
    fn test_empty_domain_is_kept_as_dns_name() {
        let opts = CertificateConfig::default().leaf_options();
        assert_eq!(opts.dns_names, vec![String::new()]);
        assert_eq!(opts.subject.common_name, "");
    }

    #[test]
    fn test_validate() {
        let mut cfg = CertificateConfig::default();
        assert!(matches!(cfg.validate(), Err(CertGenError::InvalidConfig(_))));

        cfg.domain = "example.com".to_string();
        cfg.validate().unwrap();

        for days in [0, MAX_VALIDITY_DAYS + 1] {
            cfg.validity_days = days;
            assert!(matches!(cfg.validate(), Err(CertGenError::InvalidConfig(_))));
        }
        cfg.validity_days = MAX_VALIDITY_DAYS;
        cfg.validate().unwrap();

        cfg.key_size = 512;
        assert!(matches!(
            cfg.validate(),
            Err(CertGenError::InvalidKeySize { .. })
        ));
    }
}
