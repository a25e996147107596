#![allow(dead_code)]

use certgen::cert::Certificate;
use certgen::config::CertificateConfig;
use certgen::generator::Generator;
use certgen::key::KeyPair;

/// Small keys keep the suite fast; the floor is still exercised.
pub const TEST_KEY_SIZE: usize = 1024;

pub fn test_config(domain: &str) -> CertificateConfig {
    CertificateConfig {
        domain: domain.to_string(),
        organization: "Test Org".to_string(),
        validity_days: 90,
        key_size: TEST_KEY_SIZE,
        ..Default::default()
    }
}

pub fn generate_ca_cert(generator: &Generator) -> (Certificate, KeyPair) {
    generator.generate_root_ca().unwrap()
}

/// Path of the openssl executable, or `None` when the test should be skipped.
pub fn openssl_cli() -> Option<std::path::PathBuf> {
    match which::which("openssl") {
        Ok(path) => Some(path),
        Err(_) => {
            eprintln!("openssl not found on PATH, skipping");
            None
        }
    }
}
