//! # CertGen - Root CA and Leaf Certificate Generator
//!
//! CertGen issues a self-signed RSA root CA and a leaf certificate signed by
//! that CA for a single domain, and exports both in the formats servers and
//! clients usually ask for. Certificates are built with rustcrypto libraries;
//! only the PKCS#12 bundle is produced by the external `openssl` tool.
//!
//! ## Outputs
//!
//! - **PEM**: `CERTIFICATE` and PKCS#8 `PRIVATE KEY` envelopes
//! - **DER / base64**: the raw signed certificate bytes as unwrapped standard base64
//! - **PKCS#12**: leaf certificate, leaf key and root CA in one password-protected archive
//! - **CSR**: an optional PKCS#10 request for the leaf key
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use certgen::{
//!     config::CertificateConfig,
//!     encoding::{convert_certificate_to_base64_der, encode_private_key_to_pem},
//!     generator::Generator,
//! };
//!
//! # fn main() -> Result<(), certgen::error::CertGenError> {
//! let generator = Generator::new(CertificateConfig {
//!     domain: "example.com".to_string(),
//!     validity_days: 90,
//!     ..Default::default()
//! });
//!
//! let (ca_cert, ca_key) = generator.generate_root_ca()?;
//! let (leaf_cert, leaf_key) = generator.generate_leaf_certificate(&ca_cert, &ca_key)?;
//! leaf_cert.check_signature_from(&ca_cert)?;
//!
//! println!("{}", leaf_cert.to_pem());
//! println!("{}", encode_private_key_to_pem(&leaf_key)?);
//! println!("{}", convert_certificate_to_base64_der(&leaf_cert));
//! # Ok(())
//! # }
//! ```
//!
//! ### Bundling
//!
//! ```rust,no_run
//! use certgen::{
//!     bundle::{BundleWriter, OpensslBundleWriter},
//!     config::CertificateConfig,
//!     generator::Generator,
//! };
//!
//! # fn main() -> Result<(), certgen::error::CertGenError> {
//! let generator = Generator::new(CertificateConfig {
//!     domain: "example.com".to_string(),
//!     ..Default::default()
//! });
//! let issued = generator.issue_all(false)?;
//!
//! let p12 = OpensslBundleWriter::default().write_bundle(
//!     &issued.leaf_cert,
//!     &issued.leaf_key,
//!     Some(&issued.ca_cert),
//!     "changeit",
//! )?;
//! std::fs::write("example_certs.p12", p12).unwrap();
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`config`]: Issuance parameters and the CA/leaf option sets
//! - [`generator`]: Key, root CA, leaf and CSR generation
//! - [`key`]: RSA key generation, PKCS#8 import/export and signatures
//! - [`cert`]: Certificates, requests, names and extensions
//! - [`issuer`]: Certificate signing
//! - [`tbs_certificate`]: Low-level certificate structure and serial numbers
//! - [`encoding`]: PEM, DER and base64 conversions
//! - [`bundle`]: PKCS#12 archive creation
//! - [`fileio`]: Artifact naming and file permissions
//! - [`error`]: Error types

pub mod bundle;
pub mod cert;
pub mod config;
pub mod encoding;
pub mod error;
pub mod fileio;
pub mod generator;
pub mod issuer;
pub mod key;
pub mod tbs_certificate;
