//! CertGen - command line entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use certgen::bundle::{BundleWriter, OpensslBundleWriter};
use certgen::config::{CertificateConfig, MAX_VALIDITY_DAYS};
use certgen::encoding::{
    convert_certificate_to_base64_der, encode_certificate_to_pem, encode_private_key_to_pem,
};
use certgen::fileio::FileWriter;
use certgen::generator::Generator;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "certgen")]
#[command(about = "Generate a root CA, a CA-signed leaf certificate and a PKCS#12 bundle")]
#[command(version)]
#[command(after_help = "Example:\n  certgen --domain example.com --organization \"My Company\" --days 365")]
struct Cli {
    /// The domain name for the leaf certificate
    #[arg(long)]
    domain: String,

    /// Country Name
    #[arg(long)]
    country: Option<String>,

    /// State or Province Name
    #[arg(long)]
    state: Option<String>,

    /// Locality Name
    #[arg(long)]
    locality: Option<String>,

    /// Organization Name
    #[arg(long)]
    organization: Option<String>,

    /// Organizational Unit Name
    #[arg(long, alias = "organizational_unit")]
    organizational_unit: Option<String>,

    /// Validity period for the leaf certificate, in days
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_VALIDITY_DAYS as i64))]
    days: Option<u32>,

    /// RSA key size in bits, for both the root CA and the leaf
    #[arg(long)]
    key_size: Option<usize>,

    /// Password for the PKCS#12 file
    #[arg(long, env = "CERTGEN_P12_PASSWORD", hide_env_values = true)]
    p12_password: Option<String>,

    /// Directory the artifacts are written to
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Also write a certificate signing request for the leaf key
    #[arg(long)]
    csr: bool,

    /// Path of the openssl executable used for the PKCS#12 bundle
    #[arg(long, default_value = "openssl")]
    openssl: PathBuf,
}

impl Cli {
    fn config(&self) -> CertificateConfig {
        let defaults = CertificateConfig::default();
        CertificateConfig {
            domain: self.domain.clone(),
            country: self.country.clone().unwrap_or(defaults.country),
            state: self.state.clone().unwrap_or(defaults.state),
            locality: self.locality.clone().unwrap_or(defaults.locality),
            organization: self.organization.clone().unwrap_or(defaults.organization),
            organizational_unit: self
                .organizational_unit
                .clone()
                .unwrap_or(defaults.organizational_unit),
            validity_days: self.days.unwrap_or(defaults.validity_days),
            key_size: self.key_size.unwrap_or(defaults.key_size),
            pkcs12_password: self.p12_password.clone().unwrap_or(defaults.pkcs12_password),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let cfg = cli.config();
    cfg.validate().context("invalid arguments")?;

    let generator = Generator::new(cfg.clone());
    let files = FileWriter::new(&cli.output_dir, &cfg.domain);
    let bundler = OpensslBundleWriter::default().with_program(&cli.openssl);

    println!("Generating certificates for domain: {}", cfg.domain);
    println!("Organization: {}", cfg.organization);
    println!("Validity: {} days\n", cfg.validity_days);

    let (root_cert, root_key) = generator
        .generate_root_ca()
        .context("failed to generate root CA")?;
    println!("✓ Generated Root CA certificate");

    let root_key_pem = encode_private_key_to_pem(&root_key).context("failed to encode root key")?;
    files.write_file(&files.root_key_path(), root_key_pem.as_bytes())?;
    println!("✓ Saved Root CA key: {}", files.root_key_path().display());

    let root_cert_pem = encode_certificate_to_pem(&root_cert);
    files.write_file(&files.root_cert_path(), root_cert_pem.as_bytes())?;
    println!(
        "✓ Saved Root CA certificate: {}",
        files.root_cert_path().display()
    );

    let (leaf_cert, leaf_key) = generator
        .generate_leaf_certificate(&root_cert, &root_key)
        .context("failed to generate leaf certificate")?;
    println!("✓ Generated leaf certificate");

    let leaf_key_pem = encode_private_key_to_pem(&leaf_key).context("failed to encode leaf key")?;
    files.write_file(&files.leaf_key_path(), leaf_key_pem.as_bytes())?;
    println!("✓ Saved leaf key: {}", files.leaf_key_path().display());

    let leaf_cert_pem = encode_certificate_to_pem(&leaf_cert);
    files.write_file(&files.leaf_cert_path(), leaf_cert_pem.as_bytes())?;
    println!(
        "✓ Saved leaf certificate: {}",
        files.leaf_cert_path().display()
    );

    if cli.csr {
        let csr = generator
            .generate_certificate_request(&leaf_key)
            .context("failed to generate certificate request")?;
        files.write_file(&files.leaf_csr_path(), csr.to_pem().as_bytes())?;
        println!(
            "✓ Saved leaf certificate request: {}",
            files.leaf_csr_path().display()
        );
    }

    let pfx = bundler
        .write_bundle(&leaf_cert, &leaf_key, Some(&root_cert), &cfg.pkcs12_password)
        .context("failed to generate PKCS#12")?;
    files.write_file(&files.pkcs12_path(), &pfx)?;
    println!("✓ Generated PKCS#12 file: {}", files.pkcs12_path().display());

    for (path, cert) in [
        (files.leaf_base64_path(), &leaf_cert),
        (files.root_base64_path(), &root_cert),
    ] {
        let encoded = convert_certificate_to_base64_der(cert);
        files.write_file(&path, encoded.as_bytes())?;
        println!(
            "Base64-encoded DER content written to {}:\n{encoded}\n",
            path.display()
        );
    }

    println!("\n✓ Certificate generation completed successfully!");
    println!("\nGenerated files:");
    println!("  - Root CA key:        {}", files.root_key_path().display());
    println!("  - Root CA cert:       {}", files.root_cert_path().display());
    println!("  - Leaf key:           {}", files.leaf_key_path().display());
    println!("  - Leaf cert:          {}", files.leaf_cert_path().display());
    if cli.csr {
        println!("  - Leaf CSR:           {}", files.leaf_csr_path().display());
    }
    println!("  - PKCS#12 bundle:     {}", files.pkcs12_path().display());
    println!("  - Root CA (base64):   {}", files.root_base64_path().display());
    println!("  - Leaf cert (base64): {}", files.leaf_base64_path().display());

    tracing::debug!(domain = %cfg.domain, "done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_domain_is_required() {
        assert!(Cli::try_parse_from(["certgen"]).is_err());
    }

    #[test]
    fn test_days_range() {
        for days in ["0", "36501", "-5"] {
            assert!(Cli::try_parse_from(["certgen", "--domain", "a.com", "--days", days]).is_err());
        }
        let cli = Cli::try_parse_from(["certgen", "--domain", "a.com", "--days", "36500"]).unwrap();
        assert_eq!(cli.config().validity_days, 36500);
    }

    #[test]
    fn test_defaults_fill_unset_flags() {
        let cli = Cli::try_parse_from([
            "certgen",
            "--domain",
            "example.com",
            "--organizational_unit",
            "Ops",
        ])
        .unwrap();
        let cfg = cli.config();
        assert_eq!(cfg.organizational_unit, "Ops");
        assert_eq!(cfg.country, "SG");
        assert_eq!(cfg.validity_days, 3650);
        assert_eq!(cfg.key_size, 4096);
    }
}
