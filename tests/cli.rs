mod util;

use std::process::Command;

use certgen::encoding::{decode_pem_certificate, decode_pem_private_key};
use certgen::fileio::FileWriter;

fn certgen() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_certgen"));
    command.env_remove("CERTGEN_P12_PASSWORD");
    command
}

#[test]
fn test_missing_domain_fails_before_generation() {
    let dir = tempfile::tempdir().unwrap();
    let output = certgen()
        .arg("--output-dir")
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_out_of_range_days() {
    let dir = tempfile::tempdir().unwrap();
    let output = certgen()
        .args(["--domain", "example.com", "--days", "36501", "--output-dir"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_version() {
    let output = certgen().arg("--version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_writes_all_artifacts() {
    let Some(openssl) = util::openssl_cli() else {
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let output = certgen()
        .args([
            "--domain",
            "www.example.com",
            "--organization",
            "My Company",
            "--days",
            "365",
            "--key-size",
            "1024",
            "--csr",
        ])
        .arg("--openssl")
        .arg(&openssl)
        .arg("--output-dir")
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "certgen failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let files = FileWriter::new(dir.path(), "www.example.com");
    for path in [
        files.root_key_path(),
        files.root_cert_path(),
        files.leaf_key_path(),
        files.leaf_cert_path(),
        files.leaf_csr_path(),
        files.pkcs12_path(),
        files.root_base64_path(),
        files.leaf_base64_path(),
    ] {
        assert!(files.file_exists(&path), "missing {}", path.display());
    }

    let root = decode_pem_certificate(files.read_file(&files.root_cert_path()).unwrap()).unwrap();
    let leaf = decode_pem_certificate(files.read_file(&files.leaf_cert_path()).unwrap()).unwrap();
    leaf.check_signature_from(&root).unwrap();
    assert_eq!(leaf.subject().organization, "My Company");
    assert_eq!(leaf.validity_span(), time::Duration::days(365));

    let key = decode_pem_private_key(files.read_file(&files.leaf_key_path()).unwrap()).unwrap();
    assert_eq!(key.bits(), 1024);

    let leaf_base64 = String::from_utf8(files.read_file(&files.leaf_base64_path()).unwrap()).unwrap();
    assert_eq!(leaf_base64, certgen::encoding::convert_certificate_to_base64_der(&leaf));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = |p: &std::path::Path| {
            std::fs::metadata(p).unwrap().permissions().mode() & 0o777
        };
        assert_eq!(mode(&files.root_key_path()), 0o600);
        assert_eq!(mode(&files.leaf_key_path()), 0o600);
        assert_eq!(mode(&files.root_cert_path()), 0o644);
        assert_eq!(mode(&files.pkcs12_path()), 0o644);
    }
}
