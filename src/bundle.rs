//! PKCS#12 archive creation.
//!
//! The generator only supplies PEM inputs and a password; producing the archive
//! is delegated to a [`BundleWriter`]. [`OpensslBundleWriter`] drives the
//! `openssl` command line tool.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::cert::Certificate;
use crate::encoding::encode_private_key_to_pem;
use crate::error::{CertGenError, Result};
use crate::key::KeyPair;

/// Environment variable that carries the archive password to the child process.
const PASSWORD_ENV: &str = "CERTGEN_P12_PASSWORD";

/// Friendly name stored alongside the leaf key in the archive.
const BUNDLE_NAME: &str = "certgen";

pub const DEFAULT_BUNDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Produces a password-protected archive holding a certificate, its key and
/// optionally the issuing certificate.
///
/// The returned bytes are opaque to the caller. Any failure of the underlying
/// mechanism is reported as [`CertGenError::BundleGenerationFailed`].
pub trait BundleWriter {
    fn write_bundle(
        &self,
        cert: &Certificate,
        key: &KeyPair,
        issuer: Option<&Certificate>,
        password: &str,
    ) -> Result<Vec<u8>>;
}

/// Runs `openssl pkcs12 -export` over files staged in a temporary directory.
#[derive(Clone, Debug)]
pub struct OpensslBundleWriter {
    program: PathBuf,
    timeout: Duration,
}

impl Default for OpensslBundleWriter {
    fn default() -> Self {
        Self {
            program: PathBuf::from("openssl"),
            timeout: DEFAULT_BUNDLE_TIMEOUT,
        }
    }
}

impl OpensslBundleWriter {
    /// Uses `program` instead of looking up `openssl` on `PATH`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolves the configured program to an executable path.
    pub fn locate(&self) -> Result<PathBuf> {
        which::which(&self.program).map_err(|e| {
            CertGenError::BundleGenerationFailed(format!(
                "{} not found: {e}",
                self.program.display()
            ))
        })
    }

    fn run(&self, program: &Path, args: &[&OsStr], password: &str) -> Result<Output> {
        let mut child = Command::new(program)
            .args(args)
            .env(PASSWORD_ENV, password)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                CertGenError::BundleGenerationFailed(format!(
                    "failed to start {}: {e}",
                    program.display()
                ))
            })?;

        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(_)) => {
                    return child.wait_with_output().map_err(|e| {
                        CertGenError::BundleGenerationFailed(format!(
                            "failed to collect output: {e}"
                        ))
                    });
                }
                Ok(None) => {
                    if start.elapsed() >= self.timeout {
                        // Reap the child so it does not linger as a zombie.
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(CertGenError::BundleGenerationFailed(format!(
                            "{} timed out after {:?}",
                            program.display(),
                            self.timeout
                        )));
                    }
                    thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(CertGenError::BundleGenerationFailed(format!(
                        "failed to wait for {}: {e}",
                        program.display()
                    )));
                }
            }
        }
    }
}

fn stage(path: &Path, contents: &[u8]) -> Result<()> {
    crate::fileio::write_private_file(path, contents).map_err(|e| {
        CertGenError::BundleGenerationFailed(format!("failed to stage {}: {e}", path.display()))
    })
}

impl BundleWriter for OpensslBundleWriter {
    fn write_bundle(
        &self,
        cert: &Certificate,
        key: &KeyPair,
        issuer: Option<&Certificate>,
        password: &str,
    ) -> Result<Vec<u8>> {
        let program = self.locate()?;

        // Removed on drop, whichever way this function returns.
        let dir = tempfile::Builder::new()
            .prefix("certgen-p12-")
            .tempdir()
            .map_err(|e| {
                CertGenError::BundleGenerationFailed(format!(
                    "failed to create temporary directory: {e}"
                ))
            })?;

        let cert_path = dir.path().join("leaf.pem");
        let key_path = dir.path().join("leaf.key");
        let out_path = dir.path().join("bundle.p12");
        stage(&cert_path, cert.to_pem().as_bytes())?;
        stage(&key_path, encode_private_key_to_pem(key)?.as_bytes())?;

        let passout = format!("env:{PASSWORD_ENV}");
        let mut args: Vec<&OsStr> = vec![
            OsStr::new("pkcs12"),
            OsStr::new("-export"),
            OsStr::new("-in"),
            cert_path.as_os_str(),
            OsStr::new("-inkey"),
            key_path.as_os_str(),
            OsStr::new("-name"),
            OsStr::new(BUNDLE_NAME),
            OsStr::new("-passout"),
            OsStr::new(&passout),
            OsStr::new("-out"),
            out_path.as_os_str(),
        ];

        let issuer_path = dir.path().join("issuer.pem");
        if let Some(issuer) = issuer {
            stage(&issuer_path, issuer.to_pem().as_bytes())?;
            args.push(OsStr::new("-certfile"));
            args.push(issuer_path.as_os_str());
        }

        debug!(program = %program.display(), dir = %dir.path().display(), "running pkcs12 export");
        let output = self.run(&program, &args, password)?;
        if !output.status.success() {
            return Err(CertGenError::BundleGenerationFailed(format!(
                "{} exited with {}: {}",
                program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let bundle = std::fs::read(&out_path).map_err(|e| {
            CertGenError::BundleGenerationFailed(format!("failed to read archive: {e}"))
        })?;
        debug!(bytes = bundle.len(), "pkcs12 archive created");
        Ok(bundle)
    }
}
