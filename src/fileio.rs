//! Artifact paths and permission-aware file writes.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CertGenError, Result};

/// Mode for private keys and staged secrets.
const SECRET_MODE: u32 = 0o600;

/// Mode for certificates, archives and text outputs.
const PUBLIC_MODE: u32 = 0o644;

/// Names the artifacts of one run after the first label of the domain.
///
/// `www.example.com` yields `www_rootCA.key`, `www_leaf.pem` and so on,
/// inside `output_dir`.
#[derive(Clone, Debug)]
pub struct FileWriter {
    output_dir: PathBuf,
    label: String,
}

impl FileWriter {
    pub fn new(output_dir: impl Into<PathBuf>, domain: &str) -> Self {
        let label = domain.split('.').next().unwrap_or_default().to_string();
        Self {
            output_dir: output_dir.into(),
            label,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn path(&self, suffix: &str) -> PathBuf {
        self.output_dir.join(format!("{}_{suffix}", self.label))
    }

    pub fn root_key_path(&self) -> PathBuf {
        self.path("rootCA.key")
    }

    pub fn root_cert_path(&self) -> PathBuf {
        self.path("rootCA.pem")
    }

    pub fn leaf_key_path(&self) -> PathBuf {
        self.path("leaf.key")
    }

    pub fn leaf_cert_path(&self) -> PathBuf {
        self.path("leaf.pem")
    }

    pub fn leaf_csr_path(&self) -> PathBuf {
        self.path("leaf.csr")
    }

    pub fn pkcs12_path(&self) -> PathBuf {
        self.path("certs.p12")
    }

    pub fn root_base64_path(&self) -> PathBuf {
        self.path("rootCA_base64.txt")
    }

    pub fn leaf_base64_path(&self) -> PathBuf {
        self.path("leaf_base64.txt")
    }

    /// Writes `contents` to `path`, creating parent directories.
    ///
    /// Files with a `.key` extension are owner read/write only; everything
    /// else is world readable. Permissions are reset on existing files too.
    pub fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| CertGenError::FileIo {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mode = if is_key_file(path) {
            SECRET_MODE
        } else {
            PUBLIC_MODE
        };
        write_with_mode(path, contents, mode).map_err(|source| CertGenError::FileIo {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), mode = %format!("{mode:o}"), "wrote file");
        Ok(())
    }

    pub fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|source| CertGenError::FileIo {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn file_exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

fn is_key_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "key")
}

/// Writes a file readable only by its owner.
pub(crate) fn write_private_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    write_with_mode(path, contents, SECRET_MODE)
}

#[cfg(unix)]
fn write_with_mode(path: &Path, contents: &[u8], mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)?;
    // `mode` only applies when the file is created.
    file.set_permissions(fs::Permissions::from_mode(mode))?;
    file.write_all(contents)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_with_mode(path: &Path, contents: &[u8], _mode: u32) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_use_first_domain_label() {
        let writer = FileWriter::new("out", "www.example.com");
        assert_eq!(writer.label(), "www");
        assert_eq!(writer.root_key_path(), Path::new("out/www_rootCA.key"));
        assert_eq!(writer.root_cert_path(), Path::new("out/www_rootCA.pem"));
        assert_eq!(writer.leaf_key_path(), Path::new("out/www_leaf.key"));
        assert_eq!(writer.leaf_cert_path(), Path::new("out/www_leaf.pem"));
        assert_eq!(writer.leaf_csr_path(), Path::new("out/www_leaf.csr"));
        assert_eq!(writer.pkcs12_path(), Path::new("out/www_certs.p12"));
        assert_eq!(
            writer.root_base64_path(),
            Path::new("out/www_rootCA_base64.txt")
        );
        assert_eq!(
            writer.leaf_base64_path(),
            Path::new("out/www_leaf_base64.txt")
        );
    }

    #[test]
    fn test_single_label_and_empty_domain() {
        assert_eq!(FileWriter::new(".", "localhost").label(), "localhost");
        let writer = FileWriter::new("", "");
        assert_eq!(writer.leaf_cert_path(), Path::new("_leaf.pem"));
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FileWriter::new(dir.path().join("nested/deeper"), "example.com");
        let path = writer.leaf_cert_path();

        assert!(!writer.file_exists(&path));
        writer.write_file(&path, b"hello").unwrap();
        assert!(writer.file_exists(&path));
        assert_eq!(writer.read_file(&path).unwrap(), b"hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_file_modes() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let writer = FileWriter::new(dir.path(), "example.com");

        let key = writer.leaf_key_path();
        let cert = writer.leaf_cert_path();
        writer.write_file(&key, b"key").unwrap();
        writer.write_file(&cert, b"cert").unwrap();

        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&key), 0o600);
        assert_eq!(mode(&cert), 0o644);

        // Rewriting an existing file resets its mode.
        fs::set_permissions(&key, fs::Permissions::from_mode(0o666)).unwrap();
        writer.write_file(&key, b"key").unwrap();
        assert_eq!(mode(&key), 0o600);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FileWriter::new(dir.path(), "example.com");
        let err = writer.read_file(&writer.root_key_path()).unwrap_err();
        assert!(matches!(err, CertGenError::FileIo { .. }));
    }
}
