//! TLS configuration and certificate loading.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;

#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("{kind} file not found: {path}")]
    Missing { kind: &'static str, path: PathBuf },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no certificates in {0}")]
    NoCertificates(PathBuf),
    #[error("no private key in {0}")]
    NoPrivateKey(PathBuf),
}

/// Load a rustls config after checking both PEM files hold usable material.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, TlsError> {
    check_pem(cert_path, key_path)?;
    RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(|source| TlsError::Io {
            path: cert_path.to_path_buf(),
            source,
        })
}

/// Fails fast on missing files or PEM without the expected sections.
pub fn check_pem(cert_path: &Path, key_path: &Path) -> Result<(), TlsError> {
    let mut certs = open(cert_path, "certificate")?;
    let found = rustls_pemfile::certs(&mut certs)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Io {
            path: cert_path.to_path_buf(),
            source,
        })?;
    if found.is_empty() {
        return Err(TlsError::NoCertificates(cert_path.to_path_buf()));
    }

    let mut key = open(key_path, "private key")?;
    match rustls_pemfile::private_key(&mut key) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(TlsError::NoPrivateKey(key_path.to_path_buf())),
        Err(source) => Err(TlsError::Io {
            path: key_path.to_path_buf(),
            source,
        }),
    }
}

fn open(path: &Path, kind: &'static str) -> Result<BufReader<File>, TlsError> {
    if !path.exists() {
        return Err(TlsError::Missing {
            kind,
            path: path.to_path_buf(),
        });
    }
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TlsError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_files_are_reported() {
        let err = check_pem(Path::new("/nonexistent/cert.pem"), Path::new("/nonexistent/key.pem"))
            .unwrap_err();
        assert!(matches!(err, TlsError::Missing { kind: "certificate", .. }));
    }

    #[test]
    fn pem_without_certificates_is_rejected() {
        let mut cert = tempfile::NamedTempFile::new().unwrap();
        writeln!(cert, "not a pem file").unwrap();
        let key = tempfile::NamedTempFile::new().unwrap();

        let err = check_pem(cert.path(), key.path()).unwrap_err();
        assert!(matches!(err, TlsError::NoCertificates(_)));
    }
}
