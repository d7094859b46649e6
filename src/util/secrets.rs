use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("failed to read secret from {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported secret location {0}; only local paths and file:// URIs are supported")]
    UnsupportedScheme(String),
    #[error("secret in {0} is empty")]
    Empty(String),
}

/// Reads the raw bytes behind a local path or `file://` URI.
pub fn read_location(location: &str) -> Result<Vec<u8>, SecretError> {
    let path = resolve(location)?;
    std::fs::read(&path).map_err(|source| SecretError::Read {
        path: location.to_string(),
        source,
    })
}

/// Reads a secret and trims surrounding whitespace. A secret that is empty after
/// trimming is an error.
pub fn read_secret(location: &str) -> Result<String, SecretError> {
    let bytes = read_location(location)?;
    let secret = String::from_utf8_lossy(&bytes).trim().to_string();
    if secret.is_empty() {
        return Err(SecretError::Empty(location.to_string()));
    }
    debug!("Read secret from {}", location);
    Ok(secret)
}

fn resolve(location: &str) -> Result<PathBuf, SecretError> {
    // Windows drive letters parse as a URL scheme, so only treat it as a URI when it has "://"
    if !location.contains("://") {
        return Ok(Path::new(location).to_path_buf());
    }

    let url = Url::parse(location)
        .map_err(|_| SecretError::UnsupportedScheme(location.to_string()))?;
    if url.scheme() != "file" {
        return Err(SecretError::UnsupportedScheme(location.to_string()));
    }
    url.to_file_path()
        .map_err(|_| SecretError::UnsupportedScheme(location.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn trims_surrounding_whitespace() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  abc123  ").unwrap();

        let secret = read_secret(file.path().to_str().unwrap()).unwrap();
        assert_eq!(secret, "abc123");
    }

    #[test]
    fn whitespace_only_secret_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, " \n\t \n").unwrap();

        let err = read_secret(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, SecretError::Empty(_)));
    }

    #[test]
    fn reads_file_uri() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "token").unwrap();
        let uri = Url::from_file_path(file.path()).unwrap().to_string();

        assert_eq!(read_secret(&uri).unwrap(), "token");
    }

    #[test]
    fn rejects_remote_schemes() {
        let err = read_secret("gs://bucket/key").unwrap_err();
        assert!(matches!(err, SecretError::UnsupportedScheme(_)));
    }

    #[test]
    fn missing_file_keeps_io_cause() {
        let err = read_secret("/definitely/not/here/key").unwrap_err();
        match err {
            SecretError::Read { source, .. } => {
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound)
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
