//! Document loaders used to fetch remote and relative references.

use futures_util::future::BoxFuture;
use serde_json::Value;
use url::Url;

use crate::error::RefError;

/// Fetches and parses the document behind a reference URL.
pub trait DocumentLoader: Send + Sync {
    fn load<'a>(&'a self, location: &'a Url) -> BoxFuture<'a, Result<Value, RefError>>;
}

/// Reads `file:` URLs from the local filesystem.
///
/// Network schemes are refused; callers that need them plug in their own
/// loader.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLoader;

impl DocumentLoader for FileLoader {
    fn load<'a>(&'a self, location: &'a Url) -> BoxFuture<'a, Result<Value, RefError>> {
        Box::pin(async move {
            if location.scheme() != "file" {
                return Err(RefError::UnsupportedLocation(location.to_string()));
            }
            let path = location
                .to_file_path()
                .map_err(|_| RefError::UnsupportedLocation(location.to_string()))?;
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| RefError::Io {
                    location: location.to_string(),
                    source,
                })?;
            parse_document(location.as_str(), &text)
        })
    }
}

/// Parse JSON or YAML text into a JSON value (JSON is valid YAML).
pub fn parse_document(location: &str, text: &str) -> Result<Value, RefError> {
    serde_yaml::from_str(text).map_err(|e| RefError::Parse {
        location: location.to_string(),
        message: e.to_string(),
    })
}
