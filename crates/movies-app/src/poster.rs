//! Poster upload policy and staging of uploaded poster bytes.
//!
//! Extension is checked from the submitted file name before any bytes are buffered,
//! size is enforced while reading, so a rejected upload never ends up in memory as a whole.
use std::ffi::OsStr;

use bytes::Bytes;
use futures::{Stream, TryStreamExt as _};
use tracing::debug;

pub const DEFAULT_MAX_POSTER_BYTES: u64 = 1_048_576;
pub const DEFAULT_POSTER_EXTENSIONS: &[&str] = &["jpg", "png"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PosterError {
    #[error("Please Select movie Poster")]
    Missing,
    #[error("Only .png, jpg images are allowed")]
    InvalidExtension,
    #[error("poster cannot be > 1MB")]
    TooLarge,
}

/// Lowercase extension without leading dot
pub fn file_ext(path: impl AsRef<OsStr>) -> Option<String> {
    std::path::Path::new(path.as_ref())
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosterPolicy {
    allowed_extensions: Vec<String>,
    max_poster_bytes: u64,
}

impl Default for PosterPolicy {
    fn default() -> Self {
        PosterPolicy::new(DEFAULT_POSTER_EXTENSIONS, DEFAULT_MAX_POSTER_BYTES)
    }
}

impl PosterPolicy {
    /// Extensions are accepted with or without leading dot, in any case
    pub fn new<I, S>(allowed_extensions: I, max_poster_bytes: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_extensions = allowed_extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        PosterPolicy {
            allowed_extensions,
            max_poster_bytes,
        }
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    pub fn max_poster_bytes(&self) -> u64 {
        self.max_poster_bytes
    }

    pub fn check_extension(&self, file_name: &str) -> Result<(), PosterError> {
        match file_ext(file_name) {
            Some(ext) if self.allowed_extensions.contains(&ext) => Ok(()),
            _ => Err(PosterError::InvalidExtension),
        }
    }

    pub fn check_size(&self, size: u64) -> Result<(), PosterError> {
        if size > self.max_poster_bytes {
            Err(PosterError::TooLarge)
        } else {
            Ok(())
        }
    }

    /// Reads poster data from the stream, stops at the first policy violation.
    ///
    /// Errors of the stream itself are returned as `Err`, policy violations are kept
    /// in the returned [`UploadedPoster`].
    pub async fn stage<S, E>(
        &self,
        file_name: impl Into<String>,
        stream: S,
    ) -> Result<UploadedPoster, E>
    where
        S: Stream<Item = Result<Bytes, E>>,
    {
        let file_name = file_name.into();
        if let Err(e) = self.check_extension(&file_name) {
            debug!("Poster {file_name} rejected: {e}");
            return Ok(UploadedPoster::rejected(file_name, e));
        }

        let mut stream = std::pin::pin!(stream);
        let mut data = Vec::new();
        while let Some(chunk) = stream.try_next().await? {
            let size = (data.len() + chunk.len()) as u64;
            if let Err(e) = self.check_size(size) {
                debug!("Poster {file_name} rejected after {size} bytes: {e}");
                return Ok(UploadedPoster::rejected(file_name, e));
            }
            data.extend_from_slice(&chunk);
        }
        debug!("Staged poster {file_name}, {} bytes", data.len());
        Ok(UploadedPoster {
            file_name,
            content: Ok(data),
        })
    }
}

#[derive(Debug)]
pub struct UploadedPoster {
    file_name: String,
    content: Result<Vec<u8>, PosterError>,
}

impl UploadedPoster {
    pub(crate) fn rejected(file_name: String, error: PosterError) -> Self {
        UploadedPoster {
            file_name,
            content: Err(error),
        }
    }

    /// Poster violated the policy, the form cannot succeed
    pub fn is_rejected(&self) -> bool {
        self.content.is_err()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn into_bytes(self) -> Result<Vec<u8>, PosterError> {
        self.content
    }
}

/// Content type from image magic number, used when serving stored posters
pub fn poster_content_type(data: &[u8]) -> &'static str {
    infer::get(data)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .map(|kind| kind.mime_type())
        .unwrap_or("application/octet-stream")
}
