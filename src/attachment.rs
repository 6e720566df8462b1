// ABOUTME: Attachment handling - classifies files as text or binary by
// ABOUTME: media type and normalizes them into texts and blobs for a request.

use std::path::Path;

use tracing::{debug, warn};

use crate::error::AttachmentError;

/// How an attachment is carried into a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Decoded to a string.
    Text,
    /// Kept as raw bytes.
    Binary,
}

/// Raw bytes of a binary attachment plus the media type inferred from its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub data: Vec<u8>,
    pub media_type: Option<String>,
}

impl Blob {
    /// Create a blob with an explicit media type.
    pub fn new(data: impl Into<Vec<u8>>, media_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            media_type: Some(media_type.into()),
        }
    }
}

/// Attachments split into decoded text fragments and binary blobs.
///
/// Both sequences keep the order the attachments were given in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedInput {
    pub texts: Vec<String>,
    pub blobs: Vec<Blob>,
}

impl NormalizedInput {
    /// True when there are neither texts nor blobs.
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty() && self.blobs.is_empty()
    }
}

/// Media type guessed from the file name, if any.
pub fn media_type(path: impl AsRef<Path>) -> Option<String> {
    mime_guess::from_path(path.as_ref())
        .first_raw()
        .map(str::to_string)
}

/// Classify a path by its name alone. Images are binary, everything else is text.
pub fn classify(path: impl AsRef<Path>) -> ContentKind {
    match mime_guess::from_path(path.as_ref()).first() {
        Some(mime) if mime.type_() == mime_guess::mime::IMAGE => ContentKind::Binary,
        _ => ContentKind::Text,
    }
}

/// Read a file's raw bytes.
pub fn read_bytes(path: impl AsRef<Path>) -> Result<Vec<u8>, AttachmentError> {
    let path = path.as_ref();
    std::fs::read(path).map_err(|source| AttachmentError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Decode text as UTF-8, falling back to Latin-1 which accepts any byte sequence.
pub fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            warn!(
                valid_up_to = err.utf8_error().valid_up_to(),
                "Attachment is not valid UTF-8, decoding as Latin-1"
            );
            err.into_bytes().into_iter().map(char::from).collect()
        }
    }
}

/// Read and split attachments into text fragments and binary blobs.
///
/// The first unreadable file aborts the whole normalization.
pub fn normalize<P: AsRef<Path>>(paths: &[P]) -> Result<NormalizedInput, AttachmentError> {
    let mut input = NormalizedInput::default();

    for path in paths {
        let path = path.as_ref();
        let data = read_bytes(path)?;

        match classify(path) {
            ContentKind::Binary => {
                debug!(path = %path.display(), bytes = data.len(), "Attached binary file");
                input.blobs.push(Blob {
                    data,
                    media_type: media_type(path),
                });
            }
            ContentKind::Text => {
                debug!(path = %path.display(), bytes = data.len(), "Attached text file");
                input.texts.push(decode_text(data));
            }
        }
    }

    Ok(input)
}
