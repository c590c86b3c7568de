use std::path::Path;

use crate::error::{Error, Result};

/// File types accepted from the upload widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Jpeg,
    Png,
}

impl UploadKind {
    /// Classify a file name by extension, case-insensitively
    pub fn from_filename(name: &str) -> Result<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "jpg" | "jpeg" => Ok(UploadKind::Jpeg),
            "png" => Ok(UploadKind::Png),
            _ => Err(Error::UnsupportedUpload(name.to_owned())),
        }
    }
}

/// An uploaded file that passed the extension check. The bytes stay in
/// memory; nothing is written to disk.
#[derive(Debug, Clone)]
pub struct Upload {
    name: String,
    kind: UploadKind,
    bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: &str, bytes: Vec<u8>) -> Result<Self> {
        let kind = UploadKind::from_filename(name)?;
        Ok(Upload {
            name: name.to_owned(),
            kind,
            bytes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> UploadKind {
        self.kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}
