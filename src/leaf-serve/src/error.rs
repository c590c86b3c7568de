use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Model artifact missing, unreadable or incompatible
    #[error("Could not load model: {0}")]
    Load(String),

    /// Tensor shape does not match what the model expects
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    /// Uploaded bytes are not a decodable image
    #[error("Could not decode image: {0}")]
    Decode(String),

    /// Upload rejected at the boundary, before decoding
    #[error("Unsupported file type '{0}', expected one of: jpg, jpeg, png")]
    UnsupportedUpload(String),

    /// Label/description document is malformed
    #[error("Invalid catalog: {0}")]
    Catalog(String),

    /// The model produced an index the label table does not cover
    #[error("Class index {index} is outside the label table ({len} labels)")]
    ClassIndexOutOfRange { index: usize, len: usize },

    /// Running the model failed
    #[error("Inference failed: {0}")]
    Inference(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn shape(expected: impl ToString, actual: impl ToString) -> Self {
        Error::Shape {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Errors caused by what the user uploaded, as opposed to the deployment
    pub fn is_user_error(&self) -> bool {
        matches!(self, Error::Decode(_) | Error::UnsupportedUpload(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_problems_are_user_errors() {
        assert!(Error::Decode("bad".into()).is_user_error());
        assert!(Error::UnsupportedUpload("gif".into()).is_user_error());
        assert!(!Error::Load("missing".into()).is_user_error());
        assert!(!Error::ClassIndexOutOfRange { index: 40, len: 38 }.is_user_error());
    }

    #[test]
    fn shape_message_names_both_sides() {
        let err = Error::shape("[1, 225, 225, 3]", "[1, 224, 224, 3]");
        assert_eq!(
            err.to_string(),
            "Shape mismatch: expected [1, 225, 225, 3], got [1, 224, 224, 3]"
        );
    }
}
