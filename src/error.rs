use thiserror::Error;

/// A specialized `Result` type for logo detection operations.
pub type LogoResult<T> = Result<T, LogoError>;

/// The error type for everything that is not a match verdict.
///
/// A failed match is never an error; see [`crate::robust_matcher::NoMatchReason`].
#[derive(Debug, Error)]
pub enum LogoError {
    #[error("Wire data truncated: needed {needed} bytes, only {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("Wire data declares a negative length: {length}")]
    NegativeLength { length: i32 },

    #[error("Pixel buffer of {length} bytes does not fit the wire length field")]
    LengthOverflow { length: usize },

    #[error("Feature set has {keypoints} keypoints but {descriptors} descriptor rows")]
    FeatureMismatch { keypoints: usize, descriptors: usize },

    #[error("Descriptor rows have inconsistent widths: expected {expected}, got {got}")]
    DescriptorWidth { expected: usize, got: usize },

    #[error("Pixel buffer of {rows}x{cols} (type {pixel_type}) needs {expected} bytes, got {got}")]
    PixelBufferSize {
        rows: i32,
        cols: i32,
        pixel_type: i32,
        expected: usize,
        got: usize,
    },

    #[error("Pixel type {pixel_type} cannot be converted to an image")]
    UnsupportedPixelType { pixel_type: i32 },

    #[error("Feature dump {path} has no frame id or roi")]
    MissingRoi { path: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("Image error: {source}")]
    Image {
        #[from]
        source: image::ImageError,
    },

    #[error("Invalid glob pattern: {source}")]
    Glob {
        #[from]
        source: glob::PatternError,
    },
}
