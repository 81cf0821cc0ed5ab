//! Error handling

use tracing::debug;

/// Failures across the meme pipeline.
#[derive(Debug)]
pub enum MemeError {
    /// The topic was empty after trimming
    EmptyTopic,
    /// The topic was longer than we accept
    TopicTooLong {
        /// Maximum number of characters allowed
        max: usize,
        /// Number of characters received
        actual: usize,
    },
    /// The text-generation backend was unreachable or returned an error
    ModelInvocation(String),
    /// The backend output could not be parsed, even after repair
    MalformedResponse(String),
    /// The template raster could not be fetched or decoded
    ImageLoad(String),
    /// The composited raster could not be encoded
    ImageEncode(String),
    /// The remote captioning service reported a failure
    RemoteService(String),
    /// A catalog lookup fell outside the catalog
    IndexOutOfRange {
        /// The requested index
        index: usize,
        /// Number of templates in the catalog
        len: usize,
    },
    /// Another generation is already in flight
    Busy,
}

impl std::fmt::Display for MemeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTopic => write!(f, "Topic must not be empty"),
            Self::TopicTooLong { max, actual } => {
                write!(f, "Topic is {actual} characters long, the limit is {max}")
            }
            Self::ModelInvocation(message) => write!(f, "Text model request failed: {message}"),
            Self::MalformedResponse(message) => {
                write!(f, "Text model returned a malformed response: {message}")
            }
            Self::ImageLoad(message) => write!(f, "Failed to load template image: {message}"),
            Self::ImageEncode(message) => write!(f, "Failed to encode meme image: {message}"),
            Self::RemoteService(message) => write!(f, "Imgflip failed: {message}"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "Template index {index} is out of range (catalog has {len})")
            }
            Self::Busy => write!(f, "A meme is already being generated"),
        }
    }
}

impl std::error::Error for MemeError {}

impl From<image::ImageError> for MemeError {
    fn from(err: image::ImageError) -> Self {
        debug!("Image error: {}", err);
        match err {
            image::ImageError::Encoding(_) => MemeError::ImageEncode(err.to_string()),
            _ => MemeError::ImageLoad(err.to_string()),
        }
    }
}

impl From<std::io::Error> for MemeError {
    fn from(err: std::io::Error) -> Self {
        MemeError::ImageLoad(err.to_string())
    }
}
