//! Shared constants for the pipeline
//!

/// How many rendered memes we keep in the session history.
pub const HISTORY_CAPACITY: usize = 6;

/// Longest topic we accept, in characters, after trimming.
pub const MAX_TOPIC_CHARS: usize = 120;

/// Number of text slots every generation result carries.
pub const SLOT_COUNT: usize = 4;

/// Word limit per text slot that the prompt asks the model for.
pub const MAX_WORDS_PER_SLOT: usize = 8;

/// Smallest font size the layout engine will use, in pixels.
pub const MIN_FONT_SIZE: f32 = 24.0;

/// Image width is divided by this to get the base font size.
pub const FONT_WIDTH_DIVISOR: f32 = 14.0;

/// Fraction of the image width a caption line may take up.
pub const MAX_LINE_WIDTH_RATIO: f32 = 0.9;

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT_RATIO: f32 = 1.2;

/// Distance of the bottom caption anchor from the bottom edge, as a multiple of the font size.
pub const BOTTOM_ANCHOR_RATIO: f32 = 0.6;

/// JPEG quality used for locally rendered memes.
pub const JPEG_QUALITY: u8 = 92;

/// Default Gemini model for caption generation.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-lite";

/// Base URL of the Gemini REST API.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Imgflip caption endpoint.
pub const IMGFLIP_CAPTION_URL: &str = "https://api.imgflip.com/caption_image";

/// Public imgflip account that works for anonymous captioning.
pub const IMGFLIP_DEFAULT_USERNAME: &str = "imgflip_hubot";

/// Password for [`IMGFLIP_DEFAULT_USERNAME`].
pub const IMGFLIP_DEFAULT_PASSWORD: &str = "imgflip_hubot";
