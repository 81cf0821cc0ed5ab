//! The [`Renderer`] seam shared by local compositing and the imgflip adapter.

use std::future::Future;

use base64::Engine;
use base64::engine::general_purpose;
use url::Url;

use crate::catalog::Template;
use crate::constants::SLOT_COUNT;
use crate::error::MemeError;

/// A finished meme image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemeImage {
    /// Rendered here, kept as encoded bytes.
    Encoded {
        /// MIME type of `bytes`, eg `image/jpeg`.
        mime: &'static str,
        /// The encoded raster.
        bytes: Vec<u8>,
    },
    /// Rendered by a remote service, only the URL is known.
    Remote(Url),
}

impl MemeImage {
    /// Something a browser can display directly: a `data:` URI or the remote URL.
    pub fn display_uri(&self) -> String {
        match self {
            Self::Encoded { mime, bytes } => {
                format!("data:{mime};base64,{}", general_purpose::STANDARD.encode(bytes))
            }
            Self::Remote(url) => url.to_string(),
        }
    }

    /// File extension matching the image type, when we know it.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Encoded { mime, .. } => match *mime {
                "image/png" => "png",
                _ => "jpg",
            },
            Self::Remote(url) => match url.path().rsplit('.').next() {
                Some("png") => "png",
                Some("gif") => "gif",
                _ => "jpg",
            },
        }
    }
}

/// Turns a template and its slot texts into a finished image.
pub trait Renderer {
    /// Render `texts` onto `template`. Slots past `template.slot_count` are ignored.
    fn render(
        &self,
        template: &Template,
        texts: &[String; SLOT_COUNT],
    ) -> impl Future<Output = Result<MemeImage, MemeError>> + Send;
}
