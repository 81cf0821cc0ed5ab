//! Meme template catalog loaded from a bundled JSON file.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::MemeError;

/// A meme template: a background image and the number of text boxes it takes.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct Template {
    /// Imgflip template id.
    pub id: String,
    /// Display name, also used in the model prompt.
    pub name: String,
    /// Where the source raster lives.
    pub image_url: Url,
    /// Number of meaningful text slots, 1 to 4.
    pub slot_count: u8,
}

impl Template {
    /// Returns true if `slot` is one this template actually renders.
    pub fn uses_slot(&self, slot: usize) -> bool {
        slot < usize::from(self.slot_count)
    }
}

/// Topic ideas offered to users who don't have one.
pub const SUGGESTIONS: [&str; 12] = [
    "Monday mornings",
    "JavaScript bugs",
    "eating healthy",
    "gym motivation",
    "online meetings",
    "my sleep schedule",
    "adulting",
    "caffeine addiction",
    "debugging at 3am",
    "free Wi-Fi",
    "reply all emails",
    "crypto",
];

/// Errors returned when loading a catalog.
#[derive(Debug)]
pub enum CatalogError {
    /// The JSON payload could not be parsed.
    Parse(serde_json::Error),
    /// The catalog has no templates.
    Empty,
    /// A template declared an unsupported number of slots.
    InvalidSlotCount {
        /// Template id
        id: String,
        /// Declared slot count
        slot_count: u8,
    },
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "Failed to parse template catalog JSON: {err}"),
            Self::Empty => write!(f, "Template catalog is empty"),
            Self::InvalidSlotCount { id, slot_count } => {
                write!(f, "Template {id} declares {slot_count} slots, expected 1 to 4")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

/// Fixed, ordered list of templates. Indices are stable for the life of the value.
#[derive(Clone, Debug)]
pub struct Catalog {
    templates: Vec<Template>,
}

impl Catalog {
    /// Parse the bundled catalog.
    pub fn builtin() -> Result<Self, CatalogError> {
        let raw = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates.json"));
        Self::from_json(raw)
    }

    /// Parse a catalog from a JSON array of templates.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let templates: Vec<Template> = serde_json::from_str(raw).map_err(CatalogError::Parse)?;
        Self::new(templates)
    }

    /// Build a catalog, checking every template's slot count.
    pub fn new(templates: Vec<Template>) -> Result<Self, CatalogError> {
        if templates.is_empty() {
            return Err(CatalogError::Empty);
        }
        if let Some(bad) = templates
            .iter()
            .find(|template| !(1..=4).contains(&template.slot_count))
        {
            return Err(CatalogError::InvalidSlotCount {
                id: bad.id.clone(),
                slot_count: bad.slot_count,
            });
        }
        Ok(Self { templates })
    }

    /// All templates, in prompt order.
    pub fn list_templates(&self) -> &[Template] {
        &self.templates
    }

    /// Number of templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// A catalog is never empty once built, but clippy wants this next to `len`.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Template at `index`, if there is one.
    pub fn get(&self, index: usize) -> Option<&Template> {
        self.templates.get(index)
    }

    /// Template at `index`, failing with [`MemeError::IndexOutOfRange`].
    pub fn by_index(&self, index: usize) -> Result<&Template, MemeError> {
        self.get(index).ok_or(MemeError::IndexOutOfRange {
            index,
            len: self.templates.len(),
        })
    }

    /// Template with the given imgflip id.
    pub fn by_id(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|template| template.id == id)
    }

    /// The first template, used whenever the model picks something we don't have.
    pub fn fallback(&self) -> &Template {
        // `new` refuses empty catalogs
        &self.templates[0]
    }

    /// Resolve a model-chosen index, falling back to the first template when
    /// the index is missing, negative or past the end.
    pub fn resolve_or_first(&self, index: Option<i64>) -> &Template {
        index
            .and_then(|index| usize::try_from(index).ok())
            .and_then(|index| self.get(index))
            .unwrap_or_else(|| self.fallback())
    }
}
