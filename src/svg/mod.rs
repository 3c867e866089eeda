use std::fs;
use std::path::Path;

use thiserror::Error;

mod parse;
pub mod remap;
mod writer;

pub use remap::{remap_colors, write_remapped};
pub use writer::write_document;

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Path,
    Circle,
    Rect,
    Group,
}

impl ElementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Circle => "circle",
            Self::Rect => "rect",
            Self::Group => "g",
        }
    }

    pub fn from_local_name(name: &str) -> Option<Self> {
        match name {
            "path" => Some(Self::Path),
            "circle" => Some(Self::Circle),
            "rect" => Some(Self::Rect),
            "g" => Some(Self::Group),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgElement {
    pub kind: ElementKind,
    pub attributes: Vec<(String, String)>,
}

impl SvgElement {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    // Replaces in place so attribute order stays stable; appends when missing.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self
                .attributes
                .push((name.to_string(), value.to_string())),
        }
    }
}

/// A flat drawable tree with the canvas attributes kept as raw strings.
///
/// Width, height and viewBox are never interpreted, so malformed values from a
/// tracer survive a parse/write cycle unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorDocument {
    pub width: String,
    pub height: String,
    pub view_box: String,
    /// Prefix/URI pairs used by prefixed element attributes, declared on the root when written.
    pub namespaces: Vec<(String, String)>,
    pub elements: Vec<SvgElement>,
}

impl VectorDocument {
    pub fn new(
        width: impl Into<String>,
        height: impl Into<String>,
        view_box: impl Into<String>,
    ) -> Self {
        Self {
            width: width.into(),
            height: height.into(),
            view_box: view_box.into(),
            namespaces: Vec::new(),
            elements: Vec::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let raw = fs::read_to_string(path).map_err(|source| DocumentError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse_str(raw.as_str())
    }

    pub fn elements_of(&self, kind: ElementKind) -> impl Iterator<Item = &SvgElement> {
        self.elements
            .iter()
            .filter(move |element| element.kind == kind)
    }

    pub fn to_svg_string(&self) -> String {
        write_document(self)
    }

    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        fs::write(path, self.to_svg_string()).map_err(|source| DocumentError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read vector document '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse vector document: {0}")]
    Parse(#[source] roxmltree::Error),
    #[error("failed to write vector document '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
