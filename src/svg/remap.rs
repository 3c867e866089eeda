use std::path::Path;

use super::{DocumentError, ElementKind, SvgElement, VectorDocument};
use crate::config::ColorPair;

pub fn remap_colors(doc: &VectorDocument, colors: &ColorPair) -> VectorDocument {
    let mut out = VectorDocument::new(
        doc.width.as_str(),
        doc.height.as_str(),
        doc.view_box.as_str(),
    );
    out.namespaces = doc.namespaces.clone();
    out.elements.reserve(doc.elements.len() + 1);
    out.elements
        .push(background_rect(colors.background.as_str()));

    for element in &doc.elements {
        let remapped = match element.kind {
            ElementKind::Path => SvgElement::new(ElementKind::Path)
                .with_attribute("d", element.attribute("d").unwrap_or_default())
                .with_attribute("fill", colors.main.as_str())
                .with_attribute("stroke", "none"),
            ElementKind::Circle | ElementKind::Rect => {
                let mut shape = element.clone();
                shape.set_attribute("fill", colors.main.as_str());
                shape
            }
            // Group children are flattened by the parser and never recolored here.
            ElementKind::Group => element.clone(),
        };
        out.elements.push(remapped);
    }
    out
}

pub fn write_remapped(
    doc: &VectorDocument,
    output_path: &Path,
    colors: &ColorPair,
) -> Result<(), DocumentError> {
    remap_colors(doc, colors).save(output_path)
}

pub(crate) fn background_rect(fill: &str) -> SvgElement {
    SvgElement::new(ElementKind::Rect)
        .with_attribute("width", "100%")
        .with_attribute("height", "100%")
        .with_attribute("fill", fill)
}
