use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::config::ColorPair;
use crate::svg::remap::background_rect;
use crate::svg::{DocumentError, ElementKind, SvgElement, VectorDocument};

const CANVAS_SIZE: &str = "100";
const CANVAS_VIEW_BOX: &str = "0 0 100 100";

#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("failed to read raster dimensions '{path}': {source}")]
    RasterDimensions {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to write fallback icon: {0}")]
    Document(#[source] DocumentError),
}

pub fn fallback_document(colors: &ColorPair) -> VectorDocument {
    let main = colors.main.as_str();
    let bg = colors.background.as_str();
    let mut doc = VectorDocument::new(CANVAS_SIZE, CANVAS_SIZE, CANVAS_VIEW_BOX);
    doc.elements.extend([
        background_rect(bg),
        circle("50", "50", "30", main),
        circle("40", "40", "8", bg),
        circle("60", "40", "8", bg),
        SvgElement::new(ElementKind::Path)
            .with_attribute("d", "M 35 65 Q 50 75 65 65")
            .with_attribute("stroke", bg)
            .with_attribute("stroke-width", "3")
            .with_attribute("fill", "none"),
    ]);
    doc
}

pub fn write_fallback(
    raster: &Path,
    output: &Path,
    colors: &ColorPair,
) -> Result<(), FallbackError> {
    // The template ignores the raster size, but an unreadable raster still fails here.
    let (width, height) =
        image::image_dimensions(raster).map_err(|source| FallbackError::RasterDimensions {
            path: raster.display().to_string(),
            source,
        })?;
    debug!(raster = %raster.display(), width, height, "writing fallback icon");
    fallback_document(colors)
        .save(output)
        .map_err(FallbackError::Document)
}

fn circle(cx: &str, cy: &str, r: &str, fill: &str) -> SvgElement {
    SvgElement::new(ElementKind::Circle)
        .with_attribute("cx", cx)
        .with_attribute("cy", cy)
        .with_attribute("r", r)
        .with_attribute("fill", fill)
}
