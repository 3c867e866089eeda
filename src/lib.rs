pub mod config;
pub mod pipeline;
pub mod svg;

pub use config::{ColorPair, ConversionSettings, IconJob, ThresholdBackend, TracerSettings};
pub use pipeline::orchestrator::{ConversionReport, IconConverter, IconOutcome, IconReport};
pub use pipeline::IconVariant;
pub use svg::{ElementKind, SvgElement, VectorDocument};
