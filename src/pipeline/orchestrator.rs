use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConversionSettings, IconJob};
use crate::pipeline::fallback::{write_fallback, FallbackError};
use crate::pipeline::vectorize::{vectorize, RasterTracer, VectorizeFailure};
use crate::pipeline::IconVariant;
use crate::svg::write_remapped;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IconOutcome {
    Vectorized,
    Fallback { reason: String },
}

impl IconOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vectorized => "vectorized",
            Self::Fallback { .. } => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IconReport {
    pub name: String,
    #[serde(flatten)]
    pub outcome: IconOutcome,
    pub outputs: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ConversionReport {
    pub icons: Vec<IconReport>,
}

impl ConversionReport {
    pub fn vectorized_count(&self) -> usize {
        self.icons
            .iter()
            .filter(|icon| icon.outcome == IconOutcome::Vectorized)
            .count()
    }

    pub fn fallback_count(&self) -> usize {
        self.icons.len() - self.vectorized_count()
    }
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to prepare output directory '{path}': {source}")]
    OutputDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("fallback generation failed for icon '{icon}': {source}")]
    Fallback {
        icon: String,
        #[source]
        source: FallbackError,
    },
}

pub struct IconConverter<T> {
    settings: ConversionSettings,
    tracer: T,
}

impl<T: RasterTracer> IconConverter<T> {
    pub fn new(settings: ConversionSettings, tracer: T) -> Self {
        Self { settings, tracer }
    }

    pub fn run(&self) -> Result<ConversionReport, ConvertError> {
        fs::create_dir_all(self.settings.output_dir.as_path()).map_err(|source| {
            ConvertError::OutputDir {
                path: self.settings.output_dir.display().to_string(),
                source,
            }
        })?;

        let mut report = ConversionReport::default();
        for job in self.settings.jobs() {
            report.icons.push(self.convert_icon(&job)?);
        }
        info!(
            vectorized = report.vectorized_count(),
            fallback = report.fallback_count(),
            "icon conversion finished"
        );
        Ok(report)
    }

    pub fn convert_icon(&self, job: &IconJob) -> Result<IconReport, ConvertError> {
        info!(icon = %job.name, source = %job.source_path.display(), "processing icon");

        let outcome = match self.write_vectorized_variants(job) {
            Ok(()) => IconOutcome::Vectorized,
            Err(error) => {
                warn!(icon = %job.name, error = %error, "vectorization failed, writing fallback icons");
                self.write_fallback_variants(job)?;
                IconOutcome::Fallback {
                    reason: error.to_string(),
                }
            }
        };

        let outputs = IconVariant::OUTPUT_ORDER
            .iter()
            .map(|variant| self.settings.variant_output_path(job, *variant))
            .collect::<Vec<_>>();
        info!(icon = %job.name, outcome = outcome.as_str(), "wrote icon variants");
        Ok(IconReport {
            name: job.name.clone(),
            outcome,
            outputs,
        })
    }

    fn write_vectorized_variants(&self, job: &IconJob) -> Result<(), VectorizeFailure> {
        let temp_svg = self.settings.temp_svg_path(job);
        let document = vectorize(&self.tracer, job, temp_svg.as_path())?;
        // A failed variant write leaves the temp file behind.
        for variant in IconVariant::OUTPUT_ORDER {
            write_remapped(
                &document,
                self.settings.variant_output_path(job, variant).as_path(),
                self.settings.colors_for(variant),
            )
            .map_err(VectorizeFailure::Document)?;
        }
        fs::remove_file(temp_svg.as_path()).map_err(VectorizeFailure::Io)
    }

    fn write_fallback_variants(&self, job: &IconJob) -> Result<(), ConvertError> {
        for variant in IconVariant::OUTPUT_ORDER {
            write_fallback(
                job.source_path.as_path(),
                self.settings.variant_output_path(job, variant).as_path(),
                self.settings.colors_for(variant),
            )
            .map_err(|source| ConvertError::Fallback {
                icon: job.name.clone(),
                source,
            })?;
        }
        Ok(())
    }
}
