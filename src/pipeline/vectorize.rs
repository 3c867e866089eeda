use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use image::GrayAlphaImage;
use thiserror::Error;
use tracing::debug;

use crate::config::{IconJob, ThresholdBackend, TracerSettings};
use crate::pipeline::runtime::{CommandRunner, CommandSpec, RuntimeError, StdCommandRunner};
use crate::svg::{DocumentError, VectorDocument};

// 50% of the 8-bit luma range.
const LUMA_THRESHOLD: u8 = 128;
const ALPHA_THRESHOLD: u8 = 128;

#[derive(Debug, Error)]
pub enum VectorizeFailure {
    #[error("vectorizer command runner error: {0}")]
    CommandRunner(#[source] RuntimeError),
    #[error("vectorizer command failed ({program}) with exit code {status_code}: {stderr}")]
    CommandFailed {
        program: String,
        status_code: i32,
        stderr: String,
    },
    #[error("raster threshold failed for '{path}': {source}")]
    Threshold {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("vectorizer filesystem error: {0}")]
    Io(#[source] std::io::Error),
    #[error("intermediate vector document unusable: {0}")]
    Document(#[source] DocumentError),
}

pub trait RasterTracer {
    fn trace(&self, raster: &Path, output_svg: &Path) -> Result<(), VectorizeFailure>;
}

pub fn vectorize<T: RasterTracer + ?Sized>(
    tracer: &T,
    job: &IconJob,
    temp_svg: &Path,
) -> Result<VectorDocument, VectorizeFailure> {
    tracer.trace(job.source_path.as_path(), temp_svg)?;
    VectorDocument::load(temp_svg).map_err(VectorizeFailure::Document)
}

pub fn intermediate_bitmap_path(raster: &Path) -> PathBuf {
    raster.with_extension("pbm")
}

/// Thresholds a raster into a PBM, then hands the bitmap to potrace.
///
/// The threshold step either shells out to ImageMagick or runs in-process,
/// depending on [`TracerSettings::threshold_backend`]. The intermediate PBM is
/// removed once tracing finishes, whatever the outcome.
#[derive(Debug, Clone)]
pub struct ExternalTracer<R> {
    settings: TracerSettings,
    runner: R,
}

impl<R: CommandRunner> ExternalTracer<R> {
    pub fn new(settings: TracerSettings, runner: R) -> Self {
        Self { settings, runner }
    }

    pub fn build_threshold_command(&self, raster: &Path, pbm: &Path) -> CommandSpec {
        CommandSpec {
            program: self.settings.convert_program.clone(),
            args: vec![
                raster.display().to_string(),
                String::from("-threshold"),
                String::from("50%"),
                pbm.display().to_string(),
            ],
            cwd: working_dir_for(raster),
        }
    }

    pub fn build_trace_command(&self, pbm: &Path, output_svg: &Path) -> CommandSpec {
        CommandSpec {
            program: self.settings.potrace_program.clone(),
            args: vec![
                String::from("-s"),
                String::from("-o"),
                output_svg.display().to_string(),
                pbm.display().to_string(),
            ],
            cwd: working_dir_for(pbm),
        }
    }

    fn threshold(&self, raster: &Path, pbm: &Path) -> Result<(), VectorizeFailure> {
        match self.settings.threshold_backend {
            ThresholdBackend::ImageMagick => {
                self.run_checked(&self.build_threshold_command(raster, pbm))
            }
            ThresholdBackend::Native => threshold_to_pbm(raster, pbm),
        }
    }

    fn run_checked(&self, spec: &CommandSpec) -> Result<(), VectorizeFailure> {
        debug!(command = %spec.command_line(), "running vectorizer command");
        let output = self
            .runner
            .run(spec)
            .map_err(VectorizeFailure::CommandRunner)?;
        if output.status_code != 0 {
            return Err(VectorizeFailure::CommandFailed {
                program: spec.program.clone(),
                status_code: output.status_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

impl<R: CommandRunner> RasterTracer for ExternalTracer<R> {
    fn trace(&self, raster: &Path, output_svg: &Path) -> Result<(), VectorizeFailure> {
        let pbm = intermediate_bitmap_path(raster);
        let traced = self
            .threshold(raster, pbm.as_path())
            .and_then(|()| self.run_checked(&self.build_trace_command(pbm.as_path(), output_svg)));
        remove_intermediate_bitmap(pbm.as_path());
        traced
    }
}

pub fn default_external_tracer(settings: TracerSettings) -> ExternalTracer<StdCommandRunner> {
    ExternalTracer::new(settings, StdCommandRunner)
}

pub fn threshold_to_pbm(raster: &Path, pbm: &Path) -> Result<(), VectorizeFailure> {
    let image = image::open(raster).map_err(|source| VectorizeFailure::Threshold {
        path: raster.display().to_string(),
        source,
    })?;
    fs::write(pbm, encode_pbm(&image.to_luma_alpha8())).map_err(VectorizeFailure::Io)
}

// Binary PBM (P4): rows packed MSB first, 1 = black. Transparent pixels count as white.
fn encode_pbm(image: &GrayAlphaImage) -> Vec<u8> {
    let (width, height) = image.dimensions();
    let row_bytes = (width as usize).div_ceil(8);
    let mut out = format!("P4\n{width} {height}\n").into_bytes();
    out.reserve(row_bytes * height as usize);
    for row in image.rows() {
        let mut packed = vec![0_u8; row_bytes];
        for (x, pixel) in row.enumerate() {
            if pixel[1] >= ALPHA_THRESHOLD && pixel[0] < LUMA_THRESHOLD {
                packed[x / 8] |= 0x80 >> (x % 8);
            }
        }
        out.extend_from_slice(packed.as_slice());
    }
    out
}

fn remove_intermediate_bitmap(pbm: &Path) {
    match fs::remove_file(pbm) {
        Ok(()) => {}
        Err(error) if error.kind() == ErrorKind::NotFound => {}
        Err(error) => {
            debug!(path = %pbm.display(), error = %error, "failed to remove intermediate bitmap");
        }
    }
}

fn working_dir_for(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::runtime::CommandOutput;
    use image::{GrayImage, Luma, LumaA};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct FakeRunner {
        seen: Arc<Mutex<Vec<CommandSpec>>>,
        failing_program: Option<String>,
    }

    impl FakeRunner {
        fn failing(program: &str) -> Self {
            Self {
                seen: Arc::new(Mutex::new(Vec::new())),
                failing_program: Some(program.to_string()),
            }
        }

        fn take_seen(&self) -> Vec<CommandSpec> {
            std::mem::take(&mut *self.seen.lock().expect("fake runner mutex poisoned"))
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RuntimeError> {
            self.seen
                .lock()
                .expect("fake runner mutex poisoned")
                .push(spec.clone());
            let failed = self.failing_program.as_deref() == Some(spec.program.as_str());
            Ok(CommandOutput {
                status_code: if failed { 1 } else { 0 },
                stdout: String::new(),
                stderr: if failed {
                    String::from("boom\n")
                } else {
                    String::new()
                },
            })
        }
    }

    fn temp_root() -> PathBuf {
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();
        let root = std::env::temp_dir().join(format!("icon_vectorizer_vectorize_{stamp}"));
        std::fs::create_dir_all(&root).expect("temp root should exist");
        root
    }

    #[test]
    fn builds_threshold_and_trace_commands() {
        let tracer = ExternalTracer::new(TracerSettings::default(), FakeRunner::default());
        let raster = Path::new("/icons/logo.png");
        let pbm = intermediate_bitmap_path(raster);

        let threshold = tracer.build_threshold_command(raster, pbm.as_path());
        assert_eq!(threshold.program, "convert");
        assert_eq!(
            threshold.args,
            vec!["/icons/logo.png", "-threshold", "50%", "/icons/logo.pbm"]
        );
        assert_eq!(threshold.cwd, PathBuf::from("/icons"));

        let trace = tracer.build_trace_command(pbm.as_path(), Path::new("/out/logo_temp.svg"));
        assert_eq!(trace.program, "potrace");
        assert_eq!(
            trace.args,
            vec!["-s", "-o", "/out/logo_temp.svg", "/icons/logo.pbm"]
        );
    }

    #[test]
    fn trace_runs_both_steps_in_order() {
        let runner = FakeRunner::default();
        let tracer = ExternalTracer::new(TracerSettings::default(), runner.clone());

        tracer
            .trace(Path::new("/icons/logo.png"), Path::new("/out/logo_temp.svg"))
            .expect("fake tools succeed");

        let programs = runner
            .take_seen()
            .into_iter()
            .map(|spec| spec.program)
            .collect::<Vec<_>>();
        assert_eq!(programs, vec!["convert", "potrace"]);
    }

    #[test]
    fn threshold_failure_skips_trace_and_reports_exit_code() {
        let runner = FakeRunner::failing("convert");
        let tracer = ExternalTracer::new(TracerSettings::default(), runner.clone());

        let err = tracer
            .trace(Path::new("/icons/logo.png"), Path::new("/out/logo_temp.svg"))
            .expect_err("threshold failure should surface");

        match err {
            VectorizeFailure::CommandFailed {
                program,
                status_code,
                stderr,
            } => {
                assert_eq!(program, "convert");
                assert_eq!(status_code, 1);
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected failure: {other}"),
        }
        assert_eq!(runner.take_seen().len(), 1);
    }

    #[test]
    fn native_threshold_writes_pbm_and_trace_removes_it() {
        let root = temp_root();
        let raster = root.join("half.png");
        let mut image = GrayImage::from_pixel(10, 2, Luma([255]));
        for x in 0..5 {
            image.put_pixel(x, 0, Luma([0]));
            image.put_pixel(x, 1, Luma([127]));
        }
        image.save(&raster).expect("png should save");

        let pbm = root.join("half.pbm");
        threshold_to_pbm(raster.as_path(), pbm.as_path()).expect("threshold should succeed");
        let bytes = std::fs::read(&pbm).expect("pbm should exist");
        assert_eq!(&bytes[..8], b"P4\n10 2\n");
        assert_eq!(&bytes[8..], &[0b1111_1000, 0b0000_0000, 0b1111_1000, 0b0000_0000]);

        let settings = TracerSettings {
            threshold_backend: ThresholdBackend::Native,
            ..TracerSettings::default()
        };
        let runner = FakeRunner::default();
        let tracer = ExternalTracer::new(settings, runner.clone());
        tracer
            .trace(raster.as_path(), root.join("half_temp.svg").as_path())
            .expect("native threshold plus fake potrace succeed");
        assert!(!pbm.exists());
        let programs = runner
            .take_seen()
            .into_iter()
            .map(|spec| spec.program)
            .collect::<Vec<_>>();
        assert_eq!(programs, vec!["potrace"]);
    }

    #[test]
    fn transparent_pixels_are_white() {
        let mut image = GrayAlphaImage::from_pixel(3, 1, LumaA([0, 0]));
        image.put_pixel(1, 0, LumaA([0, 255]));
        let encoded = encode_pbm(&image);
        assert_eq!(&encoded[7..], &[0b0100_0000]);
    }

    #[test]
    fn native_threshold_reports_unreadable_raster() {
        let root = temp_root();
        let err = threshold_to_pbm(root.join("missing.png").as_path(), root.join("m.pbm").as_path())
            .expect_err("missing raster should fail");
        assert!(matches!(err, VectorizeFailure::Threshold { .. }));
    }

    struct CannedTracer(&'static str);

    impl RasterTracer for CannedTracer {
        fn trace(&self, _raster: &Path, output_svg: &Path) -> Result<(), VectorizeFailure> {
            std::fs::write(output_svg, self.0).map_err(VectorizeFailure::Io)
        }
    }

    #[test]
    fn vectorize_parses_traced_output() {
        let root = temp_root();
        let job = IconJob {
            name: String::from("logo"),
            source_path: root.join("logo.png"),
        };
        let temp_svg = root.join("logo_temp.svg");
        let doc = vectorize(
            &CannedTracer(r#"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="8"><path d="M0 0"/></svg>"#),
            &job,
            temp_svg.as_path(),
        )
        .expect("canned output should parse");
        assert_eq!(doc.width, "8");
        assert_eq!(doc.elements.len(), 1);
    }

    #[test]
    fn vectorize_rejects_malformed_intermediate() {
        let root = temp_root();
        let job = IconJob {
            name: String::from("logo"),
            source_path: root.join("logo.png"),
        };
        let err = vectorize(
            &CannedTracer("<svg><g></svg>"),
            &job,
            root.join("logo_temp.svg").as_path(),
        )
        .expect_err("malformed output should fail");
        assert!(matches!(err, VectorizeFailure::Document(DocumentError::Parse(_))));
    }
}
