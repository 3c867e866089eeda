use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::pipeline::IconVariant;

pub const DEFAULT_SETTINGS_PATH: &str = "config/icon-vectorizer.toml";
pub const DEFAULT_ICONS_DIR: &str = "/workspace/medstory-ai/public/icons";
pub const DEFAULT_OUTPUT_DIR: &str = "/workspace/medstory-ai/public";
pub const DEFAULT_ICON_FILES: [&str; 5] = [
    "core_story_concept.png",
    "medstory_slide_deck.png",
    "scientific_investigation.png",
    "stakeholder_interviews.png",
    "story_flow_map.png",
];

const RASTER_EXTENSION: &str = ".png";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorPair {
    pub main: String,
    pub background: String,
}

impl ColorPair {
    pub fn new(main: impl Into<String>, background: impl Into<String>) -> Self {
        Self {
            main: main.into(),
            background: background.into(),
        }
    }

    pub fn menu_default() -> Self {
        Self::new("#14326D", "#002F6C")
    }

    pub fn chat_default() -> Self {
        Self::new("#063471", "#FFFFFF")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThresholdBackend {
    #[default]
    ImageMagick,
    Native,
}

impl ThresholdBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "imagemagick" => Some(Self::ImageMagick),
            "native" => Some(Self::Native),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracerSettings {
    pub threshold_backend: ThresholdBackend,
    pub convert_program: String,
    pub potrace_program: String,
}

impl Default for TracerSettings {
    fn default() -> Self {
        Self {
            threshold_backend: ThresholdBackend::default(),
            convert_program: String::from("convert"),
            potrace_program: String::from("potrace"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconJob {
    pub name: String,
    pub source_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionSettings {
    pub icons_dir: PathBuf,
    pub output_dir: PathBuf,
    pub icon_files: Vec<String>,
    pub menu: ColorPair,
    pub chat: ColorPair,
    pub tracer: TracerSettings,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            icons_dir: PathBuf::from(DEFAULT_ICONS_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            icon_files: DEFAULT_ICON_FILES.iter().map(|v| v.to_string()).collect(),
            menu: ColorPair::menu_default(),
            chat: ColorPair::chat_default(),
            tracer: TracerSettings::default(),
        }
    }
}

impl ConversionSettings {
    pub fn colors_for(&self, variant: IconVariant) -> &ColorPair {
        match variant {
            IconVariant::Menu => &self.menu,
            IconVariant::Chat => &self.chat,
        }
    }

    pub fn jobs(&self) -> Vec<IconJob> {
        self.icon_files
            .iter()
            .map(|file| IconJob {
                name: file
                    .strip_suffix(RASTER_EXTENSION)
                    .unwrap_or(file.as_str())
                    .to_string(),
                source_path: self.icons_dir.join(file),
            })
            .collect()
    }

    pub fn variant_output_path(&self, job: &IconJob, variant: IconVariant) -> PathBuf {
        self.output_dir
            .join(variant.output_file_name(job.name.as_str()))
    }

    pub fn temp_svg_path(&self, job: &IconJob) -> PathBuf {
        self.output_dir.join(format!("{}_temp.svg", job.name))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("failed to read icon settings '{path}': {message}")]
    ReadFile { path: String, message: String },
    #[error("failed to parse icon settings TOML '{path}': {message}")]
    ParseToml { path: String, message: String },
    #[error("icon settings field '{field}' is invalid: {message}")]
    InvalidField { field: String, message: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsOverlay {
    icons_dir: Option<String>,
    output_dir: Option<String>,
    icon_files: Option<Vec<String>>,
    menu: Option<ColorPairOverlay>,
    chat: Option<ColorPairOverlay>,
    tracer: Option<TracerOverlay>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ColorPairOverlay {
    main: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TracerOverlay {
    threshold_backend: Option<String>,
    convert_program: Option<String>,
    potrace_program: Option<String>,
}

pub fn load_conversion_settings(
    working_dir: &Path,
    explicit_path: Option<&Path>,
) -> Result<ConversionSettings, SettingsError> {
    if let Some(path) = explicit_path.map(|p| {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            working_dir.join(p)
        }
    }) {
        return load_settings_file(path.as_path());
    }

    let default_path = working_dir.join(DEFAULT_SETTINGS_PATH);
    if default_path.exists() {
        return load_settings_file(default_path.as_path());
    }
    Ok(ConversionSettings::default())
}

fn load_settings_file(path: &Path) -> Result<ConversionSettings, SettingsError> {
    let raw = fs::read_to_string(path).map_err(|error| SettingsError::ReadFile {
        path: path.display().to_string(),
        message: error.to_string(),
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_conversion_settings(raw.as_str(), base_dir).map_err(|error| match error {
        SettingsError::ParseToml { message, .. } => SettingsError::ParseToml {
            path: path.display().to_string(),
            message,
        },
        other => other,
    })
}

pub fn parse_conversion_settings(
    raw: &str,
    base_dir: &Path,
) -> Result<ConversionSettings, SettingsError> {
    let overlay =
        toml::from_str::<SettingsOverlay>(raw).map_err(|error| SettingsError::ParseToml {
            path: String::from("<inline>"),
            message: error.to_string(),
        })?;
    apply_overlay(ConversionSettings::default(), overlay, base_dir)
}

fn apply_overlay(
    mut settings: ConversionSettings,
    overlay: SettingsOverlay,
    base_dir: &Path,
) -> Result<ConversionSettings, SettingsError> {
    if let Some(dir) = overlay.icons_dir {
        settings.icons_dir = resolve_dir(base_dir, dir.as_str(), "icons_dir")?;
    }
    if let Some(dir) = overlay.output_dir {
        settings.output_dir = resolve_dir(base_dir, dir.as_str(), "output_dir")?;
    }
    if let Some(files) = overlay.icon_files {
        if files.is_empty() {
            return Err(invalid("icon_files", "at least one icon file is required"));
        }
        let mut parsed = Vec::with_capacity(files.len());
        for file in files {
            parsed.push(parse_icon_file(file.as_str())?);
        }
        settings.icon_files = parsed;
    }
    if let Some(menu) = overlay.menu {
        settings.menu = merge_color_pair(settings.menu, menu, "menu")?;
    }
    if let Some(chat) = overlay.chat {
        settings.chat = merge_color_pair(settings.chat, chat, "chat")?;
    }
    if let Some(tracer) = overlay.tracer {
        if let Some(backend) = tracer.threshold_backend {
            settings.tracer.threshold_backend = ThresholdBackend::parse(backend.as_str())
                .ok_or_else(|| {
                    invalid(
                        "tracer.threshold_backend",
                        format!("expected imagemagick|native, got '{backend}'"),
                    )
                })?;
        }
        if let Some(program) = tracer.convert_program {
            settings.tracer.convert_program =
                parse_non_empty(program.as_str(), "tracer.convert_program")?;
        }
        if let Some(program) = tracer.potrace_program {
            settings.tracer.potrace_program =
                parse_non_empty(program.as_str(), "tracer.potrace_program")?;
        }
    }
    Ok(settings)
}

fn merge_color_pair(
    current: ColorPair,
    overlay: ColorPairOverlay,
    section: &str,
) -> Result<ColorPair, SettingsError> {
    let main = match overlay.main {
        Some(value) => parse_hex_color(value.as_str(), format!("{section}.main").as_str())?,
        None => current.main,
    };
    let background = match overlay.background {
        Some(value) => {
            parse_hex_color(value.as_str(), format!("{section}.background").as_str())?
        }
        None => current.background,
    };
    Ok(ColorPair { main, background })
}

fn resolve_dir(base_dir: &Path, value: &str, field: &str) -> Result<PathBuf, SettingsError> {
    let value = parse_non_empty(value, field)?;
    let path = PathBuf::from(value);
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(base_dir.join(path))
    }
}

fn parse_icon_file(value: &str) -> Result<String, SettingsError> {
    let value = parse_non_empty(value, "icon_files")?;
    let stem = value.strip_suffix(RASTER_EXTENSION).unwrap_or_default();
    if stem.is_empty() || stem.contains(['/', '\\']) {
        return Err(invalid(
            "icon_files",
            format!("'{value}' must be a bare file name ending in {RASTER_EXTENSION}"),
        ));
    }
    Ok(value)
}

fn parse_hex_color(value: &str, field: &str) -> Result<String, SettingsError> {
    let value = value.trim();
    let valid = value
        .strip_prefix('#')
        .filter(|hex| matches!(hex.len(), 3 | 6))
        .map(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false);
    if !valid {
        return Err(invalid(
            field,
            format!("'{value}' is not a #RGB or #RRGGBB color"),
        ));
    }
    Ok(value.to_string())
}

fn parse_non_empty(value: &str, field: &str) -> Result<String, SettingsError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    Ok(value.to_string())
}

fn invalid(field: &str, message: impl Into<String>) -> SettingsError {
    SettingsError::InvalidField {
        field: field.to_string(),
        message: message.into(),
    }
}
