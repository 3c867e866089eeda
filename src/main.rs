use std::path::PathBuf;

use icon_vectorizer::config::load_conversion_settings;
use icon_vectorizer::pipeline::vectorize::default_external_tracer;
use icon_vectorizer::IconConverter;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ConvertCliArgs {
    config_path: Option<PathBuf>,
    show_help: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let cli_args = std::env::args().skip(1).collect::<Vec<_>>();
    let parsed = parse_convert_cli_args(cli_args.as_slice())?;
    if parsed.show_help {
        print_usage();
        return Ok(());
    }

    let working_dir = std::env::current_dir()?;
    let settings = load_conversion_settings(working_dir.as_path(), parsed.config_path.as_deref())?;
    let tracer = default_external_tracer(settings.tracer.clone());
    let report = IconConverter::new(settings, tracer).run()?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_convert_cli_args(args: &[String]) -> Result<ConvertCliArgs, Box<dyn std::error::Error>> {
    let mut config_path = None::<PathBuf>;
    let mut show_help = false;
    let mut i = 0usize;
    while i < args.len() {
        let flag = args[i].as_str();
        let needs_value = |idx: usize| -> Result<String, Box<dyn std::error::Error>> {
            let Some(value) = args.get(idx + 1) else {
                return Err(std::io::Error::other(format!("Missing value for {flag}")).into());
            };
            Ok(value.clone())
        };

        match flag {
            "-h" | "--help" => {
                show_help = true;
                i += 1;
            }
            "--config" => {
                let value = needs_value(i)?;
                if value.trim().is_empty() {
                    return Err(std::io::Error::other("--config requires a non-empty path").into());
                }
                config_path = Some(PathBuf::from(value));
                i += 2;
            }
            unknown => {
                return Err(std::io::Error::other(format!(
                    "Unknown argument: {unknown}\n\nUse --help for usage."
                ))
                .into());
            }
        }
    }
    Ok(ConvertCliArgs {
        config_path,
        show_help,
    })
}

fn print_usage() {
    eprintln!(
        concat!(
            "Usage:\n",
            "  icon-vectorizer [--config PATH]\n\n",
            "Defaults:\n",
            "  settings default: config/icon-vectorizer.toml under the working directory (optional)\n",
            "  without settings: icons from /workspace/medstory-ai/public/icons, SVGs into /workspace/medstory-ai/public\n",
            "  RUST_LOG controls log verbosity (default: info)\n"
        )
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_no_arguments() {
        let parsed = parse_convert_cli_args(&[]).expect("empty args should parse");
        assert_eq!(parsed, ConvertCliArgs::default());
    }

    #[test]
    fn parse_accepts_config_path() {
        let parsed = parse_convert_cli_args(&[
            String::from("--config"),
            String::from("settings/icons.toml"),
        ])
        .expect("parse should succeed");
        assert_eq!(
            parsed.config_path,
            Some(PathBuf::from("settings/icons.toml"))
        );
    }

    #[test]
    fn parse_recognizes_help_flags() {
        for flag in ["-h", "--help"] {
            let parsed =
                parse_convert_cli_args(&[String::from(flag)]).expect("help should parse");
            assert!(parsed.show_help);
        }
    }

    #[test]
    fn parse_takes_help_literal_as_config_value() {
        let parsed = parse_convert_cli_args(&[String::from("--config"), String::from("--help")])
            .expect("parse should succeed");
        assert_eq!(parsed.config_path, Some(PathBuf::from("--help")));
        assert!(!parsed.show_help);
    }

    #[test]
    fn parse_requires_config_value() {
        let err = parse_convert_cli_args(&[String::from("--config")])
            .expect_err("value should be required");
        assert!(err.to_string().contains("--config"));
    }

    #[test]
    fn parse_rejects_unknown_flags() {
        let err = parse_convert_cli_args(&[String::from("--fast")])
            .expect_err("unknown flag should fail");
        assert!(err.to_string().contains("Unknown argument: --fast"));
    }
}
