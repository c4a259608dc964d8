//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// migraflow - Sankey dashboards of internal labor migration
///
/// Loads a semicolon-delimited census flow table, aggregates the
/// employed population moving from each macro-zone to its top
/// destination departments, and writes an HTML page with one Sankey
/// diagram per zone.
///
/// Examples:
///   migraflow --input Destino_trabajo_cpv17.csv
///   migraflow --input flows.csv --zone "Macrozona Sur" --seed 42
///   migraflow --input flows.csv --format markdown --output flows.md
///   migraflow --input flows.csv --dry-run
///   migraflow --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to the flow CSV
    ///
    /// Can also be set via MIGRAFLOW_INPUT or `data.input` in .migraflow.toml.
    #[arg(short, long, value_name = "FILE", env = "MIGRAFLOW_INPUT")]
    pub input: Option<PathBuf>,

    /// Output file path for the report
    ///
    /// Defaults to `general.output` from the config, with the extension
    /// matching --format.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (html, markdown, json)
    #[arg(long, default_value = "html", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .migraflow.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Origin zones to chart (repeatable)
    ///
    /// Names not present in the config are charted with a generated title.
    #[arg(short, long = "zone", value_name = "NAME")]
    pub zones: Vec<String>,

    /// Number of destinations kept per zone
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,

    /// Seed for link colors, for reproducible output
    #[arg(long, value_name = "SEED", env = "MIGRAFLOW_SEED")]
    pub seed: Option<u64>,

    /// CSV field delimiter
    #[arg(long, value_name = "CHAR")]
    pub delimiter: Option<char>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Load the table and list its zones without writing a report
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with code 2 if any zone could not be charted
    #[arg(long)]
    pub fail_on_zone_error: bool,

    /// Generate a default .migraflow.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// HTML page with Plotly charts (default)
    #[default]
    Html,
    /// Markdown summary tables
    Markdown,
    /// JSON dump of the dashboard
    Json,
}

impl OutputFormat {
    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(top) = self.top {
            if top == 0 {
                return Err("--top must be at least 1".to_string());
            }
        }

        if let Some(delimiter) = self.delimiter {
            if !delimiter.is_ascii() {
                return Err("Delimiter must be a single ASCII character".to_string());
            }
        }

        if self.zones.iter().any(|z| z.trim().is_empty()) {
            return Err("Zone names must not be empty".to_string());
        }

        if let Some(ref input) = self.input {
            if !input.is_file() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            input: None,
            output: None,
            format: OutputFormat::Html,
            config: None,
            zones: Vec::new(),
            top: None,
            seed: None,
            delimiter: None,
            verbose: false,
            quiet: false,
            dry_run: false,
            fail_on_zone_error: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "migraflow",
            "--zone",
            "Macrozona Sur",
            "-z",
            "Macrozona Norte",
            "--top",
            "5",
            "--seed",
            "9",
            "--format",
            "markdown",
        ])
        .unwrap();

        assert_eq!(args.zones, vec!["Macrozona Sur", "Macrozona Norte"]);
        assert_eq!(args.top, Some(5));
        assert_eq!(args.seed, Some(9));
        assert_eq!(args.format, OutputFormat::Markdown);
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_top_and_delimiter() {
        let mut args = make_args();
        args.top = Some(0);
        assert!(args.validate().is_err());

        args.top = Some(3);
        args.delimiter = Some('¦');
        assert!(args.validate().is_err());

        args.delimiter = Some(',');
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_missing_input() {
        let mut args = make_args();
        args.input = Some(PathBuf::from("/definitely/not/here.csv"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_init_config_skips_validation() {
        let mut args = make_args();
        args.init_config = true;
        args.top = Some(0);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_format_extension() {
        assert_eq!(OutputFormat::Html.extension(), "html");
        assert_eq!(OutputFormat::Markdown.extension(), "md");
        assert_eq!(OutputFormat::Json.extension(), "json");
    }
}
