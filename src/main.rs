//! migraflow - Labor Migration Sankey Dashboard
//!
//! A CLI tool that loads census flow tables, aggregates the employed
//! population moving out of each macro-zone, and renders one Sankey
//! diagram per zone.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing input, malformed file, config, write failure)
//!   2 - A zone could not be charted and --fail-on-zone-error was set

mod analysis;
mod cli;
mod config;
mod error;
mod loader;
mod models;
mod report;

use analysis::color::LINK_ALPHA;
use analysis::{ColorPicker, FixedColor, RandomColors, DEFAULT_TOP_N};
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, ZoneConfig, CONFIG_FILE_NAME};
use models::{Dashboard, DashboardMetadata, FlowRecord, RgbaColor, ZoneOutcome, ZoneReport};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("migraflow v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .migraflow.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to set the input path, zones, narrative text, and chart sizes.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load, aggregate, and render. Returns the exit code (0 or 2).
fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;

    let input = config.data.input.clone().map(PathBuf::from).context(
        "No input file given; use --input, MIGRAFLOW_INPUT, or data.input in the config",
    )?;

    // Step 1: Load and normalize the flow table
    println!("📥 Loading flows: {}", input.display());
    let records = loader::load_flows(&input, &config.data, !args.quiet)
        .with_context(|| format!("Failed to load flows from {}", input.display()))?;
    info!("Loaded {} flow records", records.len());

    if args.dry_run {
        return handle_dry_run(&records, &config.zones);
    }

    // Step 2: Aggregate each zone independently
    println!("\n🔬 Aggregating {} zones...", config.zones.len());
    let mut colors: Box<dyn ColorPicker> = match config.aggregation.link_color {
        Some([r, g, b]) => Box::new(FixedColor(RgbaColor::new(r, g, b, LINK_ALPHA))),
        None => Box::new(RandomColors::from_seed_option(config.aggregation.seed)),
    };
    let zones = chart_zones(&records, &config.zones, config.aggregation.top_n, colors.as_mut());

    let zones_failed = zones.iter().filter(|z| z.outcome.is_failed()).count();

    // Step 3: Build and render the dashboard
    println!("\n📝 Generating report...");

    let metadata = DashboardMetadata {
        input_path: input.display().to_string(),
        generated_at: Utc::now(),
        records_loaded: records.len(),
        zones_rendered: zones.len() - zones_failed,
        zones_failed,
        seed: config.aggregation.seed,
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };

    let dashboard = Dashboard {
        metadata,
        title: config.page.title.clone(),
        introduction: config.page.introduction.clone(),
        zones,
        chart: config.chart.clone(),
    };

    let output = match args.format {
        OutputFormat::Html => report::generate_html_report(&dashboard)?,
        OutputFormat::Markdown => report::generate_markdown_report(&dashboard),
        OutputFormat::Json => report::generate_json_report(&dashboard)?,
    };

    let output_path = resolve_output_path(&args, &config);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    // Print summary
    println!("\n📊 Summary:");
    println!("   Records loaded: {}", dashboard.metadata.records_loaded);
    for zone in &dashboard.zones {
        match &zone.outcome {
            ZoneOutcome::Rendered(result) => println!(
                "   ✅ {}: {} destinations, {} workers",
                zone.zone.name,
                result.nodes.len() - 1,
                report::generator::format_thousands(result.total_population())
            ),
            ZoneOutcome::Failed { message } => {
                println!("   ❌ {}: {}", zone.zone.name, message)
            }
        }
    }
    println!(
        "\n✅ Dashboard complete! Report saved to: {}",
        output_path.display()
    );

    if args.fail_on_zone_error && zones_failed > 0 {
        eprintln!(
            "\n⛔ {} zone(s) could not be charted. Failing (exit code 2).",
            zones_failed
        );
        return Ok(2);
    }

    Ok(0)
}

/// Aggregate every zone, capturing failures per zone.
///
/// A failed zone never stops the others from being charted.
fn chart_zones(
    records: &[FlowRecord],
    zones: &[ZoneConfig],
    top_n: usize,
    colors: &mut dyn ColorPicker,
) -> Vec<ZoneReport> {
    zones
        .iter()
        .map(|zone| {
            let aggregated = if top_n == DEFAULT_TOP_N {
                analysis::aggregate(records, &zone.name, &mut *colors)
            } else {
                analysis::aggregate_top(records, &zone.name, top_n, &mut *colors)
            };

            let outcome = match aggregated {
                Ok(result) => {
                    if result.is_empty() {
                        warn!("Zone '{}' has no flows in the input", zone.name);
                    }
                    ZoneOutcome::Rendered(result)
                }
                Err(e) => {
                    if e.is_invalid_input() {
                        warn!("Zone '{}' rejected: {}", zone.name, e);
                    } else {
                        error!("Zone '{}' failed: {}", zone.name, e);
                    }
                    ZoneOutcome::Failed {
                        message: e.to_string(),
                    }
                }
            };

            ZoneReport {
                zone: zone.clone(),
                outcome,
            }
        })
        .collect()
}

/// Handle --dry-run: list the zones found in the data, then exit.
fn handle_dry_run(records: &[FlowRecord], zones: &[ZoneConfig]) -> Result<i32> {
    println!("\n🔍 Dry run: no report will be written.\n");

    let summary = analysis::zone_summary(records);
    if summary.is_empty() {
        println!("   No flow records found.");
    } else {
        println!("   Origin zones in the data:\n");
        for entry in &summary {
            let marker = if zones.iter().any(|z| z.name == entry.zone) {
                "📈"
            } else {
                "  "
            };
            println!(
                "     {} {} ({} records, {} workers)",
                marker,
                entry.zone,
                entry.records,
                report::generator::format_thousands(entry.population)
            );
        }
    }

    for zone in zones {
        if !summary.iter().any(|s| s.zone == zone.name) {
            println!("\n   ⚠️  Configured zone not found in data: {}", zone.name);
        }
    }

    println!("\n✅ Dry run complete.");
    Ok(0)
}

/// Output path: explicit --output, else the config path with the format's extension.
fn resolve_output_path(args: &Args, config: &Config) -> PathBuf {
    let path = PathBuf::from(&config.general.output);
    if args.output.is_some() {
        path
    } else {
        path.with_extension(args.format.extension())
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn records() -> Vec<FlowRecord> {
        vec![
            FlowRecord::new("Macrozona Norte", "Piura", 120),
            FlowRecord::new("Macrozona Norte", "Lima", 30),
            FlowRecord::new("Macrozona Sur", "Puno", -1),
            FlowRecord::new("Macrozona Centro", "Junín", 90),
        ]
    }

    #[test]
    fn test_failed_zone_does_not_stop_others() {
        let zones = Config::default().zones;
        let mut colors = FixedColor(RgbaColor::new(60, 60, 60, 0.7));
        let reports = chart_zones(&records(), &zones, 10, &mut colors);

        assert_eq!(reports.len(), 4);

        // Lima - Callao has no rows: origin-only chart, not a failure.
        match &reports[0].outcome {
            ZoneOutcome::Rendered(result) => {
                assert_eq!(result.nodes.len(), 1);
                assert!(result.links.is_empty());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        assert!(!reports[1].outcome.is_failed());
        assert!(!reports[2].outcome.is_failed());
        assert!(reports[3].outcome.is_failed());
        assert_eq!(reports[3].zone.name, "Macrozona Sur");
    }

    #[test]
    fn test_unparseable_population_fails_only_its_zone() {
        let csv = "macrozona_origen;depart_destino;pob_c\n\
                   Macrozona Norte;Piura;120\n\
                   Macrozona Sur;Puno;abc\n\
                   Macrozona Sur;Tacna;40\n\
                   Macrozona Centro;Junín;90\n\
                   Lima - Callao;Lima;300\n";
        let config = Config::default();
        let records = loader::read_flows(csv.as_bytes(), &config.data).unwrap();
        assert_eq!(records.len(), 5);

        let mut colors = FixedColor(RgbaColor::new(60, 60, 60, 0.7));
        let reports = chart_zones(&records, &config.zones, DEFAULT_TOP_N, &mut colors);

        for report in &reports[..3] {
            match &report.outcome {
                ZoneOutcome::Rendered(result) => assert_eq!(result.links.len(), 1),
                other => panic!("unexpected outcome for {}: {:?}", report.zone.name, other),
            }
        }

        assert_eq!(reports[3].zone.name, "Macrozona Sur");
        match &reports[3].outcome {
            ZoneOutcome::Failed { message } => {
                assert!(message.contains("row 3"));
                assert!(message.contains("'abc'"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_chart_zones_with_custom_top_n() {
        let records = vec![
            FlowRecord::new("Macrozona Norte", "Piura", 120),
            FlowRecord::new("Macrozona Norte", "Lima", 30),
        ];
        let zones = vec![ZoneConfig::ad_hoc("Macrozona Norte")];
        let mut colors = FixedColor(RgbaColor::new(60, 60, 60, 0.7));

        let reports = chart_zones(&records, &zones, 1, &mut colors);
        match &reports[0].outcome {
            ZoneOutcome::Rendered(result) => {
                assert_eq!(result.labels(), vec!["Macrozona Norte (Origen)", "Piura (Destino)"])
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_output_path() {
        let config = Config::default();

        let args = Args::try_parse_from(["migraflow", "--format", "json"]).unwrap();
        assert_eq!(
            resolve_output_path(&args, &config),
            PathBuf::from("migraflow_report.json")
        );

        let args = Args::try_parse_from(["migraflow", "-o", "out/sur.txt"]).unwrap();
        let mut config = Config::default();
        config.merge_with_args(&args);
        assert_eq!(resolve_output_path(&args, &config), PathBuf::from("out/sur.txt"));
    }

    #[test]
    fn test_fixture_end_to_end() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/flujos_muestra.csv");
        let config = Config::default();
        let records = loader::load_flows(&path, &config.data, false).unwrap();

        let mut colors = RandomColors::seeded(2017);
        let reports = chart_zones(&records, &config.zones, 10, &mut colors);
        assert!(reports.iter().all(|r| !r.outcome.is_failed()));

        // Norte has twelve destinations; Ucayali and Callao fall outside the top ten.
        let norte = match &reports[2].outcome {
            ZoneOutcome::Rendered(result) => result.clone(),
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert_eq!(norte.nodes.len(), 11);
        assert_eq!(norte.nodes[1].label, "La Libertad (Destino)");
        assert!(!norte.labels().contains(&"Ucayali (Destino)"));
        assert!(!norte.labels().contains(&"Callao (Destino)"));

        let lima = match &reports[0].outcome {
            ZoneOutcome::Rendered(result) => result.clone(),
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert_eq!(lima.nodes[0].label, "Lima - Callao (Origen)");
        assert_eq!(lima.nodes[1].label, "Lima (Destino)");
    }
}
