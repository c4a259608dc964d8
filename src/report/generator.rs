//! Markdown and JSON report generation.
//!
//! This module generates Markdown summaries and JSON dumps of the
//! dashboard, alongside the HTML page built in [`super::html`].

use crate::models::{Dashboard, DashboardMetadata, ZoneOutcome, ZoneReport};
use anyhow::Result;
use std::collections::HashMap;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(dashboard: &Dashboard) -> String {
    let mut output = String::new();

    // Title
    output.push_str(&format!("# {}\n\n", dashboard.title));

    if !dashboard.introduction.is_empty() {
        output.push_str(&dashboard.introduction);
        output.push_str("\n\n");
    }

    // Anchors follow every heading in document order, so repeats are numbered
    // the way GitHub numbers them.
    let mut slugs = Slugger::default();
    slugs.slug(&dashboard.title);
    slugs.slug("Metadata");
    slugs.slug("Contents");
    let anchors: Vec<String> = dashboard
        .zones
        .iter()
        .map(|report| {
            let anchor = slugs.slug(report.zone.display_heading());
            if matches!(&report.outcome, ZoneOutcome::Rendered(r) if !r.is_empty()) {
                slugs.slug(report.zone.display_title());
            }
            anchor
        })
        .collect();

    output.push_str(&generate_metadata_section(&dashboard.metadata));
    output.push_str(&generate_table_of_contents(&dashboard.zones, &anchors));

    for zone in &dashboard.zones {
        output.push_str(&generate_zone_section(zone));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &DashboardMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Input:** `{}`\n", metadata.input_path));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Records Loaded:** {}\n",
        format_thousands(metadata.records_loaded as i64)
    ));
    section.push_str(&format!("- **Zones Rendered:** {}\n", metadata.zones_rendered));
    if metadata.zones_failed > 0 {
        section.push_str(&format!("- **Zones Failed:** {}\n", metadata.zones_failed));
    }
    if let Some(seed) = metadata.seed {
        section.push_str(&format!("- **Color Seed:** {}\n", seed));
    }
    section.push_str(&format!("- **Duration:** {:.2}s\n", metadata.duration_seconds));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(zones: &[ZoneReport], anchors: &[String]) -> String {
    let mut toc = String::new();

    toc.push_str("## Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    for (zone, anchor) in zones.iter().zip(anchors) {
        toc.push_str(&format!("- [{}](#{})\n", zone.zone.name, anchor));
    }
    toc.push('\n');

    toc
}

/// Generate the section for one zone.
fn generate_zone_section(report: &ZoneReport) -> String {
    let mut section = String::new();
    let zone = &report.zone;

    section.push_str(&format!("## {}\n\n", zone.display_heading()));

    if !zone.highlights.is_empty() {
        for highlight in &zone.highlights {
            section.push_str(&format!("- {}\n", highlight));
        }
        section.push('\n');
    }

    match &report.outcome {
        ZoneOutcome::Rendered(result) if result.is_empty() => {
            section.push_str("*No flows recorded for this zone.*\n\n");
        }
        ZoneOutcome::Rendered(result) => {
            section.push_str(&format!("### {}\n\n", zone.display_title()));
            section.push_str(&format!(
                "*Origin: {} | Destinations: {} | Flows: {} | Workers: {}*\n\n",
                result.nodes[0].label,
                result.nodes.len() - 1,
                result.links.len(),
                format_thousands(result.total_population())
            ));

            section.push_str("| # | Destination | Workers |\n");
            section.push_str("|:---:|:---|---:|\n");
            for (i, (label, total)) in result.destination_totals().into_iter().enumerate() {
                section.push_str(&format!(
                    "| {} | {} | {} |\n",
                    i + 1,
                    label,
                    format_thousands(total)
                ));
            }
            section.push('\n');
        }
        ZoneOutcome::Failed { message } => {
            section.push_str(&format!("> ⚠️ **Chart unavailable:** {}\n\n", message));
        }
    }

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by migraflow*\n");

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(dashboard: &Dashboard) -> Result<String> {
    serde_json::to_string_pretty(dashboard).map_err(Into::into)
}

/// GitHub heading slugs, with `-1`, `-2`, ... appended to repeats.
#[derive(Debug, Default)]
struct Slugger {
    seen: HashMap<String, usize>,
}

impl Slugger {
    fn slug(&mut self, heading: &str) -> String {
        let base = slugify(heading);
        let count = self.seen.entry(base.clone()).or_insert(0);
        let slug = if *count == 0 {
            base
        } else {
            format!("{}-{}", base, count)
        };
        *count += 1;
        slug
    }
}

/// Lowercase, drop punctuation, and turn spaces into hyphens.
fn slugify(heading: &str) -> String {
    heading
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('-'),
            '-' | '_' => Some(c),
            c if c.is_alphanumeric() => Some(c),
            _ => None,
        })
        .collect()
}

/// Format an integer with comma thousands separators.
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    if value < 0 {
        format!("-{}", out)
    } else {
        out
    }
}
