//! HTML dashboard with Plotly Sankey charts.
//!
//! The page is self-contained apart from the Plotly.js script tag: each
//! zone's figure is embedded as JSON and drawn with `Plotly.newPlot`.

use crate::config::ChartConfig;
use crate::models::{AggregationResult, Dashboard, ZoneOutcome, ZoneReport};
use anyhow::Result;
use serde_json::{json, Value};

/// Build the Plotly figure (data and layout) for one diagram.
pub fn sankey_figure(result: &AggregationResult, title: &str, chart: &ChartConfig) -> Value {
    json!({
        "data": [{
            "type": "sankey",
            "node": {
                "pad": chart.pad,
                "thickness": chart.thickness,
                "line": { "color": chart.line_color, "width": chart.line_width },
                "label": result.labels(),
                "color": chart.node_color,
            },
            "link": {
                "source": result.sources(),
                "target": result.targets(),
                "value": result.values(),
                "color": result.colors(),
            },
        }],
        "layout": {
            "title": { "text": title },
            "font": { "size": chart.font_size },
            "width": chart.width,
            "height": chart.height,
        },
    })
}

/// Generate the complete HTML page.
pub fn generate_html_report(dashboard: &Dashboard) -> Result<String> {
    let mut page = String::new();

    page.push_str("<!DOCTYPE html>\n<html lang=\"es\">\n<head>\n");
    page.push_str("<meta charset=\"utf-8\">\n");
    page.push_str(&format!("<title>{}</title>\n", escape_html(&dashboard.title)));
    page.push_str(&format!(
        "<script src=\"{}\"></script>\n",
        escape_html(&dashboard.chart.plotly_url)
    ));
    page.push_str(STYLE);
    page.push_str("</head>\n<body>\n<main>\n");

    page.push_str(&format!("<h1>{}</h1>\n", escape_html(&dashboard.title)));
    if !dashboard.introduction.is_empty() {
        page.push_str(&format!("<p>{}</p>\n", escape_html(&dashboard.introduction)));
    }

    for (i, zone) in dashboard.zones.iter().enumerate() {
        page.push_str(&generate_zone_section(i, zone, &dashboard.chart)?);
    }

    page.push_str(&format!(
        "<footer>Generado el {} a partir de {} registros de <code>{}</code>.</footer>\n",
        dashboard.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        dashboard.metadata.records_loaded,
        escape_html(&dashboard.metadata.input_path)
    ));
    page.push_str("</main>\n</body>\n</html>\n");

    Ok(page)
}

fn generate_zone_section(index: usize, report: &ZoneReport, chart: &ChartConfig) -> Result<String> {
    let mut section = String::new();
    let zone = &report.zone;

    section.push_str("<section class=\"zone\">\n");
    section.push_str(&format!("<h2>{}</h2>\n", escape_html(zone.display_heading())));

    if !zone.highlights.is_empty() {
        section.push_str("<ul>\n");
        for highlight in &zone.highlights {
            section.push_str(&format!("  <li>{}</li>\n", escape_html(highlight)));
        }
        section.push_str("</ul>\n");
    }

    match &report.outcome {
        ZoneOutcome::Rendered(result) => {
            if result.is_empty() {
                section.push_str(&format!(
                    "<p class=\"empty\">Sin flujos registrados para {}.</p>\n",
                    escape_html(&zone.name)
                ));
            }

            let figure = sankey_figure(result, zone.display_title(), chart);
            let id = format!("sankey-{}", index);
            section.push_str(&format!("<div id=\"{}\" class=\"chart\"></div>\n", id));
            section.push_str(&format!(
                "<script>\n(function () {{\n  var fig = {};\n  Plotly.newPlot(\"{}\", fig.data, fig.layout);\n}})();\n</script>\n",
                script_json(&figure)?,
                id
            ));
        }
        ZoneOutcome::Failed { message } => {
            section.push_str(&format!(
                "<div class=\"notice\">No se pudo generar el diagrama para {}: {}</div>\n",
                escape_html(&zone.name),
                escape_html(message)
            ));
        }
    }

    section.push_str("</section>\n");
    Ok(section)
}

/// Serialize JSON for inline use inside a `<script>` element.
fn script_json(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

/// Escape text for HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = "<style>\n\
body { font-family: sans-serif; margin: 0; background: #fafafa; color: #222; }\n\
main { max-width: 960px; margin: 0 auto; padding: 2rem 1rem; }\n\
section.zone { margin-top: 2.5rem; }\n\
.notice { padding: 1rem; border: 1px solid #c0392b; background: #fdecea; color: #8e2a1f; }\n\
.empty { color: #777; font-style: italic; }\n\
footer { margin-top: 3rem; font-size: 0.85rem; color: #666; }\n\
</style>\n";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZoneConfig;
    use crate::models::{DashboardMetadata, Link, Node, RgbaColor};
    use chrono::Utc;

    fn sample_result() -> AggregationResult {
        let color = RgbaColor::new(90, 160, 210, 0.7);
        AggregationResult {
            zone: "Macrozona Sur".to_string(),
            nodes: vec![
                Node::origin("Macrozona Sur"),
                Node::destination("Arequipa"),
                Node::destination("Cusco"),
            ],
            links: vec![
                Link {
                    source_index: 0,
                    target_index: 1,
                    value: 272469,
                    color,
                },
                Link {
                    source_index: 0,
                    target_index: 2,
                    value: 125987,
                    color,
                },
            ],
        }
    }

    fn sample_dashboard() -> Dashboard {
        let config = crate::config::Config::default();
        Dashboard {
            metadata: DashboardMetadata {
                input_path: "data/flujos.csv".to_string(),
                generated_at: Utc::now(),
                records_loaded: 2,
                zones_rendered: 1,
                zones_failed: 1,
                seed: Some(1),
                duration_seconds: 0.1,
            },
            title: config.page.title.clone(),
            introduction: "Flujos <PEAO> & destinos".to_string(),
            zones: vec![
                ZoneReport {
                    zone: config.zones[3].clone(),
                    outcome: ZoneOutcome::Rendered(sample_result()),
                },
                ZoneReport {
                    zone: config.zones[2].clone(),
                    outcome: ZoneOutcome::Failed {
                        message: "negative population -1".to_string(),
                    },
                },
                ZoneReport {
                    zone: ZoneConfig::ad_hoc("Selva"),
                    outcome: ZoneOutcome::Rendered(AggregationResult::empty("Selva")),
                },
            ],
            chart: config.chart,
        }
    }

    #[test]
    fn test_sankey_figure() {
        let figure = sankey_figure(&sample_result(), "Sur", &ChartConfig::default());
        let trace = &figure["data"][0];

        assert_eq!(trace["type"], "sankey");
        assert_eq!(trace["node"]["pad"], 15);
        assert_eq!(trace["node"]["thickness"], 20);
        assert_eq!(trace["node"]["label"][0], "Macrozona Sur (Origen)");
        assert_eq!(trace["link"]["source"], json!([0, 0]));
        assert_eq!(trace["link"]["target"], json!([1, 2]));
        assert_eq!(trace["link"]["value"], json!([272469, 125987]));
        assert_eq!(trace["link"]["color"][1], "rgba(90, 160, 210, 0.7)");
        assert_eq!(figure["layout"]["width"], 900);
        assert_eq!(figure["layout"]["height"], 600);
        assert_eq!(figure["layout"]["title"]["text"], "Sur");
    }

    #[test]
    fn test_generate_html_report() {
        let html = generate_html_report(&sample_dashboard()).unwrap();

        assert!(html.contains("<h1>Análisis de migración laboral en Perú - 2017</h1>"));
        assert!(html.contains("Flujos &lt;PEAO&gt; &amp; destinos"));
        assert!(html.contains("cdn.plot.ly"));
        assert!(html.contains("id=\"sankey-0\""));
        assert!(html.contains("Arequipa (Destino)"));
        assert!(html.contains("No se pudo generar el diagrama para Macrozona Norte"));
        assert!(!html.contains("id=\"sankey-1\""));
        assert!(html.contains("id=\"sankey-2\""));
        assert!(html.contains("Sin flujos registrados para Selva"));
    }

    #[test]
    fn test_script_json_escapes_closing_tags() {
        let value = json!({ "label": "</script><b>" });
        let out = script_json(&value).unwrap();
        assert!(!out.contains("</script>"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
        assert_eq!(escape_html("Junín"), "Junín");
    }
}
