//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.migraflow.toml` files.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = ".migraflow.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input file settings.
    #[serde(default)]
    pub data: DataConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Chart presentation constants.
    #[serde(default)]
    pub chart: ChartConfig,

    /// Page text.
    #[serde(default)]
    pub page: PageConfig,

    /// Zones to render, in page order.
    #[serde(default = "default_zones")]
    pub zones: Vec<ZoneConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            data: DataConfig::default(),
            aggregation: AggregationConfig::default(),
            chart: ChartConfig::default(),
            page: PageConfig::default(),
            zones: default_zones(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

fn default_output() -> String {
    "migraflow_report.html".to_string()
}

/// Input table settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Path to the flow CSV.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,

    /// Field delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Column holding the origin macro-zone.
    #[serde(default = "default_origin_column")]
    pub origin_column: String,

    /// Column holding the destination department.
    #[serde(default = "default_destination_column")]
    pub destination_column: String,

    /// Column holding the employed population count.
    #[serde(default = "default_population_column")]
    pub population_column: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            input: None,
            delimiter: default_delimiter(),
            origin_column: default_origin_column(),
            destination_column: default_destination_column(),
            population_column: default_population_column(),
        }
    }
}

fn default_delimiter() -> char {
    ';'
}

fn default_origin_column() -> String {
    "macrozona_origen".to_string()
}

fn default_destination_column() -> String {
    "depart_destino".to_string()
}

fn default_population_column() -> String {
    "pob_c".to_string()
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Number of destinations kept per zone.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Seed for link colors. Unseeded runs draw from OS entropy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Fixed RGB link color; overrides random colors when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_color: Option<[u8; 3]>,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            seed: None,
            link_color: None,
        }
    }
}

fn default_top_n() -> usize {
    crate::analysis::DEFAULT_TOP_N
}

/// Presentation constants for the Sankey charts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_pad")]
    pub pad: u32,

    #[serde(default = "default_thickness")]
    pub thickness: u32,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_font_size")]
    pub font_size: u32,

    /// Fill color for every node.
    #[serde(default = "default_node_color")]
    pub node_color: String,

    /// Node outline color.
    #[serde(default = "default_line_color")]
    pub line_color: String,

    #[serde(default = "default_line_width")]
    pub line_width: f64,

    /// Script URL for Plotly.js in the HTML report.
    #[serde(default = "default_plotly_url")]
    pub plotly_url: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            pad: default_pad(),
            thickness: default_thickness(),
            width: default_width(),
            height: default_height(),
            font_size: default_font_size(),
            node_color: default_node_color(),
            line_color: default_line_color(),
            line_width: default_line_width(),
            plotly_url: default_plotly_url(),
        }
    }
}

fn default_pad() -> u32 {
    15
}

fn default_thickness() -> u32 {
    20
}

fn default_width() -> u32 {
    900
}

fn default_height() -> u32 {
    600
}

fn default_font_size() -> u32 {
    12
}

fn default_node_color() -> String {
    "rgba(169, 169, 169, 0.7)".to_string()
}

fn default_line_color() -> String {
    "black".to_string()
}

fn default_line_width() -> f64 {
    0.1
}

fn default_plotly_url() -> String {
    "https://cdn.plot.ly/plotly-2.35.2.min.js".to_string()
}

/// Page-level text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_introduction")]
    pub introduction: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            introduction: default_introduction(),
        }
    }
}

fn default_title() -> String {
    "Análisis de migración laboral en Perú - 2017".to_string()
}

fn default_introduction() -> String {
    "En base a los datos del Censo de Población y Vivienda del año 2017 (INEI), se han \
     identificado patrones de desplazamiento de la población económicamente activa ocupada \
     (PEAO) entre las cuatro macrozonas del Perú y los 25 departamentos del país."
        .to_string()
}

/// One macro-zone section of the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Exact value of the origin column for this zone.
    pub name: String,

    /// Section heading.
    #[serde(default)]
    pub heading: String,

    /// Chart title.
    #[serde(default)]
    pub title: String,

    /// Narrative bullet points shown above the chart.
    #[serde(default)]
    pub highlights: Vec<String>,
}

impl ZoneConfig {
    /// A zone with generated heading and title and no narrative.
    pub fn ad_hoc(name: &str) -> Self {
        Self {
            name: name.to_string(),
            heading: format!("{}:", name),
            title: format!("Diagrama de Sankey: {}", name),
            highlights: Vec::new(),
        }
    }

    /// Heading to display, falling back to the zone name.
    pub fn display_heading(&self) -> &str {
        if self.heading.is_empty() {
            &self.name
        } else {
            &self.heading
        }
    }

    /// Chart title to display, falling back to the zone name.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.name
        } else {
            &self.title
        }
    }
}

fn zone(name: &str, heading: &str, title: &str, highlights: &[&str]) -> ZoneConfig {
    ZoneConfig {
        name: name.to_string(),
        heading: heading.to_string(),
        title: title.to_string(),
        highlights: highlights.iter().map(|h| h.to_string()).collect(),
    }
}

fn default_zones() -> Vec<ZoneConfig> {
    vec![
        zone(
            "Lima - Callao",
            "Macrozona Lima y Callao:",
            "Diagrama de Sankey: Lima y Callao",
            &[
                "Es la principal fuente de trabajadores a nivel nacional, enviando 2,434,325 personas.",
                "Representa un alto porcentaje de la migración laboral entre las macrozonas.",
                "Contribuye significativamente al desarrollo económico en regiones específicas.",
                "Se observa una mayor concentración hacia Lima y Callao.",
            ],
        ),
        zone(
            "Macrozona Centro",
            "Macrozona Centro:",
            "Diagrama de Sankey: Macrozona Centro",
            &[
                "Representa un flujo de 274,614 personas empleadas.",
                "Tiene una alta contribución hacia Junín (98,230) y Huancavelica (37,795), lo que \
                 subraya una dinámica interna significativa dentro de la región central.",
                "Otros destinos destacados son Pasco (14,115) y Lima-Callao (5,979). La relación \
                 con Lima se explica por la centralidad económica de la capital.",
            ],
        ),
        zone(
            "Macrozona Norte",
            "Macrozona Norte:",
            "Diagrama de Sankey: Macrozona Norte",
            &[
                "Genera 548,265 trabajadores, siendo un aporte importante hacia regiones del norte \
                 como La Libertad (156,141), Lambayeque (97,074) y Piura (119,771).",
                "Aunque el flujo hacia Lima-Callao es menor en comparación con otras macrozonas \
                 (21,496), sigue siendo significativo dada la atracción laboral de la capital.",
            ],
        ),
        zone(
            "Macrozona Sur",
            "Macrozona Sur:",
            "Diagrama de Sankey: Macrozona Sur",
            &[
                "Con 732,470 trabajadores, muestra una importante contribución regional e \
                 interregional.",
                "Arequipa (272,469) absorbe el mayor flujo, mostrando su relevancia económica en \
                 la región sur.",
                "Cusco (125,987) y Puno (57,312) reflejan la interacción dentro de la región sur.",
                "Aunque menos destacado, también hay un flujo hacia Lima-Callao (26,048), lo que \
                 evidencia la conexión con la capital.",
            ],
        ),
    ]
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref input) = args.input {
            self.data.input = Some(input.display().to_string());
        }
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(delimiter) = args.delimiter {
            self.data.delimiter = delimiter;
        }
        if let Some(top) = args.top {
            self.aggregation.top_n = top;
        }
        if let Some(seed) = args.seed {
            self.aggregation.seed = Some(seed);
        }

        if !args.zones.is_empty() {
            self.zones = self.select_zones(&args.zones);
        }
    }

    /// Check values the file can set but the CLI validates on its own.
    ///
    /// Call after [`Config::merge_with_args`] so overrides are checked too.
    pub fn validate(&self) -> Result<()> {
        if self.aggregation.top_n == 0 {
            bail!("aggregation.top_n must be at least 1");
        }
        if !self.data.delimiter.is_ascii() {
            bail!(
                "data.delimiter '{}' must be a single ASCII character",
                self.data.delimiter
            );
        }
        if self.zones.is_empty() {
            bail!("no zones configured");
        }
        Ok(())
    }

    /// Resolve zone names against the configured zones.
    ///
    /// Known names keep their configured text; unknown names become
    /// ad-hoc zones so any origin value in the data can be charted.
    pub fn select_zones(&self, names: &[String]) -> Vec<ZoneConfig> {
        names
            .iter()
            .map(|name| {
                let name = name.trim();
                self.zones
                    .iter()
                    .find(|z| z.name == name)
                    .cloned()
                    .unwrap_or_else(|| ZoneConfig::ad_hoc(name))
            })
            .collect()
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
