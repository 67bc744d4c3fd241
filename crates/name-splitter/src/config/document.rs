//! Structured document form of [`Config`]
//!
//! Documents are parsed into a generic value first so that every section can
//! be checked for shape (and named in errors) before typed conversion.
//! Integers are read signed and converted with field-named range errors.

use super::*;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentFormat {
    Json,
    #[cfg(feature = "toml")]
    Toml,
}

impl DocumentFormat {
    fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(DocumentFormat::Json),
            #[cfg(feature = "toml")]
            "toml" => Ok(DocumentFormat::Toml),
            #[cfg(not(feature = "toml"))]
            "toml" => Err(config_error(
                "TOML support is not enabled; use a .json config file",
            )),
            _ => Err(config_error(format!(
                "Unsupported config file format: .{ext}. Use .json or .toml"
            ))),
        }
    }
}

impl Config {
    /// Load and validate a configuration document (`.json` or `.toml`).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(config_error(format!("Config not found: {}", path.display())));
        }
        let format = DocumentFormat::from_path(path)?;
        let text = std::fs::read_to_string(path)?;
        let config = Self::parse(&text, format)?;
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save the canonical document form. The format follows the extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let format = DocumentFormat::from_path(path)?;
        let document = ConfigDocument::from(self);
        let text = match format {
            DocumentFormat::Json => serde_json::to_string_pretty(&document)
                .map_err(|e| config_error(format!("Failed to serialize config: {e}")))?,
            #[cfg(feature = "toml")]
            DocumentFormat::Toml => toml::to_string_pretty(&document)
                .map_err(|e| config_error(format!("Failed to serialize config: {e}")))?,
        };
        std::fs::write(path, text)?;
        Ok(())
    }

    fn parse(text: &str, format: DocumentFormat) -> Result<Self> {
        let root: Value = match format {
            DocumentFormat::Json => serde_json::from_str(text)
                .map_err(|e| config_error(format!("Failed to parse config: {e}")))?,
            #[cfg(feature = "toml")]
            DocumentFormat::Toml => toml::from_str(text)
                .map_err(|e| config_error(format!("Failed to parse config: {e}")))?,
        };
        let root = match root {
            Value::Null => serde_json::Map::new(),
            Value::Object(map) => map,
            _ => return Err(config_error("Config root must be a mapping")),
        };

        let document = ConfigDocument {
            version: match root.get("version") {
                None | Some(Value::Null) => None,
                Some(value) => Some(value.as_i64().ok_or_else(|| {
                    config_error(format!("version must be an integer, got {value}"))
                })?),
            },
            input: section(&root, "input")?,
            grid: section(&root, "grid")?,
            merge: section(&root, "merge")?,
            output: section(&root, "output")?,
            limits: section(&root, "limits")?,
        };
        Config::try_from(document)
    }
}

fn section<T: DeserializeOwned + Default>(
    root: &serde_json::Map<String, Value>,
    label: &str,
) -> Result<T> {
    match root.get(label) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value @ Value::Object(_)) => serde_json::from_value(value.clone())
            .map_err(|e| config_error(format!("{label}: {e}"))),
        Some(_) => Err(config_error(format!("{label} must be a mapping"))),
    }
}

// =============================================================================
// Document Types
// =============================================================================

// Plain values are declared before nested tables so TOML output stays valid.

#[derive(Debug, Default, Serialize)]
struct ConfigDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<i64>,
    input: InputSection,
    grid: GridSection,
    merge: MergeSection,
    output: OutputSection,
    limits: LimitsSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct InputSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    image_path: Option<String>,
    /// Older documents named the source `psd_path`
    #[serde(skip_serializing_if = "Option::is_none")]
    psd_path: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct GridSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cols: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<GridOrder>,
    /// Legacy uniform margin, only read
    #[serde(skip_serializing_if = "Option::is_none")]
    margin_px: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    margin_top_px: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    margin_bottom_px: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    margin_left_px: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    margin_right_px: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    margin_unit: Option<Unit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gutter_px: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gutter_unit: Option<Unit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dpi: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_size_name: Option<PaperSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    orientation: Option<Orientation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_width_px: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_height_px: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_size_unit: Option<Unit>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct MergeSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    include_hidden_layers: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_rules: Option<Vec<RuleDocument>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    layer_rules: Option<Vec<RuleDocument>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct RuleDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    layer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_layer: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct OutputSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    out_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_basename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    layer_stack: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raster_ext: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    container: Option<ContainerFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    layout: Option<OutputLayout>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dpi: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_number_start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    skip_pages: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    odd_even: Option<PageParity>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct LimitsSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_dim_px: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    on_exceed: Option<OnExceed>,
}

// =============================================================================
// Document -> Config
// =============================================================================

fn non_negative(label: &str, value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| config_error(format!("{label} must be >= 0, got {value}")))
}

fn opt_u32(label: &str, value: Option<i64>, default: u32) -> Result<u32> {
    value.map_or(Ok(default), |v| non_negative(label, v))
}

fn parse_rules(label: &str, rules: Option<Vec<RuleDocument>>) -> Result<Vec<MergeRule>> {
    let mut parsed = Vec::new();
    for (index, rule) in rules.unwrap_or_default().into_iter().enumerate() {
        let output_layer = rule
            .output_layer
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| config_error(format!("{label}[{index}].output_layer is required")))?;
        let target = match (rule.group_name, rule.layer_name) {
            (Some(name), None) => RuleTarget::Group(name),
            (None, Some(name)) => RuleTarget::Layer(name),
            (None, None) => {
                return Err(config_error(format!(
                    "{label}[{index}] requires group_name or layer_name"
                )));
            }
            (Some(_), Some(_)) => {
                return Err(config_error(format!(
                    "{label}[{index}] must set only one of group_name and layer_name"
                )));
            }
        };
        parsed.push(MergeRule {
            target,
            output_layer,
        });
    }
    Ok(parsed)
}

impl TryFrom<ConfigDocument> for Config {
    type Error = SplitError;

    fn try_from(doc: ConfigDocument) -> Result<Self> {
        let g = doc.grid;
        // Directional margins win; the legacy margin only fills the gaps.
        let legacy = opt_u32("grid.margin_px", g.margin_px, 0)?;
        let grid = GridConfig {
            rows: opt_u32("grid.rows", g.rows, DEFAULT_ROWS)?,
            cols: opt_u32("grid.cols", g.cols, DEFAULT_COLS)?,
            order: g.order.unwrap_or_default(),
            margin_top_px: opt_u32("grid.margin_top_px", g.margin_top_px, legacy)?,
            margin_bottom_px: opt_u32("grid.margin_bottom_px", g.margin_bottom_px, legacy)?,
            margin_left_px: opt_u32("grid.margin_left_px", g.margin_left_px, legacy)?,
            margin_right_px: opt_u32("grid.margin_right_px", g.margin_right_px, legacy)?,
            margin_unit: g.margin_unit.unwrap_or_default(),
            gutter_px: opt_u32("grid.gutter_px", g.gutter_px, 0)?,
            gutter_unit: g.gutter_unit.unwrap_or_default(),
            dpi: opt_u32("grid.dpi", g.dpi, DEFAULT_DPI)?,
            page_size_name: g.page_size_name.unwrap_or_default(),
            orientation: g.orientation.unwrap_or_default(),
            page_width_px: opt_u32("grid.page_width_px", g.page_width_px, 0)?,
            page_height_px: opt_u32("grid.page_height_px", g.page_height_px, 0)?,
            page_size_unit: g.page_size_unit.unwrap_or_default(),
        };

        let merge = MergeConfig {
            group_rules: parse_rules("merge.group_rules", doc.merge.group_rules)?,
            layer_rules: parse_rules("merge.layer_rules", doc.merge.layer_rules)?,
            include_hidden_layers: doc.merge.include_hidden_layers.unwrap_or(false),
        };

        let o = doc.output;
        let defaults = OutputConfig::default();
        let skip_pages = o
            .skip_pages
            .unwrap_or_default()
            .into_iter()
            .map(|page| non_negative("output.skip_pages", page))
            .collect::<Result<Vec<_>>>()?;
        let output = OutputConfig {
            out_dir: o.out_dir.map(PathBuf::from).unwrap_or_default(),
            page_basename: o.page_basename.unwrap_or(defaults.page_basename),
            layer_stack: o.layer_stack.unwrap_or(defaults.layer_stack),
            raster_ext: o
                .raster_ext
                .map(|ext| ext.trim_start_matches('.').to_string())
                .unwrap_or(defaults.raster_ext),
            container: o.container.unwrap_or_default(),
            layout: o.layout.unwrap_or_default(),
            output_dpi: opt_u32("output.output_dpi", o.output_dpi, 0)?,
            page_number_start: opt_u32("output.page_number_start", o.page_number_start, 1)?,
            skip_pages,
            odd_even: o.odd_even.unwrap_or_default(),
        };

        let limits = LimitsConfig {
            max_dim_px: opt_u32("limits.max_dim_px", doc.limits.max_dim_px, DEFAULT_MAX_DIM_PX)?,
            on_exceed: doc.limits.on_exceed.unwrap_or_default(),
        };

        let image_path = doc
            .input
            .image_path
            .or(doc.input.psd_path)
            .map(PathBuf::from)
            .unwrap_or_default();

        Ok(Config {
            version: doc.version.unwrap_or(CONFIG_VERSION),
            input: InputConfig { image_path },
            grid,
            merge,
            output,
            limits,
        })
    }
}

// =============================================================================
// Config -> Document
// =============================================================================

fn rule_documents(rules: &[MergeRule]) -> Vec<RuleDocument> {
    rules
        .iter()
        .map(|rule| {
            let (group_name, layer_name) = match &rule.target {
                RuleTarget::Group(name) => (Some(name.clone()), None),
                RuleTarget::Layer(name) => (None, Some(name.clone())),
            };
            RuleDocument {
                group_name,
                layer_name,
                output_layer: Some(rule.output_layer.clone()),
            }
        })
        .collect()
}

impl From<&Config> for ConfigDocument {
    fn from(cfg: &Config) -> Self {
        let g = &cfg.grid;
        let o = &cfg.output;
        ConfigDocument {
            version: Some(cfg.version),
            input: InputSection {
                image_path: Some(cfg.input.image_path.to_string_lossy().into_owned()),
                psd_path: None,
            },
            grid: GridSection {
                rows: Some(g.rows.into()),
                cols: Some(g.cols.into()),
                order: Some(g.order),
                margin_px: None,
                margin_top_px: Some(g.margin_top_px.into()),
                margin_bottom_px: Some(g.margin_bottom_px.into()),
                margin_left_px: Some(g.margin_left_px.into()),
                margin_right_px: Some(g.margin_right_px.into()),
                margin_unit: Some(g.margin_unit),
                gutter_px: Some(g.gutter_px.into()),
                gutter_unit: Some(g.gutter_unit),
                dpi: Some(g.dpi.into()),
                page_size_name: Some(g.page_size_name),
                orientation: Some(g.orientation),
                page_width_px: Some(g.page_width_px.into()),
                page_height_px: Some(g.page_height_px.into()),
                page_size_unit: Some(g.page_size_unit),
            },
            merge: MergeSection {
                include_hidden_layers: Some(cfg.merge.include_hidden_layers),
                group_rules: Some(rule_documents(&cfg.merge.group_rules)),
                layer_rules: Some(rule_documents(&cfg.merge.layer_rules)),
            },
            output: OutputSection {
                out_dir: Some(o.out_dir.to_string_lossy().into_owned()),
                page_basename: Some(o.page_basename.clone()),
                layer_stack: Some(o.layer_stack.clone()),
                raster_ext: Some(o.raster_ext.clone()),
                container: Some(o.container),
                layout: Some(o.layout),
                output_dpi: Some(o.output_dpi.into()),
                page_number_start: Some(o.page_number_start.into()),
                skip_pages: Some(o.skip_pages.iter().map(|&p| p.into()).collect()),
                odd_even: Some(o.odd_even),
            },
            limits: LimitsSection {
                max_dim_px: Some(cfg.limits.max_dim_px.into()),
                on_exceed: Some(cfg.limits.on_exceed),
            },
        }
    }
}
