//! Report rendering: `table`, `json`, and `light` text, plus saving to a file.
//!
//! Grounded directly on the teacher's `output.rs` — `colored` for console text,
//! `serde_json::to_string_pretty` for the JSON report, `std::fs::write` for
//! saving. The teacher's `csv`/`xml` formats are dropped; this spec's `-of`
//! surface only names `table`, `json`, `light`.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use colored::{Color, Colorize};
use serde::Serialize;

use crate::error::ParamHuntError;
use crate::results::ResultTree;
use crate::surface::SurfaceTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Light,
}

impl FromStr for OutputFormat {
    type Err = ParamHuntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "light" => Ok(OutputFormat::Light),
            other => Err(ParamHuntError::UnknownOutputFormat(other.to_string())),
        }
    }
}

fn surface_color(surface: SurfaceTag) -> Color {
    match surface {
        SurfaceTag::Url => Color::Cyan,
        SurfaceTag::BodyForm => Color::Magenta,
        SurfaceTag::BodyJson => Color::Blue,
        SurfaceTag::Header => Color::Yellow,
        SurfaceTag::Cookie => Color::Green,
    }
}

/// Renders `tree` as `table`/`json`/`light` text per `format`.
pub fn render(tree: &ResultTree, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => render_table(tree),
        OutputFormat::Json => render_json(tree),
        OutputFormat::Light => render_light(tree),
    }
}

fn render_table(tree: &ResultTree) -> String {
    let mut rows: Vec<(String, String, String, String)> = tree
        .iter()
        .flat_map(|(origin, surface, hit)| {
            if hit.reasons.is_empty() {
                vec![(origin.clone(), surface.to_string(), hit.name.clone(), String::new())]
            } else {
                hit.reasons
                    .iter()
                    .map(|r| (origin.clone(), surface.to_string(), hit.name.clone(), format!("{}: {}", r.kind.as_str(), r.value)))
                    .collect()
            }
        })
        .collect();
    rows.sort();

    if rows.is_empty() {
        return "No hidden parameters found.".dimmed().to_string();
    }

    let headers = ("URL", "SURFACE", "NAME", "REASON");
    let url_w = rows.iter().map(|r| r.0.len()).chain([headers.0.len()]).max().unwrap_or(0);
    let surface_w = rows.iter().map(|r| r.1.len()).chain([headers.1.len()]).max().unwrap_or(0);
    let name_w = rows.iter().map(|r| r.2.len()).chain([headers.2.len()]).max().unwrap_or(0);

    let mut out = String::new();
    out.push_str(&format!(
        "{:url_w$}  {:surface_w$}  {:name_w$}  {}\n",
        headers.0.bold(),
        headers.1.bold(),
        headers.2.bold(),
        headers.3.bold(),
    ));
    out.push_str(&"-".repeat(url_w + surface_w + name_w + 40));
    out.push('\n');
    for (url, surface, name, reason) in rows {
        out.push_str(&format!("{url:url_w$}  {surface:surface_w$}  {name:name_w$}  {reason}\n"));
    }
    out
}

#[derive(Serialize)]
struct JsonReasonEntry {
    reason: String,
    value: String,
}

#[derive(Serialize)]
struct JsonHitEntry {
    param: String,
    reasons: Vec<JsonReasonEntry>,
}

/// Top-level JSON report shape, mirroring the teacher's `ScanReport` (a
/// timestamp alongside the actual findings).
#[derive(Serialize)]
struct JsonReport {
    generated_at: String,
    results: std::collections::HashMap<String, std::collections::HashMap<String, Vec<JsonHitEntry>>>,
}

fn render_json(tree: &ResultTree) -> String {
    use std::collections::HashMap;

    let mut by_url: HashMap<String, HashMap<String, Vec<JsonHitEntry>>> = HashMap::new();
    for (origin, surface, hit) in tree.iter() {
        by_url.entry(origin.clone()).or_default().entry(surface.to_string()).or_default().push(JsonHitEntry {
            param: hit.name.clone(),
            reasons: hit.reasons.iter().map(|r| JsonReasonEntry { reason: r.kind.as_str().to_string(), value: r.value.clone() }).collect(),
        });
    }
    let report = JsonReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        results: by_url,
    };
    serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
}

fn render_light(tree: &ResultTree) -> String {
    const WIDTH: usize = 100;
    let mut out = String::new();
    let mut origins: Vec<&String> = tree.origins().collect();
    origins.sort();

    for origin in origins {
        out.push_str(&format!("{}\n", origin.bold().underline()));
        let surfaces = tree.surfaces_for(origin).expect("origin came from tree.origins()");
        let mut tags: Vec<&SurfaceTag> = surfaces.keys().collect();
        tags.sort_by_key(|t| t.as_str());

        let mut line_len = 0usize;
        for tag in tags {
            let hits = &surfaces[tag];
            for hit in hits {
                let token = format!("{}: {};", tag, hit.name);
                if line_len + token.len() + 1 > WIDTH && line_len > 0 {
                    out.push('\n');
                    line_len = 0;
                }
                out.push_str(&token.color(surface_color(*tag)).to_string());
                out.push(' ');
                line_len += token.len() + 1;
            }
        }
        out.push_str("\n\n");
    }
    out
}

/// Persists `render`ed output to `path`, mapping I/O failure to the closed
/// error taxonomy (spec §7).
pub fn save(path: &Path, rendered: &str) -> Result<(), ParamHuntError> {
    std::fs::write(path, rendered).map_err(|source| ParamHuntError::OutputWrite { path: path.to_path_buf(), source })
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::Light => "light",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::HitRecord;
    use crate::surface::{Reason, ReasonKind};

    #[test]
    fn format_parses_known_values_only() {
        assert_eq!(OutputFormat::from_str("table").unwrap(), OutputFormat::Table);
        assert_eq!(OutputFormat::from_str("json").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("light").unwrap(), OutputFormat::Light);
        assert!(OutputFormat::from_str("xml").is_err());
    }

    #[test]
    fn table_render_contains_header_and_row() {
        let mut tree = ResultTree::new();
        tree.record(
            "https://example.com/",
            SurfaceTag::Url,
            HitRecord {
                name: "debug".to_string(),
                reasons: vec![Reason::new(ReasonKind::ParamValueReflection, "1 (0)")],
                response: None,
            },
        );
        let rendered = render_table(&tree);
        assert!(rendered.contains("URL"));
        assert!(rendered.contains("debug"));
    }

    #[test]
    fn json_render_is_valid_json() {
        let mut tree = ResultTree::new();
        tree.record(
            "https://example.com/",
            SurfaceTag::Header,
            HitRecord { name: "X-Secret".to_string(), reasons: vec![], response: None },
        );
        let rendered = render_json(&tree);
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert!(parsed.get("generated_at").is_some());
        assert!(parsed["results"].get("https://example.com/").is_some());
    }
}
