use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::annotate::LocationRecord;

/// Carto SQL-over-HTTP endpoint; the table query is appended with spaces
/// percent-encoded.
pub const CARTO_ROOT: &str = "https://gravistar.carto.com/api/v2/sql?format=GeoJSON&q=";

// ── Wire types ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
pub struct Feature {
    pub properties: serde_json::Value,
}

/// Fields consumed from the narratives metadata table.
#[derive(Debug, Deserialize)]
pub struct MetadataProps {
    #[serde(default)]
    pub narrative_id: Option<i64>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub img: Option<String>,
}

/// Fields consumed from the routes table.
#[derive(Debug, Deserialize)]
pub struct RouteProps {
    #[serde(default)]
    pub narrative_id: Option<i64>,
    #[serde(default)]
    pub cartodb_id: Option<i64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub placename_prior: Option<String>,
    #[serde(default)]
    pub placename_expressed: Option<String>,
    #[serde(default)]
    pub placename_post: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

pub struct CartoClient {
    http: reqwest::blocking::Client,
    root: String,
}

/// Build the full query URL for `SELECT * FROM <table>`.
pub fn table_query_url(root: &str, table: &str) -> String {
    let query = format!("SELECT * FROM {table}");
    let encoded: Vec<&str> = query.split_whitespace().collect();
    format!("{root}{}", encoded.join("%20"))
}

impl CartoClient {
    pub fn new() -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .build()
            .context("cannot build HTTP client")?;
        Ok(CartoClient {
            http,
            root: CARTO_ROOT.to_string(),
        })
    }

    /// Fetch an entire table as a GeoJSON feature collection. Any
    /// network or decode failure here is fatal to the run.
    pub fn fetch_table(&self, table: &str) -> Result<FeatureCollection> {
        let url = table_query_url(&self.root, table);
        let resp = self
            .http
            .get(&url)
            .send()
            .with_context(|| format!("cannot reach Carto for table {table}"))?;
        let collection = resp
            .error_for_status()
            .with_context(|| format!("Carto query failed for table {table}"))?
            .json()
            .with_context(|| format!("cannot decode Carto response for table {table}"))?;
        Ok(collection)
    }

    /// Fetch raw bytes from an arbitrary URL (cover images).
    pub fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self
            .http
            .get(url)
            .send()
            .with_context(|| format!("cannot fetch {url}"))?;
        let bytes = resp
            .error_for_status()
            .with_context(|| format!("request failed for {url}"))?
            .bytes()
            .with_context(|| format!("cannot read body of {url}"))?;
        Ok(bytes.to_vec())
    }
}

// ── Document index ───────────────────────────────────────────────────

/// Build `filename -> location records` from the two fetched tables.
///
/// Route rows are dropped when a coordinate is missing, when both
/// placename context fields are missing, or when no filename is known
/// for their narrative; none of these are fatal.
pub fn build_index(
    metadata: &FeatureCollection,
    routes: &FeatureCollection,
) -> HashMap<String, Vec<LocationRecord>> {
    let mut narrative_to_filename: HashMap<i64, String> = HashMap::new();
    for feature in &metadata.features {
        let props: MetadataProps = match serde_json::from_value(feature.properties.clone()) {
            Ok(p) => p,
            Err(_) => continue,
        };
        if let (Some(id), Some(filename)) = (props.narrative_id, props.filename) {
            narrative_to_filename.insert(id, filename);
        }
    }

    let mut index: HashMap<String, Vec<LocationRecord>> = HashMap::new();
    for feature in &routes.features {
        let props: RouteProps = match serde_json::from_value(feature.properties.clone()) {
            Ok(p) => p,
            Err(_) => continue,
        };
        if props.latitude.is_none() || props.longitude.is_none() {
            continue;
        }
        let prior = props.placename_prior.as_deref().unwrap_or("");
        let post = props.placename_post.as_deref().unwrap_or("");
        if prior.is_empty() && post.is_empty() {
            continue;
        }
        let expressed = props.placename_expressed.as_deref().unwrap_or("");

        let record_id = match props.cartodb_id {
            Some(id) => id,
            None => {
                eprintln!("  route record without cartodb_id; skipping");
                continue;
            }
        };
        let narrative_id = match props.narrative_id {
            Some(id) => id,
            None => {
                eprintln!("  route record {record_id} has no narrative_id; skipping");
                continue;
            }
        };
        let filename = match narrative_to_filename.get(&narrative_id) {
            Some(f) => f,
            None => {
                eprintln!(
                    "  no filename for narrative {narrative_id}; skipping record {record_id}"
                );
                continue;
            }
        };

        // Untrimmed on purpose: the direct substring match downstream
        // sees exactly what the table concatenation produces.
        let passage = format!("{prior} {expressed} {post}");
        index
            .entry(filename.clone())
            .or_default()
            .push(LocationRecord { record_id, passage });
    }

    index
}
