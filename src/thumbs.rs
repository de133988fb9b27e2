use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::carto::{CartoClient, MetadataProps};

/// Download every narrative cover image named in the metadata table to
/// `<out_dir>/<narrative_id>.jpg`. Rows without both an image URL and a
/// narrative id are skipped; individual download failures are logged
/// and skipped. Returns the number of covers written.
pub fn fetch_thumbnails(client: &CartoClient, table: &str, out_dir: &Path) -> Result<usize> {
    let collection = client.fetch_table(table)?;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("cannot create {}", out_dir.display()))?;

    let mut written = 0;
    for feature in &collection.features {
        let props: MetadataProps = match serde_json::from_value(feature.properties.clone()) {
            Ok(p) => p,
            Err(_) => continue,
        };
        let (Some(id), Some(img)) = (props.narrative_id, props.img.as_deref()) else {
            continue;
        };
        match client.fetch_bytes(img) {
            Ok(bytes) => {
                let path = out_dir.join(format!("{id}.jpg"));
                fs::write(&path, bytes)
                    .with_context(|| format!("cannot write {}", path.display()))?;
                written += 1;
            }
            Err(e) => eprintln!("  could not fetch cover for narrative {id}: {e:#}"),
        }
    }
    Ok(written)
}
