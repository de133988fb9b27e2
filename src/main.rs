mod annotate;
mod carto;
mod config;
mod matcher;
mod normalize;
mod pipeline;
mod thumbs;
mod tree;

use std::path::{Path, PathBuf};
use std::process::exit;

use clap::{Parser, Subcommand};
use walkdir::WalkDir;

use annotate::Outcome;
use carto::CartoClient;

#[derive(Parser)]
#[command(
    name = "narrative_annotate",
    about = "Travel narrative converter: TEI XML to map-annotated HTML"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Convert the XML corpus to annotated HTML pages
    Convert {
        /// Directory of TEI XML narratives
        #[arg(default_value = "assets/data/xml")]
        xml_dir: PathBuf,
        /// Output directory for the generated pages
        #[arg(long, default_value = "_texts")]
        out_dir: PathBuf,
        /// Jekyll site config naming the Carto tables
        #[arg(long, default_value = "_config.yml")]
        config: PathBuf,
    },
    /// Fetch narrative cover thumbnails from the metadata table
    Thumbs {
        /// Output directory for cover images
        #[arg(default_value = "assets/images/narrative_covers")]
        out_dir: PathBuf,
        /// Jekyll site config naming the Carto tables
        #[arg(long, default_value = "_config.yml")]
        config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Convert {
            xml_dir,
            out_dir,
            config,
        }) => run_convert(&xml_dir, &out_dir, &config),
        Some(Command::Thumbs { out_dir, config }) => run_thumbs(&out_dir, &config),
        // Default: convert with the standard site layout
        None => run_convert(
            Path::new("assets/data/xml"),
            Path::new("_texts"),
            Path::new("_config.yml"),
        ),
    }
}

/// Abort the run on a fatal error: config, network, or input directory.
fn fatal<T>(result: anyhow::Result<T>) -> T {
    result.unwrap_or_else(|e| {
        eprintln!("Error: {e:#}");
        exit(1);
    })
}

// ═══════════════════════════════════════════════════════════════════════
//  CONVERT: XML corpus → annotated HTML pages
// ═══════════════════════════════════════════════════════════════════════

fn run_convert(xml_dir: &Path, out_dir: &Path, config_path: &Path) {
    let cfg = fatal(config::load(config_path));
    let client = fatal(CartoClient::new());

    eprintln!(
        "Fetching Carto tables: {} / {}",
        cfg.carto_metadata, cfg.carto_routes
    );
    let metadata = fatal(client.fetch_table(&cfg.carto_metadata));
    let routes = fatal(client.fetch_table(&cfg.carto_routes));
    let index = carto::build_index(&metadata, &routes);
    eprintln!(
        "Built location index: {} documents, {} records",
        index.len(),
        index.values().map(Vec::len).sum::<usize>()
    );

    if !xml_dir.is_dir() {
        eprintln!("Error: input directory {} not found", xml_dir.display());
        exit(1);
    }
    fatal(
        std::fs::create_dir_all(out_dir)
            .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", out_dir.display())),
    );

    let (mut processed, mut skipped) = (0usize, 0usize);
    let (mut direct, mut indirect, mut unresolved) = (0usize, 0usize, 0usize);

    for entry in WalkDir::new(xml_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("xml") {
            continue;
        }
        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => continue,
        };

        // Only process files for which location data is present
        let records = match index.get(filename) {
            Some(r) => r,
            None => {
                skipped += 1;
                continue;
            }
        };

        let xml = match std::fs::read_to_string(path) {
            Ok(x) => x,
            Err(e) => {
                eprintln!("  cannot read {filename}: {e}");
                continue;
            }
        };

        let converted = match pipeline::convert_document(&xml, records) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("  cannot convert {filename}: {e:#}");
                continue;
            }
        };

        for oc in &converted.outcomes {
            match &oc.outcome {
                Outcome::Direct => direct += 1,
                Outcome::Indirect { .. } => indirect += 1,
                Outcome::Skipped { reason } => {
                    unresolved += 1;
                    eprintln!(
                        "  needs hand correction: {} record {} ({})",
                        filename,
                        oc.record_id,
                        reason.as_str()
                    );
                }
            }
        }

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(filename);
        let out_path = out_dir.join(format!("{stem}.html"));
        match std::fs::write(&out_path, &converted.page) {
            Ok(()) => processed += 1,
            Err(e) => eprintln!("  cannot write {}: {e}", out_path.display()),
        }
    }

    eprintln!("\n══════════════════════════════════════════");
    eprintln!("  CONVERSION SUMMARY");
    eprintln!("══════════════════════════════════════════");
    eprintln!("  Pages written:       {processed}");
    eprintln!("  Without route data:  {skipped}");
    eprintln!("  Direct matches:      {direct}");
    eprintln!("  Fuzzy matches:       {indirect}");
    eprintln!("  Need hand fixes:     {unresolved}");
}

// ═══════════════════════════════════════════════════════════════════════
//  THUMBS: narrative cover images
// ═══════════════════════════════════════════════════════════════════════

fn run_thumbs(out_dir: &Path, config_path: &Path) {
    let cfg = fatal(config::load(config_path));
    let client = fatal(CartoClient::new());

    eprintln!("Fetching covers from table {}", cfg.carto_metadata);
    let written = fatal(thumbs::fetch_thumbnails(
        &client,
        &cfg.carto_metadata,
        out_dir,
    ));
    eprintln!("Wrote {written} covers to {}", out_dir.display());
}
