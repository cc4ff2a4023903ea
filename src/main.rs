//! Verdant - deterministic music from biodiversity observation records

use anyhow::Result;
use clap::Parser;
use verdant::config;
use verdant::data::load_year_species;
use verdant::mapping::{mapping_metadata, MappingEngine};
use verdant::metrics::compute_year_metrics;
use verdant::timegrid::TimeGrid;

mod cli;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Metrics {
            config: config_path,
            input,
            output,
        } => {
            println!("Loading configuration from {:?}...", config_path);
            let cfg = config::load_config(&config_path)?;
            let rows = load_year_species(&input)?;
            println!("Loaded {} year-species rows from {:?}", rows.len(), input);

            let grid = TimeGrid::from_config(&cfg.time)?;
            let metrics = compute_year_metrics(&rows, &grid, cfg.mapping.top_k_species_pool);

            println!("\nComputed metrics for {} years:", metrics.len());
            println!(
                "  {:>6} {:>9} {:>10} {:>9} {:>11} {:>5} {:>5}",
                "year", "richness", "total_obs", "turnover", "confidence", "new", "lost"
            );
            for m in &metrics {
                println!(
                    "  {:>6} {:>9} {:>10.0} {:>9.3} {:>11.3} {:>5} {:>5}",
                    m.year,
                    m.richness,
                    m.total_obs,
                    m.turnover,
                    m.confidence,
                    m.new_species_count,
                    m.lost_species_count
                );
            }

            if let Some(path) = output {
                std::fs::write(&path, serde_json::to_string_pretty(&metrics)?)?;
                println!("\nWrote metrics to {:?}", path);
            }
        }

        Commands::Generate {
            config: config_path,
            input,
            metadata,
        } => {
            println!("Loading configuration from {:?}...", config_path);
            let cfg = config::load_config(&config_path)?;
            let rows = load_year_species(&input)?;
            println!("Loaded {} year-species rows from {:?}", rows.len(), input);

            let grid = TimeGrid::from_config(&cfg.time)?;
            let metrics = compute_year_metrics(&rows, &grid, cfg.mapping.top_k_species_pool);

            let mut engine = MappingEngine::new(&cfg)?;
            let results = engine.generate_all(&rows, &metrics)?;

            let total_notes: usize = results.values().map(|m| m.notes.len()).sum();
            let total_cc: usize = results.values().map(|m| m.cc_events.len()).sum();

            println!("\nGenerated music for {} years:", results.len());
            for (year, music) in &results {
                println!(
                    "  {}: {} notes, {} CC events, {} species voiced",
                    year,
                    music.notes.len(),
                    music.cc_events.len(),
                    music.selected_species.len()
                );
            }
            println!("\nTotals:");
            println!("  Notes: {}", total_notes);
            println!("  CC events: {}", total_cc);
            println!("  Species voiced: {}", engine.voices().len());
            println!("  Timeline: {:.1}s at {} bpm", grid.total_duration(), grid.bpm());

            if let Some(path) = metadata {
                let doc = mapping_metadata(&cfg, &results, &engine, &metrics)?;
                std::fs::write(&path, serde_json::to_string_pretty(&doc)?)?;
                println!(
                    "\nWrote mapping metadata to {:?} (content hash {})",
                    path,
                    doc["content_hash"].as_str().unwrap_or("")
                );
            }
        }

        Commands::Check {
            config: config_path,
        } => {
            println!("Checking configuration at {:?}...", config_path);

            match config::load_config(&config_path) {
                Ok(cfg) => {
                    println!("Configuration is valid!");
                    println!(
                        "  Years: {}-{} ({} bars/year at {} bpm)",
                        cfg.time.start_year, cfg.time.end_year, cfg.time.bars_per_year, cfg.time.bpm
                    );
                    println!("  Mode: {}", cfg.mapping.mode);
                    println!("  Root: {}", cfg.mapping.base_root_midi);
                    println!(
                        "  Voices: {}-{} from a pool of {}",
                        cfg.mapping.min_voices, cfg.mapping.max_voices, cfg.mapping.top_k_species_pool
                    );
                    println!("  Pad programs: {:?}", cfg.mapping.pad_programs);
                    println!(
                        "  Layers: drone={} pads={} shimmer={}",
                        cfg.mapping.layers.drone, cfg.mapping.layers.pads, cfg.mapping.layers.shimmer
                    );
                }
                Err(e) => {
                    println!("Configuration is invalid: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Init => {
            let example_config = include_str!("../verdant.example.yaml");

            let path = "verdant.yaml";
            if std::path::Path::new(path).exists() {
                println!("verdant.yaml already exists. Not overwriting.");
            } else {
                std::fs::write(path, example_config)?;
                println!("Created verdant.yaml with example configuration.");
            }
        }
    }

    Ok(())
}
