//! # Reference Dataset Seeder
//!
//! Writes a reference dataset snapshot into the local store so the app can
//! search offline from first launch.
//!
//! ## Usage
//! ```bash
//! # Seed the built-in development dataset
//! cargo run -p medscan-db --bin seed
//!
//! # Import a dataset exported by the content team
//! cargo run -p medscan-db --bin seed -- --file ./reference.json
//!
//! # Specify database path
//! cargo run -p medscan-db --bin seed -- --db ./data/medscan.db
//! ```

use chrono::Utc;
use std::collections::BTreeMap;
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

use medscan_core::{Alternative, ReferenceDataset, ReferenceEntry};
use medscan_db::{keys, Database, DbConfig};

/// Development dataset: (category, [(name, [conditions])]).
const CATEGORIES: &[(&str, &[(&str, &[&str])])] = &[
    (
        "pain",
        &[
            ("Ibuprofen", &["headache", "fever", "inflammation"]),
            ("Acetaminophen", &["headache", "fever"]),
            ("Naproxen", &["arthritis", "inflammation"]),
            ("Aspirin", &["headache", "heart attack prevention"]),
        ],
    ),
    (
        "sleep",
        &[
            ("Zolpidem", &["insomnia"]),
            ("Diphenhydramine", &["insomnia", "allergy"]),
        ],
    ),
    (
        "allergy",
        &[
            ("Loratadine", &["hay fever", "hives"]),
            ("Cetirizine", &["hay fever", "hives"]),
        ],
    ),
    (
        "digestion",
        &[
            ("Omeprazole", &["heartburn", "reflux"]),
            ("Loperamide", &["diarrhea"]),
        ],
    ),
];

/// Development alternatives: (name, [targets]).
const ALTERNATIVES: &[(&str, &[&str])] = &[
    ("Turmeric", &["Ibuprofen", "Naproxen"]),
    ("Willow bark", &["Aspirin"]),
    ("Valerian root", &["Zolpidem"]),
    ("Chamomile", &["Zolpidem", "Diphenhydramine"]),
    ("Butterbur", &["Loratadine", "Cetirizine"]),
    ("Ginger", &["Omeprazole"]),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./medscan_dev.db");
    let mut file: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--file" | "-f" => {
                if i + 1 < args.len() {
                    file = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("MedScan Reference Dataset Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -f, --file <PATH>  Import dataset JSON instead of the built-in one");
                println!("  -d, --db <PATH>    Database file path (default: ./medscan_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let dataset = match &file {
        Some(path) => {
            info!(path = %path, "Importing reference dataset");
            ReferenceDataset::from_json(&std::fs::read_to_string(path)?)?
        }
        None => development_dataset(),
    };

    let db = Database::new(DbConfig::new(&db_path)).await?;

    if let Some(existing) = db
        .store()
        .get_json::<ReferenceDataset>(keys::REFERENCE_DATASET)
        .await
        .ok()
        .flatten()
    {
        info!(version = %existing.version, "Replacing existing reference dataset");
    }

    db.store().put_json(keys::REFERENCE_DATASET, &dataset).await?;

    let hits = dataset.search("ibuprofen", 20);
    info!(
        db = %db_path,
        version = %dataset.version,
        entries = dataset.entry_count(),
        alternatives = dataset.alternatives.len(),
        ibuprofen_hits = hits.len(),
        "Seed complete"
    );

    db.close().await;
    Ok(())
}

/// Builds the bundled development dataset.
fn development_dataset() -> ReferenceDataset {
    let mut categories = BTreeMap::new();

    for (category, medications) in CATEGORIES {
        let entries = medications
            .iter()
            .enumerate()
            .map(|(idx, (name, conditions))| ReferenceEntry {
                id: format!("{}-{:03}", category, idx + 1),
                name: name.to_string(),
                conditions: conditions.iter().map(|c| c.to_string()).collect(),
                description: None,
            })
            .collect();
        categories.insert(category.to_string(), entries);
    }

    let alternatives = ALTERNATIVES
        .iter()
        .map(|(name, targets)| Alternative {
            name: name.to_string(),
            targets: targets.iter().map(|t| t.to_string()).collect(),
            description: None,
        })
        .collect();

    let now = Utc::now();
    ReferenceDataset {
        categories,
        alternatives,
        version: format!("dev-{}", now.format("%Y%m%d")),
        last_updated: now,
    }
}
