use kwgold_core::{Keyword, KwGoldError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    seed_keywords: Vec<SeedEntry>,
}

#[derive(Debug, Deserialize)]
struct SeedEntry {
    #[serde(default)]
    keyword: String,
}

/// Load the seed keywords for a subject from
/// `<data_dir>/<subject>.json`, in file order, capped at `max_seeds`.
pub fn load_seed_keywords(data_dir: &Path, subject: &str, max_seeds: usize) -> Result<Vec<Keyword>> {
    let path = data_dir.join(format!("{subject}.json"));
    if !path.exists() {
        return Err(KwGoldError::Store(format!(
            "seed file not found: {}",
            path.display()
        )));
    }
    let text = fs::read_to_string(&path)?;
    let file: SeedFile = serde_json::from_str(&text)?;
    let mut seeds: Vec<Keyword> = file
        .seed_keywords
        .into_iter()
        .map(|entry| Keyword::new(entry.keyword))
        .filter(|keyword| !keyword.is_empty())
        .collect();
    if seeds.len() > max_seeds {
        info!(
            "seed list for '{subject}' truncated from {} to {max_seeds}",
            seeds.len()
        );
        seeds.truncate(max_seeds);
    }
    Ok(seeds)
}

/// Subjects that have a seed file on disk (file stem per `*.json`,
/// excluding the `template` placeholder). A missing data directory is
/// just an empty list.
pub fn available_subjects(data_dir: &Path) -> Result<Vec<String>> {
    if !data_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut subjects = Vec::new();
    for entry in fs::read_dir(data_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            if !stem.is_empty() && stem != "template" {
                subjects.push(stem.to_string());
            }
        }
    }
    subjects.sort();
    Ok(subjects)
}
