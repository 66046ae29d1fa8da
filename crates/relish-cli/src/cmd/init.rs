use anyhow::Context;
use relish_core::{config::Config, io, manual, paths, progress};
use std::path::Path;

pub fn run(root: &Path, family: Option<&str>, name: Option<&str>) -> anyhow::Result<()> {
    let dir_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "family".to_string());

    println!("Initializing Relish in: {}", root.display());

    // 1. Record directories
    for collection in [manual::COLLECTION, progress::COLLECTION] {
        let p = paths::collection_dir(root, collection);
        io::ensure_dir(&p).with_context(|| format!("failed to create {}", p.display()))?;
    }

    // 2. config.yaml if missing
    let config_path = paths::config_path(root);
    if !config_path.exists() {
        let family_id = match family {
            Some(id) => id.to_string(),
            None => slugify(&dir_name),
        };
        paths::validate_id(&family_id)
            .with_context(|| format!("invalid family id '{family_id}'"))?;
        let family_name = name.map(str::to_string).unwrap_or(dir_name);

        let cfg = Config::new(family_id, family_name);
        cfg.save(root).context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }

    println!("\nNext: relish manual create <id> --type child --title <name>");
    Ok(())
}

/// Lowercase, hyphen-separated id derived from a directory name.
fn slugify(s: &str) -> String {
    let mut slug = String::new();
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.truncate(64);
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "family".to_string()
    } else {
        slug.to_string()
    }
}
