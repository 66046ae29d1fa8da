use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use relish_core::{
    manual::{BoundaryCategory, ContentItem, Manual, ManualContent},
    types::{ContentKind, ManualType, RespondentType},
};
use std::path::Path;

#[derive(Subcommand)]
pub enum ManualSubcommand {
    /// Create a new manual
    Create {
        id: String,
        /// child, adult, marriage, household, or person
        #[arg(long = "type", value_name = "TYPE")]
        manual_type: String,
        /// Manual title
        #[arg(long)]
        title: String,
        /// Owning family (default: family.id from config)
        #[arg(long)]
        family: Option<String>,
    },
    /// Add a content item
    Add {
        id: String,
        /// Content kind, e.g. triggers, values, warning-signs
        kind: String,
        text: String,
        /// Who contributed it: parent, partner, self, child, sibling, caregiver
        #[arg(long)]
        by: Option<String>,
        /// Trigger severity, 1 (mild) to 5 (severe)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        severity: Option<u8>,
        /// Mark a strategy as effective
        #[arg(long)]
        effective: bool,
        /// Boundary category: immovable or negotiable
        #[arg(long)]
        boundary: Option<String>,
    },
    /// Remove a content item by id
    Remove { id: String, item: String },
    /// Show a manual's content
    Show { id: String },
    /// List all manuals
    List,
}

pub fn run(root: &Path, subcmd: ManualSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ManualSubcommand::Create {
            id,
            manual_type,
            title,
            family,
        } => create(root, &id, &manual_type, &title, family.as_deref(), json),
        ManualSubcommand::Add {
            id,
            kind,
            text,
            by,
            severity,
            effective,
            boundary,
        } => {
            let mut item = ContentItem::new(text);
            if let Some(by) = by {
                item = item.by(by.parse::<RespondentType>()?);
            }
            if let Some(s) = severity {
                item = item.with_severity(s);
            }
            if effective {
                item = item.marked_effective();
            }
            if let Some(b) = boundary {
                item = item.with_boundary(b.parse::<BoundaryCategory>()?);
            }
            add(root, &id, &kind, item, json)
        }
        ManualSubcommand::Remove { id, item } => remove(root, &id, &item, json),
        ManualSubcommand::Show { id } => show(root, &id, json),
        ManualSubcommand::List => list(root, json),
    }
}

// ---------------------------------------------------------------------------
// create
// ---------------------------------------------------------------------------

fn create(
    root: &Path,
    id: &str,
    manual_type: &str,
    title: &str,
    family: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let manual_type: ManualType = manual_type.parse()?;
    let (config, store) = super::open(root)?;
    let family = family.unwrap_or(&config.family.id);

    let manual = Manual::create(&store, id, family, manual_type, title)
        .with_context(|| format!("failed to create manual '{id}'"))?;

    if json {
        print_json(&manual)?;
    } else {
        println!("Created {} manual '{}': {}", manual_type, manual.manual_id, manual.title);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// add / remove
// ---------------------------------------------------------------------------

fn add(root: &Path, id: &str, kind: &str, item: ContentItem, json: bool) -> anyhow::Result<()> {
    let kind: ContentKind = kind.parse()?;
    let (_, store) = super::open(root)?;
    let mut manual = Manual::load(&store, id).with_context(|| format!("manual '{id}' not found"))?;

    let added = manual.add_item(kind, item)?.clone();
    manual.save(&store).context("failed to save manual")?;

    if json {
        print_json(&serde_json::json!({
            "manual": id,
            "kind": kind,
            "item": added,
        }))?;
    } else {
        println!("Added {kind} item [{}] to '{id}': {}", added.id, added.text);
    }
    Ok(())
}

fn remove(root: &Path, id: &str, item_id: &str, json: bool) -> anyhow::Result<()> {
    let (_, store) = super::open(root)?;
    let mut manual = Manual::load(&store, id).with_context(|| format!("manual '{id}' not found"))?;

    let (kind, item) = manual.remove_item(item_id)?;
    manual.save(&store).context("failed to save manual")?;

    if json {
        print_json(&serde_json::json!({
            "manual": id,
            "kind": kind,
            "removed": item,
        }))?;
    } else {
        println!("Removed {kind} item [{}] from '{id}'", item.id);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// show / list
// ---------------------------------------------------------------------------

fn describe(item: &ContentItem) -> String {
    let mut tags = Vec::new();
    if let Some(by) = item.contributed_by {
        tags.push(format!("by {by}"));
    }
    if let Some(s) = item.severity {
        tags.push(format!("severity {s}"));
    }
    if item.effective {
        tags.push("effective".to_string());
    }
    if let Some(b) = item.boundary {
        tags.push(b.to_string());
    }
    if tags.is_empty() {
        item.text.clone()
    } else {
        format!("{} ({})", item.text, tags.join(", "))
    }
}

fn show(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let (_, store) = super::open(root)?;
    let manual = Manual::load(&store, id).with_context(|| format!("manual '{id}' not found"))?;

    if json {
        return print_json(&manual);
    }

    println!("Manual:  {}", manual.manual_id);
    println!("Title:   {}", manual.title);
    println!("Type:    {}", manual.manual_type());
    println!("Family:  {}", manual.family_id);
    println!("Items:   {}", manual.total_items());
    for &kind in ManualContent::kinds_for(manual.manual_type()) {
        let items = manual.items(kind);
        if items.is_empty() {
            continue;
        }
        println!("\n{kind}:");
        for item in items {
            println!("  [{}] {}", item.id, describe(item));
        }
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let (_, store) = super::open(root)?;
    let manuals = Manual::list(&store).context("failed to list manuals")?;

    if json {
        let summary: Vec<_> = manuals
            .iter()
            .map(|m| {
                serde_json::json!({
                    "manual_id": m.manual_id,
                    "type": m.manual_type(),
                    "title": m.title,
                    "items": m.total_items(),
                })
            })
            .collect();
        return print_json(&summary);
    }

    if manuals.is_empty() {
        println!("No manuals. Run: relish manual create <id> --type child --title <name>");
        return Ok(());
    }

    let rows = manuals
        .iter()
        .map(|m| {
            vec![
                m.manual_id.clone(),
                m.manual_type().to_string(),
                m.title.clone(),
                m.total_items().to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "TYPE", "TITLE", "ITEMS"], rows);
    Ok(())
}
