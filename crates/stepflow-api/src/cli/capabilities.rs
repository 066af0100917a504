//! `stepflow capabilities` -- the catalog listing.

use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use stepflow_core::registry::CapabilityRegistry;
use stepflow_types::capability::{CapabilityKind, CapabilitySpec};

pub fn handle_capabilities(group: Option<&str>, json: bool) -> anyhow::Result<()> {
    let registry = CapabilityRegistry::builtin();

    let mut specs: Vec<&CapabilitySpec> = registry
        .iter()
        .filter(|spec| group.map(|g| spec.group == g).unwrap_or(true))
        .collect();
    specs.sort_by(|a, b| (&a.group, &a.key).cmp(&(&b.group, &b.key)));

    if json {
        println!("{}", serde_json::to_string_pretty(&specs)?);
        return Ok(());
    }

    if specs.is_empty() {
        println!();
        println!("  No capabilities in group '{}'.", group.unwrap_or(""));
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Key").fg(Color::Cyan),
            Cell::new("Kind"),
            Cell::new("Group"),
            Cell::new("Params"),
            Cell::new("Description"),
        ]);

    for spec in &specs {
        let kind = match spec.kind {
            CapabilityKind::Trigger => "trigger",
            CapabilityKind::Action => "action",
        };
        table.add_row(vec![
            Cell::new(&spec.key),
            Cell::new(kind),
            Cell::new(&spec.group),
            Cell::new(format_params(spec)),
            Cell::new(&spec.description),
        ]);
    }

    println!();
    println!(
        "  {} capabilities ({} shown)",
        style("Available").bold(),
        specs.len()
    );
    println!();
    println!("{table}");
    println!();

    Ok(())
}

/// Comma-separated parameter list, required ones marked with `*`.
fn format_params(spec: &CapabilitySpec) -> String {
    spec.params
        .iter()
        .map(|p| {
            if p.required {
                format!("{}*", p.name)
            } else {
                p.name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
