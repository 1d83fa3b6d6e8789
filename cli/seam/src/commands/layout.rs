//! `seam layout`: C layout of a manifest struct.

use std::path::Path;

use anyhow::{Context, Result};
use seam_manifest::{Manifest, StructLayout};
use serde_json::json;

/// Print offsets, sizes and padding of struct `name`.
pub fn run(path: &Path, name: &str, as_json: bool) -> Result<()> {
    let manifest =
        Manifest::load(path).with_context(|| format!("loading manifest {}", path.display()))?;
    let layout = manifest
        .struct_layout(name)
        .with_context(|| format!("laying out '{name}'"))?;
    let kinds: Vec<&str> = manifest
        .structs
        .iter()
        .find(|s| s.name == name)
        .map(|s| s.fields.iter().map(|f| f.kind.as_str()).collect())
        .unwrap_or_default();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&layout_json(&layout, &kinds))?);
        return Ok(());
    }

    println!(
        "struct {} (size {}, align {}, padding {})",
        layout.name,
        layout.size.size_bytes,
        layout.size.alignment_bytes,
        layout.padding_bytes()
    );
    println!("  {:>6}  {:>4}  {:>5}  {:<12} kind", "offset", "size", "align", "field");
    for (i, field) in layout.fields.iter().enumerate() {
        if field.padding_before > 0 {
            println!("  {:>6}  {:>4}  {:>5}  <padding>", field.offset - field.padding_before, field.padding_before, "");
        }
        println!(
            "  {:>6}  {:>4}  {:>5}  {:<12} {}",
            field.offset,
            field.size.size_bytes,
            field.size.alignment_bytes,
            field.name,
            kinds.get(i).copied().unwrap_or("?")
        );
    }
    if layout.trailing_padding > 0 {
        println!(
            "  {:>6}  {:>4}  {:>5}  <padding>",
            layout.size.size_bytes - layout.trailing_padding,
            layout.trailing_padding,
            ""
        );
    }
    Ok(())
}

fn layout_json(layout: &StructLayout, kinds: &[&str]) -> serde_json::Value {
    let fields: Vec<_> = layout
        .fields
        .iter()
        .enumerate()
        .map(|(i, f)| {
            json!({
                "name": f.name,
                "kind": kinds.get(i),
                "offset": f.offset,
                "size": f.size.size_bytes,
                "align": f.size.alignment_bytes,
                "padding_before": f.padding_before,
            })
        })
        .collect();
    json!({
        "name": layout.name,
        "size": layout.size.size_bytes,
        "align": layout.size.alignment_bytes,
        "trailing_padding": layout.trailing_padding,
        "fields": fields,
    })
}
