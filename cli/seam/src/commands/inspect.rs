//! `seam inspect`: marshal paths of a signature manifest.

use std::path::Path;

use anyhow::{Context, Result};
use seam_manifest::marshal::CallbackFailure;
use seam_manifest::signature::PlannedParam;
use seam_manifest::{Manifest, Signature};
use serde_json::{json, Value};

/// Print the call plan of every function (or of `function` only).
pub fn run(path: &Path, function: Option<&str>, as_json: bool) -> Result<()> {
    let manifest =
        Manifest::load(path).with_context(|| format!("loading manifest {}", path.display()))?;

    let mut signatures = manifest.signatures()?;
    if let Some(name) = function {
        signatures.retain(|s| s.name == name);
        if signatures.is_empty() {
            anyhow::bail!("function '{name}' is not declared in {}", path.display());
        }
    }

    if as_json {
        let functions: Vec<Value> = signatures
            .iter()
            .map(|s| plan_json(s, manifest.function(&s.name).and_then(|f| f.doc.as_deref())))
            .collect();
        let report = json!({
            "library": manifest.library.name,
            "functions": functions,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Library: {} (abi \"{}\")", manifest.library.name, manifest.library.abi);
    for signature in &signatures {
        let plan = signature.plan();
        println!();
        println!("{signature}");
        if let Some(doc) = manifest.function(&signature.name).and_then(|f| f.doc.as_deref()) {
            println!("  // {doc}");
        }
        for (param, planned) in signature.params.iter().zip(&plan.params) {
            println!(
                "  {:<12} {:<28} {}",
                param.name,
                param.kind.to_string(),
                describe(planned)
            );
        }
        println!(
            "  {:<12} {:<28} {}{}",
            "->",
            signature.returns.to_string(),
            plan.returns,
            if plan.fallible { " (fallible)" } else { "" }
        );
    }
    Ok(())
}

fn describe(planned: &PlannedParam) -> String {
    let mut text = planned.path.to_string();
    if planned.transfers_release {
        text.push_str(", receiver releases");
    }
    match planned.callback {
        Some(CallbackFailure::ObservedAsErr) => text.push_str(", failure observed as Err"),
        Some(CallbackFailure::Unobservable) => text.push_str(", failure follows policy"),
        None => {}
    }
    text
}

fn plan_json(signature: &Signature, doc: Option<&str>) -> Value {
    let plan = signature.plan();
    let params: Vec<Value> = signature
        .params
        .iter()
        .zip(&plan.params)
        .map(|(param, planned)| {
            json!({
                "name": param.name,
                "kind": param.kind.to_string(),
                "path": planned.path.name(),
                "transfers_release": planned.transfers_release,
                "checked_callback": planned.callback.map(|c| c == CallbackFailure::ObservedAsErr),
            })
        })
        .collect();
    json!({
        "name": signature.name,
        "doc": doc,
        "params": params,
        "returns": {
            "kind": signature.returns.to_string(),
            "path": plan.returns.name(),
            "fallible": plan.fallible,
        },
    })
}
