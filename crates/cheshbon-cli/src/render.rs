//! Markdown rendering for impact reports.
//!
//! The core emits structure only; the human-facing text lives here.

use cheshbon_core::prelude::*;

pub fn render_outcome(outcome: &DiffOutcome, detail: DetailLevel) -> String {
    let impact = &outcome.impact;
    let mut out = String::new();

    out.push_str("# Impact analysis\n\n");
    out.push_str(&format!(
        "- impacted: {}\n- unaffected: {}\n- events: {}\n- validation failed: {}\n",
        impact.impacted.len(),
        impact.unaffected.len(),
        outcome.events.len(),
        if impact.validation_failed { "yes" } else { "no" },
    ));

    if !outcome.cycles.is_empty() {
        out.push_str("\n## Cycles\n\n");
        for cycle in &outcome.cycles {
            out.push_str(&format!("- {cycle}\n"));
        }
    }

    if !outcome.events.is_empty() {
        out.push_str("\n## Events\n\n");
        for event in &outcome.events {
            out.push_str(&format!("- `{}`\n", event.event_id()));
        }
    }

    if !impact.impacted.is_empty() {
        out.push_str("\n## Impacted\n\n");
        for id in &impact.impacted {
            let reasons = &impact.reasons[id];
            let all: Vec<&str> = reasons.all.iter().map(|r| r.as_str()).collect();
            out.push_str(&format!("- `{id}`: {}", all.join(", ")));
            if detail == DetailLevel::Full {
                if let Some(path) = impact.paths.get(id) {
                    let hops: Vec<&str> = path.iter().map(|n| n.as_str()).collect();
                    let alt = impact.alt_path_counts.get(id).copied().unwrap_or(0);
                    out.push_str(&format!("\n  - path: {} (alt paths: {alt})", hops.join(" -> ")));
                }
            }
            out.push('\n');
        }
    }

    out
}

pub fn render_validation(report: &ValidationReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "# Validation: {}\n",
        if report.ok { "ok" } else { "failed" }
    ));
    if !report.findings.is_empty() {
        out.push('\n');
        for f in &report.findings {
            let level = match f.level {
                FindingLevel::Error => "error",
                FindingLevel::Warning => "warning",
            };
            out.push_str(&format!("- {level} `{}`: {}\n", f.code, f.message));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_impacted_with_paths() {
        let mk = |params: serde_json::Value| MappingSpec {
            schema_version: "0.7".to_string(),
            sources: vec![],
            derived: vec![DerivedVariable {
                id: NodeId::parse("d:X").unwrap(),
                name: "X".to_string(),
                ty: "string".to_string(),
                inputs: vec![],
                transform_ref: None,
                params,
            }],
            constraints: vec![],
        };
        let v1 = mk(json!({}));
        let v2 = mk(json!({"v": 2}));
        let mut request = DiffRequest::new(&v1, &v2);
        request.detail = DetailLevel::Full;
        let outcome = diff(&request).unwrap();

        let text = render_outcome(&outcome, DetailLevel::Full);
        assert!(text.contains("## Impacted"));
        assert!(text.contains("`d:X`: DIRECT_CHANGE"));
        assert!(text.contains("path: d:X"));
    }
}
