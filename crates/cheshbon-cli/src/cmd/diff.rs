use std::io::Write;

use anyhow::{bail, Result};
use serde::Serialize;
use termcolor::{Color, ColorSpec, WriteColor};

use cheshbon_core::prelude::*;

use crate::args::DetailArg;
use crate::io::input;
use crate::output;
use crate::render;

#[derive(Debug, Serialize)]
struct DiffOut<'a> {
    impacted: &'a [NodeId],
    unaffected: &'a [NodeId],
    validation_failed: bool,
    events: &'a [ChangeEvent],
    reasons: &'a std::collections::BTreeMap<NodeId, NodeReasons>,
    #[serde(skip_serializing_if = "Option::is_none")]
    paths: Option<&'a std::collections::BTreeMap<NodeId, Vec<NodeId>>>,
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    from: &str,
    to: &str,
    registry_from: Option<&str>,
    registry_to: Option<&str>,
    bindings: Option<&str>,
    raw_schema: Option<&str>,
    detail: DetailArg,
    report_out: Option<&str>,
) -> Result<i32> {
    if bindings.is_some() != raw_schema.is_some() {
        bail!("--bindings and --raw-schema must be supplied together");
    }

    let from_spec: MappingSpec = input::read_artifact(from)?;
    let to_spec: MappingSpec = input::read_artifact(to)?;
    let registry_from: Option<TransformRegistry> =
        registry_from.map(input::read_artifact).transpose()?;
    let registry_to: Option<TransformRegistry> =
        registry_to.map(input::read_artifact).transpose()?;
    let bindings: Option<Bindings> = bindings.map(input::read_artifact).transpose()?;
    let raw_schema: Option<RawSchema> = raw_schema.map(input::read_artifact).transpose()?;

    let request = DiffRequest {
        from_spec: &from_spec,
        to_spec: &to_spec,
        registry_from: registry_from.as_ref(),
        registry_to: registry_to.as_ref(),
        bindings: bindings.as_ref(),
        raw_schema: raw_schema.as_ref(),
        detail: match detail {
            DetailArg::Core => DetailLevel::Core,
            DetailArg::Full | DetailArg::AllDetails => DetailLevel::Full,
        },
    };

    let outcome = diff(&request)?;

    let report = if detail == DetailArg::AllDetails || report_out.is_some() {
        Some(build_report_for(&request, ReportMode::AllDetails)?)
    } else {
        None
    };
    if let (Some(path), Some(report)) = (report_out, report.as_ref()) {
        input::write_json_file(path, report)?;
        output::eprintln_line(&format!("report written to {path}"));
    }

    if output::is_json() {
        match (detail, report.as_ref()) {
            (DetailArg::AllDetails, Some(report)) => output::print_json(report)?,
            _ => output::print_json(&DiffOut {
                impacted: &outcome.impact.impacted,
                unaffected: &outcome.impact.unaffected,
                validation_failed: outcome.impact.validation_failed,
                events: &outcome.events,
                reasons: &outcome.impact.reasons,
                paths: (request.detail == DetailLevel::Full).then_some(&outcome.impact.paths),
            })?,
        }
    } else {
        print_verdict(&outcome)?;
        print!("{}", render::render_outcome(&outcome, request.detail));
    }

    Ok(outcome.exit_code())
}

fn print_verdict(outcome: &DiffOutcome) -> Result<()> {
    let mut stdout = output::stdout();
    let (color, verdict) = if outcome.impact.validation_failed {
        (Color::Red, "validation failed")
    } else if outcome.impact.impacted.is_empty() {
        (Color::Green, "no impact")
    } else {
        (Color::Yellow, "impact found")
    };
    stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(stdout, "{verdict}")?;
    stdout.reset()?;
    writeln!(stdout)?;
    Ok(())
}
