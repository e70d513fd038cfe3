use anyhow::Result;

use cheshbon_core::prelude::*;

use crate::args::VerifyTarget;
use crate::io::input;
use crate::output;
use crate::render;

pub fn run(target: VerifyTarget) -> Result<i32> {
    match target {
        VerifyTarget::Report {
            report,
            from,
            to,
            registry_from,
            registry_to,
            bindings,
            raw_schema,
        } => {
            let report: Report = input::read_artifact(&report)?;
            let from_spec: MappingSpec = input::read_artifact(&from)?;
            let to_spec: MappingSpec = input::read_artifact(&to)?;
            let registry_from: Option<TransformRegistry> =
                registry_from.map(input::read_artifact).transpose()?;
            let registry_to: Option<TransformRegistry> =
                registry_to.map(input::read_artifact).transpose()?;
            let bindings: Option<Bindings> = bindings.map(input::read_artifact).transpose()?;
            let raw_schema: Option<RawSchema> =
                raw_schema.map(input::read_artifact).transpose()?;

            let inputs = ReportInputs {
                from_spec: &from_spec,
                to_spec: &to_spec,
                registry_from: registry_from.as_ref(),
                registry_to: registry_to.as_ref(),
                bindings: bindings.as_ref(),
                raw_schema: raw_schema.as_ref(),
            };
            let outcome = verify_report(&report, &inputs)?;
            let ok = outcome == VerifyOutcome::Ok;
            output::print_human_or(
                &outcome,
                &format!("verify: {}", if ok { "OK" } else { "MISMATCH" }),
            )?;
            if !ok && !output::is_json() {
                output::eprintln_line(&format!("{outcome:?}"));
            }
            Ok(if ok { 0 } else { 2 })
        }

        VerifyTarget::Spec { file, registry } => {
            let spec: MappingSpec = input::read_artifact(&file)?;
            let registry: Option<TransformRegistry> =
                registry.map(input::read_artifact).transpose()?;
            let report = validate(&ValidateRequest {
                spec: &spec,
                registry: registry.as_ref(),
                bindings: None,
                raw_schema: None,
            })?;
            finish_validation(report)
        }

        VerifyTarget::Registry { file } => {
            let registry: TransformRegistry = input::read_artifact(&file)?;
            let report = match validate_registry(&registry) {
                Ok(()) => ValidationReport {
                    ok: true,
                    findings: vec![],
                },
                Err(e) => ValidationReport {
                    ok: false,
                    findings: vec![Finding {
                        level: FindingLevel::Error,
                        code: "registry.invalid".to_string(),
                        message: e.to_string(),
                    }],
                },
            };
            finish_validation(report)
        }

        VerifyTarget::Bindings {
            file,
            spec,
            raw_schema,
        } => {
            let bindings: Bindings = input::read_artifact(&file)?;
            let spec: MappingSpec = input::read_artifact(&spec)?;
            let raw_schema: RawSchema = input::read_artifact(&raw_schema)?;
            let report = validate(&ValidateRequest {
                spec: &spec,
                registry: None,
                bindings: Some(&bindings),
                raw_schema: Some(&raw_schema),
            })?;
            finish_validation(report)
        }
    }
}

fn finish_validation(report: ValidationReport) -> Result<i32> {
    output::print_human_or(&report, &render::render_validation(&report))?;
    Ok(if report.ok { 0 } else { 2 })
}
