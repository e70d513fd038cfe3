//! Analysis orchestration for cheshbon.
//!
//! The core has one control flow: canonicalize and validate the inputs,
//! diff the two versions, build the dependency graph, evaluate bindings,
//! propagate impact, and optionally assemble a witnessed report. These
//! entry points are used by:
//! - CLI (`cheshbon diff ...`, `cheshbon verify ...`)
//! - CI jobs gating promotion on impact
//!
//! The core crate performs no filesystem, network, clock, or environment
//! access. Callers load artifacts and pass in-memory structures; all
//! outputs are deterministic functions of the inputs.

mod diff;
mod validate;
mod verify;

pub use diff::{build_report_for, diff, DetailLevel, DiffOutcome, DiffRequest};
pub use validate::{validate, Finding, FindingLevel, ValidateRequest, ValidationReport};
pub use verify::{verify_report, VerifyOutcome};
