use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[command(name = "cheshbon", version, about = "Cheshbon CLI")]
pub struct Cli {
    /// Emit JSON output on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Diff two mapping-spec versions and report structural impact.
    ///
    /// Exit codes: 0 no impact, 1 impact found, 2 validation failed.
    Diff {
        /// Spec artifact for the old version (JSON file).
        from: String,

        /// Spec artifact for the new version (JSON file).
        to: String,

        /// Transform registry for the old version.
        #[arg(long)]
        registry_from: Option<String>,

        /// Transform registry for the new version.
        #[arg(long)]
        registry_to: Option<String>,

        /// Binding layer (raw column name -> source id).
        #[arg(long)]
        bindings: Option<String>,

        /// Raw upstream schema, required alongside --bindings.
        #[arg(long)]
        raw_schema: Option<String>,

        /// Amount of detail: core|full|all-details.
        #[arg(long, value_enum, default_value_t = DetailArg::Core)]
        detail: DetailArg,

        /// Write an all-details report artifact to this path.
        #[arg(long)]
        report_out: Option<String>,
    },

    /// Re-derive digests and witnesses, or validate a single artifact.
    Verify {
        #[command(subcommand)]
        target: VerifyTarget,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum VerifyTarget {
    /// Verify an all-details report against its input artifacts.
    Report {
        #[arg(long)]
        report: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        registry_from: Option<String>,
        #[arg(long)]
        registry_to: Option<String>,
        #[arg(long)]
        bindings: Option<String>,
        #[arg(long)]
        raw_schema: Option<String>,
    },

    /// Structurally validate a spec artifact.
    Spec {
        file: String,
        #[arg(long)]
        registry: Option<String>,
    },

    /// Structurally validate a registry artifact.
    Registry { file: String },

    /// Validate a binding layer against a spec and raw schema.
    Bindings {
        file: String,
        #[arg(long)]
        spec: String,
        #[arg(long)]
        raw_schema: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailArg {
    Core,
    Full,
    #[value(name = "all-details")]
    AllDetails,
}
