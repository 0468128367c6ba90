//! Command handlers
//!
//! Each command handler orchestrates the execution of a CLI command.

pub mod decide;
pub mod run;
pub mod status;

pub use decide::run_decide;
pub use run::run_governor;
pub use status::run_status;

use crate::cli::args::BackendArgs;
use crate::config::{ConfigBuilder, GeneralConfig};
use crate::device::SmiBackend;

/// Apply the shared backend flags to a config builder
fn with_backend_args(builder: ConfigBuilder, args: &BackendArgs) -> ConfigBuilder {
    builder
        .with_backend(args.backend.map(Into::into))
        .with_smi_path(args.smi_path.clone())
}

/// Build the nvidia-smi backend described by the configuration
fn smi_backend(general: &GeneralConfig) -> SmiBackend {
    SmiBackend::new(general.smi_path.clone()).with_leading_args(general.smi_args.clone())
}
