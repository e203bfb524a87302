pub mod checks;
pub mod report;
pub mod validator;

pub use checks::{ContentSelection, SymlinkInfo};
pub use report::{PreflightFailure, ValidationCategory, ValidationError};
pub use validator::{validate_before_install, PreflightConfig, PreflightOutcome};
