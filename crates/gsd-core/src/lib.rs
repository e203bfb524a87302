pub mod backup;
pub mod effects;
pub mod error;
pub mod io;
pub mod lock;
pub mod manifest;
pub mod migration;
pub mod paths;
pub mod platform;
pub mod preflight;
pub mod probe;
pub mod settings;
pub mod status;
pub mod validation;
pub mod version;

pub use error::{InstallError, Result};
