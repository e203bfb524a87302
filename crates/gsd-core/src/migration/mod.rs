pub mod detect;
pub mod manager;
pub mod orchestrator;

pub use detect::{detect_all_old_versions, detect_old_version, LegacyInstall, OldVersionDetection};
pub use manager::{perform_migration, MigrationOptions, MigrationOutcome};
pub use orchestrator::{check_and_migrate_old_versions, MigrationSummary};
