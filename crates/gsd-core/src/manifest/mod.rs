pub mod reader;
pub mod repair;
pub mod schema;
pub mod writer;

pub use reader::{read_manifest, ManifestReadResult};
pub use repair::{
    detect_version, read_manifest_with_repair, repair_manifest, RepairOptions, RepairOutcome,
    RepairedRead, VersionSource, VersionSourceKind,
};
pub use schema::{
    create_manifest, validate_manifest, FieldDefinition, InstallationManifest, ManifestDraft,
    ManifestValidation, FIELD_DEFINITIONS, REQUIRED_FIELDS,
};
pub use writer::{generate_manifest, write_manifest};
