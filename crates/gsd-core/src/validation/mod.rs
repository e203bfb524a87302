pub mod path;

pub use path::{
    is_reserved_name, validate_all_paths, validate_path, InvalidPathEntry, PathRejection,
    PathValidationReport, ValidatedPath,
};
