pub mod check_updates;
pub mod detect;
pub mod manifest;
pub mod migrate;
pub mod preflight;
