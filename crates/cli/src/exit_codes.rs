//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract. Scripts rely on them.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success                                                   |
//! | 1    | General error (unspecified)                               |
//! | 2    | Usage error (bad arguments, invalid settings)             |
//! | 3    | Input file cannot be opened, read or parsed               |
//! | 4    | Required columns or conflict markers are absent           |
//! | 5    | Invalid selection (fewer than 2, duplicate, unknown name) |
//! | 6    | Conflicts found (only with `--fail-on-conflict`)          |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use accessgrid_config::ConfigError;
use accessgrid_io::LoadError;
use accessgrid_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unparseable settings file.
pub const EXIT_USAGE: u8 = 2;

/// Input or output file cannot be opened, read, parsed or written.
pub const EXIT_IO: u8 = 3;

/// Assignment columns or conflict header markers not found.
pub const EXIT_SCHEMA_MISSING: u8 = 4;

/// Selection has fewer than two profiles, a repeated name, or a name
/// absent from the assignment table.
pub const EXIT_INVALID_SELECTION: u8 = 5;

/// At least one selection co-holds access under a conflicting pair.
pub const EXIT_CONFLICTS_FOUND: u8 = 6;

pub fn load_exit_code(err: &LoadError) -> u8 {
    if err.is_schema_missing() {
        EXIT_SCHEMA_MISSING
    } else {
        EXIT_IO
    }
}

pub fn recon_exit_code(err: &ReconError) -> u8 {
    if err.is_invalid_selection() {
        EXIT_INVALID_SELECTION
    } else {
        EXIT_ERROR
    }
}

pub fn config_exit_code(err: &ConfigError) -> u8 {
    match err {
        ConfigError::Read { .. } => EXIT_IO,
        ConfigError::Parse { .. } => EXIT_USAGE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_IO,
            EXIT_SCHEMA_MISSING,
            EXIT_INVALID_SELECTION,
            EXIT_CONFLICTS_FOUND,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn error_mapping() {
        let missing = LoadError::MissingColumns { table: "base".into(), columns: vec!["Menu".into()] };
        assert_eq!(load_exit_code(&missing), EXIT_SCHEMA_MISSING);
        let io = LoadError::Io { path: "x".into(), message: "gone".into() };
        assert_eq!(load_exit_code(&io), EXIT_IO);
        assert_eq!(recon_exit_code(&ReconError::TooFewProfiles { selected: 1 }), EXIT_INVALID_SELECTION);
        assert_eq!(recon_exit_code(&ReconError::Cancelled), EXIT_ERROR);
    }
}
