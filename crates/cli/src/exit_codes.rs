//! CLI Exit Code Registry
//!
//! Single source of truth for `townlink` exit codes. Scripts that schedule
//! lookup rebuilds rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error                                        |
//! | 2    | Usage error (bad args, missing file)                 |
//! | 3    | Config invalid                                       |
//! | 4    | Data-quality abort (address outside the vocabulary)  |
//! | 5    | I/O error reading sources or writing output          |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config file failed to parse or validate, or a configured column is missing.
pub const EXIT_CONFIG_INVALID: u8 = 3;

/// An address used a street type, directional or component the
/// canonicalization tables do not know. Nothing was written.
pub const EXIT_DATA_QUALITY: u8 = 4;

/// Source table could not be read, or output could not be written.
pub const EXIT_IO: u8 = 5;
