//! The mongodb crate doesn't provide error code constants; this module
//! fills in the gap for the one code we care about.

use mongodb::error::{Error as DbError, ErrorKind, WriteFailure};

pub const DUPLICATE_KEY: i32 = 11000;

/// Return true if the given error is a duplicate key write error, i.e. an
/// insert that lost against a uniqueness constraint.
pub fn is_duplicate_key_error(err: &DbError) -> bool {
    if let ErrorKind::Write(WriteFailure::WriteError(ref e)) = *err.kind {
        return e.code == DUPLICATE_KEY;
    }
    false
}
