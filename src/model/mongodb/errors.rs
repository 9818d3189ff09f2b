//! For some reason, the mongodb crate doesn't provide error code constants.
//! This module fills in the gaps.

use mongodb::error::{Error as DbError, ErrorKind, WriteFailure};

pub const DUPLICATE_KEY: i32 = 11000;

/// If the given error is a duplicate key write error, return the name of the
/// offending field.
///
/// The field is recovered from the index name in the server's message, e.g.
/// `... index: party_1 dup key: ...` yields `party`.
pub fn duplicate_key_field(err: &DbError) -> Option<String> {
    let message = match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref e)) if e.code == DUPLICATE_KEY => &e.message,
        ErrorKind::Command(ref e) if e.code == DUPLICATE_KEY => &e.message,
        _ => return None,
    };
    Some(field_from_message(message).unwrap_or_else(|| "field".to_string()))
}

/// Return true if the given error means the server could not be reached.
pub fn is_unavailable(err: &DbError) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Io(_) | ErrorKind::ServerSelection { .. } | ErrorKind::ConnectionPoolCleared { .. }
    )
}

fn field_from_message(message: &str) -> Option<String> {
    let index = message.split("index: ").nth(1)?.split_whitespace().next()?;
    // Single-field ascending indexes are named `<field>_1`.
    let field = index.strip_suffix("_1").unwrap_or(index);
    Some(field.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_is_recovered_from_index_name() {
        let message = "E11000 duplicate key error collection: voting.candidates index: party_1 dup key: { party: \"Lotus Front\" }";
        assert_eq!(Some("party".to_string()), field_from_message(message));

        let message = "E11000 duplicate key error collection: voting.users index: national_id_1 dup key: { national_id: \"1\" }";
        assert_eq!(Some("national_id".to_string()), field_from_message(message));

        assert_eq!(None, field_from_message("something else entirely"));
    }

    #[test]
    fn io_failures_are_unavailable() {
        let err = DbError::from(std::io::Error::from(std::io::ErrorKind::ConnectionRefused));
        assert!(is_unavailable(&err));
        assert!(duplicate_key_field(&err).is_none());
        assert!(matches!(
            crate::error::Error::from(err),
            crate::error::Error::StoreUnavailable(_)
        ));
    }

    #[test]
    fn decoding_failures_are_not_unavailable() {
        let decode = mongodb::bson::from_document::<crate::model::db::Candidate>(
            mongodb::bson::doc! { "party": 7 },
        )
        .unwrap_err();
        let err = DbError::from(decode);
        assert!(!is_unavailable(&err));
        assert!(matches!(
            crate::error::Error::from(err),
            crate::error::Error::Db(_)
        ));
    }
}
