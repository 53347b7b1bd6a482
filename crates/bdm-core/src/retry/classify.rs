//! Classify curl errors and storage failures into retry kinds.

use crate::error::StorageError;
use crate::retry::policy::ErrorKind;

/// SQLite primary result codes that mean "try again shortly".
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Classify a curl error.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

/// Classify a storage failure. Transient conditions (I/O, pool exhaustion,
/// busy/locked database, unavailable store) are retryable; the rest are not.
pub fn classify_storage(e: &StorageError) -> ErrorKind {
    match e {
        StorageError::TimedOut(_) => ErrorKind::Timeout,
        StorageError::Unavailable(_) => ErrorKind::Connection,
        StorageError::Corrupt(_) | StorageError::MissingRow(_) => ErrorKind::Other,
        StorageError::Db(db) => classify_sqlx(db),
    }
}

fn classify_sqlx(e: &sqlx::Error) -> ErrorKind {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => ErrorKind::Connection,
        sqlx::Error::Database(db) => {
            let primary = db
                .code()
                .and_then(|c| c.parse::<i32>().ok())
                .map(|c| c & 0xff);
            match primary {
                Some(SQLITE_BUSY) | Some(SQLITE_LOCKED) => ErrorKind::Throttled,
                _ => ErrorKind::Other,
            }
        }
        _ => ErrorKind::Other,
    }
}
