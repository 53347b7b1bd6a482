//! Request and file CRUD for `SqliteStore`.

mod read;
mod write;
