//! One-shot migration of the centre website's legacy data into the live stack.
//!
//! Two entry points share this library:
//! - `migrate_data` copies rows from the legacy SQLite database into Postgres.
//! - `migrate_assets` moves files from the public assets folder into object
//!   storage and repoints the rows that reference them.

pub mod datastore;
pub mod logging;
pub mod migrate;
pub mod records;
pub mod storage;

pub mod util {
    pub mod db;
    pub mod env;
}
