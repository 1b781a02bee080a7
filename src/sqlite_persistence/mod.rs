pub mod versioned_schema;

pub use versioned_schema::{
    Column, ForeignKey, OnDeleteAction, SqlType, Table, VersionedSchema, BASE_DB_VERSION,
    DEFAULT_TIMESTAMP,
};
