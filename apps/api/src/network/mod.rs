pub mod archive;
pub mod csv_import;
pub mod handlers;
pub mod summary;
