pub mod import_job;
pub mod kv_entry;
