pub mod destination;
pub mod kv;
pub mod queue;
pub mod source;
