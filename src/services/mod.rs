pub mod background;
pub mod credentials;
pub mod import;
pub mod kv_store;
pub mod matching;
pub mod progress;
pub mod queue;
pub mod spotify;
pub mod tidal;
