pub mod kv;
pub mod shows;
