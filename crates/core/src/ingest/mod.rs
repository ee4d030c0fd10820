pub mod error;
pub mod parse;
pub mod provider;
pub mod types;
