//! Data contracts shared by the botanist engine and CLI.

pub mod aggregate;
pub mod chat;
pub mod events;
pub mod guides;
pub mod language;
pub mod models;
pub mod plants;
pub mod schemas;

pub use aggregate::aggregate_results;
pub use language::LanguageCode;
