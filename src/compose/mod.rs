//! Compose document assembly and bake emission.

pub mod bake;
pub mod composer;
pub mod document;

pub use bake::BakeGenerator;
pub use composer::{ComposeOptions, Composer, Platform};
pub use document::{ComposeDocument, ServiceDefinition};
