pub use crate::errors::{ErrorContext, RecastError};

pub mod cli;
pub mod composer;
pub mod config;
pub mod diagnostics;
pub mod discovery;
pub mod emit;
pub mod errors;
pub mod matcher;
pub mod recipe;
pub mod recipes;
pub mod syntax;
pub mod types;
pub mod visitor;
