#![allow(clippy::missing_docs_in_private_items)]

pub mod document;
pub mod error;
pub mod index;
pub mod utils;
