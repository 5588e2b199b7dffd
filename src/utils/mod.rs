//! Shared helpers: naming grammars, compressed-file opening, directory listing.

pub mod fs;
pub mod opener;
pub mod validation;
