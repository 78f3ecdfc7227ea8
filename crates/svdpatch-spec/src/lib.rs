//! Name matching and wildcard-index logic for the SVD patch specification
//! language: spec strings that select peripherals, registers, clusters,
//! interrupts, and fields by literal name, comma list, brace expansion, or
//! shell glob.

mod brace;
mod glob;
mod index;
mod matcher;
mod strip;

pub use brace::brace_expand;
pub use glob::glob_match;
pub use index::spec_ind;
pub use matcher::{matchname, matchsubspec};
pub use strip::strip;
