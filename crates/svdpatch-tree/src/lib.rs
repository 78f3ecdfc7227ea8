//! A mutable, order-preserving XML element tree for CMSIS-SVD documents,
//! plus the schema order normaliser that restores the SVD schema's required
//! child ordering after patching.

mod element;
mod error;
mod normalize;
mod parse;
mod write;

pub use element::Element;
pub use error::TreeError;
pub use normalize::{sort_element, sort_recursive};
pub use parse::{parse_file, parse_str};
pub use write::{to_string, write_file};
