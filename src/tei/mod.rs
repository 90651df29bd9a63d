mod error;
mod parser;
mod reader;
mod segment;
mod toc;
mod urn;

#[cfg(test)]
mod tests;

pub use reader::parse_file;
pub use segment::{Segmenter, UnicodeWordSegmenter};
pub use toc::table_of_contents;
