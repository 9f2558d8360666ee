pub mod hunk;
pub mod parser;

pub use hunk::{ChangeKind, Hunk};
pub use parser::parse_diff;
