mod parser;
pub use parser::{Align, Cli, Commands, Gather, Index, IndexSource, Search};
