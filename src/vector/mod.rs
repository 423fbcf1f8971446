pub mod builder;
pub mod compact;
pub mod entry;
pub mod expanded;
pub mod legacy;
pub mod position;

pub use builder::VectorBuilder;
pub use compact::CompactVector;
pub use entry::{Lexeme, WordEntry};
pub use expanded::ExpandedView;
pub use position::{Weight, WordPos};
