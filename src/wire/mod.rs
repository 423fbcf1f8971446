pub mod codec;

pub use codec::{recv, recv_with, send};
