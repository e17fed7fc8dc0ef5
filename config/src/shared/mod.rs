mod base;
mod pipeline;
mod remote;
mod runner;
mod source;

pub use base::*;
pub use pipeline::*;
pub use remote::*;
pub use runner::*;
pub use source::*;
