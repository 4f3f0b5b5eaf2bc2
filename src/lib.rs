//! kerntrace core library: turns megakernel instruction timings into
//! Chrome/Perfetto trace event files.

mod clock;
mod cmd;
mod config;
mod error;
mod export;
mod fsutil;
mod merge;
mod opcodes;
mod schedule;
mod timeline;
mod tracefile;
mod workers;

pub use clock::*;
pub use cmd::*;
pub use config::*;
pub use error::*;
pub use export::*;
pub use fsutil::*;
pub use merge::*;
pub use opcodes::*;
pub use schedule::*;
pub use timeline::*;
pub use tracefile::*;
pub use workers::*;
