//! Services separating file and format concerns from the workflow

pub mod format;
pub mod io;

pub use format::OutputFormatHandler;
pub use io::ImageIOService;
