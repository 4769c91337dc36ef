//! Fluent builder for ffmpeg command lines, plus a runner that streams the
//! process's merged stdout/stderr line by line.
//!
//! ```no_run
//! use ffwrap::{FfmpegCommand, Input, Output, VideoCodec};
//!
//! # fn main() -> ffwrap::Result<()> {
//! let mut codec = VideoCodec::new("libx264");
//! codec.bitrate("300k");
//!
//! let mut output = Output::with("/tmp/out.mp4", [codec]);
//! output.overwrite();
//!
//! let mut command = FfmpegCommand::new();
//! command.input(Input::new("/tmp/in.mkv")).output(output);
//!
//! command.scoped(|process| {
//!     for line in process.lines() {
//!         println!("{}", line?);
//!     }
//!     Ok(())
//! })
//! # }
//! ```

pub mod core;

pub use crate::core::codec::{AudioCodec, VideoCodec, NO_AUDIO, NO_VIDEO};
pub use crate::core::command::{FfmpegCommand, Input, Output, DEFAULT_BINARY};
pub use crate::core::error::{FfxError, Result};
pub use crate::core::filter::{AudioFilter, VideoFilter};
pub use crate::core::parameters::{
    format_parameter, ContainerKind, Entry, FormatArg, NamedValue, Parameter, ParameterContainer,
};
pub use crate::core::runner::{FfmpegProcess, Lines, ProcessOptions, ProcessState};
