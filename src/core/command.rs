use std::fmt;

use crate::core::error::{FfxError, Result};
use crate::core::parameters::{
    container_newtype, ContainerKind, FormatArg, Parameter, ParameterContainer,
};
use crate::core::runner::{FfmpegProcess, ProcessOptions};

pub const DEFAULT_BINARY: &str = "ffmpeg";

/// An input file; its own options come before `-i <path>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input(ParameterContainer);

container_newtype!(Input);

impl Input {
    pub fn new(path: impl Into<String>) -> Self {
        Self(ParameterContainer::with_kind(ContainerKind::Input {
            path: path.into(),
        }))
    }

    /// Creates the input with codecs, filters or plain containers nested in order.
    pub fn with<I, C>(path: impl Into<String>, containers: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ParameterContainer>,
    {
        let mut input = Self::new(path);
        for container in containers {
            input.0.append(container);
        }
        input
    }

    pub fn path(&self) -> &str {
        match self.0.kind() {
            ContainerKind::Input { path } => path,
            _ => "",
        }
    }
}

/// An output file; its own options come before the bare path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output(ParameterContainer);

container_newtype!(Output);

impl Output {
    pub fn new(path: impl Into<String>) -> Self {
        Self(ParameterContainer::with_kind(ContainerKind::Output {
            path: path.into(),
        }))
    }

    pub fn with<I, C>(path: impl Into<String>, containers: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ParameterContainer>,
    {
        let mut output = Self::new(path);
        for container in containers {
            output.0.append(container);
        }
        output
    }

    pub fn path(&self) -> &str {
        match self.0.kind() {
            ContainerKind::Output { path } => path,
            _ => "",
        }
    }

    /// Overwrite the file if it already exists (`-y`).
    pub fn overwrite(&mut self) -> &mut Self {
        self.0.add_flag("-y");
        self
    }
}

/// The root container: `<binary>` followed by every nested container in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegCommand(ParameterContainer);

container_newtype!(FfmpegCommand);

impl Default for FfmpegCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FfmpegCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FfmpegCommand {
    pub fn new() -> Self {
        Self::with_binary(DEFAULT_BINARY)
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self(ParameterContainer::with_kind(ContainerKind::Command {
            binary: binary.into(),
        }))
    }

    pub fn binary(&self) -> &str {
        match self.0.kind() {
            ContainerKind::Command { binary } => binary,
            _ => DEFAULT_BINARY,
        }
    }

    pub fn input(&mut self, input: Input) -> &mut Self {
        self.0.append(input);
        self
    }

    pub fn output(&mut self, output: Output) -> &mut Self {
        self.0.append(output);
        self
    }

    /// Inserts an option directly after the binary, ahead of all inputs.
    pub fn add_global(&mut self, name: impl Into<String>, value: impl FormatArg) -> &mut Self {
        self.0.insert(0, Parameter::new(name, value.into_arg()));
        self
    }

    /// The full argument vector, binary first.
    pub fn to_args(&self) -> Vec<String> {
        self.0.flatten()
    }

    pub fn to_shell_string(&self) -> String {
        shell_words::join(self.to_args())
    }

    /// Spawns the binary; the returned process is already running.
    pub fn run(&self) -> Result<FfmpegProcess> {
        self.run_with(ProcessOptions::default())
    }

    pub fn run_with(&self, options: ProcessOptions) -> Result<FfmpegProcess> {
        let mut process = FfmpegProcess::with_options(self.to_args(), options);
        process.run()?;
        Ok(process)
    }

    /// Runs `f` against the live process and terminates it on every exit path.
    pub fn scoped<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut FfmpegProcess) -> std::result::Result<T, E>,
        E: From<FfxError>,
    {
        self.scoped_with(ProcessOptions::default(), f)
    }

    pub fn scoped_with<T, E, F>(&self, options: ProcessOptions, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut FfmpegProcess) -> std::result::Result<T, E>,
        E: From<FfxError>,
    {
        let mut process = FfmpegProcess::with_options(self.to_args(), options);
        process.run()?;
        process.scoped(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::codec::{AudioCodec, VideoCodec};
    use crate::core::filter::VideoFilter;
    use crate::core::parameters::Entry;

    #[test]
    fn input_path_goes_last_behind_flag() {
        let mut input = Input::new("/old");
        assert_eq!(input.flatten(), vec!["-i", "/old"]);
        assert_eq!(input.path(), "/old");

        let mut options = ParameterContainer::new();
        options.add("-f", "x11grab");
        input.append(options.clone());
        assert_eq!(input.flatten(), vec!["-f", "x11grab", "-i", "/old"]);
        assert_eq!(input.pop(), Some(Entry::Container(options)));
    }

    #[test]
    fn output_path_goes_last_without_flag() {
        let mut output = Output::new("/new");
        assert_eq!(output.flatten(), vec!["/new"]);
        assert_eq!(output.path(), "/new");

        output.append(VideoCodec::new("libx264"));
        assert_eq!(output.flatten(), vec!["-vcodec", "libx264", "/new"]);

        output.overwrite();
        assert_eq!(output.flatten(), vec!["-vcodec", "libx264", "-y", "/new"]);
    }

    #[test]
    fn output_nests_filters_at_construction() {
        let mut filter = VideoFilter::new();
        filter.blackframe(1, 2).crop(792, None, None, None);

        let output = Output::with("/new", [filter]);
        assert_eq!(
            output.flatten(),
            vec!["-vf", "blackframe=1:2,crop=792", "/new"]
        );
    }

    #[test]
    fn command_starts_with_binary() {
        let mut command = FfmpegCommand::new();
        command.input(Input::new("/old")).output(Output::new("/new"));
        assert_eq!(command.to_args(), vec!["ffmpeg", "-i", "/old", "/new"]);
        assert_eq!(command.binary(), "ffmpeg");
    }

    #[test]
    fn command_preserves_caller_order() {
        let mut command = FfmpegCommand::with_binary("/usr/local/bin/ffmpeg");
        command
            .output(Output::new("/new"))
            .input(Input::new("/old"));
        assert_eq!(
            command.to_args(),
            vec!["/usr/local/bin/ffmpeg", "/new", "-i", "/old"]
        );
    }

    #[test]
    fn global_options_precede_inputs() {
        let mut command = FfmpegCommand::new();
        command.input(Input::new("/old")).output(Output::new("/new"));
        command.add_global("-loglevel", "error").add_global("-nostdin", None::<&str>);
        assert_eq!(
            command.to_args(),
            vec!["ffmpeg", "-nostdin", "-loglevel", "error", "-i", "/old", "/new"]
        );
    }

    #[test]
    fn full_transcode_command() {
        let mut video = VideoCodec::new("libx264");
        video.bitrate("2M").preset("slow");
        let mut audio = AudioCodec::new("aac");
        audio.bitrate("128k");
        let mut filter = VideoFilter::new();
        filter.scale(1280, -1);

        let mut output = Output::with(
            "out file.mp4",
            [
                ParameterContainer::from(video),
                ParameterContainer::from(audio),
                ParameterContainer::from(filter),
            ],
        );
        output.overwrite();

        let mut command = FfmpegCommand::new();
        command.input(Input::new("in.mkv")).output(output);

        assert_eq!(
            command.to_args(),
            vec![
                "ffmpeg", "-i", "in.mkv", "-vcodec", "libx264", "-b", "2M", "-vpre", "slow",
                "-acodec", "aac", "-ab", "128k", "-vf", "scale=1280:-1", "-y", "out file.mp4",
            ]
        );
        assert!(command.to_shell_string().ends_with("-y 'out file.mp4'"));
    }
}
