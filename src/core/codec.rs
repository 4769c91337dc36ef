//! Encoder selection plus per-encoder tuning flags.

use std::fmt::Display;

use crate::core::parameters::{container_newtype, ContainerKind, ParameterContainer};

/// Drops the audio track (`-an`).
pub const NO_AUDIO: &str = "-an";
/// Drops the video track (`-vn`).
pub const NO_VIDEO: &str = "-vn";

/// Flattens to `-vcodec <name>` followed by its tuning flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoCodec(ParameterContainer);

container_newtype!(VideoCodec);

impl VideoCodec {
    pub fn new(name: impl Into<String>) -> Self {
        Self(ParameterContainer::with_kind(ContainerKind::Codec {
            selector: "-vcodec",
            name: name.into(),
        }))
    }

    pub fn name(&self) -> &str {
        codec_name(&self.0)
    }

    pub fn bitrate(&mut self, bitrate: impl Display) -> &mut Self {
        self.0.add("-b", bitrate.to_string());
        self
    }

    /// Stop after `number` video frames.
    pub fn frames(&mut self, number: u64) -> &mut Self {
        self.0.add("-vframes", number);
        self
    }

    pub fn fps(&mut self, fps: impl Display) -> &mut Self {
        self.0.add("-r", fps.to_string());
        self
    }

    /// Frame size as `<width>x<height>`.
    pub fn size(&mut self, width: u32, height: u32) -> &mut Self {
        self.0.add("-s", format!("{width}x{height}"));
        self
    }

    pub fn aspect(&mut self, x: impl Display, y: impl Display) -> &mut Self {
        self.0
            .add_formatted("-aspect", [Some(x.to_string()), Some(y.to_string())], &[]);
        self
    }

    pub fn bitrate_tolerance(&mut self, tolerance: impl Display) -> &mut Self {
        self.0.add("-bt", tolerance.to_string());
        self
    }

    pub fn max_bitrate(&mut self, rate: impl Display) -> &mut Self {
        self.0.add("-maxrate", rate.to_string());
        self
    }

    pub fn min_bitrate(&mut self, rate: impl Display) -> &mut Self {
        self.0.add("-minrate", rate.to_string());
        self
    }

    pub fn buffer_size(&mut self, size: impl Display) -> &mut Self {
        self.0.add("-bufsize", size.to_string());
        self
    }

    /// Multi-pass encoding pass (1 or 2).
    pub fn pass_number(&mut self, number: u8) -> &mut Self {
        self.0.add("-pass", number);
        self
    }

    pub fn language(&mut self, lang: impl Display) -> &mut Self {
        self.0.add("-vlang", lang.to_string());
        self
    }

    pub fn same_quality(&mut self) -> &mut Self {
        self.0.add_flag("-sameq");
        self
    }

    pub fn preset(&mut self, preset: impl Display) -> &mut Self {
        self.0.add("-vpre", preset.to_string());
        self
    }
}

/// Flattens to `-acodec <name>` followed by its tuning flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioCodec(ParameterContainer);

container_newtype!(AudioCodec);

impl AudioCodec {
    pub fn new(name: impl Into<String>) -> Self {
        Self(ParameterContainer::with_kind(ContainerKind::Codec {
            selector: "-acodec",
            name: name.into(),
        }))
    }

    pub fn name(&self) -> &str {
        codec_name(&self.0)
    }

    pub fn frames(&mut self, number: u64) -> &mut Self {
        self.0.add("-aframes", number);
        self
    }

    /// Sample rate in Hz.
    pub fn frequency(&mut self, hz: u32) -> &mut Self {
        self.0.add("-ar", hz);
        self
    }

    pub fn bitrate(&mut self, rate: impl Display) -> &mut Self {
        self.0.add("-ab", rate.to_string());
        self
    }

    pub fn quality(&mut self, number: impl Display) -> &mut Self {
        self.0.add("-aq", number.to_string());
        self
    }

    pub fn channels(&mut self, number: u8) -> &mut Self {
        self.0.add("-ac", number);
        self
    }

    pub fn language(&mut self, lang: impl Display) -> &mut Self {
        self.0.add("-alang", lang.to_string());
        self
    }

    pub fn preset(&mut self, preset: impl Display) -> &mut Self {
        self.0.add("-apre", preset.to_string());
        self
    }
}

fn codec_name(container: &ParameterContainer) -> &str {
    match container.kind() {
        ContainerKind::Codec { name, .. } => name,
        _ => "",
    }
}
