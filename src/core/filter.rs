//! Filter chains rendered as one comma-joined value under `-vf` / `-af`.

use std::fmt::{self, Display};

use crate::core::error::{FfxError, Result};
use crate::core::parameters::{
    container_newtype, ContainerKind, FormatArg, NamedValue, ParameterContainer,
};

const FIELDORDER_VALUES: &[&str] = &["0", "1", "bff", "tff"];
const TRANSPOSE_VALUES: &[&str] = &["0", "1", "2", "3"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFilter(ParameterContainer);

container_newtype!(VideoFilter);

impl Default for VideoFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for VideoFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.filter_chain())
    }
}

impl VideoFilter {
    pub fn new() -> Self {
        Self(ParameterContainer::with_kind(ContainerKind::Filter {
            selector: "-vf",
        }))
    }

    fn positional<const N: usize>(
        &mut self,
        name: &str,
        args: [Option<String>; N],
    ) -> &mut Self {
        self.0.add_formatted(name, args, &[]);
        self
    }

    fn keyword(&mut self, name: &str, named: &[(&str, NamedValue)]) -> &mut Self {
        self.0.add_formatted(name, None, named);
        self
    }

    fn bare(&mut self, name: &str) -> &mut Self {
        self.0.add_flag(name);
        self
    }

    pub fn blackframe(&mut self, amount: impl FormatArg, threshold: impl FormatArg) -> &mut Self {
        self.positional("blackframe", [amount.into_arg(), threshold.into_arg()])
    }

    pub fn copy(&mut self) -> &mut Self {
        self.bare("copy")
    }

    pub fn crop(
        &mut self,
        out_w: impl FormatArg,
        out_h: Option<&str>,
        x: Option<&str>,
        y: Option<&str>,
    ) -> &mut Self {
        self.positional(
            "crop",
            [out_w.into_arg(), out_h.into_arg(), x.into_arg(), y.into_arg()],
        )
    }

    pub fn cropdetect(
        &mut self,
        limit: Option<u32>,
        round: Option<u32>,
        reset: Option<u32>,
    ) -> &mut Self {
        self.positional(
            "cropdetect",
            [limit.into_arg(), round.into_arg(), reset.into_arg()],
        )
    }

    pub fn drawbox(
        &mut self,
        x: impl FormatArg,
        y: impl FormatArg,
        width: impl FormatArg,
        height: impl FormatArg,
        color: &str,
    ) -> &mut Self {
        self.positional(
            "drawbox",
            [
                x.into_arg(),
                y.into_arg(),
                width.into_arg(),
                height.into_arg(),
                color.into_arg(),
            ],
        )
    }

    /// Keyword-only, so the value is always quoted.
    pub fn drawtext(&mut self, options: &[(&str, NamedValue)]) -> &mut Self {
        self.keyword("drawtext", options)
    }

    pub fn fade(&mut self, kind: &str, start: u64, number: u64) -> &mut Self {
        self.positional("fade", [kind.into_arg(), start.into_arg(), number.into_arg()])
    }

    /// Accepts `0`, `1`, `bff` or `tff`.
    pub fn fieldorder(&mut self, order: impl Display) -> Result<&mut Self> {
        let order = checked("fieldorder", order, FIELDORDER_VALUES)?;
        self.0.add("fieldorder", order);
        Ok(self)
    }

    pub fn fifo(&mut self) -> &mut Self {
        self.bare("fifo")
    }

    /// Pixel formats joined with `:`.
    pub fn format(&mut self, pix_fmts: &[&str]) -> &mut Self {
        self.0
            .add_formatted("format", pix_fmts.iter().map(|fmt| (*fmt).into_arg()), &[]);
        self
    }

    pub fn frei0r(&mut self, name: &str, params: &[&str]) -> &mut Self {
        let args = std::iter::once(name.into_arg())
            .chain(params.iter().map(|param| (*param).into_arg()));
        self.0.add_formatted("frei0r", args, &[]);
        self
    }

    pub fn gradfun(&mut self, strength: Option<f64>, radius: Option<u32>) -> &mut Self {
        self.positional("gradfun", [strength.into_arg(), radius.into_arg()])
    }

    pub fn hflip(&mut self) -> &mut Self {
        self.bare("hflip")
    }

    pub fn hqdn3d(
        &mut self,
        luma_spatial: Option<f64>,
        chroma_spatial: Option<f64>,
        luma_tmp: Option<f64>,
        chroma_tmp: Option<f64>,
    ) -> &mut Self {
        self.positional(
            "hqdn3d",
            [
                luma_spatial.into_arg(),
                chroma_spatial.into_arg(),
                luma_tmp.into_arg(),
                chroma_tmp.into_arg(),
            ],
        )
    }

    pub fn mp(&mut self, options: &[(&str, NamedValue)]) -> &mut Self {
        self.keyword("mp", options)
    }

    pub fn negate(&mut self) -> &mut Self {
        self.0.add("negate", 1);
        self
    }

    pub fn noformat(&mut self, pix_fmts: &[&str]) -> &mut Self {
        self.0
            .add_formatted("noformat", pix_fmts.iter().map(|fmt| (*fmt).into_arg()), &[]);
        self
    }

    pub fn null(&mut self) -> &mut Self {
        self.bare("null")
    }

    pub fn overlay(&mut self, x: impl FormatArg, y: impl FormatArg) -> &mut Self {
        self.positional("overlay", [x.into_arg(), y.into_arg()])
    }

    pub fn pad(
        &mut self,
        width: impl FormatArg,
        height: impl FormatArg,
        x: impl FormatArg,
        y: impl FormatArg,
        color: &str,
    ) -> &mut Self {
        self.positional(
            "pad",
            [
                width.into_arg(),
                height.into_arg(),
                x.into_arg(),
                y.into_arg(),
                color.into_arg(),
            ],
        )
    }

    /// `-1` keeps the aspect ratio for that side.
    pub fn scale(&mut self, width: impl FormatArg, height: impl FormatArg) -> &mut Self {
        self.positional("scale", [width.into_arg(), height.into_arg()])
    }

    pub fn select(&mut self, expression: &str) -> &mut Self {
        self.0.add("select", expression);
        self
    }

    pub fn setdar(&mut self, x: impl FormatArg, y: impl FormatArg) -> &mut Self {
        self.positional("setdar", [x.into_arg(), y.into_arg()])
    }

    pub fn setpts(&mut self, expression: &str) -> &mut Self {
        self.0.add("setpts", expression);
        self
    }

    pub fn setsar(&mut self, x: impl FormatArg, y: impl FormatArg) -> &mut Self {
        self.positional("setsar", [x.into_arg(), y.into_arg()])
    }

    pub fn slicify(&mut self, height: u32) -> &mut Self {
        self.0.add("slicify", height);
        self
    }

    /// Accepts `0` through `3`.
    pub fn transpose(&mut self, direction: impl Display) -> Result<&mut Self> {
        let direction = checked("transpose", direction, TRANSPOSE_VALUES)?;
        self.0.add("transpose", direction);
        Ok(self)
    }

    pub fn vflip(&mut self) -> &mut Self {
        self.bare("vflip")
    }

    pub fn yadif(&mut self, mode: i32, parity: i32) -> &mut Self {
        self.positional("yadif", [mode.into_arg(), parity.into_arg()])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFilter(ParameterContainer);

container_newtype!(AudioFilter);

impl Default for AudioFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for AudioFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.filter_chain())
    }
}

impl AudioFilter {
    pub fn new() -> Self {
        Self(ParameterContainer::with_kind(ContainerKind::Filter {
            selector: "-af",
        }))
    }

    pub fn anull(&mut self) -> &mut Self {
        self.0.add_flag("anull");
        self
    }

    pub fn volume(&mut self, volume: impl FormatArg) -> &mut Self {
        self.0.add_formatted("volume", [volume.into_arg()], &[]);
        self
    }

    pub fn aresample(&mut self, sample_rate: u32) -> &mut Self {
        self.0.add_formatted("aresample", [sample_rate.into_arg()], &[]);
        self
    }

    pub fn atempo(&mut self, tempo: f64) -> &mut Self {
        self.0.add_formatted("atempo", [tempo.into_arg()], &[]);
        self
    }
}

fn checked(
    filter: &'static str,
    value: impl Display,
    allowed: &'static [&'static str],
) -> Result<String> {
    let value = value.to_string();
    if allowed.contains(&value.as_str()) {
        Ok(value)
    } else {
        Err(FfxError::InvalidArgument {
            filter,
            value,
            allowed,
        })
    }
}
