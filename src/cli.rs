use clap::Parser;

use ffwrap::{
    AudioCodec, FfmpegCommand, FfxError, Input, Output, ParameterContainer, VideoCodec,
    VideoFilter, DEFAULT_BINARY, NO_AUDIO,
};

#[derive(Debug, Parser)]
#[command(name = "ffwrap", version, about = "Build and run ffmpeg commands")]
pub struct Cli {
    #[arg(short = 'i', long = "input", required = true)]
    pub inputs: Vec<String>,
    #[arg(short = 'o', long = "output")]
    pub output: String,
    #[arg(long = "vcodec")]
    pub video_codec: Option<String>,
    #[arg(long = "acodec")]
    pub audio_codec: Option<String>,
    #[arg(long = "vbitrate", requires = "video_codec")]
    pub video_bitrate: Option<String>,
    #[arg(long = "abitrate", requires = "audio_codec")]
    pub audio_bitrate: Option<String>,
    #[arg(long = "preset", requires = "video_codec")]
    pub preset: Option<String>,
    /// Video filter chain, e.g. `scale=1280:-1,hflip` (no commas inside values)
    #[arg(long = "vf")]
    pub video_filter: Option<String>,
    #[arg(long = "no-audio")]
    pub no_audio: bool,
    #[arg(short = 'y', long = "overwrite")]
    pub overwrite: bool,
    #[arg(long = "binary", default_value = DEFAULT_BINARY)]
    pub binary: String,
    /// Print the command line instead of running it
    #[arg(long = "dry-run")]
    pub dry_run: bool,
    /// Keep `\r`/`\n` on streamed lines
    #[arg(long = "keep-ends")]
    pub keep_ends: bool,
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
    /// Raw output options; a single quoted string is split shell-style
    #[arg(last = true)]
    pub extra_args: Vec<String>,
}

pub fn build_command(cli: &Cli) -> Result<FfmpegCommand, FfxError> {
    let mut output = Output::new(cli.output.as_str());

    if let Some(name) = &cli.video_codec {
        let mut codec = VideoCodec::new(name.as_str());
        if let Some(bitrate) = &cli.video_bitrate {
            codec.bitrate(bitrate);
        }
        if let Some(preset) = &cli.preset {
            codec.preset(preset);
        }
        output.append(codec);
    }

    if cli.no_audio {
        output.add_flag(NO_AUDIO);
    } else if let Some(name) = &cli.audio_codec {
        let mut codec = AudioCodec::new(name.as_str());
        if let Some(bitrate) = &cli.audio_bitrate {
            codec.bitrate(bitrate);
        }
        output.append(codec);
    }

    if let Some(chain) = &cli.video_filter {
        output.append(parse_filter_chain(chain));
    }

    let extra = extra_args(&cli.extra_args)?;
    if !extra.is_empty() {
        let mut raw = ParameterContainer::new();
        for arg in extra {
            raw.add_flag(arg);
        }
        output.append(raw);
    }

    if cli.overwrite {
        output.overwrite();
    }

    let mut command = FfmpegCommand::with_binary(cli.binary.as_str());
    for input in &cli.inputs {
        command.input(Input::new(input.as_str()));
    }
    command.output(output);

    Ok(command)
}

fn parse_filter_chain(chain: &str) -> VideoFilter {
    let mut filter = VideoFilter::new();
    for item in chain.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        match item.split_once('=') {
            Some((name, value)) => filter.add(name, value),
            None => filter.add_flag(item),
        };
    }
    filter
}

fn extra_args(args: &[String]) -> Result<Vec<String>, FfxError> {
    match args {
        [single] if single.contains(char::is_whitespace) => {
            shell_words::split(single).map_err(|err| FfxError::InvalidCommand {
                message: err.to_string(),
            })
        }
        _ => Ok(args.to_vec()),
    }
}
