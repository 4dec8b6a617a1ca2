//! Types for the toolchain module.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extension of the per-channel images produced by the decoder.
pub const CHANNEL_IMAGE_EXT: &str = "bmp";

/// Extension of the published output images.
pub const OUTPUT_IMAGE_EXT: &str = "png";

/// Demodulator tuning parameters.
///
/// Defaults match an OQPSK LRPT downlink at 72k symbols/s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemodParams {
    /// Modulation mode (e.g. "oqpsk", "qpsk").
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Input sample rate in samples/s.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Symbol rate in symbols/s.
    #[serde(default = "default_symbol_rate")]
    pub symbol_rate: u32,
    /// PLL bandwidth in Hz.
    #[serde(default = "default_pll_bandwidth")]
    pub pll_bandwidth: u32,
    /// Carrier frequency search range in Hz.
    #[serde(default = "default_freq_delta")]
    pub freq_delta_hz: u32,
    /// Interpolation factor.
    #[serde(default = "default_interpolation")]
    pub interpolation: u32,
    /// Status refresh rate in milliseconds.
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate_ms: u32,
}

fn default_mode() -> String {
    "oqpsk".to_string()
}

fn default_sample_rate() -> u32 {
    156_250
}

fn default_symbol_rate() -> u32 {
    72_000
}

fn default_pll_bandwidth() -> u32 {
    300
}

fn default_freq_delta() -> u32 {
    1000
}

fn default_interpolation() -> u32 {
    24
}

fn default_refresh_rate() -> u32 {
    1000
}

impl Default for DemodParams {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            sample_rate: default_sample_rate(),
            symbol_rate: default_symbol_rate(),
            pll_bandwidth: default_pll_bandwidth(),
            freq_delta_hz: default_freq_delta(),
            interpolation: default_interpolation(),
            refresh_rate_ms: default_refresh_rate(),
        }
    }
}

/// Decoder channel selection parameters.
///
/// The decoder writes one image per requested APID, as channels 0..=2 in
/// blue/green/red order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeParams {
    /// APID decoded into channel 2.
    pub apid_red: u16,
    /// APID decoded into channel 1.
    pub apid_green: u16,
    /// APID decoded into channel 0.
    pub apid_blue: u16,
    /// Enable differential decoding.
    #[serde(default)]
    pub diff_decode: bool,
    /// Input soft bits are interleaved.
    #[serde(default)]
    pub interleaved: bool,
}

/// A request to demodulate an IQ recording into a soft-bit file.
#[derive(Debug, Clone)]
pub struct DemodRequest {
    /// Path to the IQ recording.
    pub input: PathBuf,
    /// Expected soft-bit output path.
    pub output: PathBuf,
    /// Demodulator tuning.
    pub params: DemodParams,
}

/// Result of a successful demodulation.
#[derive(Debug, Clone)]
pub struct DemodResult {
    /// The produced soft-bit file.
    pub soft_bits: PathBuf,
    /// Exit code reported by the demodulator, if any.
    pub exit_code: Option<i32>,
}

/// A request to decode a soft-bit file into channel images.
#[derive(Debug, Clone)]
pub struct DecodeRequest {
    /// Path to the soft-bit file (or an intermediate product for a
    /// second pass).
    pub input: PathBuf,
    /// Output path prefix; channel images land at
    /// `<output_basename>_<channel>.bmp`.
    pub output_basename: PathBuf,
    /// Channel selection.
    pub params: DecodeParams,
}

/// One channel image produced by the decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelImage {
    /// Channel index (0..=2).
    pub channel: u8,
    /// Path of the image file.
    pub path: PathBuf,
}

/// Result of a successful decode.
#[derive(Debug, Clone)]
pub struct DecodeResult {
    /// Channel images that were actually produced.
    pub channels: Vec<ChannelImage>,
    /// Intermediate product usable for a second decode pass, if present.
    pub intermediate: Option<PathBuf>,
    /// Exit code reported by the decoder, if any.
    pub exit_code: Option<i32>,
}

/// How decoded channel images are combined into published imagery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CompositionMode {
    /// Vertically append the listed channels into a single image.
    CompositeAppend { channels: Vec<u8> },
    /// Merge three channels into one RGB image via the channel-to-plane
    /// mapping, and convert the designated infrared channel on its own.
    FalseColorCombine {
        red: u8,
        green: u8,
        blue: u8,
        infrared: u8,
    },
    /// Convert every produced channel image independently.
    SeparateConvert,
}

/// Kind of a composed output image; decides the published filename suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageKind {
    /// Vertical composite of all channels; published under the bare stem.
    Composite,
    /// False-color RGB combine.
    FalseColor,
    /// Infrared image.
    Infrared,
    /// A single channel converted on its own.
    Channel { channel: u8 },
}

impl ImageKind {
    /// Filename suffix appended to the recording stem.
    pub fn suffix(&self) -> String {
        match self {
            Self::Composite => String::new(),
            Self::FalseColor => "_fc".to_string(),
            Self::Infrared => "_ir".to_string(),
            Self::Channel { channel } => format!("_{}", channel),
        }
    }
}

/// A single composition operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ComposeOp {
    /// Vertically append the inputs, first on top.
    Append { inputs: Vec<PathBuf> },
    /// Combine three grayscale inputs into the RGB planes of one image.
    CombineRgb {
        red: PathBuf,
        green: PathBuf,
        blue: PathBuf,
    },
    /// Convert a single input to the output format.
    Convert { input: PathBuf },
}

/// One planned output of the composition stage.
#[derive(Debug, Clone)]
pub struct ComposeOutput {
    /// What the output is, for naming and reporting.
    pub kind: ImageKind,
    /// Where the output must appear.
    pub output: PathBuf,
    /// How to produce it.
    pub op: ComposeOp,
}

/// A composition job: a set of independent outputs.
#[derive(Debug, Clone)]
pub struct ComposeJob {
    pub outputs: Vec<ComposeOutput>,
}

/// A produced output image.
#[derive(Debug, Clone)]
pub struct ComposedImage {
    pub kind: ImageKind,
    pub path: PathBuf,
}

/// A composition output that could not be produced.
#[derive(Debug, Clone)]
pub struct ComposeFailure {
    pub kind: ImageKind,
    pub output: PathBuf,
    pub reason: String,
}

/// Result of a composition job.
///
/// Outputs are independent: the result carries whichever subset succeeded
/// together with the failures. The caller decides whether zero successes is
/// fatal.
#[derive(Debug, Clone, Default)]
pub struct ComposeResult {
    pub images: Vec<ComposedImage>,
    pub failures: Vec<ComposeFailure>,
}

/// Path of the decoder's channel image for `channel` under `basename`.
pub fn channel_image_path(basename: &Path, channel: u8) -> PathBuf {
    let mut name = basename.as_os_str().to_os_string();
    name.push(format!("_{}.{}", channel, CHANNEL_IMAGE_EXT));
    PathBuf::from(name)
}

/// Path of the decoder's intermediate product under `basename`.
pub fn intermediate_path(basename: &Path) -> PathBuf {
    let mut name = basename.as_os_str().to_os_string();
    name.push(".dec");
    PathBuf::from(name)
}

/// Path of a composed output image of `kind` under `basename`.
pub fn output_image_path(basename: &Path, kind: ImageKind) -> PathBuf {
    let mut name = basename.as_os_str().to_os_string();
    name.push(format!("{}.{}", kind.suffix(), OUTPUT_IMAGE_EXT));
    PathBuf::from(name)
}

impl CompositionMode {
    /// Plans the composition outputs for the channel images produced by a
    /// decode, rooted at `basename`.
    ///
    /// Plane sources are derived from `basename` rather than the produced
    /// set, so a missing channel surfaces as a failed output instead of a
    /// silently shrunk plan.
    pub fn plan(&self, produced: &[ChannelImage], basename: &Path) -> Vec<ComposeOutput> {
        match self {
            Self::CompositeAppend { channels } => vec![ComposeOutput {
                kind: ImageKind::Composite,
                output: output_image_path(basename, ImageKind::Composite),
                op: ComposeOp::Append {
                    inputs: channels
                        .iter()
                        .map(|ch| channel_image_path(basename, *ch))
                        .collect(),
                },
            }],
            Self::FalseColorCombine {
                red,
                green,
                blue,
                infrared,
            } => vec![
                ComposeOutput {
                    kind: ImageKind::FalseColor,
                    output: output_image_path(basename, ImageKind::FalseColor),
                    op: ComposeOp::CombineRgb {
                        red: channel_image_path(basename, *red),
                        green: channel_image_path(basename, *green),
                        blue: channel_image_path(basename, *blue),
                    },
                },
                ComposeOutput {
                    kind: ImageKind::Infrared,
                    output: output_image_path(basename, ImageKind::Infrared),
                    op: ComposeOp::Convert {
                        input: channel_image_path(basename, *infrared),
                    },
                },
            ],
            Self::SeparateConvert => produced
                .iter()
                .map(|ch| {
                    let kind = ImageKind::Channel {
                        channel: ch.channel,
                    };
                    ComposeOutput {
                        kind,
                        output: output_image_path(basename, kind),
                        op: ComposeOp::Convert {
                            input: ch.path.clone(),
                        },
                    }
                })
                .collect(),
        }
    }
}
