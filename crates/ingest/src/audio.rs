//! Audio decoding for the transcription path.
//!
//! Any container/codec symphonia understands is decoded, downmixed to mono
//! and resampled to the rate the speech model expects.

use std::io::Cursor;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tracing::{debug, warn};

/// Sample rate the speech-recognition model is fed with.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unrecognised audio format: {0}")]
    Probe(String),

    #[error("no audio track found")]
    NoTrack,

    #[error("audio decoding failed: {0}")]
    Codec(String),

    #[error("resampling failed: {0}")]
    Resample(String),

    #[error("audio contains no samples")]
    Empty,
}

/// Turns encoded audio into mono `f32` samples at a requested rate.
pub trait AudioDecoder: Send + Sync {
    /// `hint` is an optional file extension used to speed up format probing.
    fn decode(
        &self,
        bytes: &[u8],
        hint: Option<&str>,
        target_rate: u32,
    ) -> Result<Vec<f32>, DecodeError>;
}

#[derive(Debug, Clone, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode every packet of the first audio track, averaging channels.
    /// Returns the samples and their native rate.
    fn decode_mono(
        &self,
        bytes: &[u8],
        hint: Option<&str>,
    ) -> Result<(Vec<f32>, Option<u32>), DecodeError> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

        let mut probe_hint = Hint::new();
        if let Some(ext) = hint {
            probe_hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &probe_hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| DecodeError::Probe(e.to_string()))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoTrack)?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let mut sample_rate = codec_params.sample_rate;

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::Codec(e.to_string()))?;

        let mut mono = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => return Err(DecodeError::Codec(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!(error = %e, "Skipping undecodable audio packet");
                    continue;
                }
                Err(e) => return Err(DecodeError::Codec(e.to_string())),
            };

            let spec = *decoded.spec();
            sample_rate.get_or_insert(spec.rate);
            let channels = spec.channels.count().max(1);

            let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buffer.copy_interleaved_ref(decoded);

            mono.extend(
                buffer
                    .samples()
                    .chunks(channels)
                    .map(|frame| frame.iter().sum::<f32>() / channels as f32),
            );
        }

        Ok((mono, sample_rate))
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode(
        &self,
        bytes: &[u8],
        hint: Option<&str>,
        target_rate: u32,
    ) -> Result<Vec<f32>, DecodeError> {
        let (mono, native_rate) = self.decode_mono(bytes, hint)?;
        if mono.is_empty() {
            return Err(DecodeError::Empty);
        }

        let native_rate =
            native_rate.ok_or_else(|| DecodeError::Codec("sample rate unknown".to_string()))?;

        debug!(
            samples = mono.len(),
            native_rate, target_rate, "Decoded audio to mono"
        );

        resample(mono, native_rate, target_rate)
    }
}

/// Resample mono PCM with a single-pass sinc interpolator.
fn resample(samples: Vec<f32>, source_rate: u32, target_rate: u32) -> Result<Vec<f32>, DecodeError> {
    if source_rate == target_rate || samples.is_empty() {
        return Ok(samples);
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = target_rate as f64 / source_rate as f64;
    let frames = samples.len();

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, frames, 1)
        .map_err(|e| DecodeError::Resample(e.to_string()))?;

    let mut output = resampler
        .process(&[samples], None)
        .map_err(|e| DecodeError::Resample(e.to_string()))?;

    let resampled = output.pop().unwrap_or_default();

    debug!(
        source_rate,
        target_rate,
        frames_in = frames,
        frames_out = resampled.len(),
        "Resampled audio"
    );

    Ok(resampled)
}
