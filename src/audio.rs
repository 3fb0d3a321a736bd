use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::fmt;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

/// Why a recording could not start. Surfaced directly to the user at the
/// point of the attempted action; recording simply does not begin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// Access to the input device was refused by the OS or audio backend.
    Permission(String),
    /// No usable input device is available.
    Device(String),
    /// Any other backend failure (unsupported config, stream error, or a
    /// recording already in progress).
    Backend(String),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::Permission(msg) => write!(f, "microphone access denied: {msg}"),
            RecordError::Device(msg) => write!(f, "no microphone available: {msg}"),
            RecordError::Backend(msg) => write!(f, "recording failed: {msg}"),
        }
    }
}

impl std::error::Error for RecordError {}

/// A finalized recording: WAV-encoded bytes plus the metadata the audio
/// analysis endpoint needs. Produced by `AudioRecorder::stop`; submitting it
/// is a separate, explicit action so the user can review it first.
#[derive(Debug, Clone)]
pub struct RecordedClip {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: usize,
}

impl RecordedClip {
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f32 / self.sample_rate as f32
    }

    /// True when nothing was captured; the UI blocks submission of such
    /// clips but producing one is not an error.
    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }
}

pub fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).context("start WAV encoding")?;
        for &sample in samples {
            writer.write_sample(sample).context("encode WAV sample")?;
        }
        writer.finalize().context("finalize WAV clip")?;
    }
    Ok(cursor.into_inner())
}

/// Owner of the microphone input stream. At most one recording session is
/// active at a time; the device is held for the duration of the session and
/// released on every exit path, including errors during stream setup, since
/// the stream handle is dropped whenever `start` bails out.
pub struct AudioRecorder {
    stream: Option<cpal::Stream>,
    samples: Arc<Mutex<Vec<i16>>>,
    sample_rate: u32,
    channels: u16,
}

impl Default for AudioRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioRecorder {
    pub fn new() -> Self {
        Self {
            stream: None,
            samples: Arc::new(Mutex::new(Vec::new())),
            sample_rate: 0,
            channels: 0,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.stream.is_some()
    }

    /// Acquire the default input device and start capturing.
    pub fn start(&mut self) -> std::result::Result<(), RecordError> {
        if self.stream.is_some() {
            return Err(RecordError::Backend("a recording is already in progress".into()));
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| RecordError::Device("no default input device".into()))?;
        let config = device
            .default_input_config()
            .map_err(|e| RecordError::Device(e.to_string()))?;

        self.sample_rate = config.sample_rate().0;
        self.channels = config.channels();

        let samples = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&samples);
        let err_fn = |e| tracing::warn!(error = %e, "input stream error");

        let stream = match config.sample_format() {
            cpal::SampleFormat::I16 => device.build_input_stream(
                &config.into(),
                move |data: &[i16], _| {
                    if let Ok(mut buf) = sink.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                err_fn,
                None,
            ),
            cpal::SampleFormat::F32 => device.build_input_stream(
                &config.into(),
                move |data: &[f32], _| {
                    if let Ok(mut buf) = sink.lock() {
                        buf.extend(data.iter().map(|&s| {
                            (s * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16
                        }));
                    }
                },
                err_fn,
                None,
            ),
            other => {
                return Err(RecordError::Backend(format!(
                    "unsupported input sample format {other:?}"
                )))
            }
        }
        .map_err(map_build_error)?;

        stream
            .play()
            .map_err(|e| RecordError::Backend(e.to_string()))?;

        self.samples = samples;
        self.stream = Some(stream);
        tracing::debug!(sample_rate = self.sample_rate, channels = self.channels, "recording started");
        Ok(())
    }

    /// Stop capturing, release the device and finalize the clip. Returns
    /// `None` when no recording is active. A stop before any samples arrived
    /// yields a valid zero-duration clip.
    pub fn stop(&mut self) -> Result<Option<RecordedClip>> {
        let Some(stream) = self.stream.take() else {
            return Ok(None);
        };
        drop(stream);

        let samples = match self.samples.lock() {
            Ok(mut buf) => std::mem::take(&mut *buf),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        let channels = self.channels.max(1);
        let bytes = encode_wav(&samples, self.sample_rate, channels)?;
        let clip = RecordedClip {
            bytes,
            mime_type: "audio/wav",
            sample_rate: self.sample_rate,
            channels,
            frames: samples.len() / channels as usize,
        };
        tracing::debug!(duration_secs = clip.duration_secs(), "recording stopped");
        Ok(Some(clip))
    }

    /// Abort the session without producing a clip. Idempotent.
    pub fn cancel(&mut self) {
        self.stream = None;
        if let Ok(mut buf) = self.samples.lock() {
            buf.clear();
        }
    }
}

fn map_build_error(e: cpal::BuildStreamError) -> RecordError {
    match e {
        cpal::BuildStreamError::DeviceNotAvailable => RecordError::Device(e.to_string()),
        cpal::BuildStreamError::BackendSpecific { .. } => RecordError::Permission(e.to_string()),
        other => RecordError::Backend(other.to_string()),
    }
}
