//! Streaming recognizer wrapper for offline Vosk-style decoders
//!
//! The wrapper validates audio, feeds PCM to a [`StreamDecoder`] in fixed
//! chunks and unwraps decoder results into a [`Recognition`]. The real Vosk
//! binding is only compiled with the `vosk` feature.

use crate::error::{LalaError, LalaResult};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

pub const SAMPLE_RATE: u32 = 16000;

/// Frames fed to the decoder per step (250ms at 16kHz)
const CHUNK_FRAMES: usize = 4000;

/// Decoder state after accepting a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    Running,
    Finalized,
    Failed,
}

/// Text with its mean word confidence
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    pub text: String,
    pub confidence: f32,
}

impl Transcript {
    /// Build a transcript from per-word confidences (1.0 without word data)
    pub fn from_words(text: &str, confidences: impl IntoIterator<Item = f32>) -> Self {
        let (sum, count) = confidences
            .into_iter()
            .fold((0.0f32, 0usize), |(s, c), conf| (s + conf, c + 1));
        let confidence = if count == 0 { 1.0 } else { sum / count as f32 };

        Self {
            text: text.to_string(),
            confidence,
        }
    }
}

/// Incremental speech decoder
pub trait StreamDecoder: Send {
    /// Feed 16-bit mono PCM
    fn accept(&mut self, pcm: &[i16]) -> DecodeState;

    /// Result of the utterance that just finalized
    fn result(&mut self) -> Transcript;

    /// Current partial hypothesis
    fn partial(&mut self) -> String;

    /// Flush the decoder and return whatever is left
    fn final_result(&mut self) -> Transcript;

    fn reset(&mut self);
}

/// Outcome of a recognition call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recognition {
    pub text: String,
    pub confidence: f32,
    pub partial: bool,
}

/// Offline streaming recognizer
pub struct VoskRecognizer<D: StreamDecoder> {
    decoder: D,
    streaming: bool,
}

impl<D: StreamDecoder> VoskRecognizer<D> {
    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            streaming: false,
        }
    }

    pub fn reset(&mut self) {
        self.decoder.reset();
    }

    /// Transcribe a mono 16-bit PCM WAV file
    pub fn process_audio_file(&mut self, path: &Path) -> LalaResult<Recognition> {
        if !path.exists() {
            return Err(LalaError::Recognition(format!(
                "Audio file not found: {}",
                path.display()
            )));
        }

        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        if spec.channels != 1
            || spec.bits_per_sample != 16
            || spec.sample_format != hound::SampleFormat::Int
        {
            return Err(LalaError::Audio(format!(
                "expected mono 16-bit PCM WAV, got {} channel(s) at {} bits",
                spec.channels, spec.bits_per_sample
            )));
        }
        if spec.sample_rate != SAMPLE_RATE {
            debug!(
                "WAV sample rate {} differs from decoder rate {}",
                spec.sample_rate, SAMPLE_RATE
            );
        }

        let samples = reader
            .samples::<i16>()
            .collect::<Result<Vec<i16>, hound::Error>>()?;

        self.decoder.reset();

        let mut texts = Vec::new();
        for chunk in samples.chunks(CHUNK_FRAMES) {
            if self.decoder.accept(chunk) == DecodeState::Finalized {
                if let Some(text) = extract_text(&self.decoder.result().text) {
                    texts.push(text);
                }
            }
        }

        let last = self.decoder.final_result();
        if let Some(text) = extract_text(&last.text) {
            texts.push(text);
        }

        let text = texts.join(" ");
        info!("📝 Transcribed {}: '{}'", path.display(), text);

        Ok(Recognition {
            text,
            confidence: last.confidence,
            partial: false,
        })
    }

    /// Feed raw little-endian PCM bytes; `is_final` flushes the decoder
    pub fn process_audio_data(&mut self, bytes: &[u8], is_final: bool) -> LalaResult<Recognition> {
        let pcm = pcm_from_bytes(bytes)?;

        if is_final {
            self.decoder.accept(&pcm);
            let last = self.decoder.final_result();
            return Ok(Recognition {
                text: last.text.trim().to_string(),
                confidence: last.confidence,
                partial: false,
            });
        }

        match self.decoder.accept(&pcm) {
            DecodeState::Finalized => {
                let result = self.decoder.result();
                Ok(Recognition {
                    text: result.text.trim().to_string(),
                    confidence: result.confidence,
                    partial: false,
                })
            }
            DecodeState::Running => Ok(Recognition {
                text: self.decoder.partial(),
                confidence: 0.0,
                partial: true,
            }),
            DecodeState::Failed => Err(LalaError::Recognition(
                "decoding failed for this chunk".to_string(),
            )),
        }
    }

    pub fn start_streaming(&mut self) {
        self.decoder.reset();
        self.streaming = true;
        info!("🎙️ Streaming recognition started");
    }

    pub fn stop_streaming(&mut self) {
        self.streaming = false;
        info!("🔇 Streaming recognition stopped");
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }
}

fn pcm_from_bytes(bytes: &[u8]) -> LalaResult<Vec<i16>> {
    if bytes.len() % 2 != 0 {
        return Err(LalaError::Audio(
            "PCM data must hold whole 16-bit samples".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect())
}

/// Extract text from a decoder result, filtering empty results
fn extract_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(feature = "vosk")]
pub use backend::VoskDecoder;

#[cfg(feature = "vosk")]
mod backend {
    use super::{DecodeState, StreamDecoder, Transcript, SAMPLE_RATE};
    use anyhow::{Context, Result};
    use std::path::Path;
    use tracing::info;

    /// Decoder backed by libvosk
    pub struct VoskDecoder {
        recognizer: ::vosk::Recognizer,
    }

    impl VoskDecoder {
        pub fn load(model_path: &Path) -> Result<Self> {
            if !model_path.exists() {
                return Err(anyhow::anyhow!(
                    "Vosk model not found at {}",
                    model_path.display()
                ));
            }

            info!("Loading Vosk model from: {}", model_path.display());

            let model_str = model_path.to_str().ok_or_else(|| {
                anyhow::anyhow!(
                    "Vosk model path is not valid UTF-8: {}",
                    model_path.display()
                )
            })?;

            let model = ::vosk::Model::new(model_str).context("Failed to load Vosk model")?;
            let mut recognizer = ::vosk::Recognizer::new(&model, SAMPLE_RATE as f32)
                .context("Failed to create Vosk recognizer")?;
            recognizer.set_words(true);

            Ok(Self { recognizer })
        }
    }

    fn transcript(result: ::vosk::CompleteResult<'_>) -> Transcript {
        match result.single() {
            Some(single) => Transcript::from_words(single.text, single.result.iter().map(|w| w.conf)),
            None => Transcript::default(),
        }
    }

    impl StreamDecoder for VoskDecoder {
        fn accept(&mut self, pcm: &[i16]) -> DecodeState {
            match self.recognizer.accept_waveform(pcm) {
                ::vosk::DecodingState::Finalized => DecodeState::Finalized,
                ::vosk::DecodingState::Running => DecodeState::Running,
                ::vosk::DecodingState::Failed => DecodeState::Failed,
            }
        }

        fn result(&mut self) -> Transcript {
            transcript(self.recognizer.result())
        }

        fn partial(&mut self) -> String {
            self.recognizer.partial_result().partial.to_string()
        }

        fn final_result(&mut self) -> Transcript {
            transcript(self.recognizer.final_result())
        }

        fn reset(&mut self) {
            self.recognizer.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Decoder that finalizes on scripted chunk indices
    struct ScriptedDecoder {
        states: VecDeque<DecodeState>,
        results: VecDeque<&'static str>,
        partial: &'static str,
        final_text: &'static str,
        accepted: usize,
    }

    impl ScriptedDecoder {
        fn new(states: Vec<DecodeState>, results: Vec<&'static str>, final_text: &'static str) -> Self {
            Self {
                states: states.into(),
                results: results.into(),
                partial: "pon una",
                final_text,
                accepted: 0,
            }
        }
    }

    impl StreamDecoder for ScriptedDecoder {
        fn accept(&mut self, _pcm: &[i16]) -> DecodeState {
            self.accepted += 1;
            self.states.pop_front().unwrap_or(DecodeState::Running)
        }

        fn result(&mut self) -> Transcript {
            Transcript::from_words(self.results.pop_front().unwrap_or(""), [0.8, 0.6])
        }

        fn partial(&mut self) -> String {
            self.partial.to_string()
        }

        fn final_result(&mut self) -> Transcript {
            Transcript::from_words(self.final_text, [])
        }

        fn reset(&mut self) {
            self.accepted = 0;
        }
    }

    fn write_wav(path: &Path, channels: u16, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames * channels as usize {
            writer.write_sample((i % 128) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_extract_text() {
        assert_eq!(extract_text(""), None);
        assert_eq!(extract_text("  "), None);
        assert_eq!(extract_text("  hola  "), Some("hola".to_string()));
    }

    #[test]
    fn test_transcript_mean_confidence() {
        let t = Transcript::from_words("a b", [0.5, 1.0]);
        assert!((t.confidence - 0.75).abs() < f32::EPSILON);
        assert_eq!(Transcript::from_words("a", []).confidence, 1.0);
    }

    #[test]
    fn test_file_joins_finalized_segments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmd.wav");
        write_wav(&path, 1, CHUNK_FRAMES * 3);

        let decoder = ScriptedDecoder::new(
            vec![DecodeState::Finalized, DecodeState::Running, DecodeState::Finalized],
            vec!["lala", " pon una alarma "],
            "para las ocho",
        );
        let mut recognizer = VoskRecognizer::new(decoder);

        let result = recognizer.process_audio_file(&path).unwrap();
        assert_eq!(result.text, "lala pon una alarma para las ocho");
        assert!(!result.partial);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_file_rejects_stereo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 2, 100);

        let mut recognizer = VoskRecognizer::new(ScriptedDecoder::new(vec![], vec![], ""));
        assert!(matches!(
            recognizer.process_audio_file(&path),
            Err(LalaError::Audio(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let mut recognizer = VoskRecognizer::new(ScriptedDecoder::new(vec![], vec![], ""));
        assert!(matches!(
            recognizer.process_audio_file(Path::new("/nonexistent/a.wav")),
            Err(LalaError::Recognition(_))
        ));
    }

    #[test]
    fn test_data_partial_then_final() {
        let decoder = ScriptedDecoder::new(
            vec![DecodeState::Running, DecodeState::Finalized],
            vec!["pon una alarma"],
            "",
        );
        let mut recognizer = VoskRecognizer::new(decoder);
        let chunk = [0u8, 1, 2, 3];

        let partial = recognizer.process_audio_data(&chunk, false).unwrap();
        assert!(partial.partial);
        assert_eq!(partial.text, "pon una");
        assert_eq!(partial.confidence, 0.0);

        let full = recognizer.process_audio_data(&chunk, false).unwrap();
        assert!(!full.partial);
        assert_eq!(full.text, "pon una alarma");
        assert!((full.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_data_rejects_odd_length() {
        let mut recognizer = VoskRecognizer::new(ScriptedDecoder::new(vec![], vec![], ""));
        assert!(matches!(
            recognizer.process_audio_data(&[1, 2, 3], false),
            Err(LalaError::Audio(_))
        ));
    }

    #[test]
    fn test_data_failed_chunk_is_error() {
        let mut recognizer =
            VoskRecognizer::new(ScriptedDecoder::new(vec![DecodeState::Failed], vec![], ""));
        assert!(recognizer.process_audio_data(&[0, 0], false).is_err());
    }

    #[test]
    fn test_streaming_flag() {
        let mut recognizer = VoskRecognizer::new(ScriptedDecoder::new(vec![], vec![], ""));
        recognizer.start_streaming();
        assert!(recognizer.is_streaming());
        recognizer.stop_streaming();
        assert!(!recognizer.is_streaming());
    }
}
