use std::path::Path;

use log::debug;
use vosk::{CompleteResult, DecodingState, Model, Recognizer};

use super::{SpeechRecognizer, TranscriptSegment, WordTiming};
use crate::media::AudioClip;
use crate::{Error, Result};

/// 每次送入识别器的采样数
const CHUNK_SAMPLES: usize = 4000;

/// Vosk 离线语音识别
pub struct VoskRecognizer {
    model: Model,
}

impl VoskRecognizer {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::Model(format!("vosk model not found: {}", path.display())));
        }
        let path_str = path
            .to_str()
            .ok_or_else(|| Error::Model(format!("invalid model path: {}", path.display())))?;
        let model = Model::new(path_str)
            .ok_or_else(|| Error::Model(format!("failed to load vosk model: {}", path.display())))?;
        Ok(Self { model })
    }
}

impl SpeechRecognizer for VoskRecognizer {
    fn transcribe(&self, clip: &AudioClip) -> Result<Vec<TranscriptSegment>> {
        let mut recognizer = Recognizer::new(&self.model, clip.sample_rate as f32)
            .ok_or_else(|| Error::Model("failed to create vosk recognizer".to_string()))?;
        recognizer.set_words(true);

        let mut segments = vec![];
        for chunk in clip.samples.chunks(CHUNK_SAMPLES) {
            let state = recognizer
                .accept_waveform(chunk)
                .map_err(|e| Error::Model(format!("vosk rejected waveform: {:?}", e)))?;
            if matches!(state, DecodingState::Finalized) {
                segments.extend(to_segment(recognizer.result()));
            }
        }
        segments.extend(to_segment(recognizer.final_result()));

        debug!("识别出 {} 个片段", segments.len());
        Ok(segments)
    }
}

fn to_segment(result: CompleteResult<'_>) -> Option<TranscriptSegment> {
    let single = result.single()?;
    if single.text.is_empty() {
        return None;
    }
    Some(TranscriptSegment {
        text: single.text.to_string(),
        result: single
            .result
            .iter()
            .map(|w| WordTiming { word: w.word.to_string(), start: w.start, end: w.end, conf: w.conf })
            .collect(),
    })
}
