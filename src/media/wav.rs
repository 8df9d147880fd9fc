use std::io::Cursor;

use hound::{SampleFormat, WavReader};

use crate::{Error, Result};

/// 单声道 16 位 PCM 音频
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub sample_rate: u32,
    pub samples: Vec<i16>,
}

/// 读取 WAV 文件，多声道会被平均混合为单声道
pub fn read_wav(bytes: &[u8]) -> Result<AudioClip> {
    let mut reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(Error::Decode("wav file has no channels".to_string()));
    }

    let samples: Vec<i16> = match spec.sample_format {
        SampleFormat::Int if spec.bits_per_sample == 16 => {
            reader.samples::<i16>().collect::<Result<_, _>>()?
        }
        SampleFormat::Int => {
            let shift = spec.bits_per_sample as i32 - 16;
            reader
                .samples::<i32>()
                .map(|s| {
                    s.map(|v| {
                        if shift >= 0 { (v >> shift) as i16 } else { (v << -shift) as i16 }
                    })
                })
                .collect::<Result<_, _>>()?
        }
        SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1., 1.) * i16::MAX as f32) as i16))
            .collect::<Result<_, _>>()?,
    };

    let channels = spec.channels as usize;
    let samples = if channels == 1 {
        samples
    } else {
        samples
            .chunks_exact(channels)
            .map(|frame| (frame.iter().map(|&s| s as i32).sum::<i32>() / channels as i32) as i16)
            .collect()
    };

    Ok(AudioClip { sample_rate: spec.sample_rate, samples })
}
