use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};
use std::io::Cursor;
use tracing::{debug, info};

/// A decoded WAV clip (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioClip {
    /// Decode an uploaded WAV body
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self> {
        let reader = WavReader::new(Cursor::new(bytes)).context("Failed to parse WAV header")?;

        let spec = reader.spec();
        if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
            anyhow::bail!(
                "Unsupported WAV format: {} bit {:?}, expected 16 bit PCM",
                spec.bits_per_sample,
                spec.sample_format
            );
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio clip decoded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Convert to mono at `target_rate`.
    ///
    /// Only integer-ratio downsampling is supported (e.g. 48kHz -> 16kHz).
    pub fn prepare(self, target_rate: u32) -> Result<Self> {
        if target_rate == 0 {
            anyhow::bail!("Target sample rate must be positive");
        }

        let clip = self.to_mono()?;

        if clip.sample_rate == target_rate {
            return Ok(clip);
        }

        if clip.sample_rate < target_rate || clip.sample_rate % target_rate != 0 {
            anyhow::bail!(
                "Cannot resample {}Hz audio to {}Hz",
                clip.sample_rate,
                target_rate
            );
        }

        Ok(clip.decimate(target_rate))
    }

    /// Split into little-endian PCM byte chunks of `chunk_ms` each
    pub fn pcm_chunks(&self, chunk_ms: u64) -> Vec<Vec<u8>> {
        let samples_per_chunk =
            ((self.sample_rate as u64 * self.channels as u64 * chunk_ms) / 1000).max(1) as usize;

        let chunks: Vec<Vec<u8>> = self
            .samples
            .chunks(samples_per_chunk)
            .map(|chunk| chunk.iter().flat_map(|s| s.to_le_bytes()).collect())
            .collect();

        debug!(
            "Split clip into {} chunks of {} samples",
            chunks.len(),
            samples_per_chunk
        );

        chunks
    }

    /// Average stereo down to mono
    fn to_mono(self) -> Result<Self> {
        match self.channels {
            1 => Ok(self),
            2 => {
                let samples = self
                    .samples
                    .chunks_exact(2)
                    .map(|pair| ((pair[0] as i32 + pair[1] as i32) / 2) as i16)
                    .collect();

                Ok(Self {
                    duration_seconds: self.duration_seconds,
                    sample_rate: self.sample_rate,
                    channels: 1,
                    samples,
                })
            }
            n => anyhow::bail!("Unsupported channel count: {}", n),
        }
    }

    /// Downsample by decimation: take every Nth sample
    fn decimate(self, target_rate: u32) -> Self {
        let ratio = (self.sample_rate / target_rate) as usize;
        let samples = self.samples.iter().step_by(ratio).copied().collect();

        Self {
            duration_seconds: self.duration_seconds,
            sample_rate: target_rate,
            channels: self.channels,
            samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(sample_rate: u32, channels: u16, samples: Vec<i16>) -> AudioClip {
        AudioClip {
            duration_seconds: 0.0,
            sample_rate,
            channels,
            samples,
        }
    }

    #[test]
    fn test_prepare_averages_stereo() {
        let prepared = clip(16000, 2, vec![100, 300, -200, -400])
            .prepare(16000)
            .unwrap();

        assert_eq!(prepared.channels, 1);
        assert_eq!(prepared.samples, vec![200, -300]);
    }

    #[test]
    fn test_prepare_decimates_integer_ratio() {
        let prepared = clip(48000, 1, (0..9).collect()).prepare(16000).unwrap();

        assert_eq!(prepared.sample_rate, 16000);
        assert_eq!(prepared.samples, vec![0, 3, 6]);
    }

    #[test]
    fn test_prepare_rejects_upsampling() {
        assert!(clip(8000, 1, vec![0; 10]).prepare(16000).is_err());
        assert!(clip(22050, 1, vec![0; 10]).prepare(16000).is_err());
    }

    #[test]
    fn test_prepare_rejects_zero_target_rate() {
        assert!(clip(16000, 1, vec![0; 10]).prepare(0).is_err());
    }

    #[test]
    fn test_pcm_chunks_split_by_duration() {
        // 250 samples at 1kHz = 250ms, 100ms chunks -> 100 + 100 + 50 samples
        let chunks = clip(1000, 1, vec![1; 250]).pcm_chunks(100);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 200);
        assert_eq!(chunks[2].len(), 100);
        assert_eq!(&chunks[0][..2], &1i16.to_le_bytes());
    }
}
