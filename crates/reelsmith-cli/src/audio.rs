//! Headless audio sessions for the command line.
//!
//! There is no waveform or speaker here: a session only remembers its trim
//! region and play state, and the track duration comes from probing the
//! container with symphonia.

use std::io::Cursor;
use std::path::Path;

use anyhow::{anyhow, Result};
use reelsmith_core::{AudioSession, AudioSessionFactory, SessionId};
use symphonia::core::{
    formats::FormatOptions,
    io::{MediaSourceStream, MediaSourceStreamOptions},
    meta::MetadataOptions,
    probe::Hint,
};
use tracing::debug;

#[derive(Debug)]
pub struct HeadlessSession {
    id: SessionId,
    path: String,
    region: Option<(f64, f64)>,
    playing: bool,
}

impl HeadlessSession {
    fn new(id: SessionId, path: &str) -> Self {
        Self {
            id,
            path: path.to_string(),
            region: None,
            playing: false,
        }
    }
}

impl AudioSession for HeadlessSession {
    fn install_region(&mut self, start: f64, end: f64) -> reelsmith_core::Result<()> {
        self.region = Some((start, end));
        debug!(session_id = %self.id, start, end, "Installed trim region");
        Ok(())
    }

    fn play(&mut self) -> reelsmith_core::Result<()> {
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> reelsmith_core::Result<()> {
        self.playing = false;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn play_range(&mut self, start: f64, end: f64) -> reelsmith_core::Result<()> {
        debug!(session_id = %self.id, start, end, "Region playback requested");
        self.playing = true;
        Ok(())
    }

    fn destroy(&mut self) {
        self.playing = false;
        debug!(session_id = %self.id, path = %self.path, "Closed headless session");
    }
}

/// Opens a [`HeadlessSession`] per selected track.
#[derive(Debug, Default)]
pub struct HeadlessSessions;

impl AudioSessionFactory for HeadlessSessions {
    fn open(&mut self, id: SessionId, path: &str) -> reelsmith_core::Result<Box<dyn AudioSession>> {
        Ok(Box::new(HeadlessSession::new(id, path)))
    }
}

/// Duration in seconds of an encoded track.
///
/// `path` is only used for its extension, as a format hint.
pub fn probe_duration(bytes: Vec<u8>, path: &str) -> Result<f64> {
    let mss = MediaSourceStream::new(
        Box::new(Cursor::new(bytes)),
        MediaSourceStreamOptions::default(),
    );

    let mut hint = Hint::new();
    if let Some(ext) = Path::new(path).extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| anyhow!("unsupported audio file {}: {}", path, e))?;

    let track = probed
        .format
        .default_track()
        .ok_or_else(|| anyhow!("no default audio track in {}", path))?;
    let params = &track.codec_params;
    let frames = params
        .n_frames
        .ok_or_else(|| anyhow!("audio track in {} has unknown length", path))?;

    let secs = if let Some(time_base) = params.time_base {
        let time = time_base.calc_time(frames);
        time.seconds as f64 + time.frac
    } else {
        let rate = params
            .sample_rate
            .ok_or_else(|| anyhow!("audio track in {} missing sample rate", path))?;
        frames as f64 / rate as f64
    };
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 16-bit mono PCM WAV of silence.
    fn wav(sample_rate: u32, frames: u32) -> Vec<u8> {
        let data_len = frames * 2;
        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&1u16.to_le_bytes()); // mono
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        out.resize(44 + data_len as usize, 0);
        out
    }

    #[test]
    fn test_probe_wav_duration() {
        let secs = probe_duration(wav(8000, 20000), "/music/clip.wav").unwrap();
        assert!((secs - 2.5).abs() < 1e-6, "got {}", secs);
    }

    #[test]
    fn test_probe_rejects_garbage() {
        let err = probe_duration(vec![0u8; 64], "/music/clip.mp3").unwrap_err();
        assert!(err.to_string().contains("/music/clip.mp3"));
    }

    #[test]
    fn test_headless_session_tracks_state() {
        let mut factory = HeadlessSessions;
        let mut session = factory.open(SessionId(1), "/music/a.mp3").unwrap();
        assert!(!session.is_playing());

        session.install_region(0.0, 30.0).unwrap();
        session.play_range(5.0, 10.0).unwrap();
        assert!(session.is_playing());

        session.pause().unwrap();
        assert!(!session.is_playing());

        session.play().unwrap();
        session.destroy();
        assert!(!session.is_playing());
    }
}
