//! Clip fetching and decoding
//!
//! Fetch is host-supplied behind [`TrackFetcher`] (the engine imposes no
//! format or transport of its own); decode is symphonia. Each load runs a
//! worker thread that fetches and decodes both clips of a pair, then
//! reports back over a channel the control loop drains; the control
//! thread never blocks on I/O.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tf_core::Sample;

use crate::{ClipData, ClipPair, LoadError};

use super::TrackDefinition;

/// Host-supplied clip resource access.
///
/// `url` is whatever the track table carries: a relative asset path for
/// the filesystem fetcher, anything else for a custom host.
pub trait TrackFetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError>;
}

/// Filesystem fetcher rooted at the game's asset directory.
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TrackFetcher for FsFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        std::fs::read(self.root.join(url)).map_err(|e| LoadError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Outcome of one fetch+decode job.
#[derive(Debug)]
pub struct LoadSettled {
    pub track_id: String,
    pub result: Result<ClipPair, LoadError>,
}

/// Spawns fetch+decode workers and collects their results.
pub struct ClipLoader {
    fetcher: Arc<dyn TrackFetcher>,
    tx: Sender<LoadSettled>,
    rx: Receiver<LoadSettled>,
}

impl ClipLoader {
    pub fn new(fetcher: Arc<dyn TrackFetcher>) -> Self {
        let (tx, rx) = unbounded();
        Self { fetcher, tx, rx }
    }

    /// Start a fetch+decode worker for `def`. Deduplication against loads
    /// already in flight is the caller's job (the engine's registry).
    pub fn spawn_load(&self, def: &TrackDefinition) {
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.tx.clone();
        let def = def.clone();
        let fallback_id = def.id.clone();
        let fallback_url = def.intro_url.clone();

        let spawned = std::thread::Builder::new()
            .name(format!("tf-load-{}", def.id))
            .spawn(move || {
                let result = load_pair(fetcher.as_ref(), &def);
                // Receiver gone means the engine is shutting down
                let _ = tx.send(LoadSettled {
                    track_id: def.id,
                    result,
                });
            });

        if let Err(err) = spawned {
            log::error!("[ClipLoader] failed to spawn load worker: {err}");
            let _ = self.tx.send(LoadSettled {
                track_id: fallback_id,
                result: Err(LoadError::Fetch {
                    url: fallback_url,
                    reason: err.to_string(),
                }),
            });
        }
    }

    /// Next settled load, if any; never blocks.
    pub fn try_recv(&self) -> Option<LoadSettled> {
        self.rx.try_recv().ok()
    }
}

fn load_pair(fetcher: &dyn TrackFetcher, def: &TrackDefinition) -> Result<ClipPair, LoadError> {
    let intro_bytes = fetcher.fetch(&def.intro_url)?;
    let loop_bytes = fetcher.fetch(&def.loop_url)?;
    let intro = decode_clip(intro_bytes, &def.intro_url)?;
    let looped = decode_clip(loop_bytes, &def.loop_url)?;
    Ok(ClipPair::new(intro, looped))
}

/// Decode an in-memory audio resource to a [`ClipData`].
pub fn decode_clip(bytes: Vec<u8>, url: &str) -> Result<ClipData, LoadError> {
    let decode_err = |reason: String| LoadError::Decode {
        url: url.to_string(),
        reason,
    };

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = url.rsplit('.').next() {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| decode_err(e.to_string()))?;

    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| decode_err("no audio track".to_string()))?;

    let track_id = track.id;
    let num_channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(2);
    let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| decode_err(e.to_string()))?;

    let mut channels: Vec<Vec<Sample>> = vec![Vec::new(); num_channels];

    loop {
        match format_reader.next_packet() {
            Ok(packet) => {
                if packet.track_id() != track_id {
                    continue;
                }
                match decoder.decode(&packet) {
                    Ok(decoded) => copy_audio_buffer(&decoded, &mut channels),
                    // Recoverable corruption: skip the packet
                    Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
                    Err(e) => return Err(decode_err(e.to_string())),
                }
            }
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(decode_err(e.to_string())),
        }
    }

    if channels.is_empty() || channels[0].is_empty() {
        return Err(LoadError::Empty {
            url: url.to_string(),
        });
    }

    Ok(if channels.len() == 1 {
        ClipData::mono(channels.remove(0), sample_rate)
    } else {
        let right = channels.swap_remove(1);
        let left = channels.swap_remove(0);
        ClipData::stereo(left, right, sample_rate)
    })
}

/// Append a decoded symphonia buffer to the per-channel sample vectors.
fn copy_audio_buffer(buffer: &AudioBufferRef, output: &mut [Vec<Sample>]) {
    macro_rules! copy {
        ($buf:expr, $map:expr) => {
            for (ch, out_ch) in output.iter_mut().enumerate() {
                if ch < $buf.spec().channels.count() {
                    out_ch.extend($buf.chan(ch).iter().map($map));
                }
            }
        };
    }

    match buffer {
        AudioBufferRef::F32(buf) => copy!(buf, |&s| s),
        AudioBufferRef::F64(buf) => copy!(buf, |&s| s as Sample),
        AudioBufferRef::S8(buf) => copy!(buf, |&s| s as Sample / 128.0),
        AudioBufferRef::S16(buf) => copy!(buf, |&s| s as Sample / 32768.0),
        AudioBufferRef::S24(buf) => copy!(buf, |s| s.0 as Sample / 8388608.0),
        AudioBufferRef::S32(buf) => copy!(buf, |&s| s as Sample / 2147483648.0),
        AudioBufferRef::U8(buf) => copy!(buf, |&s| (s as Sample - 128.0) / 128.0),
        AudioBufferRef::U16(buf) => copy!(buf, |&s| (s as Sample - 32768.0) / 32768.0),
        AudioBufferRef::U24(buf) => copy!(buf, |s| (s.0 as Sample - 8388608.0) / 8388608.0),
        AudioBufferRef::U32(buf) => {
            copy!(buf, |&s| (s as Sample - 2147483648.0) / 2147483648.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn wav_bytes(num_frames: usize, sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..num_frames {
                let v = ((i as f32 * 0.05).sin() * 8000.0) as i16;
                writer.write_sample(v).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    struct MemFetcher {
        intro: Vec<u8>,
        looped: Vec<u8>,
        fetches: AtomicUsize,
    }

    impl TrackFetcher for MemFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if url.contains("intro") {
                Ok(self.intro.clone())
            } else {
                Ok(self.looped.clone())
            }
        }
    }

    fn test_def() -> TrackDefinition {
        TrackDefinition {
            id: "menu_theme".to_string(),
            intro_url: "menu_theme_intro.wav".to_string(),
            loop_url: "menu_theme_loop.wav".to_string(),
        }
    }

    #[test]
    fn test_decode_wav_frames_and_rate() {
        let bytes = wav_bytes(4410, 44100);
        let clip = decode_clip(bytes, "x.wav").unwrap();
        assert_eq!(clip.num_frames(), 4410);
        assert_eq!(clip.sample_rate(), 44100);
        assert!((clip.duration_secs() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = decode_clip(vec![0, 1, 2, 3, 4, 5, 6, 7], "x.wav").unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
    }

    #[test]
    fn test_load_settles_with_pair() {
        let fetcher = Arc::new(MemFetcher {
            intro: wav_bytes(1000, 48000),
            looped: wav_bytes(2000, 48000),
            fetches: AtomicUsize::new(0),
        });
        let loader = ClipLoader::new(fetcher.clone());
        loader.spawn_load(&test_def());

        let settled = loop {
            if let Some(s) = loader.try_recv() {
                break s;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        };

        assert_eq!(settled.track_id, "menu_theme");
        let pair = settled.result.unwrap();
        assert_eq!(pair.intro.num_frames(), 1000);
        assert_eq!(pair.looped.num_frames(), 2000);
        // One fetch per clip
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_fs_fetcher_reads_from_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.wav"), wav_bytes(100, 48000)).unwrap();

        let fetcher = FsFetcher::new(dir.path());
        assert!(fetcher.fetch("a.wav").is_ok());
        assert!(matches!(
            fetcher.fetch("missing.wav"),
            Err(LoadError::Fetch { .. })
        ));
    }
}
