use crate::error::{AnchorcastError, AnchorcastResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

// ---------------------------------------------------------------------------
// Mix layout
// ---------------------------------------------------------------------------

/// One bed/sfx/tag track layered under the voice.
#[derive(Debug, Clone, Copy)]
pub struct PackTrack {
    pub label: &'static str,
    /// Path relative to the pack directory.
    pub file: &'static str,
    pub gain: f64,
    pub delay_ms: u32,
}

const VOICE_GAIN: f64 = 1.00;

/// Pack tracks in input order (ffmpeg inputs 1..=8; the voice is input 0).
pub const PACK_TRACKS: [PackTrack; 8] = [
    PackTrack { label: "logo", file: "music/MUS_logo_01.wav", gain: 0.80, delay_ms: 0 },
    PackTrack { label: "intro", file: "music/MUS_intro_01.wav", gain: 0.55, delay_ms: 800 },
    PackTrack { label: "bed", file: "music/MUS_bed_loop_01.wav", gain: 0.16, delay_ms: 800 },
    PackTrack { label: "outro", file: "music/MUS_outro_01.wav", gain: 0.55, delay_ms: 14200 },
    PackTrack { label: "whoosh", file: "sfx/SFX_whoosh_short_01.wav", gain: 0.55, delay_ms: 2000 },
    PackTrack { label: "hit", file: "sfx/SFX_hit_hard_01.wav", gain: 0.60, delay_ms: 7500 },
    PackTrack { label: "tagopen", file: "tags/TAG_open.wav", gain: 1.00, delay_ms: 800 },
    PackTrack { label: "tagclose", file: "tags/TAG_close.wav", gain: 1.00, delay_ms: 13800 },
];

/// Tracks whose presence pushes the bed down, in compression order.
const DUCK_TRIGGERS: [&str; 3] = ["voice", "tagopen", "tagclose"];
const DUCK_PARAMS: &str = "threshold=0.02:ratio=8:attack=10:release=250";
const LOUDNORM: &str = "loudnorm=I=-14:TP=-1.0:LRA=11";
const MIX_CHANNELS: u32 = 2;
const MIX_SAMPLE_RATE: u32 = 48_000;

/// Absolute paths of every pack track, in input order.
pub fn pack_files(pack_dir: &Path) -> Vec<PathBuf> {
    PACK_TRACKS.iter().map(|t| pack_dir.join(t.file)).collect()
}

fn track_chain(input: usize, label: &str, gain: f64, delay_ms: u32, duration_sec: f64) -> String {
    let delay = if delay_ms > 0 {
        format!(",adelay={delay_ms}|{delay_ms}")
    } else {
        String::new()
    };
    format!("[{input}:a]atrim=0:{duration_sec},asetpts=N/SR/TB{delay},volume={gain:.2}[{label}]")
}

/// The `-filter_complex` graph: trim, delay and gain every input, duck the
/// bed under voice and both tags, sum all nine, then loudness-normalize.
pub fn mix_filter_graph(duration_sec: f64) -> String {
    let mut parts = vec![track_chain(0, "voice", VOICE_GAIN, 0, duration_sec)];
    for (i, track) in PACK_TRACKS.iter().enumerate() {
        parts.push(track_chain(i + 1, track.label, track.gain, track.delay_ms, duration_sec));
    }

    // Sidechain chain: [bed][voice] -> bedduck1 -> ... -> bedduck
    let mut ducked = "bed".to_string();
    for (i, trigger) in DUCK_TRIGGERS.iter().enumerate() {
        let out = if i + 1 == DUCK_TRIGGERS.len() {
            "bedduck".to_string()
        } else {
            format!("bedduck{}", i + 1)
        };
        parts.push(format!("[{ducked}][{trigger}]sidechaincompress={DUCK_PARAMS}[{out}]"));
        ducked = out;
    }

    let mix_inputs: String = std::iter::once("voice")
        .chain(PACK_TRACKS.iter().map(|t| t.label))
        .map(|label| {
            if label == "bed" {
                format!("[{ducked}]")
            } else {
                format!("[{label}]")
            }
        })
        .collect();
    parts.push(format!(
        "{mix_inputs}amix=inputs={}:normalize=0[mix]",
        PACK_TRACKS.len() + 1
    ));
    parts.push(format!("[mix]{LOUDNORM}[out]"));

    parts.join(";")
}

/// Full ffmpeg argument list for the mix.
pub fn mix_args(voice: &Path, out: &Path, pack_dir: &Path, duration_sec: f64) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), voice.into()];
    for file in pack_files(pack_dir) {
        args.push("-i".into());
        args.push(file.into());
    }
    args.extend([
        "-filter_complex".into(),
        mix_filter_graph(duration_sec).into(),
        "-map".into(),
        "[out]".into(),
        "-ac".into(),
        MIX_CHANNELS.to_string().into(),
        "-ar".into(),
        MIX_SAMPLE_RATE.to_string().into(),
        out.into(),
    ]);
    args
}

/// ffmpeg arguments to put `audio` under the untouched video stream.
pub fn mux_args(video_in: &Path, audio_in: &Path, video_out: &Path) -> Vec<OsString> {
    vec![
        "-y".into(),
        "-i".into(),
        video_in.into(),
        "-i".into(),
        audio_in.into(),
        "-c:v".into(),
        "copy".into(),
        "-c:a".into(),
        "aac".into(),
        "-b:a".into(),
        "192k".into(),
        "-shortest".into(),
        video_out.into(),
    ]
}

// ---------------------------------------------------------------------------
// Media tool
// ---------------------------------------------------------------------------

/// External media processing used by the pipeline and the tag builder.
pub trait MediaTool {
    /// Layer the pack under `voice` and write the normalized mix to `out`.
    fn mix(&self, voice: &Path, out: &Path, pack_dir: &Path, duration_sec: f64)
        -> AnchorcastResult<()>;

    /// Copy the video stream of `video_in` and encode `audio_in` alongside it.
    fn mux(&self, video_in: &Path, audio_in: &Path, video_out: &Path) -> AnchorcastResult<()>;

    /// Convert any audio file to 48 kHz stereo WAV.
    fn to_wav(&self, input: &Path, output: &Path) -> AnchorcastResult<()>;
}

/// [`MediaTool`] backed by the `ffmpeg` binary on `PATH`.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    program: OsString,
}

impl Ffmpeg {
    pub fn new() -> Self {
        Self {
            program: "ffmpeg".into(),
        }
    }

    fn run(&self, what: &str, args: &[OsString]) -> AnchorcastResult<()> {
        debug!("Running ffmpeg {what}: {:?}", args);
        let output = Command::new(&self.program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| AnchorcastError::Ffmpeg(format!("Failed to spawn ffmpeg {what}: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            return Err(AnchorcastError::Ffmpeg(format!(
                "FFmpeg {what} failed ({}): {}",
                output.status,
                tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
            )));
        }
        Ok(())
    }
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaTool for Ffmpeg {
    fn mix(
        &self,
        voice: &Path,
        out: &Path,
        pack_dir: &Path,
        duration_sec: f64,
    ) -> AnchorcastResult<()> {
        if let Some(missing) = pack_files(pack_dir).into_iter().find(|p| !p.exists()) {
            return Err(AnchorcastError::PackFileMissing(missing));
        }
        self.run("mix", &mix_args(voice, out, pack_dir, duration_sec))
    }

    fn mux(&self, video_in: &Path, audio_in: &Path, video_out: &Path) -> AnchorcastResult<()> {
        self.run("mux", &mux_args(video_in, audio_in, video_out))
    }

    fn to_wav(&self, input: &Path, output: &Path) -> AnchorcastResult<()> {
        let args: Vec<OsString> = vec![
            "-y".into(),
            "-i".into(),
            input.into(),
            "-ar".into(),
            MIX_SAMPLE_RATE.to_string().into(),
            "-ac".into(),
            MIX_CHANNELS.to_string().into(),
            output.into(),
        ];
        self.run("wav conversion", &args)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_graph_track_chains() {
        let graph = mix_filter_graph(15.0);
        let parts: Vec<&str> = graph.split(';').collect();

        assert_eq!(parts[0], "[0:a]atrim=0:15,asetpts=N/SR/TB,volume=1.00[voice]");
        assert_eq!(parts[1], "[1:a]atrim=0:15,asetpts=N/SR/TB,volume=0.80[logo]");
        assert_eq!(
            parts[2],
            "[2:a]atrim=0:15,asetpts=N/SR/TB,adelay=800|800,volume=0.55[intro]"
        );
        assert_eq!(
            parts[3],
            "[3:a]atrim=0:15,asetpts=N/SR/TB,adelay=800|800,volume=0.16[bed]"
        );
        assert!(graph.contains("[4:a]atrim=0:15,asetpts=N/SR/TB,adelay=14200|14200,volume=0.55[outro]"));
        assert!(graph.contains("adelay=2000|2000,volume=0.55[whoosh]"));
        assert!(graph.contains("adelay=7500|7500,volume=0.60[hit]"));
        assert!(graph.contains("[7:a]atrim=0:15,asetpts=N/SR/TB,adelay=800|800,volume=1.00[tagopen]"));
        assert!(graph.contains("[8:a]atrim=0:15,asetpts=N/SR/TB,adelay=13800|13800,volume=1.00[tagclose]"));
    }

    #[test]
    fn test_filter_graph_ducking_and_master() {
        let graph = mix_filter_graph(15.0);
        let parts: Vec<&str> = graph.split(';').collect();
        let n = parts.len();

        assert_eq!(n, 9 + 3 + 2);
        assert_eq!(
            parts[9],
            "[bed][voice]sidechaincompress=threshold=0.02:ratio=8:attack=10:release=250[bedduck1]"
        );
        assert_eq!(
            parts[10],
            "[bedduck1][tagopen]sidechaincompress=threshold=0.02:ratio=8:attack=10:release=250[bedduck2]"
        );
        assert_eq!(
            parts[11],
            "[bedduck2][tagclose]sidechaincompress=threshold=0.02:ratio=8:attack=10:release=250[bedduck]"
        );
        assert_eq!(
            parts[12],
            "[voice][logo][intro][bedduck][outro][whoosh][hit][tagopen][tagclose]amix=inputs=9:normalize=0[mix]"
        );
        assert_eq!(parts[13], "[mix]loudnorm=I=-14:TP=-1.0:LRA=11[out]");
    }

    #[test]
    fn test_filter_graph_fractional_duration() {
        assert!(mix_filter_graph(9.5).starts_with("[0:a]atrim=0:9.5,"));
    }

    #[test]
    fn test_mix_args_order() {
        let args = mix_args(
            Path::new("out/voice.mp3"),
            Path::new("out/mix.wav"),
            Path::new("pack"),
            15.0,
        );
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(&args[..3], &["-y", "-i", "out/voice.mp3"]);
        let inputs: Vec<&String> = args
            .iter()
            .enumerate()
            .filter(|(i, _)| *i > 0 && args[i - 1] == "-i")
            .map(|(_, a)| a)
            .collect();
        assert_eq!(inputs.len(), 9);
        assert_eq!(inputs[1], &Path::new("pack").join("music/MUS_logo_01.wav").display().to_string());
        assert_eq!(inputs[8], &Path::new("pack").join("tags/TAG_close.wav").display().to_string());
        assert_eq!(
            &args[args.len() - 7..],
            &["-map", "[out]", "-ac", "2", "-ar", "48000", "out/mix.wav"]
        );
    }

    #[test]
    fn test_mux_args() {
        let args: Vec<String> = mux_args(Path::new("raw.mp4"), Path::new("mix.wav"), Path::new("final.mp4"))
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "-y", "-i", "raw.mp4", "-i", "mix.wav", "-c:v", "copy", "-c:a", "aac", "-b:a",
                "192k", "-shortest", "final.mp4"
            ]
        );
    }

    #[test]
    fn test_mix_reports_missing_pack_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Ffmpeg::new()
            .mix(
                &dir.path().join("voice.mp3"),
                &dir.path().join("mix.wav"),
                dir.path(),
                15.0,
            )
            .unwrap_err();
        match err {
            AnchorcastError::PackFileMissing(path) => {
                assert!(path.ends_with("music/MUS_logo_01.wav"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_nonzero_exit_is_ffmpeg_error() {
        let tool = Ffmpeg { program: "false".into() };
        let err = tool
            .mux(Path::new("a.mp4"), Path::new("b.wav"), Path::new("c.mp4"))
            .unwrap_err();
        assert!(matches!(err, AnchorcastError::Ffmpeg(_)));
    }
}
