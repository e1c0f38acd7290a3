//! FFmpeg-backed implementation of the `MediaEngine` capability.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use vidmill_core::models::Operation;

use super::{EngineError, MediaEngine};

const COMPRESS_VIDEO_BITRATE: &str = "500k";
const EXTRACT_AUDIO_BITRATE: &str = "192k";
const GIF_FILTER: &str = "fps=10,scale=320:-1:flags=lanczos";

pub struct FfmpegEngine {
    ffmpeg_path: String,
}

impl FfmpegEngine {
    pub fn new(ffmpeg_path: impl Into<String>) -> Result<Self, EngineError> {
        let ffmpeg_path = ffmpeg_path.into();

        let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
        if ffmpeg_path.is_empty() || ffmpeg_path.chars().any(|c| dangerous_chars.contains(&c)) {
            return Err(EngineError::Config(
                "ffmpeg path is empty or contains dangerous characters".to_string(),
            ));
        }

        Ok(Self { ffmpeg_path })
    }

    /// Argument list for one invocation. Pure so the per-operation command
    /// lines are unit-testable.
    fn build_args(input: &Path, operation: &Operation, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy().to_string();
        let output = output.to_string_lossy().to_string();

        let mut args: Vec<String> = Vec::new();
        match operation {
            Operation::Compress => {
                args.extend(["-i".into(), input]);
                args.extend(["-b:v".into(), COMPRESS_VIDEO_BITRATE.into()]);
            }
            Operation::ChangeResolution { width, height } => {
                args.extend(["-i".into(), input]);
                args.extend(["-vf".into(), format!("scale={}:{}", width, height)]);
            }
            Operation::ChangeAspectRatio { aspect_ratio } => {
                args.extend(["-i".into(), input]);
                args.extend(["-vf".into(), format!("setsar=1,setdar={}", aspect_ratio)]);
            }
            Operation::ExtractAudio => {
                args.extend(["-i".into(), input]);
                args.extend(["-vn".into()]);
                args.extend(["-acodec".into(), "libmp3lame".into()]);
                args.extend(["-b:a".into(), EXTRACT_AUDIO_BITRATE.into()]);
                args.extend(["-f".into(), "mp3".into()]);
            }
            Operation::CreateGif {
                start_time,
                duration,
            } => {
                args.extend(["-ss".into(), start_time.to_string()]);
                args.extend(["-t".into(), duration.to_string()]);
                args.extend(["-i".into(), input]);
                args.extend(["-vf".into(), GIF_FILTER.into()]);
            }
            Operation::CreateWebm {
                start_time,
                duration,
            } => {
                args.extend(["-ss".into(), start_time.to_string()]);
                args.extend(["-t".into(), duration.to_string()]);
                args.extend(["-i".into(), input]);
                args.extend(["-f".into(), "webm".into()]);
            }
        }
        args.push("-y".into());
        args.push(output);
        args
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn transform(
        &self,
        input: &Path,
        operation: &Operation,
        output: &Path,
    ) -> Result<(), EngineError> {
        let args = Self::build_args(input, operation, output);

        tracing::debug!(
            operation = operation.name(),
            ffmpeg = %self.ffmpeg_path,
            "Invoking ffmpeg"
        );

        let result = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(EngineError::CommandFailed(format!(
                "ffmpeg exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }

        tracing::info!(
            operation = operation.name(),
            output = %output.display(),
            "ffmpeg finished"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn paths() -> (PathBuf, PathBuf) {
        (PathBuf::from("/tmp/in.mp4"), PathBuf::from("/tmp/out.mp4"))
    }

    #[test]
    fn test_rejects_dangerous_ffmpeg_path() {
        assert!(FfmpegEngine::new("ffmpeg; rm -rf /").is_err());
        assert!(FfmpegEngine::new("").is_err());
        assert!(FfmpegEngine::new("/usr/bin/ffmpeg").is_ok());
    }

    #[test]
    fn test_compress_args() {
        let (input, output) = paths();
        let args = FfmpegEngine::build_args(&input, &Operation::Compress, &output);
        assert_eq!(
            args,
            vec!["-i", "/tmp/in.mp4", "-b:v", "500k", "-y", "/tmp/out.mp4"]
        );
    }

    #[test]
    fn test_change_resolution_args() {
        let (input, output) = paths();
        let op = Operation::ChangeResolution {
            width: 640,
            height: 480,
        };
        let args = FfmpegEngine::build_args(&input, &op, &output);
        assert!(args.contains(&"-vf".to_string()));
        assert!(args.contains(&"scale=640:480".to_string()));
    }

    #[test]
    fn test_change_aspect_ratio_args() {
        let (input, output) = paths();
        let op = Operation::ChangeAspectRatio {
            aspect_ratio: "16:9".to_string(),
        };
        let args = FfmpegEngine::build_args(&input, &op, &output);
        assert!(args.contains(&"setsar=1,setdar=16:9".to_string()));
    }

    #[test]
    fn test_extract_audio_args() {
        let (input, output) = paths();
        let args = FfmpegEngine::build_args(&input, &Operation::ExtractAudio, &output);
        assert!(args.contains(&"-vn".to_string()));
        assert!(args.contains(&"libmp3lame".to_string()));
        assert!(args.contains(&"mp3".to_string()));
    }

    #[test]
    fn test_clip_args_seek_before_input() {
        let (input, output) = paths();
        let op = Operation::CreateGif {
            start_time: 1.5,
            duration: 3.0,
        };
        let args = FfmpegEngine::build_args(&input, &op, &output);
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let i = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < i, "seek options must precede the input");
        assert_eq!(args[ss + 1], "1.5");
        assert!(args.contains(&GIF_FILTER.to_string()));
    }

    #[test]
    fn test_webm_args() {
        let (input, output) = paths();
        let op = Operation::CreateWebm {
            start_time: 0.0,
            duration: 2.0,
        };
        let args = FfmpegEngine::build_args(&input, &op, &output);
        assert!(args.contains(&"webm".to_string()));
        assert_eq!(args.last().unwrap(), "/tmp/out.mp4");
        assert!(args.contains(&"-y".to_string()));
    }
}
