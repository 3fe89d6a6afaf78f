use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;

/// Anything that can report the playing time of a media file.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn duration_seconds(&self, path: &Path) -> Result<f64>;
}

/// `MediaProbe` backed by the `ffprobe` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ffprobe;

#[async_trait]
impl MediaProbe for Ffprobe {
    async fn duration_seconds(&self, path: &Path) -> Result<f64> {
        ffprobe_duration_seconds(path).await
    }
}

pub async fn run_cmd(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Ok(());
    }

    let mut cmd = Command::new(&args[0]);
    if args.len() > 1 {
        cmd.args(&args[1..]);
    }

    let status = cmd
        .status()
        .await
        .with_context(|| format!("Failed to start {}", args[0]))?;
    if !status.success() {
        return Err(anyhow::anyhow!("Command failed ({}): {:?}", status, args));
    }

    Ok(())
}

/// Common prefix of every ffmpeg invocation: overwrite, quiet.
pub fn ffmpeg_base_args() -> Vec<String> {
    vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
    ]
}

pub async fn ffprobe_duration_seconds(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .context("ffprobe execution failed")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    parse_duration(&String::from_utf8_lossy(&output.stdout))
        .with_context(|| format!("Invalid duration for {}", path.display()))
}

fn parse_duration(text: &str) -> Result<f64> {
    let text = text.trim();
    let duration = text
        .parse::<f64>()
        .with_context(|| format!("unparsable ffprobe output {text:?}"))?;
    if !(duration > 0.1) {
        return Err(anyhow::anyhow!("duration too short ({duration})"));
    }
    Ok(duration)
}

/// Escapes a file name for a `file '...'` line of the concat demuxer.
fn concat_entry(name: &str) -> String {
    format!("file '{}'\n", name.replace('\'', r"'\''"))
}

/// Writes a concat list next to `files`, naming each by its bare file name.
///
/// The demuxer resolves entries against the list's own folder, so every file
/// must live in the same folder as `list_txt`.
pub async fn write_concat_list(list_txt: &Path, files: &[PathBuf]) -> Result<()> {
    let mut body = String::new();
    for file in files {
        let name = file
            .file_name()
            .with_context(|| format!("Concat entry has no file name: {}", file.display()))?;
        if file.parent() != list_txt.parent() {
            anyhow::bail!(
                "Concat entry {} is not next to {}",
                file.display(),
                list_txt.display()
            );
        }
        body.push_str(&concat_entry(&name.to_string_lossy()));
    }
    fs::write(list_txt, body)
        .await
        .with_context(|| format!("Failed to write concat list {}", list_txt.display()))
}

pub fn concat_videos_args(list_txt: &Path, out_mp4: &Path, audio_bitrate: &str) -> Vec<String> {
    let mut args = ffmpeg_base_args();
    args.extend([
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        list_txt.display().to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-crf".to_string(),
        "18".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        audio_bitrate.to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        out_mp4.display().to_string(),
    ]);
    args
}

/// Joins same-sized segments listed in `list_txt`, re-encoding every frame.
pub async fn ffmpeg_concat_videos(
    list_txt: &Path,
    out_mp4: &Path,
    audio_bitrate: &str,
) -> Result<bool> {
    run_cmd(&concat_videos_args(list_txt, out_mp4, audio_bitrate)).await?;
    Ok(out_mp4.exists())
}
