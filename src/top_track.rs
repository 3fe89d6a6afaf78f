use crate::config::{Config, Size};
use crate::ffmpeg::{self, MediaProbe};
use crate::timing::{ClipTiming, format_duration};
use crate::validate::{ClipPair, ValidatedInputs};
use crate::{logi, logok, logw};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Still image held for `timing.duration()` with its narration, silence-padded.
pub fn segment_args(
    pair: &ClipPair,
    timing: &ClipTiming,
    top_box: Size,
    fps: u32,
    audio_bitrate: &str,
    out_mp4: &Path,
) -> Vec<String> {
    let dur = format!("{:.3}", timing.duration());
    let (w, h) = (top_box.width, top_box.height);
    let filter = format!(
        "[0:v]scale={w}:{h}:force_original_aspect_ratio=decrease:force_divisible_by=2,\
pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1,fps={fps},format=yuv420p[v];\
[1:a]aresample=44100,aformat=channel_layouts=stereo,apad=whole_dur={dur}[a]"
    );

    let mut args = ffmpeg::ffmpeg_base_args();
    args.extend([
        "-loop".to_string(),
        "1".to_string(),
        "-framerate".to_string(),
        fps.to_string(),
        "-t".to_string(),
        dur.clone(),
        "-i".to_string(),
        pair.image.display().to_string(),
        "-i".to_string(),
        pair.audio.display().to_string(),
        "-filter_complex".to_string(),
        filter,
        "-map".to_string(),
        "[v]".to_string(),
        "-map".to_string(),
        "[a]".to_string(),
        "-t".to_string(),
        dur,
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
        out_mp4.display().to_string(),
    ]);
    args
}

/// Renders one segment per (audio, image) pair and joins them into `top.mp4`.
pub async fn build_top_track(
    validated: &ValidatedInputs,
    cfg: &Config,
    work_dir: &Path,
    probe: &dyn MediaProbe,
) -> Result<PathBuf> {
    let total = validated.pairs.len();
    let mut segments = Vec::with_capacity(total);

    for (idx, (pair, timing)) in validated
        .pairs
        .iter()
        .zip(&validated.timeline.clips)
        .enumerate()
    {
        let out = work_dir.join(format!("top_{:03}.mp4", idx + 1));
        logi(format!(
            "Top segment {}/{}: {} + {} ({:.2}s{})",
            idx + 1,
            total,
            pair.image.display(),
            pair.audio.display(),
            timing.duration(),
            if timing.section_break {
                ", section break"
            } else {
                ""
            }
        ));
        let args = segment_args(
            pair,
            timing,
            cfg.layout.top_box,
            cfg.render.fps,
            &cfg.render.audio_bitrate,
            &out,
        );
        ffmpeg::run_cmd(&args)
            .await
            .with_context(|| format!("Failed to render top segment {}", idx + 1))?;
        segments.push(out);
    }

    let list = work_dir.join("top_concat_list.txt");
    ffmpeg::write_concat_list(&list, &segments).await?;

    let top = work_dir.join("top.mp4");
    logi(format!("Concatenating {} segments -> {}", segments.len(), top.display()));
    if !ffmpeg::ffmpeg_concat_videos(&list, &top, &cfg.render.audio_bitrate).await? {
        anyhow::bail!("Top track concat produced no file: {}", top.display());
    }

    let planned = validated.timeline.total();
    let actual = probe.duration_seconds(&top).await?;
    if (actual - planned).abs() > 0.5 {
        logw(format!(
            "Top track is {} but {} was planned",
            format_duration(actual),
            format_duration(planned)
        ));
    }
    logok(format!("Top track OK: {} ({})", top.display(), format_duration(actual)));
    Ok(top)
}
