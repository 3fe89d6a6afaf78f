use crate::compose;
use crate::config::Config;
use crate::ffmpeg;
use crate::music;
use crate::timing::format_duration;
use crate::{logi, logok};
use anyhow::{Context, Result};
use std::path::Path;

/// Source files of the final encode.
#[derive(Debug, Clone, Copy)]
pub struct RenderInputs<'a> {
    pub top_track: &'a Path,
    pub long_video: &'a Path,
    pub frame: Option<&'a Path>,
    pub music_bed: &'a Path,
}

pub fn render_args(
    inputs: &RenderInputs<'_>,
    cfg: &Config,
    duration: f64,
    out_mp4: &Path,
) -> Vec<String> {
    let mut args = ffmpeg::ffmpeg_base_args();
    args.extend(["-i".to_string(), inputs.top_track.display().to_string()]);
    if cfg.layout.long_video_offset > 0.0 {
        args.extend(["-ss".to_string(), format!("{:.3}", cfg.layout.long_video_offset)]);
    }
    args.extend(["-i".to_string(), inputs.long_video.display().to_string()]);

    let frame_input = match inputs.frame {
        Some(frame) => {
            args.extend(["-i".to_string(), frame.display().to_string()]);
            Some(2)
        }
        None => None,
    };
    let bed_input = if frame_input.is_some() { 3 } else { 2 };
    args.extend(["-i".to_string(), inputs.music_bed.display().to_string()]);

    let filter = format!(
        "{};{}",
        compose::composite_filter(&cfg.layout, cfg.render.fps, frame_input),
        music::mix_filter(cfg.music.narration_volume, bed_input)
    );

    let r = &cfg.render;
    args.extend([
        "-filter_complex".to_string(),
        filter,
        "-map".to_string(),
        "[vout]".to_string(),
        "-map".to_string(),
        "[aout]".to_string(),
        "-t".to_string(),
        format!("{:.3}", duration),
        "-r".to_string(),
        r.fps.to_string(),
        "-c:v".to_string(),
        r.codec.clone(),
        "-preset".to_string(),
        r.preset.clone(),
        "-b:v".to_string(),
        r.video_bitrate.clone(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        r.audio_bitrate.clone(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        out_mp4.display().to_string(),
    ]);
    args
}

/// Encodes the composite with the mixed audio. Encoder failures are not retried.
pub async fn render_final(
    inputs: &RenderInputs<'_>,
    cfg: &Config,
    duration: f64,
    out_mp4: &Path,
) -> Result<()> {
    logi(format!(
        "Rendering {} at {} fps, {} ({}) -> {}",
        format_duration(duration),
        cfg.render.fps,
        cfg.render.video_bitrate,
        cfg.render.preset,
        out_mp4.display()
    ));
    ffmpeg::run_cmd(&render_args(inputs, cfg, duration, out_mp4))
        .await
        .context("Final render failed")?;
    if !out_mp4.exists() {
        anyhow::bail!("Render produced no file: {}", out_mp4.display());
    }
    logok(format!("Wrote output: {}", out_mp4.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(frame: Option<&Path>) -> RenderInputs<'_> {
        RenderInputs {
            top_track: Path::new("work/top.mp4"),
            long_video: Path::new("LongVideo/long.mkv"),
            frame,
            music_bed: Path::new("work/music_bed.m4a"),
        }
    }

    #[test]
    fn numbers_inputs_with_frame() {
        let cfg = Config::default();
        let frame = Path::new("frame.png");
        let args = render_args(&inputs(Some(frame)), &cfg, 30.9, Path::new("out.mp4"));
        let joined = args.join(" ");
        assert!(joined.contains(
            "-i work/top.mp4 -i LongVideo/long.mkv -i frame.png -i work/music_bed.m4a -filter_complex"
        ));
        assert!(joined.contains("[2:v]scale="));
        assert!(joined.contains("[narr][3:a]amix"));
        assert!(joined.contains("-map [vout] -map [aout] -t 30.900 -r 30"));
        assert!(joined.contains("-c:v libx264 -preset veryfast -b:v 8M"));
        assert!(!joined.contains("-ss"));
        assert_eq!(args.last().unwrap(), "out.mp4");
    }

    #[test]
    fn numbers_inputs_without_frame() {
        let cfg = Config::default();
        let args = render_args(&inputs(None), &cfg, 12.0, Path::new("out.mp4"));
        let joined = args.join(" ");
        assert!(joined.contains("-i LongVideo/long.mkv -i work/music_bed.m4a"));
        assert!(joined.contains("[narr][2:a]amix"));
        assert!(!joined.contains("[frame]"));
    }

    #[test]
    fn seeks_long_video_to_offset() {
        let mut cfg = Config::default();
        cfg.layout.long_video_offset = 12.5;
        cfg.render.fps = 24;
        let args = render_args(&inputs(None), &cfg, 12.0, Path::new("out.mp4"));
        let joined = args.join(" ");
        assert!(joined.contains("-ss 12.500 -i LongVideo/long.mkv"));
        assert!(joined.contains("-r 24"));
    }
}
