use crate::config::Config;
use crate::ffmpeg::{self, MediaProbe};
use crate::timing::format_duration;
use crate::{logi, logok};
use anyhow::{Context, Result};
use rand::Rng;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct MusicPlan {
    pub start: usize,
    /// Tracks in playback order; the pool is wrapped around as needed.
    pub tracks: Vec<PathBuf>,
    /// Untrimmed length of `tracks` played back to back.
    pub covered: f64,
}

pub fn pick_start_index<R: Rng>(rng: &mut R, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    rng.gen_range(0..len)
}

/// Walks the pool from `start`, wrapping around, until `target` seconds are covered.
///
/// Each track is probed at most once.
pub async fn plan_music(
    pool: &[PathBuf],
    start: usize,
    target: f64,
    probe: &dyn MediaProbe,
) -> Result<MusicPlan> {
    if pool.is_empty() {
        anyhow::bail!("music pool is empty");
    }
    let start = start % pool.len();

    let mut durations: Vec<Option<f64>> = vec![None; pool.len()];
    let mut tracks = Vec::new();
    let mut covered = 0.0;
    let mut idx = start;
    while covered < target {
        let dur = match durations[idx] {
            Some(d) => d,
            None => {
                let d = probe.duration_seconds(&pool[idx]).await?;
                if !(d > 0.0) {
                    anyhow::bail!("music track has no duration: {}", pool[idx].display());
                }
                durations[idx] = Some(d);
                d
            }
        };
        tracks.push(pool[idx].clone());
        covered += dur;
        idx = (idx + 1) % pool.len();
    }

    Ok(MusicPlan {
        start,
        tracks,
        covered,
    })
}

/// Concatenates the planned tracks, trims to exactly `target` and applies `volume`.
pub fn music_bed_args(
    plan: &MusicPlan,
    target: f64,
    volume: f64,
    audio_bitrate: &str,
    out_m4a: &Path,
) -> Vec<String> {
    let mut args = ffmpeg::ffmpeg_base_args();
    for track in &plan.tracks {
        args.push("-i".to_string());
        args.push(track.display().to_string());
    }

    let mut filter = String::new();
    let mut labels = String::new();
    for i in 0..plan.tracks.len() {
        filter.push_str(&format!(
            "[{i}:a]aresample=44100,aformat=sample_fmts=fltp:channel_layouts=stereo[m{i}];"
        ));
        labels.push_str(&format!("[m{i}]"));
    }
    filter.push_str(&format!(
        "{labels}concat=n={}:v=0:a=1[cat];[cat]atrim=duration={target:.3},asetpts=PTS-STARTPTS,volume={volume:.3}[bed]",
        plan.tracks.len()
    ));

    args.extend([
        "-filter_complex".to_string(),
        filter,
        "-map".to_string(),
        "[bed]".to_string(),
        "-t".to_string(),
        format!("{:.3}", target),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        audio_bitrate.to_string(),
        out_m4a.display().to_string(),
    ]);
    args
}

/// Sums the narration with the music bed at input `bed_input` into `[aout]`.
pub fn mix_filter(narration_volume: f64, bed_input: usize) -> String {
    format!(
        "[0:a]volume={narration_volume:.3}[narr];\
[narr][{bed_input}:a]amix=inputs=2:duration=first:dropout_transition=0:normalize=0[aout]"
    )
}

pub async fn render_music_bed(
    plan: &MusicPlan,
    target: f64,
    cfg: &Config,
    work_dir: &Path,
) -> Result<PathBuf> {
    let out = work_dir.join("music_bed.m4a");
    logi(format!(
        "Music bed: {} tracks from index {} ({} before trim) -> {}",
        plan.tracks.len(),
        plan.start,
        format_duration(plan.covered),
        out.display()
    ));
    let args = music_bed_args(
        plan,
        target,
        cfg.music.volume,
        &cfg.render.audio_bitrate,
        &out,
    );
    ffmpeg::run_cmd(&args)
        .await
        .context("Failed to render music bed")?;
    if !out.exists() {
        anyhow::bail!("Music bed produced no file: {}", out.display());
    }
    logok(format!("Music bed OK: {} ({})", out.display(), format_duration(target)));
    Ok(out)
}
