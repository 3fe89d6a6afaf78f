use crate::collect;
use crate::config::Config;
use crate::ffmpeg::{Ffprobe, MediaProbe};
use crate::init;
use crate::music;
use crate::render::{self, RenderInputs};
use crate::timing::format_duration;
use crate::top_track;
use crate::validate::{self, AutoApprove, Operator, TerminalOperator};
use crate::{logi, logok};
use anyhow::{Context, Result};
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::TempDir;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Skip the confirmation prompt.
    pub assume_yes: bool,
    /// Stop after validation.
    pub dry_run: bool,
    /// Seed for the music start index; wall clock when unset.
    pub seed: Option<u64>,
}

fn now_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

enum WorkDir {
    Temp(TempDir),
    Kept(PathBuf),
}

impl WorkDir {
    fn create(cfg: &Config) -> Result<Self> {
        if cfg.keep_intermediates {
            let dir = cfg.work_dir.join(format!(
                "run_{}",
                chrono::Local::now().format("%Y%m%d_%H%M%S")
            ));
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            let dir = dir
                .canonicalize()
                .with_context(|| format!("Failed to resolve {}", dir.display()))?;
            return Ok(Self::Kept(dir));
        }
        let dir = tempfile::Builder::new()
            .prefix("run_")
            .tempdir_in(&cfg.work_dir)
            .with_context(|| format!("Failed to create work dir in {}", cfg.work_dir.display()))?;
        Ok(Self::Temp(dir))
    }

    fn path(&self) -> &Path {
        match self {
            Self::Temp(dir) => dir.path(),
            Self::Kept(dir) => dir,
        }
    }
}

/// Runs the whole pipeline with ffprobe and the terminal prompt.
///
/// Returns the written file, or `None` for a dry run.
pub async fn run_generation(cfg: &Config, opts: &RunOptions) -> Result<Option<PathBuf>> {
    let operator: &dyn Operator = if opts.assume_yes {
        &AutoApprove
    } else {
        &TerminalOperator
    };
    run_with(cfg, opts, &Ffprobe, operator).await
}

pub async fn run_with(
    cfg: &Config,
    opts: &RunOptions,
    probe: &dyn MediaProbe,
    operator: &dyn Operator,
) -> Result<Option<PathBuf>> {
    let started = chrono::Local::now();

    let inputs = collect::collect_inputs(cfg)?;
    logi(format!(
        "Found {} audio, {} images, {} long video, {} music files under {}",
        inputs.audio.len(),
        inputs.images.len(),
        inputs.long_videos.len(),
        inputs.music.len(),
        cfg.input_root.display()
    ));

    let validated = validate::validate_inputs(inputs, cfg, probe).await?;
    logok(format!(
        "Inputs valid: top track {}, long video {}",
        format_duration(validated.timeline.total()),
        format_duration(validated.long_video_available)
    ));

    logi(format!("Plan: {}", validated.summary()));
    validate::confirm(&validated, operator)?;

    if opts.dry_run {
        logi("Dry run: stopping before any media is rendered.");
        return Ok(None);
    }

    init::ensure_directories(cfg).await?;
    let work = WorkDir::create(cfg)?;
    let work_dir = work.path();
    logi(format!("Intermediates in {}", work_dir.display()));

    let top = top_track::build_top_track(&validated, cfg, work_dir, probe).await?;

    let duration = validated.output_duration();
    let mut rng = rand::rngs::StdRng::seed_from_u64(opts.seed.unwrap_or_else(now_seed));
    let start = music::pick_start_index(&mut rng, validated.music.len());
    let plan = music::plan_music(&validated.music, start, duration, probe).await?;
    let bed = music::render_music_bed(&plan, duration, cfg, work_dir).await?;

    let render_inputs = RenderInputs {
        top_track: &top,
        long_video: &validated.long_video,
        frame: validated.frame.as_deref(),
        music_bed: &bed,
    };
    render::render_final(&render_inputs, cfg, duration, &cfg.output).await?;

    if let WorkDir::Kept(dir) = &work {
        logi(format!("Kept intermediates: {}", dir.display()));
    }

    let elapsed = chrono::Local::now() - started;
    logok(format!(
        "Done in {}: {}",
        format_duration(elapsed.num_milliseconds() as f64 / 1000.0),
        cfg.output.display()
    ));
    Ok(Some(cfg.output.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InputError;
    use async_trait::async_trait;
    use std::fs;

    /// 60s for the long video, 5s for everything else.
    struct FixedProbe;

    #[async_trait]
    impl MediaProbe for FixedProbe {
        async fn duration_seconds(&self, path: &Path) -> Result<f64> {
            if path.ends_with("long.mkv") {
                Ok(60.0)
            } else {
                Ok(5.0)
            }
        }
    }

    struct Answer(bool);

    impl Operator for Answer {
        fn confirm(&self, _prompt: &str) -> Result<bool> {
            Ok(self.0)
        }
    }

    fn project() -> (TempDir, Config) {
        let root = tempfile::tempdir().unwrap();
        for (folder, files) in [
            ("Audio", &["audio_a1.mp3", "audio_a2.mp3"][..]),
            ("Images", &["1.png", "2.png"][..]),
            ("LongVideo", &["long.mkv"][..]),
            ("Music", &["song.mp3"][..]),
        ] {
            fs::create_dir(root.path().join(folder)).unwrap();
            for file in files {
                fs::write(root.path().join(folder).join(file), b"x").unwrap();
            }
        }
        fs::write(root.path().join("frame.png"), b"x").unwrap();
        let cfg = Config {
            input_root: root.path().to_path_buf(),
            output: root.path().join("output/final.mp4"),
            work_dir: root.path().join("work"),
            ..Config::default()
        };
        (root, cfg)
    }

    #[tokio::test]
    async fn dry_run_renders_nothing() {
        let (root, cfg) = project();
        let opts = RunOptions {
            dry_run: true,
            ..RunOptions::default()
        };
        let out = run_with(&cfg, &opts, &FixedProbe, &Answer(true))
            .await
            .unwrap();
        assert!(out.is_none());
        assert!(!root.path().join("work").exists());
        assert!(!root.path().join("output").exists());
    }

    #[tokio::test]
    async fn declined_run_stops_before_work() {
        let (root, cfg) = project();
        let err = run_with(&cfg, &RunOptions::default(), &FixedProbe, &Answer(false))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InputError>(),
            Some(InputError::Declined)
        ));
        assert!(!root.path().join("work").exists());
    }

    #[tokio::test]
    async fn missing_folder_is_reported() {
        let (root, cfg) = project();
        fs::remove_dir_all(root.path().join("Music")).unwrap();
        let err = run_with(&cfg, &RunOptions::default(), &FixedProbe, &Answer(true))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InputError>(),
            Some(InputError::FolderUnreadable { .. })
        ));
    }

    #[test]
    fn temp_work_dir_is_removed_on_drop() {
        let (root, mut cfg) = project();
        fs::create_dir(&cfg.work_dir).unwrap();
        let path = {
            let work = WorkDir::create(&cfg).unwrap();
            assert!(work.path().is_dir());
            work.path().to_path_buf()
        };
        assert!(!path.exists());

        cfg.keep_intermediates = true;
        let work = WorkDir::create(&cfg).unwrap();
        let work_root = root.path().join("work").canonicalize().unwrap();
        assert!(work.path().starts_with(&work_root));
        drop(work);
        assert_eq!(fs::read_dir(&work_root).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn kept_work_dir_from_relative_root_feeds_concat() {
        let (root, mut cfg) = project();
        let cwd = std::env::current_dir().unwrap();
        let mut relative = PathBuf::new();
        for _ in cwd.components().skip(1) {
            relative.push("..");
        }
        relative.push(root.path().strip_prefix("/").unwrap());
        relative.push("work");
        assert!(relative.is_relative());
        cfg.work_dir = relative;
        cfg.keep_intermediates = true;

        let work = WorkDir::create(&cfg).unwrap();
        assert!(work.path().is_absolute());

        let segment = work.path().join("top_001.mp4");
        fs::write(&segment, b"x").unwrap();
        let list = work.path().join("top_concat_list.txt");
        crate::ffmpeg::write_concat_list(&list, &[segment]).await.unwrap();

        let text = fs::read_to_string(&list).unwrap();
        assert_eq!(text, "file 'top_001.mp4'\n");
        assert!(list.parent().unwrap().join("top_001.mp4").exists());
    }
}
