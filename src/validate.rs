use crate::collect::InputSet;
use crate::config::Config;
use crate::error::InputError;
use crate::ffmpeg::MediaProbe;
use crate::timing::{SectionMatcher, TimelinePlan, format_duration, plan_timeline};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Answers the go/no-go question before rendering starts.
pub trait Operator {
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Asks on the terminal.
///
/// The prompt blocks the calling thread until stdin answers. Call it only
/// while no other task is in flight on the runtime, as `run_with` does.
pub struct TerminalOperator;

impl Operator for TerminalOperator {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        Ok(dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?)
    }
}

/// Approves without asking (`--yes`).
pub struct AutoApprove;

impl Operator for AutoApprove {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

#[derive(Debug, Clone)]
pub struct ClipPair {
    pub audio: PathBuf,
    pub image: PathBuf,
}

/// Inputs that passed every check, with the planned timeline.
#[derive(Debug, Clone)]
pub struct ValidatedInputs {
    pub pairs: Vec<ClipPair>,
    pub timeline: TimelinePlan,
    pub long_video: PathBuf,
    /// Usable long-video seconds after the configured start offset.
    pub long_video_available: f64,
    pub music: Vec<PathBuf>,
    pub frame: Option<PathBuf>,
}

impl ValidatedInputs {
    /// Final video length: the top track, bounded by the long video.
    pub fn output_duration(&self) -> f64 {
        self.timeline.total().min(self.long_video_available)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} clips, {} section changes\n  top track:  {}\n  long video: {} ({})\n  music pool: {} tracks",
            self.pairs.len(),
            self.timeline.section_changes(),
            format_duration(self.timeline.total()),
            format_duration(self.long_video_available),
            self.long_video.display(),
            self.music.len()
        )
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Runs the input checks in order, failing on the first one that does not hold.
///
/// No media is probed until the folder and count checks have passed.
pub async fn validate_inputs(
    inputs: InputSet,
    cfg: &Config,
    probe: &dyn MediaProbe,
) -> Result<ValidatedInputs> {
    for (name, files, dir) in [
        ("Audio", &inputs.audio, cfg.audio_dir()),
        ("Images", &inputs.images, cfg.images_dir()),
        ("LongVideo", &inputs.long_videos, cfg.long_video_dir()),
        ("Music", &inputs.music, cfg.music_dir()),
    ] {
        if files.is_empty() {
            return Err(InputError::EmptyFolder { name, path: dir }.into());
        }
    }

    if inputs.images.len() != inputs.audio.len() {
        return Err(InputError::CountMismatch {
            images: inputs.images.len(),
            audio: inputs.audio.len(),
        }
        .into());
    }

    if inputs.long_videos.len() != 1 {
        return Err(InputError::LongVideoCount {
            found: inputs.long_videos.len(),
        }
        .into());
    }

    let frame = cfg.frame_path();
    if let Some(frame) = &frame {
        if !frame.is_file() {
            return Err(InputError::FrameMissing(frame.clone()).into());
        }
    }

    let matcher = SectionMatcher::from_rule(&cfg.timing.section_rule)?;
    let mut narrations = Vec::with_capacity(inputs.audio.len());
    for audio in &inputs.audio {
        narrations.push(probe.duration_seconds(audio).await?);
    }
    let names: Vec<String> = inputs.audio.iter().map(|p| file_name(p)).collect();
    let timeline = plan_timeline(&names, &narrations, &cfg.timing, &matcher);

    let long_video = inputs.long_videos[0].clone();
    let long_total = probe.duration_seconds(&long_video).await?;
    let long_video_available = (long_total - cfg.layout.long_video_offset).max(0.0);
    let required = timeline.total();
    if long_video_available < required {
        return Err(InputError::LongVideoTooShort {
            available: long_video_available,
            required,
        }
        .into());
    }

    let pairs = inputs
        .audio
        .into_iter()
        .zip(inputs.images)
        .map(|(audio, image)| ClipPair { audio, image })
        .collect();

    Ok(ValidatedInputs {
        pairs,
        timeline,
        long_video,
        long_video_available,
        music: inputs.music,
        frame,
    })
}

/// Shows the plan and asks the operator whether to continue.
pub fn confirm(validated: &ValidatedInputs, operator: &dyn Operator) -> Result<()> {
    let prompt = format!("{}\nRender this video?", validated.summary());
    if operator.confirm(&prompt)? {
        Ok(())
    } else {
        Err(InputError::Declined.into())
    }
}
