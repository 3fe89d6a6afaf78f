use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input_root: PathBuf,
    pub folders: FolderNames,
    pub frame_image: Option<PathBuf>,
    pub output: PathBuf,
    pub work_dir: PathBuf,
    pub keep_intermediates: bool,
    pub timing: TimingConfig,
    pub layout: LayoutConfig,
    pub music: MusicConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderNames {
    pub audio: String,
    pub images: String,
    pub long_video: String,
    pub music: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Hold after every narration clip, in seconds.
    pub pause: f64,
    /// Extra hold when the section marker changes between two clips.
    pub section_pause: f64,
    pub section_rule: SectionRule,
}

/// How a section marker is read from an audio file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionRule {
    None,
    /// Character at a zero-based position of the file name.
    CharAt { index: usize },
    /// First capture group (or whole match) of a regex over the file name.
    Pattern { regex: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub canvas: Size,
    pub top_box: Size,
    pub strip_box: Size,
    pub frame_border: u32,
    pub side_crop: f64,
    pub bottom_crop: f64,
    pub background_zoom: f64,
    pub background_vertical_offset: f64,
    pub background_blur: u32,
    pub long_video_offset: f64,
}

impl LayoutConfig {
    /// Size of the top track stacked over the long-video strip.
    ///
    /// Saturates on overflow; `Config::validate` rejects such layouts.
    pub fn stack_size(&self) -> Size {
        Size::new(
            self.top_box.width.max(self.strip_box.width),
            self.top_box.height.saturating_add(self.strip_box.height),
        )
    }

    /// Size of the framed composite: the stack plus a border on every side.
    pub fn frame_size(&self) -> Size {
        self.checked_frame_size().unwrap_or(Size::new(u32::MAX, u32::MAX))
    }

    fn checked_frame_size(&self) -> Option<Size> {
        let border = self.frame_border.checked_mul(2)?;
        let width = self.top_box.width.max(self.strip_box.width);
        let height = self.top_box.height.checked_add(self.strip_box.height)?;
        Some(Size::new(
            width.checked_add(border)?,
            height.checked_add(border)?,
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicConfig {
    pub volume: f64,
    pub narration_volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub fps: u32,
    pub video_bitrate: String,
    pub audio_bitrate: String,
    pub preset: String,
    pub codec: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_root: PathBuf::from("."),
            folders: FolderNames::default(),
            frame_image: Some(PathBuf::from("frame.png")),
            output: PathBuf::from("output/final_video.mp4"),
            work_dir: PathBuf::from("work"),
            keep_intermediates: false,
            timing: TimingConfig::default(),
            layout: LayoutConfig::default(),
            music: MusicConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl Default for FolderNames {
    fn default() -> Self {
        Self {
            audio: "Audio".to_string(),
            images: "Images".to_string(),
            long_video: "LongVideo".to_string(),
            music: "Music".to_string(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            pause: 0.3,
            section_pause: 1.0,
            section_rule: SectionRule::CharAt { index: 6 },
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            canvas: Size::new(1080, 1920),
            top_box: Size::new(960, 720),
            strip_box: Size::new(960, 960),
            frame_border: 24,
            side_crop: 0.2,
            bottom_crop: 0.1,
            background_zoom: 2.0,
            background_vertical_offset: 0.35,
            background_blur: 20,
            long_video_offset: 0.0,
        }
    }
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            volume: 0.1,
            narration_volume: 1.0,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            video_bitrate: "8M".to_string(),
            audio_bitrate: "192k".to_string(),
            preset: "veryfast".to_string(),
            codec: "libx264".to_string(),
        }
    }
}

impl Config {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when it exists, otherwise the built-in defaults.
    pub async fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if fs::metadata(&path).await.is_ok() {
            return Self::load(path).await;
        }
        Ok(Self::default())
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.input_root.join(&self.folders.audio)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.input_root.join(&self.folders.images)
    }

    pub fn long_video_dir(&self) -> PathBuf {
        self.input_root.join(&self.folders.long_video)
    }

    pub fn music_dir(&self) -> PathBuf {
        self.input_root.join(&self.folders.music)
    }

    /// The frame image resolved against the input root.
    pub fn frame_path(&self) -> Option<PathBuf> {
        self.frame_image.as_ref().map(|p| self.input_root.join(p))
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.timing;
        if !(t.pause >= 0.0) || !(t.section_pause >= 0.0) {
            anyhow::bail!("config: pauses must be non-negative");
        }
        if let SectionRule::Pattern { regex } = &t.section_rule {
            regex::Regex::new(regex)
                .with_context(|| format!("config: invalid section regex {regex:?}"))?;
        }

        let l = &self.layout;
        for (name, size) in [
            ("canvas", l.canvas),
            ("top_box", l.top_box),
            ("strip_box", l.strip_box),
        ] {
            if size.width == 0 || size.height == 0 {
                anyhow::bail!("config: {name} must not be empty");
            }
            if size.width % 2 != 0 || size.height % 2 != 0 {
                anyhow::bail!("config: {name} dimensions must be even");
            }
        }
        let Some(frame) = l.checked_frame_size() else {
            anyhow::bail!("config: layout dimensions overflow");
        };
        if frame.width > l.canvas.width || frame.height > l.canvas.height {
            anyhow::bail!(
                "config: framed content {}x{} does not fit the {}x{} canvas",
                frame.width,
                frame.height,
                l.canvas.width,
                l.canvas.height
            );
        }
        if !(0.0..0.5).contains(&l.side_crop) {
            anyhow::bail!("config: side_crop must be in [0, 0.5)");
        }
        if !(0.0..1.0).contains(&l.bottom_crop) {
            anyhow::bail!("config: bottom_crop must be in [0, 1)");
        }
        if !(l.background_zoom >= 1.0) {
            anyhow::bail!("config: background_zoom must be at least 1");
        }
        if !(0.0..=1.0).contains(&l.background_vertical_offset) {
            anyhow::bail!("config: background_vertical_offset must be in [0, 1]");
        }
        if !(l.long_video_offset >= 0.0) {
            anyhow::bail!("config: long_video_offset must be non-negative");
        }

        if !(self.music.volume > 0.0) || !(self.music.narration_volume > 0.0) {
            anyhow::bail!("config: volumes must be positive");
        }
        if self.render.fps == 0 {
            anyhow::bail!("config: fps must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.layout.stack_size(), Size::new(960, 1680));
        assert_eq!(cfg.layout.frame_size(), Size::new(1008, 1728));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: Config =
            serde_json::from_str(r#"{"timing": {"pause": 0.5}, "render": {"fps": 24}}"#).unwrap();
        assert_eq!(cfg.timing.pause, 0.5);
        assert_eq!(cfg.timing.section_pause, 1.0);
        assert_eq!(cfg.timing.section_rule, SectionRule::CharAt { index: 6 });
        assert_eq!(cfg.render.fps, 24);
        assert_eq!(cfg.render.preset, "veryfast");
        assert_eq!(cfg.folders.long_video, "LongVideo");
    }

    #[test]
    fn section_rule_is_tagged() {
        let cfg: Config = serde_json::from_str(
            r#"{"timing": {"section_rule": {"kind": "pattern", "regex": "^s(\\d+)_"}}}"#,
        )
        .unwrap();
        assert_eq!(
            cfg.timing.section_rule,
            SectionRule::Pattern {
                regex: "^s(\\d+)_".to_string()
            }
        );

        let cfg: Config =
            serde_json::from_str(r#"{"timing": {"section_rule": {"kind": "none"}}}"#).unwrap();
        assert_eq!(cfg.timing.section_rule, SectionRule::None);
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.timing.pause = -1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.layout.top_box = Size::new(961, 720);
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.layout.frame_border = 200;
        assert!(cfg.validate().is_err());

        let cfg: Config = serde_json::from_str(
            r#"{"layout": {"top_box": {"width": 4294967294, "height": 4294967294}}}"#,
        )
        .unwrap();
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.layout.frame_border = u32::MAX / 2 + 1;
        assert!(cfg.validate().is_err());
        assert_eq!(cfg.layout.frame_size(), Size::new(u32::MAX, u32::MAX));

        let mut cfg = Config::default();
        cfg.layout.side_crop = 0.5;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.timing.section_rule = SectionRule::Pattern {
            regex: "(".to_string(),
        };
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.music.volume = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_or_default(dir.path().join("absent.json"))
            .await
            .unwrap();
        assert_eq!(cfg.output, PathBuf::from("output/final_video.mp4"));
    }

    #[tokio::test]
    async fn load_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video_script.json");
        std::fs::write(&path, r#"{"render": {"fps": 0}}"#).unwrap();
        assert!(Config::load(&path).await.is_err());
    }
}
