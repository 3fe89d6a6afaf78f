use crate::config::Config;
use crate::error::InputError;
use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The four input folders, each listed in file-name order.
#[derive(Debug, Clone, Default)]
pub struct InputSet {
    pub audio: Vec<PathBuf>,
    pub images: Vec<PathBuf>,
    pub long_videos: Vec<PathBuf>,
    pub music: Vec<PathBuf>,
}

/// Lists the regular files directly inside `dir`, sorted by file name.
///
/// Symlinks are followed. Sub-directories and dot-files are skipped. Audio and image pairing relies
/// on this ordering.
pub fn collect_files(dir: &Path) -> Result<Vec<PathBuf>, InputError> {
    let mut out = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| InputError::FolderUnreadable {
            path: dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        out.push(entry.into_path());
    }
    Ok(out)
}

pub fn collect_inputs(cfg: &Config) -> Result<InputSet> {
    Ok(InputSet {
        audio: collect_files(&cfg.audio_dir())?,
        images: collect_files(&cfg.images_dir())?,
        long_videos: collect_files(&cfg.long_video_dir())?,
        music: collect_files(&cfg.music_dir())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn lists_sorted_files_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.mp3", "a.mp3", "b.mp3", ".DS_Store"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("d.mp3"), b"x").unwrap();

        let files = collect_files(dir.path()).unwrap();
        assert_eq!(names(&files), ["a.mp3", "b.mp3", "c.mp3"]);
        assert!(files.iter().all(|p| p.starts_with(dir.path())));
    }

    #[cfg(unix)]
    #[test]
    fn lists_symlinked_files() {
        let media = tempfile::tempdir().unwrap();
        fs::write(media.path().join("long.mkv"), b"x").unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(media.path().join("long.mkv"), dir.path().join("long.mkv"))
            .unwrap();
        std::os::unix::fs::symlink(media.path(), dir.path().join("linked_dir")).unwrap();

        let files = collect_files(dir.path()).unwrap();
        assert_eq!(names(&files), ["long.mkv"]);
    }

    #[test]
    fn missing_folder_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect_files(&dir.path().join("Audio")).unwrap_err();
        assert!(matches!(err, InputError::FolderUnreadable { .. }));
    }

    #[test]
    fn empty_folder_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_files(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn collects_all_four_folders() {
        let root = tempfile::tempdir().unwrap();
        for (folder, file) in [
            ("Audio", "01.mp3"),
            ("Images", "01.png"),
            ("LongVideo", "long.mkv"),
            ("Music", "song.mp3"),
        ] {
            fs::create_dir(root.path().join(folder)).unwrap();
            fs::write(root.path().join(folder).join(file), b"x").unwrap();
        }
        let cfg = Config {
            input_root: root.path().to_path_buf(),
            ..Config::default()
        };

        let inputs = collect_inputs(&cfg).unwrap();
        assert_eq!(names(&inputs.audio), ["01.mp3"]);
        assert_eq!(names(&inputs.images), ["01.png"]);
        assert_eq!(names(&inputs.long_videos), ["long.mkv"]);
        assert_eq!(names(&inputs.music), ["song.mp3"]);
    }
}
