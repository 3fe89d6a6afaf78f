use crate::config::Config;
use crate::logi;
use anyhow::{Context, Result};
use tokio::fs;

/// Creates the output folder and the intermediates root.
pub async fn ensure_directories(cfg: &Config) -> Result<()> {
    let output_dir = cfg.output.parent().filter(|p| !p.as_os_str().is_empty());
    for dir in output_dir.into_iter().chain([cfg.work_dir.as_path()]) {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
            logi(format!("Created directory: {}", dir.display()));
        }
    }
    Ok(())
}

async fn tool_runs(tool: &str) -> bool {
    match tokio::process::Command::new(tool)
        .arg("-version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

/// Names of the required media tools that are not runnable from `PATH`.
pub async fn missing_tools() -> Vec<&'static str> {
    let mut missing = Vec::new();
    for tool in ["ffmpeg", "ffprobe"] {
        if !tool_runs(tool).await {
            missing.push(tool);
        }
    }
    missing
}
