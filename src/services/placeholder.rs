// src/services/placeholder.rs
use image::{Rgb, RgbImage};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

use crate::models::media::AspectRatio;

const FFMPEG_TIMEOUT: Duration = Duration::from_secs(30);
const DOT_COUNT: usize = 60;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("ffmpeg failed: {0}")]
    Ffmpeg(String),

    #[error("ffmpeg timed out after {0:?}")]
    Timeout(Duration),

    #[error("Background task failed: {0}")]
    Join(String),
}

/// `"1024x1792"` → `(1024, 1792)`, falling back to a square.
pub fn parse_size(size: &str) -> (u32, u32) {
    size.split_once('x')
        .and_then(|(w, h)| Some((w.trim().parse().ok()?, h.trim().parse().ok()?)))
        .filter(|(w, h): &(u32, u32)| *w > 0 && *h > 0 && *w <= 4096 && *h <= 4096)
        .unwrap_or((1024, 1024))
}

/// Lowercased alphanumerics of the first 30 characters.
pub fn safe_prompt_slug(prompt: &str) -> String {
    prompt
        .chars()
        .take(30)
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

pub fn color_from_prompt(prompt: &str, index: u64) -> (u8, u8, u8) {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hasher.update(index.to_be_bytes());
    let digest = hasher.finalize();
    // keep it light enough to read as a placeholder
    (
        128 + digest[0] / 2,
        128 + digest[1] / 2,
        128 + digest[2] / 2,
    )
}

fn render_placeholder(width: u32, height: u32, prompt: &str, index: u64) -> RgbImage {
    let (r, g, b) = color_from_prompt(prompt, index);
    let mut image = RgbImage::from_pixel(width, height, Rgb([r, g, b]));

    let mut rng = rand::thread_rng();
    let radius = (width.min(height) / 40).max(2) as i64;
    for _ in 0..DOT_COUNT {
        let cx = rng.gen_range(0..width) as i64;
        let cy = rng.gen_range(0..height) as i64;
        let color = Rgb([rng.gen(), rng.gen(), rng.gen()]);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy > radius * radius {
                    continue;
                }
                let (x, y) = (cx + dx, cy + dy);
                if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
                    image.put_pixel(x as u32, y as u32, color);
                }
            }
        }
    }
    image
}

/// Writes a PNG placeholder and returns its size in bytes.
pub async fn write_placeholder_image(
    path: &Path,
    size: &str,
    prompt: &str,
    index: u64,
) -> Result<u64, MediaError> {
    let (width, height) = parse_size(size);
    let path: PathBuf = path.to_path_buf();
    let prompt = prompt.to_string();

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let target = path.clone();
    tokio::task::spawn_blocking(move || -> Result<(), MediaError> {
        render_placeholder(width, height, &prompt, index).save(&target)?;
        Ok(())
    })
    .await
    .map_err(|e| MediaError::Join(e.to_string()))??;

    Ok(tokio::fs::metadata(&path).await?.len())
}

/// Renders a solid-colour MP4 with ffmpeg and returns its size in bytes.
pub async fn render_mock_video(
    path: &Path,
    aspect_ratio: AspectRatio,
    duration: u32,
) -> Result<u64, MediaError> {
    let (width, height) = aspect_ratio.dimensions();

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let source = format!(
        "color=c=blue:size={}x{}:duration={}:rate=30",
        width, height, duration
    );

    let mut command = Command::new("ffmpeg");
    command
        .arg("-y")
        .args(["-f", "lavfi", "-i", source.as_str()])
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-preset", "fast"])
        .arg(path)
        .kill_on_drop(true);

    tracing::info!("🎞️ Rendering mock video {}x{} ({}s) to {}", width, height, duration, path.display());

    let output = tokio::time::timeout(FFMPEG_TIMEOUT, command.output())
        .await
        .map_err(|_| MediaError::Timeout(FFMPEG_TIMEOUT))??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: String = stderr
            .lines()
            .rev()
            .take(3)
            .collect::<Vec<_>>()
            .join(" | ");
        return Err(MediaError::Ffmpeg(tail));
    }

    let size = tokio::fs::metadata(path).await?.len();
    if size == 0 {
        return Err(MediaError::Ffmpeg("output file is empty".to_string()));
    }
    Ok(size)
}
