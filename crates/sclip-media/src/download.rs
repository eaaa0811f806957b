//! Source video download using yt-dlp.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::command::check_ytdlp;
use crate::error::{MediaError, MediaResult};

/// File name of the downloaded source inside a job work directory.
pub const SOURCE_FILE_NAME: &str = "source.mp4";

const FORMAT_SELECTOR: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// Only plain http(s) URLs are handed to yt-dlp.
pub fn is_http_url(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    (lower.starts_with("https://") || lower.starts_with("http://")) && lower.len() > "https://".len()
}

/// Build yt-dlp arguments for a source download.
pub fn download_args(url: &str, output_path: &Path) -> Vec<String> {
    vec![
        "--no-playlist".to_string(),
        "--no-progress".to_string(),
        "-f".to_string(),
        FORMAT_SELECTOR.to_string(),
        "--merge-output-format".to_string(),
        "mp4".to_string(),
        "-o".to_string(),
        output_path.to_string_lossy().to_string(),
        url.to_string(),
    ]
}

/// Download the video behind `url` into `<work_dir>/source.mp4`.
pub async fn download_source(url: &str, work_dir: impl AsRef<Path>) -> MediaResult<PathBuf> {
    if !is_http_url(url) {
        return Err(MediaError::UnsupportedUrl(url.to_string()));
    }
    check_ytdlp()?;

    let work_dir = work_dir.as_ref();
    tokio::fs::create_dir_all(work_dir).await?;
    let output_path = work_dir.join(SOURCE_FILE_NAME);

    info!(url = %url, output = %output_path.display(), "Downloading source video");

    let output = Command::new("yt-dlp")
        .args(download_args(url, &output_path))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("yt-dlp stderr: {}", stderr);
        let error_msg = stderr
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or("Unknown error");
        return Err(MediaError::download_failed(format!("yt-dlp failed: {}", error_msg)));
    }

    if !output_path.exists() {
        return Err(MediaError::download_failed("Output file not created"));
    }

    let file_size = output_path.metadata()?.len();
    info!(
        output = %output_path.display(),
        size_mb = file_size as f64 / (1024.0 * 1024.0),
        "Downloaded source video"
    );

    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("https://www.youtube.com/watch?v=abc"));
        assert!(is_http_url("http://example.com/v.mp4"));
        assert!(!is_http_url("file:///etc/passwd"));
        assert!(!is_http_url("--exec=rm"));
        assert!(!is_http_url("https://"));
    }

    #[test]
    fn test_download_args_put_url_last() {
        let args = download_args("https://youtu.be/x", Path::new("/tmp/j/source.mp4"));
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/x"));
        let o = args.iter().position(|a| a == "-o").unwrap();
        assert_eq!(args[o + 1], "/tmp/j/source.mp4");
        assert!(args.contains(&"--no-playlist".to_string()));
    }

    #[tokio::test]
    async fn test_rejects_non_http_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = download_source("ftp://host/file", dir.path()).await.unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedUrl(_)));
    }
}
