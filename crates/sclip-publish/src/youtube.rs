//! YouTube Data API v3 upload.

use std::path::Path;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, LOCATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::authorizer::AuthorizedClient;
use crate::error::{PublishError, PublishResult};

pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com";

/// "People & Blogs"
const DEFAULT_CATEGORY_ID: &str = "22";

/// Title, description and visibility of the published video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    /// `private`, `unlisted` or `public`
    pub privacy_status: String,
}

impl Default for VideoMetadata {
    fn default() -> Self {
        Self {
            title: "Short clip".to_string(),
            description: String::new(),
            tags: Vec::new(),
            privacy_status: "private".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct InsertResponse {
    id: String,
}

/// Uploads clips and caption tracks.
#[derive(Clone)]
pub struct YouTubeUploader {
    http: Client,
    api_base: String,
    caption_language: String,
}

impl YouTubeUploader {
    pub fn new() -> PublishResult<Self> {
        Self::with_api_base(YOUTUBE_API_BASE)
    }

    pub fn with_api_base(api_base: impl Into<String>) -> PublishResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(PublishError::Network)?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            caption_language: "en".to_string(),
        })
    }

    pub fn with_caption_language(mut self, language: impl Into<String>) -> Self {
        self.caption_language = language.into();
        self
    }

    /// Upload `clip_path` and attach `subtitle_path` as a caption track.
    ///
    /// Returns the remote video id. A failed caption insert is logged and
    /// does not fail the upload.
    pub async fn upload(
        &self,
        client: &AuthorizedClient,
        clip_path: &Path,
        subtitle_path: Option<&Path>,
        metadata: &VideoMetadata,
    ) -> PublishResult<String> {
        if !clip_path.exists() {
            return Err(PublishError::ClipNotFound(clip_path.display().to_string()));
        }
        let video = tokio::fs::read(clip_path).await?;

        let resource = json!({
            "snippet": {
                "title": metadata.title,
                "description": metadata.description,
                "tags": metadata.tags,
                "categoryId": DEFAULT_CATEGORY_ID,
            },
            "status": {
                "privacyStatus": metadata.privacy_status,
                "selfDeclaredMadeForKids": false,
            }
        });

        let url = format!(
            "{}/upload/youtube/v3/videos?uploadType=resumable&part=snippet,status",
            self.api_base
        );
        let inserted: InsertResponse = self
            .resumable_upload(client, &url, &resource, video, "video/mp4")
            .await?;

        info!(
            owner_id = %client.owner_id,
            video_id = %inserted.id,
            "Uploaded video"
        );

        if let Some(subtitle_path) = subtitle_path {
            if let Err(e) = self.insert_caption(client, &inserted.id, subtitle_path).await {
                warn!(video_id = %inserted.id, error = %e, "Caption upload failed");
            }
        }

        Ok(inserted.id)
    }

    /// Attach an SRT caption track to an uploaded video.
    pub async fn insert_caption(
        &self,
        client: &AuthorizedClient,
        video_id: &str,
        subtitle_path: &Path,
    ) -> PublishResult<String> {
        let captions = tokio::fs::read(subtitle_path).await?;
        let resource = json!({
            "snippet": {
                "videoId": video_id,
                "language": self.caption_language,
                "name": "",
                "isDraft": false,
            }
        });
        let url = format!(
            "{}/upload/youtube/v3/captions?uploadType=resumable&part=snippet",
            self.api_base
        );
        let inserted: InsertResponse = self
            .resumable_upload(client, &url, &resource, captions, "application/octet-stream")
            .await?;
        debug!(video_id, caption_id = %inserted.id, "Inserted caption track");
        Ok(inserted.id)
    }

    /// Open a resumable session, then send the whole payload in one request.
    async fn resumable_upload<T: serde::de::DeserializeOwned>(
        &self,
        client: &AuthorizedClient,
        url: &str,
        resource: &serde_json::Value,
        payload: Vec<u8>,
        content_type: &str,
    ) -> PublishResult<T> {
        let auth = client.authorization_header();

        let session = self
            .http
            .post(url)
            .header(AUTHORIZATION, &auth)
            .header("X-Upload-Content-Type", content_type)
            .header("X-Upload-Content-Length", payload.len().to_string())
            .json(resource)
            .send()
            .await?;

        if !session.status().is_success() {
            let status = session.status();
            let body = session.text().await.unwrap_or_default();
            return Err(PublishError::upload(format!(
                "session request returned {}: {}",
                status,
                body.trim()
            )));
        }

        let location = session
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or_else(|| PublishError::upload("session response has no Location header"))?;

        debug!(bytes = payload.len(), "Sending resumable upload payload");

        let response = self
            .http
            .put(&location)
            .header(AUTHORIZATION, &auth)
            .header(CONTENT_TYPE, content_type)
            .body(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::upload(format!(
                "upload returned {}: {}",
                status,
                body.trim()
            )));
        }

        Ok(response.json().await?)
    }
}
