use challenge_common::types::{UserId, VideoId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// What the media catalog knows about a video.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoInfo {
    pub id: VideoId,
    pub owner: UserId,
    /// Seconds; `None` while the catalog has not inspected the file yet.
    pub duration_secs: Option<u32>,
}

/// Read access to the media catalog collaborator.
pub trait VideoCatalog: Send + Sync {
    fn video(&self, id: VideoId) -> Option<VideoInfo>;
}

/// Catalog held in memory, used by the CLI and tests.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    videos: RwLock<BTreeMap<VideoId, VideoInfo>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, video: VideoInfo) {
        let mut videos = self
            .videos
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        videos.insert(video.id, video);
    }

    /// Register a video owned by `owner`.
    pub fn with_video(
        self,
        id: impl Into<VideoId>,
        owner: impl Into<UserId>,
        duration_secs: Option<u32>,
    ) -> Self {
        self.insert(VideoInfo {
            id: id.into(),
            owner: owner.into(),
            duration_secs,
        });
        self
    }
}

impl FromIterator<VideoInfo> for InMemoryCatalog {
    fn from_iter<I: IntoIterator<Item = VideoInfo>>(iter: I) -> Self {
        let catalog = Self::new();
        for video in iter {
            catalog.insert(video);
        }
        catalog
    }
}

impl VideoCatalog for InMemoryCatalog {
    fn video(&self, id: VideoId) -> Option<VideoInfo> {
        self.videos
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&id)
            .cloned()
    }
}
