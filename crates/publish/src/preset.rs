//! File roles ("format presets") and the metadata each one carries.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    HighResVideo,
    LowResVideo,
    VideoThumbnail,
    VideoSubtitle,
    VideoDependency,
    Audio,
    AudioThumbnail,
    AudioDependency,
    Document,
    Epub,
    DocumentThumbnail,
    Exercise,
    ExerciseThumbnail,
    ExerciseImage,
    ExerciseGraphie,
    ChannelThumbnail,
    TopicThumbnail,
    Html5Zip,
    Html5Thumbnail,
    Html5Dependency,
    SlideshowImage,
    SlideshowThumbnail,
    SlideshowManifest,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighResVideo => "high_res_video",
            Self::LowResVideo => "low_res_video",
            Self::VideoThumbnail => "video_thumbnail",
            Self::VideoSubtitle => "video_subtitle",
            Self::VideoDependency => "video_dependency",
            Self::Audio => "audio",
            Self::AudioThumbnail => "audio_thumbnail",
            Self::AudioDependency => "audio_dependency",
            Self::Document => "document",
            Self::Epub => "epub",
            Self::DocumentThumbnail => "document_thumbnail",
            Self::Exercise => "exercise",
            Self::ExerciseThumbnail => "exercise_thumbnail",
            Self::ExerciseImage => "exercise_image",
            Self::ExerciseGraphie => "exercise_graphie",
            Self::ChannelThumbnail => "channel_thumbnail",
            Self::TopicThumbnail => "topic_thumbnail",
            Self::Html5Zip => "html5_zip",
            Self::Html5Thumbnail => "html5_thumbnail",
            Self::Html5Dependency => "html5_dependency",
            Self::SlideshowImage => "slideshow_image",
            Self::SlideshowThumbnail => "slideshow_thumbnail",
            Self::SlideshowManifest => "slideshow_manifest",
        }
    }

    pub fn is_thumbnail(&self) -> bool {
        matches!(
            self,
            Self::VideoThumbnail
                | Self::AudioThumbnail
                | Self::DocumentThumbnail
                | Self::ExerciseThumbnail
                | Self::ChannelThumbnail
                | Self::TopicThumbnail
                | Self::Html5Thumbnail
                | Self::SlideshowThumbnail
        )
    }

    /// Supplementary files are optional for the node to be usable.
    pub fn is_supplementary(&self) -> bool {
        match self {
            Self::HighResVideo
            | Self::LowResVideo
            | Self::Audio
            | Self::Document
            | Self::Epub
            | Self::Exercise
            | Self::Html5Zip
            | Self::SlideshowImage
            | Self::SlideshowManifest => false,
            _ => true,
        }
    }

    /// Only embedded into exercise archives, never exported on their own.
    pub fn is_exercise_internal(&self) -> bool {
        matches!(self, Self::ExerciseImage | Self::ExerciseGraphie)
    }

    /// Priority among the files of one node; lower is preferred.
    pub fn order(&self) -> i64 {
        match self {
            Self::ChannelThumbnail => 0,
            Self::HighResVideo
            | Self::Audio
            | Self::Document
            | Self::Exercise
            | Self::TopicThumbnail
            | Self::Html5Zip
            | Self::SlideshowImage => 1,
            Self::LowResVideo
            | Self::AudioThumbnail
            | Self::Epub
            | Self::ExerciseThumbnail
            | Self::Html5Thumbnail
            | Self::SlideshowThumbnail => 2,
            Self::VideoThumbnail
            | Self::AudioDependency
            | Self::DocumentThumbnail
            | Self::ExerciseImage
            | Self::Html5Dependency
            | Self::SlideshowManifest => 3,
            Self::VideoSubtitle | Self::ExerciseGraphie => 4,
            Self::VideoDependency => 5,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
