use std::fmt::Display;

use super::Container;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    VideoOnly,
    AudioOnly,
    /// Audio and video muxed together by the platform
    Progressive,
}

/// One independently downloadable encoding of a video's track(s).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamVariant {
    /// Resolver identifier used to fetch this exact variant
    pub format_id: String,
    pub container: Container,
    pub kind: MediaKind,
    /// Vertical resolution for video, bitrate in kbps for audio
    pub quality: u32,
    pub adaptive: bool,
}

impl StreamVariant {
    fn is_adaptive(&self, kind: MediaKind, container: Container) -> bool {
        self.adaptive && self.kind == kind && self.container == container
    }
}

impl Display for StreamVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            MediaKind::AudioOnly => write!(f, "{}kbps", self.quality)?,
            _ => write!(f, "{}p", self.quality)?,
        }
        write!(f, " {} (format {})", self.container.ext(), self.format_id)
    }
}

/// The video and audio streams a job downloads and merges.
///
/// Both are adaptive and share the same container. Each one is the best of its
/// kind on its own: they are not a pair the platform offered together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPair {
    pub video: StreamVariant,
    pub audio: StreamVariant,
}

impl StreamPair {
    /// Pick the highest resolution video-only variant and the highest bitrate
    /// audio-only variant in the given container.
    ///
    /// On equal quality the variant listed last by the resolver wins.
    /// Return None if either track has no candidate.
    pub fn select(variants: &[StreamVariant], container: Container) -> Option<Self> {
        // `max_by_key` keeps the last of equal elements
        let best = |kind| {
            variants
                .iter()
                .filter(|v| v.is_adaptive(kind, container))
                .max_by_key(|v| v.quality)
                .cloned()
        };

        Some(Self {
            video: best(MediaKind::VideoOnly)?,
            audio: best(MediaKind::AudioOnly)?,
        })
    }

    pub fn container(&self) -> Container {
        self.video.container
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(id: &str, kind: MediaKind, quality: u32, container: Container) -> StreamVariant {
        StreamVariant {
            format_id: id.to_string(),
            container,
            kind,
            quality,
            adaptive: kind != MediaKind::Progressive,
        }
    }

    fn video(id: &str, height: u32) -> StreamVariant {
        variant(id, MediaKind::VideoOnly, height, Container::Mp4)
    }

    fn audio(id: &str, kbps: u32) -> StreamVariant {
        variant(id, MediaKind::AudioOnly, kbps, Container::Mp4)
    }

    #[test]
    fn picks_best_of_each_track_independently() {
        let variants = [
            video("160", 144),
            video("136", 720),
            video("134", 360),
            audio("139", 64),
            audio("140", 128),
        ];

        let pair = StreamPair::select(&variants, Container::Mp4).unwrap();
        assert_eq!(pair.video.format_id, "136");
        assert_eq!(pair.audio.format_id, "140");
        assert_eq!(pair.container(), Container::Mp4);
    }

    #[test]
    fn equal_quality_goes_to_the_last_listed() {
        let variants = [video("a", 1080), video("b", 1080), audio("c", 128), audio("d", 128)];

        let pair = StreamPair::select(&variants, Container::Mp4).unwrap();
        assert_eq!(pair.video.format_id, "b");
        assert_eq!(pair.audio.format_id, "d");
    }

    #[test]
    fn ignores_progressive_and_other_containers() {
        let variants = [
            variant("18", MediaKind::Progressive, 2160, Container::Mp4),
            variant("313", MediaKind::VideoOnly, 2160, Container::Webm),
            video("137", 1080),
            variant("251", MediaKind::AudioOnly, 160, Container::Webm),
            audio("140", 128),
        ];

        let pair = StreamPair::select(&variants, Container::Mp4).unwrap();
        assert_eq!(pair.video.format_id, "137");
        assert_eq!(pair.audio.format_id, "140");
    }

    #[test]
    fn missing_track_selects_nothing() {
        let only_video = [video("137", 1080)];
        assert_eq!(StreamPair::select(&only_video, Container::Mp4), None);

        let only_progressive = [variant("18", MediaKind::Progressive, 360, Container::Mp4)];
        assert_eq!(StreamPair::select(&only_progressive, Container::Mp4), None);

        let wrong_container = [video("137", 1080), audio("140", 128)];
        assert_eq!(StreamPair::select(&wrong_container, Container::Webm), None);
    }

    #[test]
    fn display_shows_the_quality_unit() {
        assert_eq!(video("136", 720).to_string(), "720p mp4 (format 136)");
        assert_eq!(audio("140", 128).to_string(), "128kbps mp4 (format 140)");
    }
}
