use clap::ValueEnum;
use serde::Deserialize;

/// Container format shared by the selected video and audio streams,
/// and therefore by the merged output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp4,
    Webm,
}

impl Container {
    /// Return the extension without the leading dot.
    /// e.g. "mp4"
    pub fn ext(self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Webm => "webm",
        }
    }

    /// Map the file extension reported by the resolver to a container.
    /// Return None for containers we do not merge into.
    ///
    /// Audio-only MP4 streams are usually reported as "m4a".
    pub fn from_resolver_ext(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" | "m4a" => Some(Self::Mp4),
            "webm" => Some(Self::Webm),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn m4a_audio_belongs_to_the_mp4_family() {
        assert_eq!(Container::from_resolver_ext("m4a"), Some(Container::Mp4));
        assert_eq!(Container::from_resolver_ext("MP4"), Some(Container::Mp4));
        assert_eq!(Container::from_resolver_ext("webm"), Some(Container::Webm));
        assert_eq!(Container::from_resolver_ext("3gp"), None);
    }
}
