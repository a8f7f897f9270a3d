use super::StreamVariant;

/// Everything the resolver told us about a video URL.
#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub url: String,
    pub title: String,
    /// Display name of the channel, used as the output sub-directory
    pub channel: String,
    /// False when the platform knows the video but will not serve it to us
    pub available: bool,
    pub variants: Vec<StreamVariant>,
}
