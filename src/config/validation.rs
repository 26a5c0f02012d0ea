use super::models::{Config, DownloaderConfig};
use thiserror::Error;

/// Audio codecs yt-dlp accepts for `--audio-format`
pub const SUPPORTED_AUDIO_FORMATS: &[&str] =
    &["best", "aac", "alac", "flac", "m4a", "mp3", "opus", "vorbis", "wav"];

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("downloader.binary must not be empty")]
    EmptyBinary,

    #[error("downloader.output_template must contain the '%(ext)s' field: {0:?}")]
    InvalidOutputTemplate(String),

    #[error("downloader.concurrent_fragments must be at least 1")]
    InvalidFragmentConcurrency,

    #[error("downloader.cancel_poll_ms must be positive")]
    InvalidCancelPoll,

    #[error("downloader.max_filesize must be positive")]
    InvalidMaxFilesize,

    #[error("unsupported downloader.audio_format '{0}'")]
    UnsupportedAudioFormat(String),
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_downloader(&config.downloader)
}

fn validate_downloader(downloader: &DownloaderConfig) -> Result<(), ValidationError> {
    if downloader.binary.as_os_str().is_empty() {
        return Err(ValidationError::EmptyBinary);
    }

    if !downloader.output_template.contains("%(ext)s") {
        return Err(ValidationError::InvalidOutputTemplate(
            downloader.output_template.clone(),
        ));
    }

    if downloader.concurrent_fragments == 0 {
        return Err(ValidationError::InvalidFragmentConcurrency);
    }

    if downloader.cancel_poll_ms == 0 {
        return Err(ValidationError::InvalidCancelPoll);
    }

    if downloader.max_filesize.is_some_and(|size| size.as_u64() == 0) {
        return Err(ValidationError::InvalidMaxFilesize);
    }

    if !SUPPORTED_AUDIO_FORMATS.contains(&downloader.audio_format.as_str()) {
        return Err(ValidationError::UnsupportedAudioFormat(
            downloader.audio_format.clone(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::ByteSize;
    use std::path::PathBuf;

    #[test]
    fn test_valid_config() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_binary() {
        let mut config = Config::default();
        config.downloader.binary = PathBuf::new();

        assert!(matches!(
            validate(&config),
            Err(ValidationError::EmptyBinary)
        ));
    }

    #[test]
    fn test_template_without_extension() {
        let mut config = Config::default();
        config.downloader.output_template = "%(title)s".to_string();

        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidOutputTemplate(_))
        ));
    }

    #[test]
    fn test_zero_fragments() {
        let mut config = Config::default();
        config.downloader.concurrent_fragments = 0;

        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidFragmentConcurrency)
        ));
    }

    #[test]
    fn test_zero_limits() {
        let mut config = Config::default();
        config.downloader.cancel_poll_ms = 0;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidCancelPoll)
        ));

        let mut config = Config::default();
        config.downloader.max_filesize = Some(ByteSize(0));
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidMaxFilesize)
        ));
    }

    #[test]
    fn test_unknown_audio_format() {
        let mut config = Config::default();
        config.downloader.audio_format = "midi".to_string();

        assert!(matches!(
            validate(&config),
            Err(ValidationError::UnsupportedAudioFormat(f)) if f == "midi"
        ));
    }
}
