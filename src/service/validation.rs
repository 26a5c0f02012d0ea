use thiserror::Error;

pub const MAX_URL_BYTES: usize = 2048;
pub const MAX_FORMAT_BYTES: usize = 256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestValidationError {
    #[error("url is required")]
    EmptyUrl,
    #[error("url exceeds 2048 bytes (got {0})")]
    UrlTooLong(usize),
    #[error("url must be an http/https url: {0}")]
    UnsupportedUrl(String),
    #[error("format selector exceeds 256 bytes (got {0})")]
    FormatTooLong(usize),
    #[error("format selector must not contain whitespace or control characters")]
    InvalidFormat,
}

/// Trimmed target URL
pub fn validate_url(url: &str) -> Result<&str, RequestValidationError> {
    let url = url.trim();

    if url.is_empty() {
        return Err(RequestValidationError::EmptyUrl);
    }

    if url.len() > MAX_URL_BYTES {
        return Err(RequestValidationError::UrlTooLong(url.len()));
    }

    let has_scheme = url
        .split_once("://")
        .is_some_and(|(scheme, rest)| {
            (scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https"))
                && !rest.is_empty()
        });

    if !has_scheme || url.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(RequestValidationError::UnsupportedUrl(url.to_string()));
    }

    Ok(url)
}

/// Blank selectors count as "no selector"
pub fn validate_format(format: Option<&str>) -> Result<Option<String>, RequestValidationError> {
    let Some(format) = format.map(str::trim).filter(|f| !f.is_empty()) else {
        return Ok(None);
    };

    if format.len() > MAX_FORMAT_BYTES {
        return Err(RequestValidationError::FormatTooLong(format.len()));
    }

    if format.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(RequestValidationError::InvalidFormat);
    }

    Ok(Some(format.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_url_accepts_http_and_https() {
        assert_eq!(
            validate_url("  https://www.youtube.com/watch?v=abc "),
            Ok("https://www.youtube.com/watch?v=abc")
        );
        assert!(validate_url("HTTP://example.com/v.mp4").is_ok());
    }

    #[test]
    fn validate_url_rejects_bad_targets() {
        assert_eq!(validate_url("   "), Err(RequestValidationError::EmptyUrl));
        assert!(matches!(
            validate_url("ftp://example.com/x"),
            Err(RequestValidationError::UnsupportedUrl(_))
        ));
        assert!(matches!(
            validate_url("https://"),
            Err(RequestValidationError::UnsupportedUrl(_))
        ));
        assert!(matches!(
            validate_url("--exec rm"),
            Err(RequestValidationError::UnsupportedUrl(_))
        ));
        assert!(matches!(
            validate_url("https://example.com/a b"),
            Err(RequestValidationError::UnsupportedUrl(_))
        ));

        let long = format!("https://example.com/{}", "a".repeat(MAX_URL_BYTES));
        assert!(matches!(
            validate_url(&long),
            Err(RequestValidationError::UrlTooLong(_))
        ));
    }

    #[test]
    fn validate_format_normalizes_blank() {
        assert_eq!(validate_format(None), Ok(None));
        assert_eq!(validate_format(Some("  ")), Ok(None));
        assert_eq!(
            validate_format(Some("bestvideo+bestaudio/best")),
            Ok(Some("bestvideo+bestaudio/best".to_string()))
        );
    }

    #[test]
    fn validate_format_rejects_oddities() {
        assert_eq!(
            validate_format(Some("best --exec x")),
            Err(RequestValidationError::InvalidFormat)
        );
        assert!(matches!(
            validate_format(Some(&"b".repeat(MAX_FORMAT_BYTES + 1))),
            Err(RequestValidationError::FormatTooLong(_))
        ));
    }
}
