use crate::utils::error::{Result, SubmitError};
use regex::Regex;
use url::Url;

/// `type/subtype` with optional `; name=value` parameters, restricted-name characters only.
const MEDIA_TYPE_PATTERN: &str = r#"^([A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*)/[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*(?:[ \t]*;[ \t]*[A-Za-z0-9!#$&^_.+-]+=(?:"[^"\x00-\x1f]*"|[A-Za-z0-9!#$&^_.+-]+))*$"#;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(SubmitError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(SubmitError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(SubmitError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_endpoint_path(field_name: &str, path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(SubmitError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path must start with '/'".to_string(),
        });
    }
    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(SubmitError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SubmitError::FormValidationError {
            field: field_name.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Checks that `content_type` parses as a media type whose top-level type is one of `allowed`.
pub fn validate_media_type(
    field_name: &str,
    file_name: &str,
    content_type: &str,
    allowed: &[&str],
) -> Result<()> {
    let re = Regex::new(MEDIA_TYPE_PATTERN).map_err(|e| SubmitError::ConfigError {
        message: e.to_string(),
    })?;

    let top_level = re
        .captures(content_type)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_lowercase());

    match top_level {
        Some(top_level) if allowed.contains(&top_level.as_str()) => Ok(()),
        Some(_) => Err(SubmitError::FormValidationError {
            field: field_name.to_string(),
            reason: format!(
                "{} is not an {} file ({})",
                file_name,
                allowed.join(" or "),
                content_type
            ),
        }),
        None => Err(SubmitError::FormValidationError {
            field: field_name.to_string(),
            reason: format!(
                "{} has a malformed content type: {:?}",
                file_name, content_type
            ),
        }),
    }
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(SubmitError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("api.base_url", "https://example.com").is_ok());
        assert!(validate_url("api.base_url", "http://localhost:8000").is_ok());
        assert!(validate_url("api.base_url", "").is_err());
        assert!(validate_url("api.base_url", "invalid-url").is_err());
        assert!(validate_url("api.base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_endpoint_path() {
        assert!(validate_endpoint_path("api.register_path", "/api/registrations/").is_ok());
        assert!(validate_endpoint_path("api.register_path", "api/registrations/").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("polling.attempts", 6, 1, 50).is_ok());
        assert!(validate_range("polling.attempts", 0, 1, 50).is_err());
        assert!(validate_range("polling.attempts", 51, 1, 50).is_err());
    }

    #[test]
    fn test_validate_media_type() {
        let media = ["audio", "video"];
        assert!(validate_media_type("media_files", "a.mp3", "audio/mpeg", &media).is_ok());
        assert!(validate_media_type("media_files", "a.mp4", "Video/MP4", &media).is_ok());
        assert!(
            validate_media_type("media_files", "a.ogg", "audio/ogg; codecs=opus", &media).is_ok()
        );

        let err = validate_media_type("media_files", "a.pdf", "application/pdf", &media).unwrap_err();
        assert!(err.to_string().contains("audio or video"));

        for malformed in ["audio/mp eg\u{0}", "audio/", "audio", "audio/mpeg;", ""] {
            let err = validate_media_type("media_files", "a.mp3", malformed, &media).unwrap_err();
            assert!(
                err.to_string().contains("malformed"),
                "{:?} was accepted",
                malformed
            );
        }
    }

    #[test]
    fn test_validate_non_empty_string() {
        assert!(validate_non_empty_string("full_name", "Ali").is_ok());
        let err = validate_non_empty_string("full_name", "   ").unwrap_err();
        assert!(matches!(err, SubmitError::FormValidationError { .. }));
    }
}
