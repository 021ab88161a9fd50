//! Input validation applied before a site enters the collection.

use url::{ParseError, Url};

use crate::error::ValidationError;
use crate::models::ALLOWED_FREQUENCIES;

/// Normalize user input into the URL string stored on a site.
///
/// Input is trimmed. An explicit scheme must be `https`; input without a
/// scheme gets `https://` prepended and is parsed again.
pub fn normalize_url(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyUrl);
    }

    match Url::parse(trimmed) {
        Ok(url) => {
            // Url lowercases the scheme for us
            if url.scheme() != "https" {
                return Err(ValidationError::UnsupportedScheme(url.scheme().to_string()));
            }
            ensure_host(trimmed, &url)?;
            Ok(trimmed.to_string())
        }
        Err(ParseError::RelativeUrlWithoutBase) => {
            let prefixed = format!("https://{trimmed}");
            let url = Url::parse(&prefixed).map_err(|e| invalid(trimmed, e))?;
            ensure_host(trimmed, &url)?;
            Ok(prefixed)
        }
        Err(e) => Err(invalid(trimmed, e)),
    }
}

/// Validate that a frequency is one of the offered intervals
pub fn validate_frequency(frequency: u64) -> Result<u64, ValidationError> {
    if ALLOWED_FREQUENCIES.contains(&frequency) {
        Ok(frequency)
    } else {
        Err(ValidationError::InvalidFrequency(frequency))
    }
}

fn ensure_host(input: &str, url: &Url) -> Result<(), ValidationError> {
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(ValidationError::InvalidUrl {
            input: input.to_string(),
            reason: "URL must have a valid host".to_string(),
        }),
    }
}

fn invalid(input: &str, e: ParseError) -> ValidationError {
    ValidationError::InvalidUrl { input: input.to_string(), reason: e.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepends_https_when_scheme_missing() {
        assert_eq!(normalize_url("example.com").unwrap(), "https://example.com");
        assert_eq!(normalize_url("  google.com/status \n").unwrap(), "https://google.com/status");
    }

    #[test]
    fn test_accepts_explicit_https() {
        assert_eq!(normalize_url("https://example.com").unwrap(), "https://example.com");
        assert_eq!(normalize_url("HTTPS://Example.com/a?b=c").unwrap(), "HTTPS://Example.com/a?b=c");
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert_eq!(
            normalize_url("ftp://example.com"),
            Err(ValidationError::UnsupportedScheme("ftp".to_string()))
        );
        assert_eq!(
            normalize_url("http://example.com"),
            Err(ValidationError::UnsupportedScheme("http".to_string()))
        );
    }

    #[test]
    fn test_rejects_empty_input() {
        assert_eq!(normalize_url(""), Err(ValidationError::EmptyUrl));
        assert_eq!(normalize_url("   \t"), Err(ValidationError::EmptyUrl));
    }

    #[test]
    fn test_rejects_unparsable_input() {
        assert!(matches!(
            normalize_url("not a valid url"),
            Err(ValidationError::InvalidUrl { .. })
        ));
        assert!(matches!(
            normalize_url("[::1"),
            Err(ValidationError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_validate_frequency() {
        for frequency in ALLOWED_FREQUENCIES {
            assert_eq!(validate_frequency(frequency), Ok(frequency));
        }

        assert_eq!(validate_frequency(0), Err(ValidationError::InvalidFrequency(0)));
        assert_eq!(validate_frequency(45), Err(ValidationError::InvalidFrequency(45)));
    }
}
