use std::fmt;
use std::path::PathBuf;

/// Where a KML document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Url(String),
    File(PathBuf),
}

impl DocumentSource {
    /// `http://` and `https://` strings are URLs; anything else is a local path.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lowered = trimmed.to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            DocumentSource::Url(trimmed.to_owned())
        } else {
            DocumentSource::File(PathBuf::from(trimmed))
        }
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::Url(url) => write!(f, "{url}"),
            DocumentSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_and_https_are_urls() {
        assert_eq!(
            DocumentSource::parse("https://example.com/a.kml"),
            DocumentSource::Url("https://example.com/a.kml".to_owned())
        );
        assert_eq!(
            DocumentSource::parse(" HTTP://example.com/a.kml "),
            DocumentSource::Url("HTTP://example.com/a.kml".to_owned())
        );
    }

    #[test]
    fn everything_else_is_a_file() {
        assert_eq!(
            DocumentSource::parse("./output.kml"),
            DocumentSource::File(PathBuf::from("./output.kml"))
        );
        assert_eq!(
            DocumentSource::parse("file.kml").to_string(),
            "file.kml".to_owned()
        );
    }
}
