use thiserror::Error;

#[derive(Debug, Error)]
pub enum KmlError {
    #[error("malformed KML document: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("failed to write KML: {0}")]
    Write(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build KML from {origin}: {source}")]
    Build {
        origin: String,
        #[source]
        source: KmlError,
    },

    #[error("failed to parse KML from {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: KmlError,
    },
}
