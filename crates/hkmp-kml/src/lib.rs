pub mod error;
pub mod generate;
pub mod latest;
pub mod loader;
pub mod parse;
mod retry;
pub mod source;

pub use error::{KmlError, LoaderError};
pub use generate::{write_kml, FeatureCollection, GeneratedKml, KmlGenerator};
pub use latest::{LatestLoad, LoadOutcome};
pub use loader::KmlLoader;
pub use parse::parse_kml;
pub use source::DocumentSource;
