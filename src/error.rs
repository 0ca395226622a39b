use thiserror::Error;

use crate::{assets::AssetError, resource::DecodeError, template::TemplateError, values::ConfigError};

/// A render failure for one cluster. No manifests are returned alongside it.
#[derive(Error, Debug)]
pub enum Error {
    #[error("cluster {cluster}: {source}")]
    Asset {
        cluster: String,
        #[source]
        source: AssetError,
    },
    #[error("cluster {cluster}: failed to render {path}: {source}")]
    Template {
        cluster: String,
        path: String,
        #[source]
        source: TemplateError,
    },
    #[error("cluster {cluster}: failed to decode document {document} of {path}: {source}")]
    Decode {
        cluster: String,
        path: String,
        document: usize,
        #[source]
        source: DecodeError,
    },
    #[error("cluster {cluster}: invalid addon configuration: {source}")]
    Config {
        cluster: String,
        #[source]
        source: ConfigError,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
