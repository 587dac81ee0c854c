use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no config file found in any of the default locations")]
    ConfigNotFound,

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
