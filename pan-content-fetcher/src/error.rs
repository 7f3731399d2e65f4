use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetcherError {
    #[error("an I/O error occurred: {0}")]
    GenericIo(#[from] std::io::Error),

    #[error("http client error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("deserialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("config error: {0}")]
    ConfigError(#[from] toml::de::Error),

    #[error("invalid release timestamp: {0}")]
    BadReleaseDate(#[from] chrono::ParseError),

    #[error("cookie store error: {0}")]
    CookieStore(String),

    #[error("username or password is incorrect")]
    InvalidCredentials,

    #[error("failed to login: {0}")]
    LoginFailed(&'static str),

    #[error("unknown package type: {0}")]
    UnknownPackage(String),

    #[error("update page is in an unrecognized state: {0}")]
    FetchStatus(&'static str),

    #[error("no matching update found: {0}")]
    NoMatchingUpdate(String),

    #[error("failure getting download link: {0}")]
    GetLink(String),
}
