use std::fs;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use cookie_store::CookieStore;
use crate::error::FetcherError;

/// Durable storage for the session cookie jar.
///
/// Absence of a stored jar is the expected cold-start path and loads as
/// `None`, never as an error.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<CookieStore>, FetcherError>;
    fn save(&self, cookies: &CookieStore) -> Result<(), FetcherError>;
}

impl<S: SessionStore + ?Sized> SessionStore for Arc<S> {
    fn load(&self) -> Result<Option<CookieStore>, FetcherError> {
        (**self).load()
    }

    fn save(&self, cookies: &CookieStore) -> Result<(), FetcherError> {
        (**self).save(cookies)
    }
}

/// Cookie jar persisted as a JSON file, by default next to the working
/// directory. Session cookies are written too, since the portal's SSO
/// cookies carry no expiry.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<CookieStore>, FetcherError> {
        let file = match fs::File::open(&self.path) {
            Ok(v) => v,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No existing cookies found");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let cookies = cookie_store::serde::json::load_all(BufReader::new(file))
            .map_err(|err| FetcherError::CookieStore(err.to_string()))?;

        Ok(Some(cookies))
    }

    fn save(&self, cookies: &CookieStore) -> Result<(), FetcherError> {
        let mut file = fs::File::create(&self.path)?;
        cookie_store::serde::json::save_incl_expired_and_nonpersistent(cookies, &mut file)
            .map_err(|err| FetcherError::CookieStore(err.to_string()))?;

        Ok(())
    }
}

/// Keeps the jar in memory only; used by tests.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    cookies: Mutex<Option<Vec<u8>>>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<CookieStore>, FetcherError> {
        let guard = self
            .cookies
            .lock()
            .map_err(|_| FetcherError::CookieStore("session store mutex poisoned".to_owned()))?;

        match guard.as_deref() {
            Some(data) => {
                let cookies = cookie_store::serde::json::load_all(data)
                    .map_err(|err| FetcherError::CookieStore(err.to_string()))?;
                Ok(Some(cookies))
            }
            None => Ok(None),
        }
    }

    fn save(&self, cookies: &CookieStore) -> Result<(), FetcherError> {
        let mut data = Vec::new();
        cookie_store::serde::json::save_incl_expired_and_nonpersistent(cookies, &mut data)
            .map_err(|err| FetcherError::CookieStore(err.to_string()))?;

        let mut guard = self
            .cookies
            .lock()
            .map_err(|_| FetcherError::CookieStore("session store mutex poisoned".to_owned()))?;
        *guard = Some(data);

        Ok(())
    }
}
