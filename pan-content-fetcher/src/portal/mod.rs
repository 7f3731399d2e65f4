mod classify;
mod forms;
mod models;

pub use classify::{PageState, VERIFICATION_TOKEN_FIELD};
pub use models::*;

use crate::config::FetcherConfig;
use crate::error::FetcherError;
use crate::session::SessionStore;
use regex::Regex;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::redirect::Policy;
use reqwest::Client;
use reqwest_cookie_store::CookieStoreMutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt as _;
use url::Url;

/// Which listing variant the portal serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ListingSource {
    /// HTML page embedding the JSON update feed.
    Feed,
    /// HTML page carrying direct download hyperlinks.
    Links,
}

/// The SSO flow rejects non-browser agents, so pose as one.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_10_5) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/44.0.2403.157 Safari/537.36";

const INCORRECT_CREDENTIALS_MARKER: &str = "The user name or password provided is incorrect.";
const RESUME_INTERSTITIAL_MARKER: &str =
    "Since your browser does not support JavaScript, you must press the Resume button once to proceed.";

const LOGIN_FORM_EMAIL_FIELD: &str = "Email";
const LOGIN_FORM_PASSWORD_FIELD: &str = "Password";

pub struct SupportPortalApi {
    client: Client,
    cookies: Arc<CookieStoreMutex>,
    session_store: Box<dyn SessionStore>,
    username: String,
    password: String,
    endpoints: PortalEndpoints,
}

impl SupportPortalApi {
    /// Prepare the portal client, reloading a previously stored cookie jar
    /// when one exists.
    pub fn new(
        config: &FetcherConfig,
        endpoints: PortalEndpoints,
        session_store: Box<dyn SessionStore>,
        timeout: Duration,
    ) -> Result<Self, FetcherError> {
        let cookies = Arc::new(CookieStoreMutex::new(
            session_store.load()?.unwrap_or_default(),
        ));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::limited(10))
            .hickory_dns(true)
            .timeout(timeout)
            .cookie_provider(Arc::clone(&cookies))
            .build()?;

        Ok(Self {
            client,
            cookies,
            session_store,
            username: config.username.clone(),
            password: config.password.clone(),
            endpoints,
        })
    }

    /// Run the form-based SSO login and persist the resulting cookie jar.
    #[tracing::instrument(skip(self))]
    pub async fn login(&self) -> Result<(), FetcherError> {
        tracing::info!("Logging in");

        let response = self
            .client
            .get(self.endpoints.login_url.clone())
            .send()
            .await?
            .error_for_status()?;

        let page_url = response.url().clone();
        let body = response.text().await?;

        let mut form = forms::PortalForm::first_on_page(&body, &page_url).ok_or(
            FetcherError::LoginFailed("identity provider returned no login form"),
        )?;
        form.set(LOGIN_FORM_EMAIL_FIELD, self.username.as_str());
        form.set(LOGIN_FORM_PASSWORD_FIELD, self.password.as_str());

        let response = self
            .client
            .post(form.action.clone())
            .form(&form.fields)
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;

        if body.contains(INCORRECT_CREDENTIALS_MARKER) {
            return Err(FetcherError::InvalidCredentials);
        }

        // The no-JavaScript interstitial is the only success signal this
        // flow has; any other page means the login landed somewhere else.
        if !body.contains(RESUME_INTERSTITIAL_MARKER) {
            return Err(FetcherError::LoginFailed(
                "expected the resume interstitial",
            ));
        }

        self.submit_resume_form().await?;
        self.persist_session()?;

        Ok(())
    }

    /// Fetch and parse the update listing, replaying the login exactly once
    /// when the response looks unauthenticated.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_listing(&self, source: ListingSource) -> Result<Listing, FetcherError> {
        let body = self.fetch_updates_page().await?;

        let body = match classify::classify(&body, source, &self.endpoints.download_prefix) {
            PageState::Ok => body,
            PageState::Unknown => {
                return Err(FetcherError::FetchStatus("listing response not recognized"));
            }
            PageState::NeedsLogin => {
                tracing::info!("Not logged in.");
                self.login().await?;

                tracing::info!("Checking for new content updates (2nd attempt)");
                let body = self.fetch_updates_page().await?;
                match classify::classify(&body, source, &self.endpoints.download_prefix) {
                    PageState::Ok => body,
                    PageState::NeedsLogin => {
                        return Err(FetcherError::FetchStatus(
                            "still unauthenticated after login",
                        ));
                    }
                    PageState::Unknown => {
                        return Err(FetcherError::FetchStatus("listing response not recognized"));
                    }
                }
            }
        };

        self.parse_listing(&body, source)
    }

    /// Exchange the verification token for a direct download URL.
    #[tracing::instrument(skip(self, token))]
    pub async fn get_download_link(
        &self,
        token: &str,
        file_name: &str,
        folder_name: &str,
    ) -> Result<Url, FetcherError> {
        let payload = DownloadLinkRequest {
            token,
            file_name,
            folder_name,
        };

        let response = self
            .client
            .post(self.endpoints.get_link_url.clone())
            .header(CONTENT_TYPE, "application/json; charset=UTF-8")
            .header(ACCEPT, "application/json, text/javascript, */*; q=0.01")
            .header("X-Requested-With", "XMLHttpRequest")
            .body(serde_json::to_vec(&payload)?)
            .send()
            .await?
            .error_for_status()?;

        let data = response.bytes().await?;

        let response: serde_json::Value = serde_json::from_slice(&data)
            .map_err(|_| FetcherError::GetLink(String::from_utf8_lossy(&data).into_owned()))?;

        if response.get("Success").and_then(|v| v.as_bool()) != Some(true) {
            return Err(FetcherError::GetLink(response.to_string()));
        }

        response
            .get("DownloadUrl")
            .and_then(|v| v.as_str())
            .and_then(|v| Url::parse(v).ok())
            .ok_or_else(|| FetcherError::GetLink(response.to_string()))
    }

    /// Stream the target into the directory, named after the resolved file.
    /// Overwrites a leftover file of the same name.
    #[tracing::instrument(skip(self, target), fields(file_name = target.file_name.as_str()))]
    pub async fn download(
        &self,
        target: &DownloadTarget,
        directory: &Path,
    ) -> Result<String, FetcherError> {
        let path = directory.join(&target.file_name);

        let mut response = self
            .client
            .get(target.url.clone())
            .send()
            .await?
            .error_for_status()?;

        let mut file = tokio::fs::File::create(&path).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        Ok(target.file_name.clone())
    }

    /// Complete the SSO handshake by submitting the "Resume" form the portal
    /// serves to browsers without JavaScript.
    async fn submit_resume_form(&self) -> Result<(), FetcherError> {
        let response = self
            .client
            .get(self.endpoints.updates_url.clone())
            .send()
            .await?
            .error_for_status()?;

        let page_url = response.url().clone();
        let body = response.text().await?;

        let form = forms::PortalForm::first_on_page(&body, &page_url).ok_or(
            FetcherError::LoginFailed("update page returned no resume form"),
        )?;

        self.client
            .post(form.action.clone())
            .form(&form.fields)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    async fn fetch_updates_page(&self) -> Result<String, FetcherError> {
        let response = self
            .client
            .get(self.endpoints.updates_url.clone())
            .send()
            .await?
            .error_for_status()?;

        Ok(response.text().await?)
    }

    fn parse_listing(&self, body: &str, source: ListingSource) -> Result<Listing, FetcherError> {
        match source {
            ListingSource::Feed => {
                let form = forms::PortalForm::first_on_page(body, &self.endpoints.updates_url)
                    .ok_or(FetcherError::FetchStatus("feed page carries no form"))?;
                let token = form
                    .field(VERIFICATION_TOKEN_FIELD)
                    .ok_or(FetcherError::FetchStatus(
                        "feed page carries no verification token",
                    ))?
                    .to_owned();

                let blob_regex =
                    Regex::new(r#""data":(\{"Data":.*?"Total":\d+,"AggregateResults":null\})"#)
                        .expect("valid feed blob regex");
                let blob = blob_regex
                    .captures(body)
                    .and_then(|captures| captures.get(1))
                    .ok_or(FetcherError::FetchStatus("feed page embeds no update data"))?;

                let listing: ListingData = serde_json::from_str(blob.as_str())?;

                Ok(Listing::Feed {
                    token,
                    records: listing.data,
                })
            }
            ListingSource::Links => {
                let links = forms::outbound_links(body, &self.endpoints.updates_url)
                    .into_iter()
                    .filter(|link| link.as_str().starts_with(&self.endpoints.download_prefix))
                    .collect();

                Ok(Listing::Links(links))
            }
        }
    }

    fn persist_session(&self) -> Result<(), FetcherError> {
        let cookies = self
            .cookies
            .lock()
            .map_err(|_| FetcherError::CookieStore("cookie jar mutex poisoned".to_owned()))?;

        self.session_store.save(&cookies)
    }
}
