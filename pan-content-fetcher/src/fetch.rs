use std::path::PathBuf;
use std::time::Duration;

use crate::args::FetcherArgs;
use crate::config::FetcherConfig;
use crate::error::FetcherError;
use crate::inventory;
use crate::portal::{DownloadTarget, Listing, ListingSource, PortalEndpoints, SupportPortalApi};
use crate::resolve;
use crate::session::{FileSessionStore, SessionStore};

/// How a run ended; both outcomes exit 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded(String),
    AlreadyCurrent(String),
}

pub struct ContentFetcher {
    api: SupportPortalApi,
    package: String,
    key: &'static str,
    source: ListingSource,
    download_dir: PathBuf,
}

impl ContentFetcher {
    /// Validate the requested package and prepare the portal client. An
    /// unknown package fails here, before any network traffic happens.
    pub fn new(config: &FetcherConfig, args: &FetcherArgs) -> Result<Self, FetcherError> {
        Self::with_endpoints(
            config,
            args,
            PortalEndpoints::default(),
            Box::new(FileSessionStore::new(&args.cookie_file)),
        )
    }

    /// Like `new`, with the portal collaborators swapped out; tests run
    /// against a mock server and an in-memory session store.
    pub fn with_endpoints(
        config: &FetcherConfig,
        args: &FetcherArgs,
        endpoints: PortalEndpoints,
        session_store: Box<dyn SessionStore>,
    ) -> Result<Self, FetcherError> {
        let key = resolve::content_key(&args.package)
            .ok_or_else(|| FetcherError::UnknownPackage(args.package.clone()))?;

        let api = SupportPortalApi::new(
            config,
            endpoints,
            session_store,
            Duration::from_secs(args.timeout_secs),
        )?;

        Ok(Self {
            api,
            package: args.package.clone(),
            key,
            source: args.source,
            download_dir: config.resolve_download_dir()?,
        })
    }

    /// Check the portal for the newest update of the configured package and
    /// download it unless it is already present locally.
    pub async fn run(&self) -> Result<FetchOutcome, FetcherError> {
        tracing::info!("Checking for new content updates: {}", self.package);
        let listing = self.api.fetch_listing(self.source).await?;

        match listing {
            Listing::Feed { token, records } => {
                let latest = resolve::latest_feed_update(&records, self.key)?;
                tracing::info!(
                    "Found latest update:  {}  Released {}",
                    latest.file_name,
                    latest.release_date
                );

                if inventory::is_downloaded(
                    &self.download_dir,
                    &latest.file_name,
                    &latest.version_number,
                )? {
                    return Ok(FetchOutcome::AlreadyCurrent(latest.file_name.clone()));
                }

                let url = self
                    .api
                    .get_download_link(&token, &latest.file_name, &latest.folder_name)
                    .await?;

                let target = DownloadTarget {
                    file_name: latest.file_name.clone(),
                    version: latest.version_number.clone(),
                    url,
                };

                tracing::info!("Downloading latest version: {}", target.version);
                let file_name = self.api.download(&target, &self.download_dir).await?;
                Ok(FetchOutcome::Downloaded(file_name))
            }
            Listing::Links(links) => {
                let target = resolve::first_link_update(&links)?;
                tracing::info!("Found latest update:  {}", target.file_name);

                if inventory::is_downloaded(&self.download_dir, &target.file_name, &target.version)?
                {
                    return Ok(FetchOutcome::AlreadyCurrent(target.file_name));
                }

                tracing::info!("Downloading latest version: {}", target.version);
                let file_name = self.api.download(&target, &self.download_dir).await?;
                Ok(FetchOutcome::Downloaded(file_name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use clap::Parser as _;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const UPDATES_PATH: &str = "/Updates/DynamicUpdates/245";
    const FILE_NAME: &str = "panupv2-all-contents-8549-7289";

    fn test_config(download_dir: &std::path::Path) -> FetcherConfig {
        FetcherConfig {
            username: "user@example.com".to_owned(),
            password: "secret".to_owned(),
            download_dir: Some(download_dir.to_owned()),
        }
    }

    fn test_args(package: &str, source: &str) -> FetcherArgs {
        FetcherArgs::parse_from([
            "pan-content-fetcher",
            "--package",
            package,
            "--source",
            source,
        ])
    }

    fn test_endpoints(server: &MockServer) -> PortalEndpoints {
        let base = Url::parse(&server.uri()).unwrap();
        PortalEndpoints {
            login_url: base.join("/login").unwrap(),
            updates_url: base.join(UPDATES_PATH).unwrap(),
            get_link_url: base.join("/Updates/GetDownloadUrl").unwrap(),
            download_prefix: format!("{}/content/", server.uri()),
        }
    }

    fn fetcher(
        server: &MockServer,
        download_dir: &std::path::Path,
        package: &str,
        source: &str,
    ) -> ContentFetcher {
        ContentFetcher::with_endpoints(
            &test_config(download_dir),
            &test_args(package, source),
            test_endpoints(server),
            Box::new(MemorySessionStore::default()),
        )
        .unwrap()
    }

    fn feed_page() -> String {
        format!(
            "<html><body>\
             <form action=\"{UPDATES_PATH}\">\
             <input type=\"hidden\" name=\"__RequestVerificationToken\" value=\"tok123\"/>\
             </form>\
             <script>var pageData = {{\"data\":{{\"Data\":[\
             {{\"Key\":\"CONTENTS\",\"FileName\":\"{FILE_NAME}\",\"FolderName\":\"content\",\
             \"VersionNumber\":\"8549-7289\",\"ReleaseDate\":\"2024-01-01T00:00:00\"}}\
             ],\"Total\":1,\"AggregateResults\":null}}}};</script>\
             </body></html>"
        )
    }

    async fn mount_feed_page(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(UPDATES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(feed_page()))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn unknown_package_fails_before_any_network_call() {
        let dir = tempfile::tempdir().unwrap();
        let result = ContentFetcher::with_endpoints(
            &test_config(dir.path()),
            &test_args("globalprotect", "feed"),
            PortalEndpoints::default(),
            Box::new(MemorySessionStore::default()),
        );

        match result {
            Err(FetcherError::UnknownPackage(package)) => assert_eq!(package, "globalprotect"),
            _ => panic!("expected an UnknownPackage error"),
        }
    }

    #[tokio::test]
    async fn feed_run_downloads_the_newest_package() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        mount_feed_page(&server).await;
        Mock::given(method("POST"))
            .and(path("/Updates/GetDownloadUrl"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"{{"Success":true,"DownloadUrl":"{}/content/{FILE_NAME}"}}"#,
                server.uri()
            )))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/content/{FILE_NAME}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"signature data".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = fetcher(&server, dir.path(), "appthreat", "feed")
            .run()
            .await
            .unwrap();

        assert_eq!(outcome, FetchOutcome::Downloaded(FILE_NAME.to_owned()));
        let written = std::fs::read(dir.path().join(FILE_NAME)).unwrap();
        assert_eq!(written, b"signature data");
    }

    #[tokio::test]
    async fn present_file_short_circuits_without_download_calls() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(FILE_NAME), b"already here").unwrap();

        mount_feed_page(&server).await;
        // Neither the link exchange nor the download may be touched.
        Mock::given(method("POST"))
            .and(path("/Updates/GetDownloadUrl"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/content/{FILE_NAME}")))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let outcome = fetcher(&server, dir.path(), "appthreat", "feed")
            .run()
            .await
            .unwrap();

        assert_eq!(outcome, FetchOutcome::AlreadyCurrent(FILE_NAME.to_owned()));
    }

    #[tokio::test]
    async fn denied_link_exchange_writes_no_file() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        mount_feed_page(&server).await;
        Mock::given(method("POST"))
            .and(path("/Updates/GetDownloadUrl"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"Success":false}"#))
            .mount(&server)
            .await;

        let result = fetcher(&server, dir.path(), "appthreat", "feed").run().await;

        assert!(matches!(result, Err(FetcherError::GetLink(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn links_run_downloads_the_first_matching_link() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        let page = format!(
            "<html><body>\
             <a href=\"/Updates/Help\">help</a>\
             <a href=\"{0}/content/{FILE_NAME}?__gda__=tkn\">newest</a>\
             </body></html>",
            server.uri()
        );
        Mock::given(method("GET"))
            .and(path(UPDATES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/content/{FILE_NAME}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"content bytes".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = fetcher(&server, dir.path(), "appthreat", "links")
            .run()
            .await
            .unwrap();

        assert_eq!(outcome, FetchOutcome::Downloaded(FILE_NAME.to_owned()));
        assert!(dir.path().join(FILE_NAME).exists());
    }

    #[tokio::test]
    async fn links_run_skips_an_already_downloaded_version() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        // A differently named artifact of the same version also counts.
        std::fs::write(dir.path().join("panupv2-all-contents-8549-7289.bak"), b"x").unwrap();

        let page = format!(
            "<html><body><a href=\"{0}/content/{FILE_NAME}?__gda__=tkn\">newest</a></body></html>",
            server.uri()
        );
        Mock::given(method("GET"))
            .and(path(UPDATES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/content/{FILE_NAME}")))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let outcome = fetcher(&server, dir.path(), "appthreat", "links")
            .run()
            .await
            .unwrap();

        assert_eq!(outcome, FetchOutcome::AlreadyCurrent(FILE_NAME.to_owned()));
    }
}
