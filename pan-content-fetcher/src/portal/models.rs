use serde::{Deserialize, Serialize};
use url::Url;

/// One entry of the portal's update feed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateRecord {
    pub key: String,
    pub file_name: String,
    pub folder_name: String,
    pub version_number: String,
    pub release_date: String,
}

/// The JSON blob embedded in the feed page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListingData {
    pub data: Vec<UpdateRecord>,
    pub total: u64,
    pub aggregate_results: Option<serde_json::Value>,
}

/// Payload for the download-link resolver endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadLinkRequest<'a> {
    #[serde(rename = "__RequestVerificationToken")]
    pub token: &'a str,
    #[serde(rename = "FileName")]
    pub file_name: &'a str,
    #[serde(rename = "FolderName")]
    pub folder_name: &'a str,
}

/// A fully resolved update: what to fetch and what to call it on disk.
#[derive(Debug, Clone)]
pub struct DownloadTarget {
    pub file_name: String,
    pub version: String,
    pub url: Url,
}

/// The raw update listing, before resolution.
#[derive(Debug, Clone)]
pub enum Listing {
    /// The JSON feed embedded in the page, plus the page's request
    /// verification token.
    Feed {
        token: String,
        records: Vec<UpdateRecord>,
    },
    /// Outbound links matching the download prefix, in document order.
    Links(Vec<Url>),
}

/// The portal endpoints as one overridable value; tests point these at a
/// mock server.
#[derive(Debug, Clone)]
pub struct PortalEndpoints {
    pub login_url: Url,
    pub updates_url: Url,
    pub get_link_url: Url,

    /// Direct-download links on the hyperlink-variant page start with this.
    pub download_prefix: String,
}

impl Default for PortalEndpoints {
    fn default() -> Self {
        Self {
            login_url: Url::parse(
                "https://identity.paloaltonetworks.com/idp/startSSO.ping?PartnerSpId=supportCSP&TargetResource=https://support.paloaltonetworks.com/Updates/DynamicUpdates/245",
            )
            .unwrap(),
            updates_url: Url::parse("https://support.paloaltonetworks.com/Updates/DynamicUpdates/245")
                .unwrap(),
            get_link_url: Url::parse("https://support.paloaltonetworks.com/Updates/GetDownloadUrl")
                .unwrap(),
            download_prefix: "https://downloads.paloaltonetworks.com/content/".to_owned(),
        }
    }
}
