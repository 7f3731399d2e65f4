use chrono::NaiveDateTime;
use regex::Regex;
use url::Url;

use crate::error::FetcherError;
use crate::portal::{DownloadTarget, UpdateRecord};

/// Command-line package names and the feed category key each maps to.
///
/// Download URLs take the form
/// `https://downloads.paloaltonetworks.com/content/panupv2-all-contents-578-2874`;
/// maintaining this tool means keeping these keys in line with the portal's
/// listing categories as packages come and go.
pub const PACKAGE_KEYS: &[(&str, &str)] = &[
    ("appthreat", "CONTENTS"),
    ("app", "APPS"),
    ("antivirus", "VIRUS"),
    ("wildfire", "WILDFIRE_OLDER"),
    ("wildfire2", "WILDFIRE_NEWEST"),
    ("wf500", "WF-500 CONTENT"),
    ("traps", "TRAPS3.4"),
    ("clientless", "GPCONTENTS"),
];

/// Release timestamps in the feed use this fixed format.
pub const RELEASE_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn content_key(package: &str) -> Option<&'static str> {
    PACKAGE_KEYS
        .iter()
        .find(|(name, _)| *name == package)
        .map(|(_, key)| *key)
}

/// Pick the newest record of the requested category.
///
/// Ties on the release timestamp resolve to the record appearing later in
/// the feed: the sort is stable and ascending, and the last element wins.
pub fn latest_feed_update<'a>(
    records: &'a [UpdateRecord],
    key: &str,
) -> Result<&'a UpdateRecord, FetcherError> {
    let mut of_type = Vec::new();
    for record in records.iter().filter(|record| record.key == key) {
        let released = NaiveDateTime::parse_from_str(&record.release_date, RELEASE_DATE_FORMAT)?;
        of_type.push((released, record));
    }

    of_type.sort_by_key(|(released, _)| *released);

    of_type
        .last()
        .map(|(_, record)| *record)
        .ok_or_else(|| FetcherError::NoMatchingUpdate(key.to_owned()))
}

/// Take the first download link in document order and pull the version out
/// of its final path segment (the part before any query string).
pub fn first_link_update(links: &[Url]) -> Result<DownloadTarget, FetcherError> {
    let version_regex = Regex::new(r"(\d+-\d+)$").expect("valid version regex");

    let link = links
        .first()
        .ok_or_else(|| FetcherError::NoMatchingUpdate("no download links on page".to_owned()))?;

    let file_name = link
        .path_segments()
        .and_then(|segments| segments.last())
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| FetcherError::NoMatchingUpdate("download link has no path".to_owned()))?
        .to_owned();

    let version = version_regex
        .captures(&file_name)
        .and_then(|captures| captures.get(1))
        .map(|capture| capture.as_str().to_owned())
        .ok_or_else(|| {
            FetcherError::NoMatchingUpdate("download link carries no version".to_owned())
        })?;

    Ok(DownloadTarget {
        file_name,
        version,
        url: link.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str, file_name: &str, date: &str) -> UpdateRecord {
        UpdateRecord {
            key: key.to_owned(),
            file_name: file_name.to_owned(),
            folder_name: "content".to_owned(),
            version_number: "1-1".to_owned(),
            release_date: date.to_owned(),
        }
    }

    #[test]
    fn known_packages_map_to_their_keys() {
        assert_eq!(content_key("appthreat"), Some("CONTENTS"));
        assert_eq!(content_key("antivirus"), Some("VIRUS"));
        assert_eq!(content_key("wf500"), Some("WF-500 CONTENT"));
    }

    #[test]
    fn unknown_package_has_no_key() {
        assert_eq!(content_key("globalprotect"), None);
        assert_eq!(content_key(""), None);
    }

    #[test]
    fn newest_record_of_the_requested_category_wins() {
        let records = vec![
            record("CONTENTS", "contents-old", "2024-01-01T00:00:00"),
            record("VIRUS", "virus-newest", "2024-06-01T00:00:00"),
            record("CONTENTS", "contents-new", "2024-03-01T12:30:00"),
            record("CONTENTS", "contents-mid", "2024-02-01T00:00:00"),
        ];

        let latest = latest_feed_update(&records, "CONTENTS").unwrap();
        assert_eq!(latest.file_name, "contents-new");
    }

    #[test]
    fn other_categories_never_influence_the_result() {
        // The VIRUS record is newer than every CONTENTS record.
        let records = vec![
            record("CONTENTS", "contents", "2024-01-01T00:00:00"),
            record("VIRUS", "virus", "2025-01-01T00:00:00"),
        ];

        let latest = latest_feed_update(&records, "CONTENTS").unwrap();
        assert_eq!(latest.file_name, "contents");
    }

    #[test]
    fn equal_timestamps_resolve_to_the_later_record() {
        let records = vec![
            record("CONTENTS", "first", "2024-01-01T00:00:00"),
            record("CONTENTS", "second", "2024-01-01T00:00:00"),
        ];

        let latest = latest_feed_update(&records, "CONTENTS").unwrap();
        assert_eq!(latest.file_name, "second");
    }

    #[test]
    fn no_record_of_the_category_is_an_error() {
        let records = vec![record("VIRUS", "virus", "2024-01-01T00:00:00")];
        let result = latest_feed_update(&records, "CONTENTS");
        assert!(matches!(result, Err(FetcherError::NoMatchingUpdate(_))));
    }

    #[test]
    fn malformed_release_date_is_an_error() {
        let records = vec![record("CONTENTS", "contents", "01/01/2024")];
        let result = latest_feed_update(&records, "CONTENTS");
        assert!(matches!(result, Err(FetcherError::BadReleaseDate(_))));
    }

    #[test]
    fn first_link_wins_and_yields_its_version() {
        let links = vec![
            Url::parse(
                "https://downloads.example.com/content/panupv2-all-contents-8549-7289?__gda__=tkn",
            )
            .unwrap(),
            Url::parse("https://downloads.example.com/content/panupv2-all-contents-8448-7111")
                .unwrap(),
        ];

        let target = first_link_update(&links).unwrap();
        assert_eq!(target.file_name, "panupv2-all-contents-8549-7289");
        assert_eq!(target.version, "8549-7289");
        assert_eq!(target.url, links[0]);
    }

    #[test]
    fn no_links_is_an_error() {
        let result = first_link_update(&[]);
        assert!(matches!(result, Err(FetcherError::NoMatchingUpdate(_))));
    }

    #[test]
    fn link_without_version_digits_is_an_error() {
        let links = vec![Url::parse("https://downloads.example.com/content/readme").unwrap()];
        let result = first_link_update(&links);
        assert!(matches!(result, Err(FetcherError::NoMatchingUpdate(_))));
    }
}
