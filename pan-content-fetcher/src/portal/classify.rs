use crate::portal::ListingSource;

/// Authentication state inferred from a listing response body.
///
/// The portal exposes no structured status for this; the state is
/// pattern-matched on known page copy. The marker strings live here as
/// data so they can be updated without touching the logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Ok,
    NeedsLogin,
    Unknown,
}

/// Markers of an unauthenticated response, shared by both listing variants.
const NEEDS_LOGIN_MARKERS: &[(&str, &str)] = &[
    ("<h1>Single Sign On</h1>", "single sign on page"),
    (
        "<h4>You are not authorized to perform this action.</h4>",
        "not authorized page",
    ),
    (
        r#"webData.pageName = "support:portal:Unauth Home""#,
        "unauth screen",
    ),
];

/// The feed page renders a loading placeholder instead of the grid when the
/// session is missing.
const FEED_LOADING_MARKER: (&str, &str) = (
    r#"<img src="/assets/img/pan-loading.gif" alt="Loading"/>"#,
    "loading screen",
);

/// Form field carrying the per-session verification token on the feed page.
pub const VERIFICATION_TOKEN_FIELD: &str = "__RequestVerificationToken";

pub fn classify(body: &str, source: ListingSource, download_prefix: &str) -> PageState {
    for (marker, name) in NEEDS_LOGIN_MARKERS {
        if body.contains(marker) {
            tracing::debug!("Got {}", name);
            return PageState::NeedsLogin;
        }
    }

    if source == ListingSource::Feed {
        let (marker, name) = FEED_LOADING_MARKER;
        if body.contains(marker) {
            tracing::debug!("Got {}", name);
            return PageState::NeedsLogin;
        }
    }

    let authenticated = match source {
        ListingSource::Feed => body.contains(VERIFICATION_TOKEN_FIELD),
        ListingSource::Links => body.contains(download_prefix),
    };

    if authenticated {
        PageState::Ok
    } else {
        PageState::Unknown
    }
}
