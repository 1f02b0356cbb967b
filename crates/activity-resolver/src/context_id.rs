//! Parsing of document context ids.
//!
//! A context id is a document URL such as
//! `https://contoso-my.sharepoint.com/personal/alice_contoso_com/_layouts/15/Doc.aspx?sourcedoc=%7B0D86F64F-8435-430C-8979-FF46C00F7ACB%7D&file=Deck.pptx`.
//! It carries the site URL in its host and leading path, and the drive item
//! GUID in the `sourcedoc` query parameter.

use url::Url;

/// Path prefixes that scope a site collection.
const MANAGED_PATHS: [&str; 3] = ["sites", "teams", "personal"];

fn parse_web_url(s: &str) -> Option<Url> {
    let url = Url::parse(s.trim()).ok()?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Some(url),
        _ => None,
    }
}

fn is_managed_path(segment: &str) -> bool {
    MANAGED_PATHS
        .iter()
        .any(|p| segment.eq_ignore_ascii_case(p))
}

/// Site URL embedded in a context id.
///
/// `https://host/sites/x/...` gives `https://host/sites/x` (likewise `teams`
/// and `personal`); any other path gives the root site `https://host`.
pub fn site_url(context_id: &str) -> Option<String> {
    let url = parse_web_url(context_id)?;
    let host = url.host_str()?;

    let mut base = format!("{}://{}", url.scheme(), host);
    if let Some(port) = url.port() {
        base.push_str(&format!(":{}", port));
    }

    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    match (segments.next(), segments.next()) {
        (Some(scope), Some(name)) if is_managed_path(scope) => {
            Some(format!("{}/{}/{}", base, scope, name))
        }
        _ => Some(base),
    }
}

/// Personal ("my site") URLs live on the `<tenant>-my` host under `/personal/`.
pub fn is_my_site_url(site_url: &str) -> bool {
    let Some(url) = parse_web_url(site_url) else {
        return false;
    };

    let my_host = url
        .host_str()
        .and_then(|h| h.split('.').next())
        .is_some_and(|label| label.to_ascii_lowercase().ends_with("-my"));

    let personal_path = url
        .path_segments()
        .and_then(|mut s| s.next())
        .is_some_and(|first| first.eq_ignore_ascii_case("personal"));

    my_host || personal_path
}

/// Graph site address for a site URL: `host:/sites/x`, or `host` for a root site.
///
/// Returns `None` for hosts that are not SharePoint (Teams links and the like).
pub fn host_and_site_relative_url(site_url: &str) -> Option<String> {
    let url = parse_web_url(site_url)?;
    let host = url.host_str()?.to_ascii_lowercase();
    if !host.contains(".sharepoint.") {
        return None;
    }

    let path = url
        .path_segments()?
        .filter(|s| !s.is_empty())
        .map(|s| {
            urlencoding::decode(s)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| s.to_string())
        })
        .collect::<Vec<_>>()
        .join("/");

    if path.is_empty() {
        Some(host)
    } else {
        Some(format!("{}:/{}", host, path))
    }
}

/// Drive item GUID from the `sourcedoc` parameter, braces removed.
pub fn drive_item_id(context_id: &str) -> Option<String> {
    let url = parse_web_url(context_id)?;

    url.query_pairs()
        .find(|(name, _)| name.eq_ignore_ascii_case("sourcedoc"))
        .map(|(_, value)| {
            value
                .trim()
                .trim_start_matches('{')
                .trim_end_matches('}')
                .to_string()
        })
        .filter(|id| is_guid(id))
}

/// `8-4-4-4-12` hex digits.
fn is_guid(s: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

    let parts: Vec<&str> = s.split('-').collect();
    parts.len() == GROUPS.len()
        && parts
            .iter()
            .zip(GROUPS)
            .all(|(part, len)| part.len() == len && part.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    const MY_SITE_DOC: &str = "https://m365cp123890-my.sharepoint.com/personal/sambetts_m365cp123890_onmicrosoft_com/_layouts/15/Doc.aspx?sourcedoc=%7B0D86F64F-8435-430C-8979-FF46C00F7ACB%7D&file=Presentation.pptx&action=edit&mobileredirect=true";
    const TEAM_SITE_DOC: &str = "https://contoso.sharepoint.com/sites/Marketing/_layouts/15/Doc.aspx?sourcedoc={5E1A0C9B-2D3F-4A5B-8C7D-9E0F1A2B3C4D}&file=Plan.docx";

    #[test]
    fn test_site_url_personal() {
        assert_eq!(
            site_url(MY_SITE_DOC).as_deref(),
            Some("https://m365cp123890-my.sharepoint.com/personal/sambetts_m365cp123890_onmicrosoft_com")
        );
    }

    #[test]
    fn test_site_url_team() {
        assert_eq!(
            site_url(TEAM_SITE_DOC).as_deref(),
            Some("https://contoso.sharepoint.com/sites/Marketing")
        );
        assert_eq!(
            site_url("https://contoso.sharepoint.com/teams/Eng/Shared%20Documents/a.docx").as_deref(),
            Some("https://contoso.sharepoint.com/teams/Eng")
        );
    }

    #[test]
    fn test_site_url_root() {
        assert_eq!(
            site_url("https://contoso.sharepoint.com/Shared%20Documents/a.docx").as_deref(),
            Some("https://contoso.sharepoint.com")
        );
        assert_eq!(
            site_url("https://contoso.sharepoint.com/sites").as_deref(),
            Some("https://contoso.sharepoint.com")
        );
    }

    #[test]
    fn test_site_url_unparsable() {
        assert_eq!(site_url(""), None);
        assert_eq!(site_url("19:meeting_abc@thread.v2"), None);
        assert_eq!(site_url("not a url"), None);
        assert_eq!(site_url("ftp://contoso.sharepoint.com/sites/a"), None);
    }

    #[test]
    fn test_is_my_site_url() {
        assert!(is_my_site_url(&site_url(MY_SITE_DOC).unwrap()));
        assert!(is_my_site_url("https://contoso.sharepoint.com/personal/alice"));
        assert!(!is_my_site_url(&site_url(TEAM_SITE_DOC).unwrap()));
        assert!(!is_my_site_url("https://contoso.sharepoint.com"));
        assert!(!is_my_site_url("garbage"));
    }

    #[test]
    fn test_host_and_site_relative_url() {
        assert_eq!(
            host_and_site_relative_url("https://contoso.sharepoint.com/sites/Marketing").as_deref(),
            Some("contoso.sharepoint.com:/sites/Marketing")
        );
        assert_eq!(
            host_and_site_relative_url("https://Contoso.SharePoint.com/sites/Team%20A").as_deref(),
            Some("contoso.sharepoint.com:/sites/Team A")
        );
        assert_eq!(
            host_and_site_relative_url("https://contoso.sharepoint.com").as_deref(),
            Some("contoso.sharepoint.com")
        );
    }

    #[test]
    fn test_host_and_site_relative_url_rejects_non_sharepoint() {
        assert_eq!(
            host_and_site_relative_url("https://teams.microsoft.com/l/meetup-join"),
            None
        );
        assert_eq!(host_and_site_relative_url("nope"), None);
    }

    #[test]
    fn test_drive_item_id() {
        assert_eq!(
            drive_item_id(MY_SITE_DOC).as_deref(),
            Some("0D86F64F-8435-430C-8979-FF46C00F7ACB")
        );
        assert_eq!(
            drive_item_id(TEAM_SITE_DOC).as_deref(),
            Some("5E1A0C9B-2D3F-4A5B-8C7D-9E0F1A2B3C4D")
        );
    }

    #[test]
    fn test_drive_item_id_parameter_name_is_case_insensitive() {
        let url = "https://contoso.sharepoint.com/sites/a/_layouts/15/Doc.aspx?SourceDoc=%7B0d86f64f-8435-430c-8979-ff46c00f7acb%7D";
        assert_eq!(
            drive_item_id(url).as_deref(),
            Some("0d86f64f-8435-430c-8979-ff46c00f7acb")
        );
    }

    #[test]
    fn test_drive_item_id_missing_or_malformed() {
        assert_eq!(
            drive_item_id("https://contoso.sharepoint.com/sites/a/Shared%20Documents/a.docx"),
            None
        );
        assert_eq!(
            drive_item_id("https://contoso.sharepoint.com/sites/a/Doc.aspx?sourcedoc=%7Bnot-a-guid%7D"),
            None
        );
        assert_eq!(drive_item_id("sourcedoc={0D86F64F-8435-430C-8979-FF46C00F7ACB}"), None);
    }
}
