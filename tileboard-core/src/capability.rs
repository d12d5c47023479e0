//! Narrow interfaces to capabilities the board borrows from its host.

/// Resolves the small icon shown next to a bookmark link.
pub trait FaviconResolver {
    /// Icon URL for `page_url`, or `None` when no icon can be derived.
    fn favicon_url(&self, page_url: &str) -> Option<String>;
}

/// Looks icons up by domain through a public favicon service.
#[derive(Debug, Clone)]
pub struct DomainFavicon {
    /// Service URL; `{domain}` is replaced with the page's host.
    pub template: String,
}

impl Default for DomainFavicon {
    fn default() -> Self {
        Self {
            template: "http://www.google.com/s2/favicons?domain={domain}".to_string(),
        }
    }
}

impl FaviconResolver for DomainFavicon {
    fn favicon_url(&self, page_url: &str) -> Option<String> {
        let domain = page_domain(page_url)?;
        Some(self.template.replace("{domain}", domain))
    }
}

/// Host of an `http(s)` URL without port, e.g. `"example.com"` for
/// `"https://example.com:8443/a"`.
pub fn page_domain(url: &str) -> Option<&str> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host = authority.rsplit('@').next()?.split(':').next()?;
    (!host.is_empty()).then_some(host)
}

/// Validate a user-supplied background image URL.
///
/// The URL must be `http`-like and point at a `.jpg`, `.jpeg`, `.png` or
/// `.svg` file. An empty string is not an error; callers treat it as a
/// cancelled prompt.
pub fn validate_image_url(url: &str) -> crate::Result<()> {
    if !url.starts_with("http") {
        return Err(crate::CoreError::InvalidBackgroundUrl);
    }
    const EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".svg"];
    if !EXTENSIONS.iter().any(|ext| url.ends_with(ext)) {
        return Err(crate::CoreError::UnsupportedImageUrl);
    }
    Ok(())
}
