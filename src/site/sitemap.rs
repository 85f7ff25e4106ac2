//! XML sitemap for the generated documentation site.

use quick_xml::escape::escape;
use std::fmt::Write;

const CHANGE_FREQUENCY: &str = "weekly";
const PRIORITY: &str = "0.8";

/// Page URLs listed in the sitemap, in output order.
///
/// The landing page appears both as the directory URL and as `index.html`, followed by
/// one entry per theme and the two specification files.
pub fn sitemap_urls(base_url: &str, themes: &[String]) -> Vec<String> {
    let base = base_url.trim_end_matches('/');
    let mut urls = vec![format!("{}/", base), format!("{}/index.html", base)];
    urls.extend(themes.iter().map(|theme| format!("{}/{}.html", base, theme)));
    urls.push(format!("{}/openapi.json", base));
    urls.push(format!("{}/openapi.yaml", base));
    urls
}

pub fn render_sitemap(base_url: &str, themes: &[String]) -> String {
    let mut xml = String::with_capacity(1024);
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");

    for url in sitemap_urls(base_url, themes) {
        let _ = write!(
            xml,
            "  <url>\n    <loc>{}</loc>\n    <changefreq>{}</changefreq>\n    <priority>{}</priority>\n  </url>\n",
            escape(url.as_str()),
            CHANGE_FREQUENCY,
            PRIORITY
        );
    }

    xml.push_str("</urlset>\n");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;

    fn themes(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_two_themes_give_six_entries() {
        let xml = render_sitemap("https://example.com/docs/", &themes(&["swagger", "redoc"]));

        assert_eq!(xml.matches("<url>").count(), 6);
        assert!(xml.contains("<loc>https://example.com/docs/</loc>"));
        assert!(xml.contains("<loc>https://example.com/docs/redoc.html</loc>"));
        assert!(xml.contains("<loc>https://example.com/docs/openapi.yaml</loc>"));
        assert!(xml.contains("<changefreq>weekly</changefreq>"));
    }

    #[test]
    fn test_loc_is_escaped() {
        let xml = render_sitemap("https://example.com/?a=1&b=2", &[]);
        assert!(xml.contains("a=1&amp;b=2"));
        assert!(!xml.contains("a=1&b"));
    }
}
