/// Text and link target of one element on a rendered page
#[derive(Debug, Clone, PartialEq)]
pub struct PageElement {
    /// Visible text, line breaks between block elements preserved
    pub text: String,
    /// Resolved `href`, if the element is a link
    pub href: Option<String>,
}

impl PageElement {
    pub fn new(text: impl Into<String>, href: Option<&str>) -> Self {
        Self {
            text: text.into(),
            href: href.map(str::to_string),
        }
    }
}

/// URL of results page `page`: `<base>?page=<N>`
pub fn page_url(base_url: &str, page: u32) -> String {
    format!("{}?page={}", base_url.trim_end_matches('?'), page)
}

/// CSS selector matching every element with class `marker`
pub fn marker_selector(marker: &str) -> String {
    format!(".{}", marker.trim_start_matches('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_url_appends_page_query() {
        assert_eq!(
            page_url("https://www.willhaben.at/iad/immobilien/eigentumswohnung/wien", 7),
            "https://www.willhaben.at/iad/immobilien/eigentumswohnung/wien?page=7"
        );
    }

    #[test]
    fn marker_selector_accepts_bare_or_dotted_class() {
        assert_eq!(marker_selector("hPOcQO"), ".hPOcQO");
        assert_eq!(marker_selector(".hPOcQO"), ".hPOcQO");
    }
}
