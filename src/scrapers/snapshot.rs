use crate::scrapers::traits::RenderedPage;
use crate::scrapers::types::{marker_selector, PageElement};
use anyhow::{anyhow, Context, Result};
use scraper::{Html, Selector};
use std::path::Path;

/// A results page captured as HTML (debug dumps, saved pages)
pub struct HtmlPage {
    document: Html,
}

impl HtmlPage {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let html = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read page dump {}", path.display()))?;
        Ok(Self::parse(&html))
    }
}

impl RenderedPage for HtmlPage {
    fn find_by_marker(&self, marker: &str) -> Result<Vec<PageElement>> {
        let selector = Selector::parse(&marker_selector(marker))
            .map_err(|e| anyhow!("Invalid content marker {:?}: {}", marker, e))?;

        let elements = self
            .document
            .select(&selector)
            .map(|element| {
                // No layout engine here: one line per non-blank text node is
                // the closest we get to innerText for card markup.
                let text = element
                    .text()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n");
                PageElement::new(text, element.value().attr("href"))
            })
            .collect();

        Ok(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD_PAGE: &str = r#"
        <html><body>
          <a class="hPOcQO other" href="/iad/immobilien/d/1">
            <h3>Nice Flat</h3>
            <div><span>1010 Wien</span></div>
            <div><span>85 m²</span><span>3 Zimmer</span></div>
            <span>€ 450.000</span>
          </a>
          <a class="hPOcQO" href="/iad/immobilien/d/2"><h3>Dachgeschoss</h3></a>
          <a class="something-else" href="/ad">Sponsored</a>
        </body></html>
    "#;

    #[test]
    fn finds_only_marked_elements() {
        let page = HtmlPage::parse(CARD_PAGE);
        let elements = page.find_by_marker("hPOcQO").unwrap();

        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].text, "Nice Flat\n1010 Wien\n85 m²\n3 Zimmer\n€ 450.000");
        assert_eq!(elements[0].href.as_deref(), Some("/iad/immobilien/d/1"));
        assert_eq!(elements[1].text, "Dachgeschoss");
    }

    #[test]
    fn no_marked_elements_is_not_an_error() {
        let page = HtmlPage::parse("<html><body><p>Keine Treffer</p></body></html>");
        assert!(page.find_by_marker("hPOcQO").unwrap().is_empty());
    }

    #[test]
    fn malformed_marker_is_reported() {
        let page = HtmlPage::parse(CARD_PAGE);
        assert!(page.find_by_marker("[[").is_err());
    }
}
