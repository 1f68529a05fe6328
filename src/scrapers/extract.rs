use crate::models::ScrapedRecord;
use crate::scrapers::traits::RenderedPage;
use anyhow::Result;
use tracing::debug;

/// Collect one record per listing card on `page`.
///
/// Cards with blank text are skipped even when they link somewhere. The
/// result follows document order, which lazy loading does not keep stable
/// between reloads of the same page.
pub fn extract<P: RenderedPage + ?Sized>(page: &P, marker: &str) -> Result<Vec<ScrapedRecord>> {
    let elements = page.find_by_marker(marker)?;
    let found = elements.len();

    let records: Vec<ScrapedRecord> = elements
        .into_iter()
        .filter_map(|element| {
            let text = element.text.trim();
            if text.is_empty() {
                return None;
            }
            Some(ScrapedRecord {
                text: text.to_string(),
                url: element.href.unwrap_or_default(),
            })
        })
        .collect();

    debug!("{} of {} marked elements carried text", records.len(), found);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::types::PageElement;

    struct FixedPage(Vec<PageElement>);

    impl RenderedPage for FixedPage {
        fn find_by_marker(&self, _marker: &str) -> Result<Vec<PageElement>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn empty_page_yields_no_records() {
        let records = extract(&FixedPage(vec![]), "hPOcQO").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn blank_cards_are_skipped_even_with_links() {
        let page = FixedPage(vec![
            PageElement::new("  \n ", Some("https://example.at/d/1")),
            PageElement::new("Altbau\n1070 Wien", Some("https://example.at/d/2")),
            PageElement::new("", None),
        ]);

        let records = extract(&page, "hPOcQO").unwrap();
        assert_eq!(
            records,
            vec![ScrapedRecord {
                text: "Altbau\n1070 Wien".to_string(),
                url: "https://example.at/d/2".to_string(),
            }]
        );
    }

    #[test]
    fn text_is_trimmed_and_missing_link_is_empty() {
        let page = FixedPage(vec![PageElement::new("\n  Penthouse  \n", None)]);
        let records = extract(&page, "hPOcQO").unwrap();
        assert_eq!(records[0].text, "Penthouse");
        assert_eq!(records[0].url, "");
    }

    #[test]
    fn keeps_page_order() {
        let page = FixedPage(vec![
            PageElement::new("first", Some("a")),
            PageElement::new("second", Some("b")),
            PageElement::new("third", Some("c")),
        ]);
        let urls: Vec<_> = extract(&page, "x").unwrap().into_iter().map(|r| r.url).collect();
        assert_eq!(urls, ["a", "b", "c"]);
    }
}
