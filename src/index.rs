use scraper::{Html, Selector};

/// One entry from the index page's chapter dropdown. Order follows the document,
/// which is the publication order of the chapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterEntry {
    pub display_title: String,
    pub relative_url: String,
}

/// Pulls every `<option>` out of the index page in document order. An index page
/// with no usable options means the URL does not point at a chapter listing, which
/// is unrecoverable.
pub fn parse_index(html: &str) -> anyhow::Result<Vec<ChapterEntry>> {
    let document = Html::parse_document(html);
    let option = Selector::parse("option").expect("parse option selector");

    let mut entries = Vec::new();
    for element in document.select(&option) {
        // Options without a value carry no chapter URL; skip them.
        let Some(value) = element.value().attr("value") else {
            continue;
        };
        let display_title = element.text().collect::<String>().trim().to_owned();
        entries.push(ChapterEntry {
            display_title,
            relative_url: value.to_owned(),
        });
    }

    if entries.is_empty() {
        anyhow::bail!("no chapter entries found on the index page");
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_index_preserves_document_order() {
        let html = r#"<html><body>
            <select>
              <option value="/c/1.html">Chapter 1</option>
              <option value="/c/2.html">Chapter 2</option>
              <option value="/c/3.html">Chapter 3</option>
            </select>
        </body></html>"#;

        let entries = parse_index(html).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].display_title, "Chapter 1");
        assert_eq!(entries[0].relative_url, "/c/1.html");
        assert_eq!(entries[2].relative_url, "/c/3.html");
    }

    #[test]
    fn parse_index_skips_options_without_value() {
        let html = r#"<select>
            <option>placeholder</option>
            <option value="/c/1.html">Chapter 1</option>
        </select>"#;

        let entries = parse_index(html).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].relative_url, "/c/1.html");
    }

    #[test]
    fn parse_index_rejects_pages_without_options() {
        let err = parse_index("<html><body><p>not a listing</p></body></html>").unwrap_err();
        assert!(err.to_string().contains("no chapter entries"));
    }
}
