use scraper::{ElementRef, Html, Selector};

/// Cleans fetched chapter pages down to the fragment worth archiving.
///
/// The selectors encode the site layout in one place: where the chapter body
/// lives, which descendants are navigation noise, and which trailing block is the
/// decorative footer every chapter carries.
pub struct Sanitizer {
    container: Selector,
    stripped: Selector,
    trailing: Selector,
}

impl Sanitizer {
    pub fn new() -> Self {
        Self {
            container: Selector::parse("div#chapter-content").expect("parse container selector"),
            stripped: Selector::parse("a, script").expect("parse strip selector"),
            trailing: Selector::parse("div").expect("parse trailing selector"),
        }
    }

    /// Extracts the chapter body, drops every anchor and script descendant, drops
    /// the last `div` descendant in document order, and serializes what is left.
    ///
    /// A page without the content container, or whose container has no `div` to
    /// drop, is a sanitize error; the caller decides whether that aborts the run.
    /// A container whose only child is the trailing `div` sanitizes to an empty
    /// fragment, which is accepted as an empty page.
    pub fn sanitize(&self, raw_html: &str) -> anyhow::Result<String> {
        let mut document = Html::parse_document(raw_html);

        let (container_id, doomed) = {
            let container = document
                .select(&self.container)
                .next()
                .ok_or_else(|| anyhow::anyhow!("chapter content container not found"))?;

            let mut doomed: Vec<_> = container.select(&self.stripped).map(|el| el.id()).collect();

            let trailing = container
                .select(&self.trailing)
                .last()
                .ok_or_else(|| anyhow::anyhow!("no trailing block to remove from chapter body"))?;
            doomed.push(trailing.id());

            (container.id(), doomed)
        };

        for id in doomed {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }

        let node = document
            .tree
            .get(container_id)
            .ok_or_else(|| anyhow::anyhow!("chapter content container vanished"))?;
        let container = ElementRef::wrap(node)
            .ok_or_else(|| anyhow::anyhow!("chapter content container is not an element"))?;

        Ok(container.inner_html())
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}
