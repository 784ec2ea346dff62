use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use anyhow::Context as _;
use chrono::Utc;
use zip::write::SimpleFileOptions;

static LANG: &str = "en";

/// One chapter of an in-progress archive: a display title plus an already
/// sanitized XHTML body fragment.
#[derive(Debug)]
struct Page {
    stem: String,
    title: String,
    body_html: String,
}

/// An EPUB archive under construction. Created empty, pages appended in batch
/// order, then serialized to disk once and released.
#[derive(Debug)]
pub struct Epub {
    title: String,
    pages: Vec<Page>,
}

impl Epub {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            pages: Vec::new(),
        }
    }

    pub fn add_page(&mut self, title: &str, body_html: &str) {
        let stem = format!("page-{}", self.pages.len() + 1);
        self.pages.push(Page {
            stem,
            title: title.to_owned(),
            body_html: body_html.to_owned(),
        });
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Writes the archive. The caller has already removed any stale file at
    /// `out_path`; writing is not atomic, so a killed run may leave a partial file.
    pub fn save(&self, out_path: &Path) -> anyhow::Result<()> {
        let uuid = uuid::Uuid::new_v4();
        let modified = Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

        let out_file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(out_path)
            .with_context(|| format!("open epub output: {}", out_path.display()))?;

        let mut zip = zip::ZipWriter::new(out_file);

        // Per EPUB spec, `mimetype` MUST be the first entry and MUST be stored (no compression).
        let mimetype_options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored)
            .unix_permissions(0o644);
        zip.start_file("mimetype", mimetype_options)
            .context("epub start_file mimetype")?;
        zip.write_all(b"application/epub+zip")
            .context("epub write mimetype")?;

        let deflated_options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .unix_permissions(0o644);

        zip.start_file("META-INF/container.xml", deflated_options)
            .context("epub start_file container.xml")?;
        zip.write_all(render_container_xml().as_bytes())
            .context("epub write container.xml")?;

        zip.start_file("OEBPS/content.opf", deflated_options)
            .context("epub start_file content.opf")?;
        zip.write_all(self.render_content_opf(uuid, &modified).as_bytes())
            .context("epub write content.opf")?;

        zip.start_file("OEBPS/nav.xhtml", deflated_options)
            .context("epub start_file nav.xhtml")?;
        zip.write_all(self.render_nav_xhtml().as_bytes())
            .context("epub write nav.xhtml")?;

        zip.start_file("OEBPS/toc.ncx", deflated_options)
            .context("epub start_file toc.ncx")?;
        zip.write_all(self.render_toc_ncx(uuid).as_bytes())
            .context("epub write toc.ncx")?;

        zip.start_file("OEBPS/style.css", deflated_options)
            .context("epub start_file style.css")?;
        zip.write_all(default_style_css().as_bytes())
            .context("epub write style.css")?;

        for page in &self.pages {
            let body = format!(
                "<h1>{}</h1>\n{}",
                xml_escape(&page.title),
                ensure_xhtml_void_tags(&page.body_html)
            );
            let xhtml = wrap_xhtml_document(&page.title, &body);

            zip.start_file(format!("OEBPS/{}.xhtml", page.stem), deflated_options)
                .with_context(|| format!("epub start_file page: {}", page.stem))?;
            zip.write_all(xhtml.as_bytes())
                .with_context(|| format!("epub write page: {}", page.stem))?;
        }

        zip.finish().context("epub finish zip")?;
        Ok(())
    }

    fn render_content_opf(&self, uuid: uuid::Uuid, modified: &str) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        out.push_str(&format!(
            "<package xmlns=\"http://www.idpf.org/2007/opf\" unique-identifier=\"bookid\" version=\"3.0\" xml:lang=\"{LANG}\">\n",
        ));
        out.push_str("  <metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\n");
        out.push_str(&format!(
            "    <dc:identifier id=\"bookid\">urn:uuid:{}</dc:identifier>\n",
            xml_escape(&uuid.to_string())
        ));
        out.push_str(&format!(
            "    <dc:title>{}</dc:title>\n",
            xml_escape(&self.title)
        ));
        out.push_str(&format!("    <dc:language>{LANG}</dc:language>\n"));
        out.push_str(&format!(
            "    <meta property=\"dcterms:modified\">{}</meta>\n",
            xml_escape(modified)
        ));
        out.push_str("  </metadata>\n");
        out.push_str("  <manifest>\n");
        out.push_str(
            "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\" />\n",
        );
        out.push_str(
            "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\" />\n",
        );
        out.push_str("    <item id=\"css\" href=\"style.css\" media-type=\"text/css\" />\n");

        for page in &self.pages {
            out.push_str(&format!(
                "    <item id=\"{}\" href=\"{}.xhtml\" media-type=\"application/xhtml+xml\" />\n",
                xml_escape(&page.stem),
                xml_escape(&page.stem)
            ));
        }

        out.push_str("  </manifest>\n");
        out.push_str("  <spine toc=\"ncx\">\n");
        for page in &self.pages {
            out.push_str(&format!(
                "    <itemref idref=\"{}\" />\n",
                xml_escape(&page.stem)
            ));
        }
        out.push_str("  </spine>\n");
        out.push_str("</package>\n");
        out
    }

    fn render_nav_xhtml(&self) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        out.push_str("<!DOCTYPE html>\n");
        out.push_str(&format!(
            "<html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\" lang=\"{LANG}\" xml:lang=\"{LANG}\">\n",
        ));
        out.push_str("<head>\n");
        out.push_str(&format!("  <title>{}</title>\n", xml_escape(&self.title)));
        out.push_str("  <meta charset=\"utf-8\" />\n");
        out.push_str("  <link rel=\"stylesheet\" type=\"text/css\" href=\"style.css\" />\n");
        out.push_str("</head>\n");
        out.push_str("<body>\n");
        out.push_str(&format!("  <h1>{}</h1>\n", xml_escape(&self.title)));
        out.push_str("  <nav epub:type=\"toc\" id=\"toc\">\n");
        out.push_str("    <ol>\n");
        for page in &self.pages {
            out.push_str(&format!(
                "      <li><a href=\"{}.xhtml\">{}</a></li>\n",
                xml_escape(&page.stem),
                xml_escape(&page.title)
            ));
        }
        out.push_str("    </ol>\n");
        out.push_str("  </nav>\n");
        out.push_str("</body>\n");
        out.push_str("</html>\n");
        out
    }

    fn render_toc_ncx(&self, uuid: uuid::Uuid) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        out.push_str(
            "<!DOCTYPE ncx PUBLIC \"-//NISO//DTD ncx 2005-1//EN\" \"http://www.daisy.org/z3986/2005/ncx-2005-1.dtd\">\n",
        );
        out.push_str("<ncx xmlns=\"http://www.daisy.org/z3986/2005/ncx/\" version=\"2005-1\">\n");
        out.push_str("  <head>\n");
        out.push_str(&format!(
            "    <meta name=\"dtb:uid\" content=\"urn:uuid:{}\" />\n",
            xml_escape(&uuid.to_string())
        ));
        out.push_str("    <meta name=\"dtb:depth\" content=\"1\" />\n");
        out.push_str("    <meta name=\"dtb:totalPageCount\" content=\"0\" />\n");
        out.push_str("    <meta name=\"dtb:maxPageNumber\" content=\"0\" />\n");
        out.push_str("  </head>\n");
        out.push_str("  <docTitle><text>");
        out.push_str(&xml_escape(&self.title));
        out.push_str("</text></docTitle>\n");
        out.push_str("  <navMap>\n");
        for (idx, page) in self.pages.iter().enumerate() {
            let play = idx + 1;
            out.push_str(&format!(
                "    <navPoint id=\"navPoint-{play}\" playOrder=\"{play}\">\n",
            ));
            out.push_str("      <navLabel><text>");
            out.push_str(&xml_escape(&page.title));
            out.push_str("</text></navLabel>\n");
            out.push_str(&format!(
                "      <content src=\"{}.xhtml\" />\n",
                xml_escape(&page.stem)
            ));
            out.push_str("    </navPoint>\n");
        }
        out.push_str("  </navMap>\n");
        out.push_str("</ncx>\n");
        out
    }
}

fn render_container_xml() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#
    .to_string()
}

fn default_style_css() -> String {
    r#"@charset "utf-8";

html { font-family: serif; }
body { margin: 0; padding: 0 1.2em; line-height: 1.6; }
h1 { font-size: 1.3em; }
blockquote { margin: 1em 0; padding: 0 1em; border-left: 4px solid #ddd; color: #333; }
"#
    .to_string()
}

fn wrap_xhtml_document(title: &str, body_html: &str) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    out.push_str("<!DOCTYPE html>\n");
    out.push_str(&format!(
        "<html xmlns=\"http://www.w3.org/1999/xhtml\" lang=\"{LANG}\" xml:lang=\"{LANG}\">\n",
    ));
    out.push_str("<head>\n");
    out.push_str(&format!("  <title>{}</title>\n", xml_escape(title)));
    out.push_str("  <meta charset=\"utf-8\" />\n");
    out.push_str("  <link rel=\"stylesheet\" type=\"text/css\" href=\"style.css\" />\n");
    out.push_str("</head>\n");
    out.push_str("<body>\n");
    out.push_str(body_html);
    if !body_html.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("</body>\n");
    out.push_str("</html>\n");
    out
}

/// Converts void tags like `<br>` into `<br />` to keep the page XHTML well-formed.
fn ensure_xhtml_void_tags(html: &str) -> String {
    const VOID_TAGS: &[&str] = &[
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
        "source", "track", "wbr",
    ];

    let bytes = html.as_bytes();
    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;

    while let Some(rel_lt) = html[cursor..].find('<') {
        let lt = cursor + rel_lt;

        // Copy text before the tag (keeps UTF-8 intact).
        out.push_str(&html[cursor..lt]);

        // Find end of the tag `>` while respecting quotes.
        let mut in_quote: Option<u8> = None;
        let mut gt = lt + 1;
        while gt < bytes.len() {
            let b = bytes[gt];
            if let Some(q) = in_quote {
                if b == q {
                    in_quote = None;
                }
                gt += 1;
                continue;
            }
            if b == b'"' || b == b'\'' {
                in_quote = Some(b);
                gt += 1;
                continue;
            }
            if b == b'>' {
                break;
            }
            gt += 1;
        }
        if gt >= bytes.len() {
            // Malformed HTML; copy the rest as-is.
            out.push_str(&html[lt..]);
            return out;
        }

        let raw_tag = &html[lt..=gt];

        // Keep comments/doctype/processing instructions/end tags as-is.
        if raw_tag
            .as_bytes()
            .get(1)
            .is_some_and(|b| matches!(b, b'!' | b'?' | b'/'))
        {
            out.push_str(raw_tag);
            cursor = gt + 1;
            continue;
        }

        // Parse tag name.
        let name_start = lt + 1;
        let mut name_end = name_start;
        while name_end < gt && (bytes[name_end] as char).is_ascii_alphabetic() {
            name_end += 1;
        }
        if name_end == name_start {
            out.push_str(raw_tag);
            cursor = gt + 1;
            continue;
        }

        let tag_name_lower = html[name_start..name_end].to_ascii_lowercase();
        if !VOID_TAGS.contains(&tag_name_lower.as_str()) {
            out.push_str(raw_tag);
            cursor = gt + 1;
            continue;
        }

        let tag_without_gt = &html[lt..gt];
        if tag_without_gt.trim_end().ends_with('/') {
            out.push_str(raw_tag);
        } else {
            out.push_str(tag_without_gt);
            out.push_str(" />");
        }
        cursor = gt + 1;
    }

    out.push_str(&html[cursor..]);
    out
}

pub fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use std::io::Read as _;

    use super::*;

    #[test]
    fn ensure_xhtml_void_tags_self_closes_breaks() {
        let input = "<p>line one<br>line two</p><hr>";
        let out = ensure_xhtml_void_tags(input);
        assert_eq!(out, "<p>line one<br />line two</p><hr />");
    }

    #[test]
    fn save_writes_stored_mimetype_first_and_all_pages() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let out_path = dir.path().join("book.epub");

        let mut epub = Epub::new("My Novel Chapter 1 to 2");
        epub.add_page("Chapter 1", "<p>one</p>");
        epub.add_page("Chapter 2", "<p>two</p>");
        epub.save(&out_path)?;

        let file = std::fs::File::open(&out_path)?;
        let mut archive = zip::ZipArchive::new(file)?;

        {
            let mut mimetype = archive.by_index(0)?;
            assert_eq!(mimetype.name(), "mimetype");
            assert_eq!(mimetype.compression(), zip::CompressionMethod::Stored);
            let mut contents = String::new();
            mimetype.read_to_string(&mut contents)?;
            assert_eq!(contents, "application/epub+zip");
        }

        let mut opf = String::new();
        archive.by_name("OEBPS/content.opf")?.read_to_string(&mut opf)?;
        assert!(opf.contains("<dc:title>My Novel Chapter 1 to 2</dc:title>"));
        assert!(opf.contains("href=\"page-1.xhtml\""));
        assert!(opf.contains("href=\"page-2.xhtml\""));

        let mut page = String::new();
        archive.by_name("OEBPS/page-2.xhtml")?.read_to_string(&mut page)?;
        assert!(page.contains("<h1>Chapter 2</h1>"));
        assert!(page.contains("<p>two</p>"));

        Ok(())
    }

    #[test]
    fn save_refuses_to_clobber_an_existing_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let out_path = dir.path().join("book.epub");
        std::fs::write(&out_path, b"stale")?;

        let epub = Epub::new("My Novel Chapter 1 to 1");
        assert!(epub.save(&out_path).is_err());

        Ok(())
    }
}
