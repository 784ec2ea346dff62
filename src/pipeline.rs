use std::fs;
use std::path::Path;

use anyhow::Context as _;
use tracing::{info, warn};

use crate::batch;
use crate::cli::{Cli, OnFailure};
use crate::client::SiteClient;
use crate::epub::{self, Epub};
use crate::normalize;
use crate::sanitize::Sanitizer;
use crate::throttle::Throttle;

/// The whole run, start to finish: fetch the index once, validate and slice the
/// requested range, split it into batches, then fetch and sanitize each chapter in
/// source order, one archive per batch.
pub fn run(args: &Cli) -> anyhow::Result<()> {
    // Sign/ordering validation happens before the client even parses the URL so a
    // bad range never touches the network.
    batch::validate_request(args.chunk_size, args.start_idx, args.end_idx)?;

    let client = SiteClient::new(&args.url)?;
    let sanitizer = Sanitizer::new();
    let throttle = Throttle::new(args.chapter_delay_ms, args.batch_delay_ms);

    let index = client.fetch_index().context("fetch chapter index")?;
    info!(chapters = index.len(), "fetched chapter index");

    let range = batch::select_range(index.len(), args.start_idx, args.end_idx)?;
    let offset = range.start;
    let entries = &index[range];

    for batch in batch::into_batches(entries, args.chunk_size) {
        // Human-facing chapter numbers are 1-based and count from the full index,
        // so the slicing offset is added back in.
        let first = offset + batch.start_offset + 1;
        let last = offset + batch.end_offset;

        let mut book = Epub::new(format!("{} Chapter {first} to {last}", args.title));

        for entry in &batch.entries {
            let page_title = normalize::strip_non_ascii(&entry.display_title);
            let raw = client
                .fetch_chapter(&entry.relative_url)
                .with_context(|| format!("fetch chapter: {}", entry.display_title))?;

            match sanitizer.sanitize(&raw) {
                Ok(content) => {
                    info!(chapter = %page_title, "adding chapter");
                    book.add_page(&page_title, &content);
                }
                Err(err) => match args.on_failure {
                    OnFailure::Abort => {
                        return Err(
                            err.context(format!("sanitize chapter: {}", entry.display_title))
                        );
                    }
                    OnFailure::Placeholder => {
                        warn!(chapter = %page_title, ?err, "skipping chapter");
                        book.add_page(&page_title, &placeholder_page(&page_title));
                    }
                },
            }

            throttle.after_chapter();
        }

        let filename = format!("{}_{first}_{last}.epub", args.title.replace(' ', "_"));
        let out_path = Path::new(&filename);
        if out_path.exists() {
            fs::remove_file(out_path)
                .with_context(|| format!("remove stale archive: {filename}"))?;
        }

        book.save(out_path)
            .with_context(|| format!("save archive: {filename}"))?;
        info!(%filename, pages = book.page_count(), "saved archive");

        throttle.after_batch();
    }

    Ok(())
}

fn placeholder_page(title: &str) -> String {
    let title = epub::xml_escape(title);
    format!(
        "<p>********************</p>\n<p>Skipping {title}</p>\n<p>********************</p>\n"
    )
}
