//! RSS 2.0 retrieval and item extraction.

use epicast_core::{Error, FeedItem, FetchBackend, FetchRequest, Result};
use quick_xml::events::Event;

/// Default episode feed.
pub const DEFAULT_FEED_URL: &str = "https://anchor.fm/s/10684950c/podcast/rss";
/// Default timeout for the feed GET.
pub const DEFAULT_FEED_TIMEOUT_MS: u64 = 30_000;
/// Largest feed document accepted. Longer bodies are cut off and rejected.
pub const DEFAULT_FEED_MAX_BYTES: u64 = 32 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    PubDate,
    Guid,
    Description,
    Summary,
    Encoded,
}

/// Item children we keep. Core RSS fields match unprefixed names only; the vendor extensions match
/// any `*:summary` / `*:encoded` element.
fn field_for(qname: &str) -> Option<Field> {
    match qname {
        "title" => Some(Field::Title),
        "link" => Some(Field::Link),
        "pubDate" => Some(Field::PubDate),
        "guid" => Some(Field::Guid),
        "description" => Some(Field::Description),
        _ => {
            let lower = qname.to_ascii_lowercase();
            if lower.ends_with("summary") {
                Some(Field::Summary)
            } else if lower.ends_with("encoded") {
                Some(Field::Encoded)
            } else {
                None
            }
        }
    }
}

fn assign(item: &mut FeedItem, field: Field, text: String) {
    let slot = match field {
        Field::Title => &mut item.title,
        Field::Link => &mut item.link,
        Field::PubDate => &mut item.pub_date,
        Field::Guid => &mut item.guid,
        Field::Description => &mut item.description,
        Field::Summary => &mut item.summary_ext,
        Field::Encoded => &mut item.encoded_ext,
    };
    // First non-blank occurrence wins.
    if slot.as_deref().map_or(true, |s| s.trim().is_empty()) {
        *slot = Some(text);
    }
}

/// Parse an RSS document into its `<channel><item>` entries, in document order.
///
/// Errors when the document is not well-formed or has no `<channel>`.
pub fn parse_rss(body: &str) -> Result<Vec<FeedItem>> {
    let mut reader = quick_xml::Reader::from_str(body);
    let mut buf = Vec::new();

    let mut items: Vec<FeedItem> = Vec::new();
    let mut depth = 0usize;
    let mut saw_channel = false;
    let mut item: Option<(FeedItem, usize)> = None;
    let mut field: Option<(Field, usize)> = None;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "channel" {
                    saw_channel = true;
                }
                match item.as_ref().map(|(_, d)| *d) {
                    None if name == "item" => item = Some((FeedItem::default(), depth)),
                    Some(d) if field.is_none() && depth == d + 1 => {
                        field = field_for(&name).map(|f| (f, depth));
                        text.clear();
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(t)) => {
                if field.is_some() {
                    // Undeclared HTML entities are left for the summary step to decode.
                    let s = t
                        .unescape()
                        .map(|s| s.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                    text.push_str(&s);
                }
            }
            Ok(Event::CData(c)) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::End(_)) => {
                if let Some((f, d)) = field {
                    if d == depth {
                        if let Some((it, _)) = item.as_mut() {
                            assign(it, f, std::mem::take(&mut text));
                        }
                        field = None;
                    }
                }
                if item.as_ref().is_some_and(|(_, d)| *d == depth) {
                    if let Some((it, _)) = item.take() {
                        items.push(it);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Err(e) => {
                return Err(Error::Feed(format!(
                    "xml error at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    if depth != 0 {
        return Err(Error::Feed("unexpected end of document".to_string()));
    }
    if !saw_channel {
        return Err(Error::Feed("missing <channel>".to_string()));
    }
    Ok(items)
}

/// GET the feed and parse it. Any transport failure, non-2xx status, body over `max_bytes` or
/// parse failure is an error.
pub async fn fetch_feed(
    fetcher: &dyn FetchBackend,
    url: &str,
    timeout_ms: u64,
    max_bytes: u64,
) -> Result<Vec<FeedItem>> {
    let mut req = FetchRequest::new(url);
    req.timeout_ms = Some(timeout_ms);
    req.max_bytes = Some(max_bytes);
    let resp = fetcher.fetch(&req).await?;
    if !resp.is_success() {
        return Err(Error::Fetch(format!("{url}: HTTP {}", resp.status)));
    }
    if resp.truncated {
        return Err(Error::Feed(format!(
            "{}: document exceeds {max_bytes} bytes",
            resp.final_url
        )));
    }
    let items = parse_rss(&resp.text_lossy())?;
    tracing::info!(
        url,
        final_url = %resp.final_url,
        content_type = resp.content_type.as_deref().unwrap_or(""),
        bytes = resp.bytes.len(),
        fetch_ms = resp.timings_ms.get("network_fetch").copied().unwrap_or(0) as u64,
        items = items.len(),
        "feed parsed"
    );
    Ok(items)
}
