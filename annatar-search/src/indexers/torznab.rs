//! Torznab RSS API (Prowlarr, Jackett's torznab endpoint, NZBHydra).
//!
//! Requests go to `GET {endpoint}/api?t=...` and return an RSS feed whose
//! `<item>` elements carry extra metadata in `<torznab:attr>` elements.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use url::Url;

use crate::error::SearchError;
use crate::http;
use crate::types::{Category, IndexerSpec, Query};

/// One `<item>` of a Torznab feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TorznabItem {
    pub title: String,
    pub size: Option<u64>,
    pub link: Option<String>,
    pub pub_date: Option<String>,
    pub seeders: Option<u32>,
    pub peers: Option<u32>,
    pub info_hash: Option<String>,
    pub magnet: Option<String>,
}

/// Text-bearing child element of `<item>` currently being read.
#[derive(Debug, Clone, Copy)]
enum Field {
    Title,
    Link,
    PubDate,
    Size,
}

/// Build the Torznab API URL for `spec` and `query`.
///
/// Series queries with a season use `t=tvsearch` with native
/// `season`/`ep` parameters instead of rewriting the terms.
pub(crate) fn request_url(spec: &IndexerSpec, query: &Query) -> Result<Url, SearchError> {
    let mut url = Url::parse(&spec.endpoint).map_err(|e| {
        SearchError::Config(format!("indexer `{}` has invalid endpoint: {e}", spec.id))
    })?;

    url.path_segments_mut()
        .map_err(|()| {
            SearchError::Config(format!("indexer `{}` endpoint cannot be a base", spec.id))
        })?
        .pop_if_empty()
        .push("api");

    let mode = match query.category {
        Some(Category::Movie) => "movie",
        Some(Category::Series) => "tvsearch",
        None => "search",
    };

    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("t", mode);
        pairs.append_pair("q", query.terms.trim());
        if let Some(category) = query.category {
            pairs.append_pair("cat", &category.newznab_code().to_string());
        }
        if query.category == Some(Category::Series) {
            if let Some(season) = query.season {
                pairs.append_pair("season", &season.to_string());
            }
            if let Some(episode) = query.episode {
                pairs.append_pair("ep", &episode.to_string());
            }
        }
        if let Some(key) = &spec.api_key {
            pairs.append_pair("apikey", key);
        }
    }

    Ok(url)
}

/// Query one Torznab indexer and parse its feed.
pub(crate) async fn search(
    client: &reqwest::Client,
    spec: &IndexerSpec,
    query: &Query,
) -> Result<Vec<TorznabItem>, SearchError> {
    let url = request_url(spec, query)?;
    tracing::trace!(indexer = %spec.id, terms = %query.terms, "Torznab search");

    let body = client
        .get(url)
        .header("Accept", "application/rss+xml, application/xml")
        .send()
        .await
        .map_err(|e| http::classify_error(&spec.id, e))?
        .error_for_status()
        .map_err(|e| http::classify_error(&spec.id, e))?
        .text()
        .await
        .map_err(|e| http::classify_error(&spec.id, e))?;

    tracing::trace!(indexer = %spec.id, bytes = body.len(), "Torznab response received");

    parse_torznab_xml(&spec.id, &body)
}

/// Parse a Torznab RSS feed.
///
/// A `<error code=".." description=".."/>` document is reported as
/// [`SearchError::Unreachable`], since the indexer answered but refused
/// the request. Anything that is not an RSS feed is malformed.
pub(crate) fn parse_torznab_xml(indexer: &str, xml: &str) -> Result<Vec<TorznabItem>, SearchError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<TorznabItem> = None;
    let mut field: Option<Field> = None;
    let mut saw_feed = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            SearchError::MalformedResponse(format!(
                "{indexer}: invalid XML at byte {}: {e}",
                reader.buffer_position()
            ))
        })?;

        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"rss" | b"channel" => saw_feed = true,
                b"item" => current = Some(TorznabItem::default()),
                b"title" if current.is_some() => field = Some(Field::Title),
                b"link" if current.is_some() => field = Some(Field::Link),
                b"pubDate" if current.is_some() => field = Some(Field::PubDate),
                b"size" if current.is_some() => field = Some(Field::Size),
                b"error" => return Err(indexer_error(indexer, &e)),
                b"attr" => {
                    if let Some(item) = current.as_mut() {
                        apply_attr(indexer, item, &e)?;
                    }
                }
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"attr" => {
                    if let Some(item) = current.as_mut() {
                        apply_attr(indexer, item, &e)?;
                    }
                }
                b"enclosure" => {
                    if let Some(item) = current.as_mut() {
                        apply_enclosure(indexer, item, &e)?;
                    }
                }
                b"error" => return Err(indexer_error(indexer, &e)),
                _ => {}
            },
            Event::Text(t) => {
                if let (Some(item), Some(f)) = (current.as_mut(), field) {
                    let text = t.unescape().map_err(|e| {
                        SearchError::MalformedResponse(format!("{indexer}: bad text: {e}"))
                    })?;
                    set_field(item, f, &text);
                }
            }
            Event::CData(c) => {
                if let (Some(item), Some(f)) = (current.as_mut(), field) {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    set_field(item, f, &text);
                }
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"item" {
                    if let Some(item) = current.take() {
                        if !item.title.trim().is_empty() {
                            items.push(item);
                        }
                    }
                }
                field = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_feed {
        return Err(SearchError::MalformedResponse(format!(
            "{indexer}: response is not a Torznab feed"
        )));
    }

    tracing::debug!(indexer, count = items.len(), "Torznab results parsed");
    Ok(items)
}

fn set_field(item: &mut TorznabItem, field: Field, text: &str) {
    let text = text.trim();
    match field {
        Field::Title => item.title.push_str(text),
        Field::Link => item.link = Some(text.to_string()),
        Field::PubDate => item.pub_date = Some(text.to_string()),
        Field::Size => {
            if let Ok(size) = text.parse() {
                item.size = Some(size);
            }
        }
    }
}

/// Look up an attribute value by local name.
fn attr_value(indexer: &str, e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, SearchError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| {
            SearchError::MalformedResponse(format!("{indexer}: bad attribute: {err}"))
        })?;
        if attr.key.local_name().as_ref() == key {
            let value = attr.unescape_value().map_err(|err| {
                SearchError::MalformedResponse(format!("{indexer}: bad attribute value: {err}"))
            })?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn apply_attr(indexer: &str, item: &mut TorznabItem, e: &BytesStart<'_>) -> Result<(), SearchError> {
    let (Some(name), Some(value)) = (attr_value(indexer, e, b"name")?, attr_value(indexer, e, b"value")?)
    else {
        return Ok(());
    };
    match name.as_str() {
        "seeders" => item.seeders = value.parse().ok(),
        "peers" => item.peers = value.parse().ok(),
        "infohash" => item.info_hash = Some(value),
        "magneturl" => item.magnet = Some(value),
        "size" => {
            if item.size.is_none() {
                item.size = value.parse().ok();
            }
        }
        _ => {}
    }
    Ok(())
}

fn apply_enclosure(
    indexer: &str,
    item: &mut TorznabItem,
    e: &BytesStart<'_>,
) -> Result<(), SearchError> {
    if item.link.is_none() {
        item.link = attr_value(indexer, e, b"url")?;
    }
    if item.size.is_none() {
        item.size = attr_value(indexer, e, b"length")?.and_then(|l| l.parse().ok());
    }
    Ok(())
}

fn indexer_error(indexer: &str, e: &BytesStart<'_>) -> SearchError {
    let code = attr_value(indexer, e, b"code").ok().flatten().unwrap_or_default();
    let description = attr_value(indexer, e, b"description")
        .ok()
        .flatten()
        .unwrap_or_default();
    SearchError::Unreachable(format!("{indexer}: torznab error {code}: {description}"))
}
