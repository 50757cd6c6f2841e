//! Mapping of indexer-specific payloads onto [`CanonicalRecord`].
//!
//! Dispatches on the [`RawPayload`] variant, so each response shape keeps
//! its own field mapping while the rest of the pipeline sees one record
//! type.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::indexers::{JackettItem, TorznabItem};
use crate::types::{CanonicalRecord, RawPayload, RawResult, Resolution, Source};

use super::fingerprint::fingerprint;

/// Fields shared by every payload shape, before fingerprinting.
struct Fields {
    title: String,
    size: Option<u64>,
    seeders: Option<u32>,
    peers: Option<u32>,
    info_hash: Option<String>,
    magnet: Option<String>,
    link: Option<String>,
    published: Option<String>,
}

impl From<JackettItem> for Fields {
    fn from(item: JackettItem) -> Self {
        Self {
            title: item.title,
            size: item.size,
            seeders: item.seeders,
            peers: item.peers,
            info_hash: item.info_hash,
            magnet: item.magnet_uri,
            link: item.link,
            published: item.publish_date,
        }
    }
}

impl From<TorznabItem> for Fields {
    fn from(item: TorznabItem) -> Self {
        Self {
            title: item.title,
            size: item.size,
            seeders: item.seeders,
            peers: item.peers,
            info_hash: item.info_hash,
            magnet: item.magnet,
            link: item.link,
            published: item.pub_date,
        }
    }
}

/// Normalise one raw result.
///
/// The record's only source is the originating indexer; merging happens
/// later in [`super::dedup`].
pub fn normalize(raw: RawResult) -> CanonicalRecord {
    let fields: Fields = match raw.payload {
        RawPayload::Jackett(item) => item.into(),
        RawPayload::Torznab(item) => item.into(),
    };

    let title = collapse_whitespace(&fields.title);
    let size = fields.size.unwrap_or(0);
    let magnet = fields.magnet.filter(|m| !m.trim().is_empty());
    let info_hash = fields
        .info_hash
        .as_deref()
        .and_then(normalize_info_hash)
        .or_else(|| magnet.as_deref().and_then(info_hash_from_magnet));

    CanonicalRecord {
        fingerprint: fingerprint(&title, size),
        resolution: Resolution::from_title(&title),
        size,
        seeders: fields.seeders,
        peers: fields.peers,
        info_hash,
        magnet,
        link: fields.link.filter(|l| !l.trim().is_empty()),
        published: fields.published.as_deref().and_then(parse_published),
        origin: raw.indexer.clone(),
        sources: vec![Source {
            indexer: raw.indexer,
            arrival: raw.arrival,
        }],
        title,
    }
}

/// Normalise a batch, preserving input order.
pub fn normalize_all(raw: Vec<RawResult>) -> Vec<CanonicalRecord> {
    raw.into_iter().map(normalize).collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase a 40-character hex info hash; anything else is rejected.
pub fn normalize_info_hash(raw: &str) -> Option<String> {
    let hash = raw.trim();
    (hash.len() == 40 && hash.chars().all(|c| c.is_ascii_hexdigit()))
        .then(|| hash.to_ascii_lowercase())
}

/// Extract the `xt=urn:btih:` hash from a magnet URI.
pub fn info_hash_from_magnet(magnet: &str) -> Option<String> {
    let query = magnet.strip_prefix("magnet:?")?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter(|(key, _)| *key == "xt")
        .find_map(|(_, value)| {
            let lower = value.to_ascii_lowercase();
            lower
                .strip_prefix("urn:btih:")
                .and_then(normalize_info_hash)
        })
}

/// Parse the date formats indexers emit: RFC 3339 (Jackett with offset),
/// naive ISO 8601 (Jackett without offset, taken as UTC) and RFC 2822
/// (Torznab `pubDate`).
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc2822(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Arrival;
    use chrono::TimeZone;

    fn jackett_item(title: &str) -> JackettItem {
        JackettItem {
            title: title.into(),
            size: Some(2_147_483_648),
            seeders: Some(412),
            peers: Some(530),
            publish_date: Some("2023-04-21T08:15:00+00:00".into()),
            info_hash: Some("A1B2C3D4E5F6A7B8C9D0E1F2A3B4C5D6E7F8A9B0".into()),
            magnet_uri: None,
            link: Some("http://jackett/dl/1".into()),
            tracker: Some("YTS".into()),
        }
    }

    fn raw(indexer: &str, payload: RawPayload) -> RawResult {
        RawResult {
            indexer: indexer.into(),
            arrival: Arrival {
                response: 2,
                position: 7,
            },
            payload,
        }
    }

    #[test]
    fn jackett_item_maps_all_fields() {
        let record = normalize(raw(
            "yts",
            RawPayload::Jackett(jackett_item("Ubuntu 22.04  [1080p]")),
        ));
        assert_eq!(record.title, "Ubuntu 22.04 [1080p]");
        assert_eq!(record.size, 2_147_483_648);
        assert_eq!(record.seeders, Some(412));
        assert_eq!(record.peers, Some(530));
        assert_eq!(
            record.info_hash.as_deref(),
            Some("a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0")
        );
        assert_eq!(record.resolution, Resolution::Hd1080);
        assert_eq!(
            record.published,
            Some(Utc.with_ymd_and_hms(2023, 4, 21, 8, 15, 0).unwrap())
        );
        assert_eq!(record.origin, "yts");
        assert_eq!(record.sources.len(), 1);
        assert_eq!(record.sources[0].arrival.response, 2);
        assert_eq!(record.fingerprint, fingerprint("Ubuntu 22.04 [1080p]", 2_147_483_648));
    }

    #[test]
    fn torznab_item_maps_all_fields() {
        let item = TorznabItem {
            title: "Ubuntu.22.04.2160p".into(),
            size: None,
            link: None,
            pub_date: Some("Sat, 01 Jul 2023 12:30:00 +0000".into()),
            seeders: Some(12),
            peers: None,
            info_hash: None,
            magnet: Some("magnet:?xt=urn:btih:FFEEDDCCBBAA99887766554433221100FFEEDDCC&dn=x".into()),
        };
        let record = normalize(raw("prowlarr", RawPayload::Torznab(item)));
        assert_eq!(record.size, 0);
        assert_eq!(record.resolution, Resolution::Uhd);
        assert_eq!(
            record.info_hash.as_deref(),
            Some("ffeeddccbbaa99887766554433221100ffeeddcc")
        );
        assert_eq!(
            record.published,
            Some(Utc.with_ymd_and_hms(2023, 7, 1, 12, 30, 0).unwrap())
        );
        assert!(record.fingerprint.ends_with("|0"));
    }

    #[test]
    fn invalid_info_hash_falls_back_to_magnet() {
        let mut item = jackett_item("x");
        item.info_hash = Some("not-a-hash".into());
        item.magnet_uri = Some("magnet:?dn=x&xt=urn:btih:0f0e0d0c0b0a09080706050403020100ffeeddcc".into());
        let record = normalize(raw("yts", RawPayload::Jackett(item)));
        assert_eq!(
            record.info_hash.as_deref(),
            Some("0f0e0d0c0b0a09080706050403020100ffeeddcc")
        );
    }

    #[test]
    fn empty_links_are_dropped() {
        let mut item = jackett_item("x");
        item.link = Some("  ".into());
        item.magnet_uri = Some(String::new());
        let record = normalize(raw("yts", RawPayload::Jackett(item)));
        assert!(record.link.is_none());
        assert!(record.magnet.is_none());
    }

    #[test]
    fn info_hash_from_magnet_rejects_other_urns() {
        assert!(info_hash_from_magnet("magnet:?xt=urn:sha1:abcdef").is_none());
        assert!(info_hash_from_magnet("https://example.com").is_none());
    }

    #[test]
    fn parse_published_formats() {
        let expected = Utc.with_ymd_and_hms(2023, 4, 20, 10, 0, 0).unwrap();
        assert_eq!(parse_published("2023-04-20T10:00:00"), Some(expected));
        assert_eq!(parse_published("2023-04-20T12:00:00+02:00"), Some(expected));
        assert_eq!(parse_published("Thu, 20 Apr 2023 10:00:00 +0000"), Some(expected));
        assert_eq!(parse_published("yesterday"), None);
    }

    #[test]
    fn normalize_all_preserves_order() {
        let records = normalize_all(vec![
            raw("a", RawPayload::Jackett(jackett_item("first"))),
            raw("b", RawPayload::Jackett(jackett_item("second"))),
        ]);
        assert_eq!(records[0].title, "first");
        assert_eq!(records[1].origin, "b");
    }
}
