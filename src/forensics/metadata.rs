//! Metadata heuristic: walk JPEG segments, report on EXIF presence,
//! editing-software fingerprints, and implausible capture timestamps.

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::ForensicScan;

/// Software strings that indicate the file went through an editor.
const EDITOR_MARKERS: &[&str] = &[
    "photoshop",
    "adobe",
    "gimp",
    "lightroom",
    "snapseed",
    "facetune",
    "picsart",
    "canva",
];

static EXIF_DATETIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}:\d{2}:\d{2} \d{2}:\d{2}:\d{2}").expect("valid datetime regex"));

pub struct MetadataScan;

#[async_trait]
impl ForensicScan for MetadataScan {
    fn name(&self) -> &'static str {
        "metadata"
    }

    async fn scan(&self, image: &[u8]) -> anyhow::Result<Vec<String>> {
        if !is_jpeg(image) {
            return Ok(vec![
                "Not a JPEG container; EXIF inspection skipped.".to_string()
            ]);
        }

        let Some(exif) = exif_segment(image) else {
            return Ok(vec![
                "No EXIF metadata found. Camera originals usually carry EXIF.".to_string(),
            ]);
        };

        let mut lines = vec![format!("EXIF metadata present ({} bytes).", exif.len())];

        let haystack = String::from_utf8_lossy(exif).to_lowercase();
        for marker in EDITOR_MARKERS {
            if haystack.contains(marker) {
                lines.push(format!("Editing-software fingerprint found: {}.", marker));
            }
        }

        if let Some(ts) = capture_time(exif) {
            let now = Utc::now().naive_utc();
            if ts > now + Duration::days(1) {
                lines.push(format!("EXIF capture time {} is in the future.", ts));
            }
        }

        Ok(lines)
    }
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

/// Payload of the first APP1 segment carrying an `Exif\0\0` header.
///
/// Stops at SOS; entropy-coded data follows and segment lengths no longer
/// apply there.
fn exif_segment(data: &[u8]) -> Option<&[u8]> {
    let mut i = 2usize;
    while i + 4 <= data.len() {
        if data[i] != 0xFF {
            return None;
        }
        let marker = data[i + 1];
        match marker {
            // standalone markers carry no length word
            0x01 | 0xD0..=0xD7 => {
                i += 2;
                continue;
            }
            0xD9 | 0xDA => return None,
            _ => {}
        }
        let len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        if len < 2 || i + 2 + len > data.len() {
            return None;
        }
        let payload = &data[i + 4..i + 2 + len];
        if marker == 0xE1 && payload.starts_with(b"Exif\0\0") {
            return Some(payload);
        }
        i += 2 + len;
    }
    None
}

/// First `YYYY:MM:DD HH:MM:SS` string anywhere in the EXIF payload.
fn capture_time(exif: &[u8]) -> Option<NaiveDateTime> {
    let text = String::from_utf8_lossy(exif);
    let m = EXIF_DATETIME.find(&text)?;
    NaiveDateTime::parse_from_str(m.as_str(), "%Y:%m:%d %H:%M:%S").ok()
}
