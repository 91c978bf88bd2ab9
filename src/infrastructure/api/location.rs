//! Best-effort country resolution for free-form profile locations.
//!
//! Profile locations are arbitrary text. The raw value is scrubbed of noise
//! first, then resolved to a country through the OpenStreetMap Nominatim
//! service. Every failure degrades to `None`; enrichment never aborts over
//! geography.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::config::AppConfig;
use crate::utils::logging;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Resolves free-form location strings to a country name
pub struct LocationResolver {
    client: Client,
    user_agent: String,
}

impl LocationResolver {
    pub fn new(config: &AppConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        LocationResolver {
            client,
            user_agent: format!("sponsor-indexer/1.0 ({})", config.api.contact_email),
        }
    }

    /// Resolve a raw profile location to a country, if possible
    pub async fn resolve_country(&self, raw_location: &str) -> Option<String> {
        let cleaned = clean_location(raw_location)?;

        let response = self
            .client
            .get(NOMINATIM_URL)
            .header("User-Agent", self.user_agent.clone())
            .header("Accept-Language", "en")
            .query(&[
                ("q", cleaned.as_str()),
                ("format", "json"),
                ("addressdetails", "1"),
            ])
            .send()
            .await;

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                logging::log_warning(&format!(
                    "Geocoding request failed with status {} for '{}'",
                    r.status(),
                    cleaned
                ));
                return None;
            }
            Err(e) => {
                logging::log_warning(&format!("Geocoding request failed for '{}': {}", cleaned, e));
                return None;
            }
        };

        let data = response.json::<Value>().await.ok()?;
        country_by_importance(data.as_array()?)
    }
}

/// Pick the country of the highest-importance hit, ignoring hits that only
/// resolve to a continent.
fn country_by_importance(hits: &[Value]) -> Option<String> {
    let best = hits.iter().max_by(|a, b| {
        let ia = a.get("importance").and_then(Value::as_f64).unwrap_or(0.0);
        let ib = b.get("importance").and_then(Value::as_f64).unwrap_or(0.0);
        ia.partial_cmp(&ib).unwrap_or(std::cmp::Ordering::Equal)
    })?;

    best.get("address")?
        .get("country")?
        .as_str()
        .map(|s| s.to_string())
}

/// Scrub a raw location string of symbols, URLs, zip codes and filler words
/// that confuse the geocoder. Returns None when nothing meaningful remains.
pub fn clean_location(raw: &str) -> Option<String> {
    if raw.trim().is_empty() {
        return None;
    }

    const SYMBOLS: &[char] = &[
        '#', '@', '$', '%', '^', '&', '*', '(', ')', '_', '+', '=', '[', ']', '{', '}', '|', '\\',
        ':', '"', ';', '\'', '<', '>', '?', '/', '~', '`',
    ];
    const NOISE_WORDS: &[&str] = &["greater", "area", "metro", "vicinity", "region", "the"];

    let mut words: Vec<String> = Vec::new();
    for token in raw.split_whitespace() {
        let lower = token.to_lowercase();

        // URLs and email-like tokens carry no geography.
        if lower.starts_with("http://") || lower.starts_with("https://") {
            continue;
        }
        if lower.contains('@') && lower.contains('.') {
            continue;
        }

        let stripped: String = lower.chars().filter(|c| !SYMBOLS.contains(c)).collect();
        let stripped = stripped.trim_matches(|c: char| c == ',' || c == '.' || c == '-');
        if stripped.is_empty() || NOISE_WORDS.contains(&stripped) {
            continue;
        }
        words.push(stripped.to_string());
    }

    // Leading/trailing digit runs are usually zip codes.
    while words
        .first()
        .map_or(false, |w| w.chars().all(|c| c.is_ascii_digit()))
    {
        words.remove(0);
    }
    while words
        .last()
        .map_or(false, |w| w.chars().all(|c| c.is_ascii_digit()))
    {
        words.pop();
    }

    let cleaned = words.join(" ");
    if cleaned.len() < 2 || matches!(cleaned.as_str(), "na" | "none" | "null") {
        return None;
    }

    Some(title_case(&cleaned))
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_location_strips_noise() {
        assert_eq!(
            clean_location("Greater Toronto Area").as_deref(),
            Some("Toronto")
        );
        assert_eq!(
            clean_location("  berlin, germany  ").as_deref(),
            Some("Berlin Germany")
        );
    }

    #[test]
    fn test_clean_location_drops_urls_and_emails() {
        assert_eq!(
            clean_location("https://example.com Paris someone@mail.com").as_deref(),
            Some("Paris")
        );
    }

    #[test]
    fn test_clean_location_strips_zip_codes() {
        assert_eq!(clean_location("94103 San Francisco").as_deref(), Some("San Francisco"));
        assert_eq!(clean_location("Oslo 0150").as_deref(), Some("Oslo"));
    }

    #[test]
    fn test_clean_location_rejects_meaningless_values() {
        assert!(clean_location("").is_none());
        assert!(clean_location("   ").is_none());
        assert!(clean_location("n/a").is_none());
        assert!(clean_location("@#$%").is_none());
    }

    #[test]
    fn test_country_by_importance_prefers_best_hit() {
        let hits = vec![
            json!({ "importance": 0.3, "address": { "country": "Georgia" } }),
            json!({ "importance": 0.8, "address": { "country": "United States" } }),
        ];
        assert_eq!(
            country_by_importance(&hits).as_deref(),
            Some("United States")
        );
    }

    #[test]
    fn test_country_by_importance_handles_continent_only_hits() {
        let hits = vec![json!({ "importance": 0.9, "address": { "continent": "Europe" } })];
        assert_eq!(country_by_importance(&hits), None);
    }
}
