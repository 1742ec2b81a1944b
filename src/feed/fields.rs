// src/feed/fields.rs

//! Derivation of individual vehicle fields from raw feed values.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::config::ImageConfig;
use crate::models::{PRICE_CALL, PRICE_SOLD, VehicleStatus};

/// Uppercase a VIN and strip everything but ASCII alphanumerics.
pub fn normalize_vin(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Build a URL-safe slug: lowercase, runs of non-alphanumerics collapsed to
/// a single hyphen, no leading or trailing hyphen.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Derive display price and status together.
///
/// No usable positive price means "call for price". An explicit "sold" in
/// the status column wins over whatever the price field said.
pub fn derive_price_status(
    raw_price: Option<&str>,
    raw_status: Option<&str>,
) -> (String, VehicleStatus) {
    if raw_status.is_some_and(|s| s.trim().eq_ignore_ascii_case("sold")) {
        return (PRICE_SOLD.to_string(), VehicleStatus::Sold);
    }

    match raw_price.map(str::trim) {
        None | Some("") | Some("0") => (PRICE_CALL.to_string(), VehicleStatus::Call),
        Some(raw) => match parse_amount(raw) {
            Some(amount) if amount > 0.0 => (format_dollars(amount), VehicleStatus::Available),
            _ => (PRICE_CALL.to_string(), VehicleStatus::Call),
        },
    }
}

/// Parse a raw price string, tolerating currency symbols and separators.
fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok()
}

/// Format a positive amount as "$45,000", keeping cents only when present.
fn format_dollars(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let grouped = group_thousands(cents / 100);
    if cents % 100 == 0 {
        format!("${grouped}")
    } else {
        format!("${grouped}.{:02}", cents % 100)
    }
}

fn group_thousands(n: i64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Parse an odometer reading by keeping digits only ("12,345 mi" -> 12345).
pub fn parse_odometer(raw: &str) -> Option<u32> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse::<u32>().ok()
}

/// Split a comma-separated photo list, dropping empties and upscaling
/// vendor CDN thumbnails.
pub fn split_images(raw: &str, images: &ImageConfig) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| upscale_image_url(s, images))
        .collect()
}

/// Rewrite a vendor CDN thumbnail URL to the configured resolution.
///
/// The CDN encodes the size as a `/<width>/<height>/` segment right before
/// the file name. URLs on other hosts, or without the segment, pass through
/// unchanged.
pub fn upscale_image_url(url: &str, images: &ImageConfig) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let on_cdn = parsed
        .host_str()
        .is_some_and(|host| host.contains(&images.cdn_host_fragment));
    if !on_cdn {
        return url.to_string();
    }

    size_segment()
        .replace(url, |caps: &regex::Captures<'_>| {
            format!(
                "/{}/{}/{}",
                images.target_width, images.target_height, &caps[1]
            )
        })
        .into_owned()
}

fn size_segment() -> &'static Regex {
    static SIZE_SEGMENT: OnceLock<Regex> = OnceLock::new();
    SIZE_SEGMENT.get_or_init(|| Regex::new(r"/\d{2,4}/\d{2,4}/([^/]+)$").unwrap())
}
