//! Turns raw scraper dataset items into the shapes served by the API.
//!
//! Scrapers for different platforms name the same thing differently
//! (`authorName` vs `author`, `ratingStars` vs `stars`, ...), so every field
//! is looked up through a list of aliases.

use crate::domain::model::{PlaceReview, Review, ScrapedProfile};
use chrono::DateTime;
use serde_json::{Map, Value};

/// Upper bound on reviews kept per profile.
pub const MAX_REVIEWS: usize = 100;

const NAME: &[&str] = &["name", "companyName", "businessName"];
const AVERAGE: &[&str] = &["average_score", "averageScore", "averageRating", "rating"];
const TOTAL: &[&str] = &["total_reviews", "totalReviews", "reviewCount", "reviewsCount"];

const AUTHOR: &[&str] = &["authorName", "author", "name", "reviewer"];
const RATING: &[&str] = &["ratingStars", "rating", "stars", "score"];
const DATE: &[&str] = &["createdDate", "date", "publishedAt", "publishedAtDate"];
const TITLE: &[&str] = &["title", "headline"];
const CONTENT: &[&str] = &["body", "content", "text", "comment"];
const REPLY: &[&str] = &["reply", "response", "ownerResponse"];
const COUNTRY: &[&str] = &["country", "reviewerCountry"];

/// Merge the dataset items of one profile scrape.
///
/// Profile metadata comes from the first item that carries it; reviews of
/// all items (one per crawled page) are concatenated and capped at
/// [`MAX_REVIEWS`].
pub fn profile_from_items(requested_url: &str, items: &[Value]) -> ScrapedProfile {
    let objects: Vec<&Map<String, Value>> = items.iter().filter_map(Value::as_object).collect();

    let url = objects
        .iter()
        .find_map(|o| string_field(o, &["url"]))
        .unwrap_or_else(|| requested_url.to_string());
    let name = objects.iter().find_map(|o| string_field(o, NAME));
    let average_score = objects.iter().find_map(|o| number_field(o, AVERAGE));
    let total_reviews = objects.iter().find_map(|o| count_field(o, TOTAL));

    let reviews = objects
        .iter()
        .filter_map(|o| o.get("reviews").and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_object)
        .map(review_from_object)
        .take(MAX_REVIEWS)
        .collect();

    ScrapedProfile {
        url,
        name,
        average_score,
        total_reviews,
        reviews,
    }
}

fn review_from_object(o: &Map<String, Value>) -> Review {
    Review {
        author: string_field(o, AUTHOR),
        rating: number_field(o, RATING),
        date: string_field(o, DATE),
        title: string_field(o, TITLE),
        content: string_field(o, CONTENT),
        reply: string_field(o, REPLY),
        country: string_field(o, COUNTRY),
    }
}

/// Google reviews scraper items are the reviews themselves.
pub fn place_reviews_from_items(items: &[Value]) -> Vec<PlaceReview> {
    items
        .iter()
        .filter_map(Value::as_object)
        .map(|o| PlaceReview {
            author_name: string_field(o, &["name"]).unwrap_or_else(|| "Anonymous".to_string()),
            rating: number_field(o, &["stars"])
                .map(|s| s.clamp(0.0, 5.0) as u8)
                .unwrap_or(0),
            text: string_field(o, &["text"]).unwrap_or_default(),
            time: string_field(o, &["publishedAtDate"])
                .map(|d| parse_iso_to_unix(&d))
                .unwrap_or(0),
            profile_photo_url: string_field(o, &["reviewerPhotoUrl"]),
            relative_time_description: string_field(o, &["publishAt"]).unwrap_or_default(),
        })
        .collect()
}

/// Unix seconds of an RFC 3339 date, 0 when it cannot be parsed.
pub fn parse_iso_to_unix(date: &str) -> i64 {
    DateTime::parse_from_rfc3339(date.trim())
        .map(|dt| dt.timestamp())
        .unwrap_or(0)
}

fn string_field(o: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|name| match o.get(*name)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn number_field(o: &Map<String, Value>, aliases: &[&str]) -> Option<f64> {
    aliases.iter().find_map(|name| match o.get(*name)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    })
}

fn count_field(o: &Map<String, Value>, aliases: &[&str]) -> Option<u64> {
    aliases.iter().find_map(|name| match o.get(*name)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => {
            let digits: String = s.chars().filter(char::is_ascii_digit).collect();
            digits.parse().ok()
        }
        _ => None,
    })
}

// Accepts "4.5", "4,5", "5 Sterne" and the like.
fn parse_number(s: &str) -> Option<f64> {
    let normalized = s.trim().replace(',', ".");
    let leading: String = normalized
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    leading.parse().ok()
}
