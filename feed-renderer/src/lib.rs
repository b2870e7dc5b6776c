//! RSS 2.0 rendering of the persisted history.
//!
//! Rendering is a pure function of the history and the build time: no I/O,
//! no clock access.

pub mod grouping;
pub mod preview;


pub use grouping::{group_entries, Entry};
pub use preview::{describe, direct_image_url, preview, signed_score};

use chrono::{DateTime, TimeZone, Utc};
use quick_xml::escape::escape;
use snoofeed_core::Item;

/// RFC 822 dates as feed readers expect them, always in GMT.
pub const RSS_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Fixed `<channel>` metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub title: String,
    pub link: String,
    pub description: String,
    pub image_url: String,
    /// Minutes readers may cache the feed.
    pub ttl: u32,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            title: "reddit new".to_string(),
            link: "https://reddit.com/".to_string(),
            description: "New posts on reddit".to_string(),
            image_url: "https://www.redditstatic.com/reddit.com.header.png".to_string(),
            ttl: 25,
        }
    }
}

pub fn rss_date(date: DateTime<Utc>) -> String {
    date.format(RSS_DATE_FORMAT).to_string()
}

/// Strip one trailing period (an ellipsis is left alone) and append the
/// community and counters.
pub fn decorate_title(item: &Item) -> String {
    let title = item.title.as_str();
    let title = match title.strip_suffix('.') {
        Some(stripped) if !stripped.is_empty() && !stripped.ends_with('.') => stripped,
        _ => title,
    };
    format!(
        "{} — {} ({} / {})",
        title,
        item.subreddit,
        item.num_comments,
        signed_score(item.score)
    )
}

/// Render `posts` (ascending by creation time) as a complete RSS document,
/// newest entry first.
pub fn render_feed(posts: &[Item], channel: &Channel, now: DateTime<Utc>) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    xml.push_str("<rss version=\"2.0\"><channel>");
    push_element(&mut xml, "title", &channel.title);
    push_element(&mut xml, "link", &channel.link);
    push_element(&mut xml, "description", &channel.description);
    push_element(&mut xml, "lastBuildDate", &rss_date(now));
    push_element(&mut xml, "ttl", &channel.ttl.to_string());
    xml.push_str("<image>");
    push_element(&mut xml, "url", &channel.image_url);
    push_element(&mut xml, "title", &channel.title);
    push_element(&mut xml, "link", &channel.link);
    xml.push_str("</image>");

    for entry in group_entries(posts) {
        render_entry(&mut xml, &entry);
    }

    xml.push_str("</channel></rss>");
    xml
}

fn render_entry(xml: &mut String, entry: &Entry<'_>) {
    let item = entry.representative();
    xml.push_str("<item>");
    push_element(xml, "title", &decorate_title(item));
    push_element(xml, "link", &preview::permalink_url(item));
    push_element(xml, "description", &describe(entry));
    xml.push_str("<guid isPermaLink=\"false\">");
    xml.push_str(&escape(item.id.as_str()));
    xml.push_str("</guid>");
    if let Some(published) = Utc.timestamp_opt(item.created_utc, 0).single() {
        push_element(xml, "pubDate", &rss_date(published));
    }
    xml.push_str("</item>");
}

fn push_element(xml: &mut String, name: &str, text: &str) {
    xml.push('<');
    xml.push_str(name);
    xml.push('>');
    xml.push_str(&escape(text));
    xml.push_str("</");
    xml.push_str(name);
    xml.push('>');
}
