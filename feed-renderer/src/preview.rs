//! HTML body of a feed entry.

use crate::grouping::Entry;
use quick_xml::escape::escape;
use snoofeed_core::{Item, MediaEmbed};
use url::Url;

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".svg"];

pub const REDDIT_BASE: &str = "https://reddit.com";

pub fn permalink_url(item: &Item) -> String {
    format!("{}{}", REDDIT_BASE, item.permalink)
}

/// `+12`, `0`, `-3`.
pub fn signed_score(score: i64) -> String {
    if score > 0 {
        format!("+{}", score)
    } else {
        score.to_string()
    }
}

/// Preview of the representative followed by one counter line per member.
pub fn describe(entry: &Entry<'_>) -> String {
    let mut html = preview(entry.representative()).unwrap_or_default();
    for member in &entry.members {
        let group = if entry.is_cross_post() {
            format!(" — {}", member.subreddit)
        } else {
            String::new()
        };
        html.push_str(&format!(
            "<p><big><a href=\"{}\">[{}{}]</a> </big>[{}]</p>",
            escape(permalink_url(member).as_str()),
            member.num_comments,
            escape(group.as_str()),
            signed_score(member.score)
        ));
    }
    html
}

/// First rule that yields something wins.
pub fn preview(item: &Item) -> Option<String> {
    item.media
        .as_ref()
        .and_then(|media| embed(item, media))
        .or_else(|| preview_image(item))
        .or_else(|| gallery(item))
        .or_else(|| item.selftext_html.clone().filter(|html| !html.is_empty()))
        .or_else(|| (!item.is_self).then(|| external_link(&item.url)))
}

fn embed(item: &Item, media: &MediaEmbed) -> Option<String> {
    let player = if let Some(html) = media.html.as_ref().filter(|html| !html.is_empty()) {
        html.clone()
    } else if let Some(thumbnail) = &media.thumbnail_url {
        linked_image(&item.url, thumbnail)
    } else {
        let video = escape(media.video_url.as_deref()?);
        format!("<p><a href=\"{}\">[video]</a></p>", video)
    };
    Some(match media.provider.as_deref().filter(|name| !name.is_empty()) {
        Some(provider) => format!("{}<p><small>via {}</small></p>", player, escape(provider)),
        None => player,
    })
}

fn preview_image(item: &Item) -> Option<String> {
    let target = if item.is_self {
        permalink_url(item)
    } else {
        item.url.clone()
    };

    if let Some(image) = item.preview.first() {
        return Some(linked_image(&target, &image.largest().url));
    }
    if !item.is_self {
        if let Some(image) = direct_image_url(&item.url) {
            return Some(linked_image(&item.url, &image));
        }
    }
    item.thumbnail
        .as_ref()
        .map(|thumbnail| linked_image(&target, thumbnail))
}

fn gallery(item: &Item) -> Option<String> {
    if item.gallery.is_empty() {
        return None;
    }
    Some(
        item.gallery
            .iter()
            .map(|image| linked_image(&image.url, &image.url))
            .collect(),
    )
}

fn external_link(url: &str) -> String {
    let url = escape(url);
    format!("<p><a href=\"{}\">[{}]</a></p>", url, url)
}

fn linked_image(href: &str, src: &str) -> String {
    format!(
        "<p><a href=\"{}\"><img src=\"{}\"/></a></p>",
        escape(href),
        escape(src)
    )
}

/// The url itself when it points at an image file, or the image behind a
/// bare imgur page.
pub fn direct_image_url(link: &str) -> Option<String> {
    let parsed = Url::parse(link).ok()?;
    let path = parsed.path().to_lowercase();
    if IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return Some(link.to_string());
    }

    let imgur_id = parsed.path().strip_prefix('/')?;
    let is_imgur_page = parsed.host_str() == Some("imgur.com")
        && !imgur_id.is_empty()
        && imgur_id.chars().all(|c| c.is_ascii_alphanumeric());
    is_imgur_page.then(|| format!("https://i.imgur.com/{}.png", imgur_id))
}
