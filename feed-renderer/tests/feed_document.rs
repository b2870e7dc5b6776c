use chrono::{TimeZone, Utc};
use feed_renderer::{render_feed, Channel};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use snoofeed_core::Item;

#[derive(Debug, Default)]
struct ParsedItem {
    title: String,
    guid: String,
    description: String,
}

/// Collect `<item>` children, failing on malformed XML.
fn parse_items(xml: &str) -> Vec<ParsedItem> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<ParsedItem> = None;
    let mut element = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                element = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if element == "item" {
                    current = Some(ParsedItem::default());
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"item" {
                    items.extend(current.take());
                }
                element.clear();
            }
            Ok(Event::Text(e)) => {
                if let Some(item) = current.as_mut() {
                    let text = e.unescape().unwrap().to_string();
                    match element.as_str() {
                        "title" => item.title = text,
                        "guid" => item.guid = text,
                        "description" => item.description = text,
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => panic!("feed is not well-formed: {}", e),
            _ => {}
        }
    }
    items
}

fn post(id: &str, created_utc: i64, url: &str, subreddit: &str, comments: u64) -> Item {
    Item {
        id: id.to_string(),
        created_utc,
        subreddit: subreddit.to_string(),
        score: 25,
        num_comments: comments,
        url: url.to_string(),
        permalink: format!("/r/{}/comments/{}/slug/", subreddit, id),
        is_self: false,
        title: format!("Headline {}.", id),
        selftext: None,
        selftext_html: None,
        thumbnail: None,
        media: None,
        preview: Vec::new(),
        gallery: Vec::new(),
    }
}

#[test]
fn test_cross_post_renders_single_item() {
    let posts = vec![
        post("t3_one", 1_700_000_000, "https://news.example/story", "worldnews", 40),
        post("t3_two", 1_700_000_100, "https://news.example/story", "europe", 7),
    ];
    let rss = render_feed(&posts, &Channel::default(), Utc::now());
    let items = parse_items(&rss);

    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.guid, "t3_one");
    assert_eq!(item.title, "Headline t3_one — worldnews (40 / +25)");
    assert!(item
        .description
        .contains("https://reddit.com/r/worldnews/comments/t3_one/slug/"));
    assert!(item
        .description
        .contains("https://reddit.com/r/europe/comments/t3_two/slug/"));
}

#[test]
fn test_feed_order_is_reverse_of_history() {
    let posts: Vec<_> = (0..5)
        .map(|n| {
            post(
                &format!("t3_{}", n),
                1_700_000_000 + n * 60,
                &format!("https://example.com/{}", n),
                "rust",
                1,
            )
        })
        .collect();
    let rss = render_feed(&posts, &Channel::default(), Utc::now());
    let guids: Vec<_> = parse_items(&rss).into_iter().map(|i| i.guid).collect();
    assert_eq!(guids, vec!["t3_4", "t3_3", "t3_2", "t3_1", "t3_0"]);
}

#[test]
fn test_markup_heavy_content_stays_well_formed() {
    let mut body = post("t3_self", 1_700_000_000, "https://reddit.com/r/rust/comments/t3_self/", "rust", 3);
    body.is_self = true;
    body.title = "<script>alert('x')</script> & \"quotes\"".to_string();
    body.selftext_html = Some("<div class=\"md\"><p>a &lt; b &amp;&amp; c</p></div>".to_string());

    let rss = render_feed(
        &[body],
        &Channel::default(),
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    );
    let items = parse_items(&rss);

    assert_eq!(items.len(), 1);
    assert!(items[0].title.starts_with("<script>alert('x')</script> & \"quotes\""));
    assert!(items[0]
        .description
        .starts_with("<div class=\"md\"><p>a &lt; b &amp;&amp; c</p></div>"));
}
