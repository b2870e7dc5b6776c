use snoofeed_core::Item;
use std::collections::{HashMap, HashSet};

/// One feed entry: a self post, a lone link post, or every link post sharing
/// one url.
#[derive(Debug)]
pub struct Entry<'a> {
    /// Members ordered by comment count, most discussed first. The first
    /// member is the representative.
    pub members: Vec<&'a Item>,
}

impl<'a> Entry<'a> {
    pub fn representative(&self) -> &'a Item {
        self.members[0]
    }

    pub fn is_cross_post(&self) -> bool {
        self.members.len() > 1
    }
}

/// Entries newest first. `posts` must be ascending by creation time; a
/// cross-post group takes the position of its newest member.
pub fn group_entries(posts: &[Item]) -> Vec<Entry<'_>> {
    let mut by_url: HashMap<&str, Vec<&Item>> = HashMap::new();
    for post in posts.iter().filter(|post| !post.is_self) {
        by_url.entry(post.url.as_str()).or_default().push(post);
    }
    for members in by_url.values_mut() {
        // Stable, so ties keep the older post first
        members.sort_by(|a, b| b.num_comments.cmp(&a.num_comments));
    }

    let mut emitted: HashSet<&str> = HashSet::new();
    let mut entries = Vec::with_capacity(posts.len());
    for post in posts.iter().rev() {
        if post.is_self {
            entries.push(Entry {
                members: vec![post],
            });
            continue;
        }
        if !emitted.insert(post.url.as_str()) {
            continue;
        }
        let members = by_url
            .get(post.url.as_str())
            .cloned()
            .unwrap_or_else(|| vec![post]);
        entries.push(Entry { members });
    }
    entries
}
