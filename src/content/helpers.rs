use chrono::{DateTime, Utc};

use super::types::{Content, ContentSortOption, Hand, HandGrade};

/// Client-side ordering of an already-fetched list.
///
/// `Popular` keeps the server order. Entries whose `created_at` does not
/// parse sort last under `Recent`.
pub fn sort_contents(contents: &[Content], sort: Option<ContentSortOption>) -> Vec<Content> {
    let mut sorted = contents.to_vec();
    match sort {
        Some(ContentSortOption::Recent) => {
            sorted.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
        }
        Some(ContentSortOption::Episode) => {
            sorted.sort_by_key(|content| content.episode.unwrap_or(0));
        }
        Some(ContentSortOption::Hands) => {
            sorted.sort_by(|a, b| b.hand_count.cmp(&a.hand_count));
        }
        Some(ContentSortOption::Popular) | None => {}
    }
    sorted
}

fn created_at(content: &Content) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&content.created_at)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

/// Hands whose grade is in `grades`; every hand when `grades` is empty.
pub fn filter_by_grade(hands: &[Hand], grades: &[HandGrade]) -> Vec<Hand> {
    if grades.is_empty() {
        return hands.to_vec();
    }
    hands
        .iter()
        .filter(|hand| grades.contains(&hand.grade))
        .cloned()
        .collect()
}
