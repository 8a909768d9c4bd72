//! CLI handlers for browsing contents, searching and resolving streams.

use crate::app::AppContext;
use crate::cli::{ContentsArgs, SearchArgs, StreamArgs};
use crate::content::{sort_contents, ContentQuery};
use crate::search::SearchQuery;

/// Handle `wsoptv contents`.
pub async fn handle_contents(app: &AppContext, args: ContentsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let query = ContentQuery {
        catalog_id: args.catalog,
        season: args.season,
        page: Some(args.page),
        limit: None,
        sort: args.sort,
    };
    app.content().fetch_contents(query).await?;

    let state = app.content().state();
    if state.contents.is_empty() {
        println!("No contents found");
        return Ok(());
    }
    for content in sort_contents(&state.contents, args.sort) {
        let episode = content
            .episode
            .map(|episode| format!("E{episode:02} "))
            .unwrap_or_default();
        println!(
            "{:>6}  {}{}  [{}]  {} hands  {}",
            content.id,
            episode,
            content.title,
            content.catalog_name,
            content.hand_count,
            format_duration(content.duration_sec),
        );
    }
    if state.has_more {
        println!("... more on page {}", state.page + 1);
    }
    Ok(())
}

/// Handle `wsoptv search <query>`.
pub async fn handle_search(app: &AppContext, args: SearchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut query = SearchQuery::new(args.query);
    query.page = Some(args.page);
    query.limit = args.limit;

    let search = app.search();
    search.initialize();
    search.search(query).await?;

    let state = search.state();
    println!("{} results for \"{}\"", state.total_hits, state.query);
    for hit in &state.results {
        println!(
            "{:>6}  {}  [{}]  {} hands",
            hit.id, hit.title, hit.catalog_name, hit.hand_count
        );
        for highlight in &hit.highlights {
            println!("        {}: {}", highlight.field, highlight.snippet);
        }
    }
    Ok(())
}

/// Handle `wsoptv stream <content-id>`.
pub async fn handle_stream(app: &AppContext, args: StreamArgs) -> Result<(), Box<dyn std::error::Error>> {
    let player = app.player();
    player.load(args.content_id).await?;

    let state = player.state();
    if let Some(url) = &state.stream_url {
        println!("Stream:   {url}");
    }
    println!("Playlist: {}", player.playlist_url(args.content_id));

    let available: Vec<_> = state
        .qualities
        .iter()
        .filter(|quality| quality.available)
        .map(|quality| quality.level.label())
        .collect();
    if !available.is_empty() {
        println!("Quality:  {}", available.join(", "));
    }

    let timeline = player.timeline_state();
    println!(
        "Hands:    {} ({} highlights)",
        timeline.total_hands,
        timeline.highlight_hands.len()
    );
    for segment in &timeline.highlight_hands {
        if let Some(hand) = &segment.hand {
            println!(
                "  #{:<4} {}  {} - {}",
                hand.hand_number,
                hand.grade,
                format_duration(segment.start_sec as u32),
                format_duration(segment.end_sec as u32),
            );
        }
    }

    let progress = app.progress_tracker(args.content_id);
    if progress.load().await.is_some() {
        println!("Resume:   {}", format_duration(progress.resume_position() as u32));
    }
    Ok(())
}

/// `h:mm:ss`, or `m:ss` under an hour.
pub fn format_duration(seconds: u32) -> String {
    let (hours, minutes, secs) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(format_duration(59), "0:59");
        assert_eq!(format_duration(754), "12:34");
        assert_eq!(format_duration(3 * 3600 + 5), "3:00:05");
    }
}
