// tests/briefing_pages.rs
// Assembly contract: fixed section order, category-specific page sizes,
// explicit empty markers, deterministic shape on total failure.

use chrono::{TimeZone, Utc};
use gameday_briefing::briefing::{chunk, BriefingAssembler, NO_ITEMS_MARKER};
use gameday_briefing::config::PagesConfig;
use gameday_briefing::news::classify::Category;
use gameday_briefing::news::CategoryBucket;
use gameday_briefing::schedule::window::ScheduleWindow;
use gameday_briefing::schedule::{Game, ResolveOutcome};

fn bucket(category: Category, n: usize) -> CategoryBucket {
    CategoryBucket {
        category,
        bullets: (0..n).map(|i| format!("bullet {i} (AP)")).collect(),
        total_count: n,
        truncated_count: 0,
        provenance: vec!["AP".to_string()],
    }
}

fn empty_schedule(attempted: &[&str]) -> ResolveOutcome {
    ResolveOutcome {
        games: Vec::new(),
        window_used: ScheduleWindow::upcoming_days(Utc::now(), 7),
        expanded: false,
        sources_attempted: attempted.iter().map(|s| s.to_string()).collect(),
    }
}

#[test]
fn fifty_two_bullets_at_five_per_page_make_eleven_pages() {
    let assembler = BriefingAssembler::new(PagesConfig::default(), -5);
    let schedule = empty_schedule(&[]);
    let buckets = vec![bucket(Category::Injuries, 52)];

    let briefing = assembler.assemble(&schedule, &buckets);
    let injuries = &briefing.sections[0];
    assert_eq!(injuries.name, "injuries");
    assert_eq!(injuries.pages.len(), 11);
    assert_eq!(injuries.pages.last().unwrap().len(), 2);
    for page in &injuries.pages[..10] {
        assert_eq!(page.len(), 5);
    }
}

#[test]
fn section_order_is_fixed_and_complete() {
    let assembler = BriefingAssembler::new(PagesConfig::default(), -5);
    let schedule = empty_schedule(&["events-api"]);
    // Only breaking news has content; every section must still appear.
    let buckets = vec![bucket(Category::BreakingNews, 1)];

    let briefing = assembler.assemble(&schedule, &buckets);
    let names: Vec<&str> = briefing.sections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["injuries", "roster-moves", "scheduled-games", "breaking-news"]
    );

    assert_eq!(
        briefing.sections[0].empty_marker.as_deref(),
        Some(NO_ITEMS_MARKER)
    );
    assert!(briefing.sections[3].empty_marker.is_none());
}

#[test]
fn schedule_section_renders_games_in_order() {
    let assembler = BriefingAssembler::new(PagesConfig::default(), -5);
    let games = vec![
        Game {
            away_team: "Wolves".into(),
            home_team: "Hawks".into(),
            start_ts: Some(Utc.with_ymd_and_hms(2025, 11, 4, 0, 30, 0).unwrap()),
            source: "events-api".into(),
        },
        Game {
            away_team: "Sharks".into(),
            home_team: "Owls".into(),
            start_ts: None,
            source: "events-api".into(),
        },
    ];
    let schedule = ResolveOutcome {
        games,
        window_used: ScheduleWindow::upcoming_days(Utc::now(), 7),
        expanded: false,
        sources_attempted: vec!["events-api".into()],
    };

    let briefing = assembler.assemble(&schedule, &[]);
    let section = &briefing.sections[2];
    assert_eq!(section.total_count, 2);
    // 00:30 UTC is 7:30 PM the previous evening at UTC-5.
    assert_eq!(section.pages[0][0], "Wolves at Hawks - Mon Nov 3, 7:30 PM");
    assert_eq!(section.pages[0][1], "Sharks at Owls - time TBD");
    assert_eq!(section.provenance, vec!["events-api".to_string()]);
    assert!(section.empty_marker.is_none());
}

#[test]
fn total_source_failure_is_labeled_not_thrown() {
    let assembler = BriefingAssembler::new(PagesConfig::default(), -5);
    let schedule = empty_schedule(&["events-api", "scrape-secondary", "scrape-tertiary"]);

    let briefing = assembler.assemble(&schedule, &[]);
    assert_eq!(briefing.sections.len(), 4);
    let section = &briefing.sections[2];
    assert_eq!(section.empty_marker.as_deref(), Some(NO_ITEMS_MARKER));
    assert_eq!(
        section.provenance,
        vec![
            "events-api: unavailable".to_string(),
            "scrape-secondary: unavailable".to_string(),
            "scrape-tertiary: unavailable".to_string(),
        ]
    );
}

#[test]
fn chunk_concatenation_reproduces_input() {
    let items: Vec<String> = (0..17).map(|i| format!("item {i}")).collect();
    let pages = chunk(&items, 4);
    assert_eq!(pages.len(), 5);
    assert_eq!(pages[4].len(), 1);
    let flat: Vec<String> = pages.into_iter().flatten().collect();
    assert_eq!(flat, items);
}
