//! Recovery of runs interrupted part way through a file.

mod common;

use chrono::{TimeZone, Utc};
use fruec::config::compile_match_regex;
use fruec::events::EventParser;
use fruec::models::{EventKind, SampleRate};
use fruec::repository::{AggregationSession, BatchWriter, DetailFilter, RunContext};
use fruec::{incomplete_files, purge_incomplete, ConsumerError};

use common::{cn_default, cn_line, lp_line, TestEnv};

fn parser(env: &TestEnv) -> EventParser {
    EventParser::new(compile_match_regex(&env.settings.default_str_validation_regex).unwrap())
}

fn filter() -> DetailFilter {
    DetailFilter::new(compile_match_regex("enwiki$").unwrap(), vec!["en".to_string()])
}

/// Save the aggregates of `lines` for a file, then stop before completing it.
async fn crash_after_save(env: &TestEnv, filename: &str, rate: u32, lines: &[String]) {
    let rate = SampleRate::new(rate).unwrap();
    let time = Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap();
    let filter = filter();
    let parser = parser(env);

    let mut ctx = RunContext::open_for_run(&env.pool, EventKind::CentralNotice)
        .await
        .unwrap();
    let handle = ctx
        .begin(filename, "/logs", &time, EventKind::CentralNotice, Some(rate))
        .await
        .unwrap();
    let mut session = AggregationSession::new(&handle, rate, &filter);
    for line in lines {
        session.add_event(&parser.parse_central_notice(line).valid().unwrap());
    }
    session.save(&mut ctx).await.unwrap();
}

/// Write `lines` as landingpage rows for a file, then stop before completing it.
async fn crash_after_flush(env: &TestEnv, filename: &str, lines: &[String]) {
    let time = Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap();
    let parser = parser(env);

    let mut ctx = RunContext::open_for_run(&env.pool, EventKind::LandingPage)
        .await
        .unwrap();
    let handle = ctx
        .begin(filename, "/logs", &time, EventKind::LandingPage, None)
        .await
        .unwrap();
    let mut writer = BatchWriter::new(&handle, 100);
    for line in lines {
        let event = parser.parse_landing_page(line).valid().unwrap();
        writer.add_and_maybe_flush(&mut ctx, &event).await.unwrap();
    }
    writer.flush_remaining(&mut ctx).await.unwrap();
}

#[tokio::test]
async fn test_purge_restores_counts_of_completed_files() {
    let env = TestEnv::new().await;
    env.write_log(
        EventKind::CentralNotice,
        "events-20230101000000-100.log",
        &[
            cn_default("2023-01-01T00:01:00Z"),
            cn_default("2023-01-01T00:01:30Z"),
        ],
    );
    env.consume_kind(EventKind::CentralNotice).await.unwrap();
    let before = env.cells();

    crash_after_save(
        &env,
        "events-20230101120000-50.log",
        50,
        &[
            cn_default("2023-01-01T00:01:10Z"),
            cn_line("2023-01-01T00:05:00Z", "BannerB", "Camp1", "enwiki", "en", "US"),
        ],
    )
    .await;
    assert_eq!(env.cells().len(), 2);
    assert_eq!(env.cells()[0].count, 4.0);

    let incomplete = incomplete_files(&env.pool, EventKind::CentralNotice)
        .await
        .unwrap();
    assert_eq!(incomplete.len(), 1);
    assert_eq!(incomplete[0].filename, "events-20230101120000-50.log");

    let stats = purge_incomplete(&env.pool, EventKind::CentralNotice)
        .await
        .unwrap();
    assert_eq!(stats.files_deleted, 1);
    assert_eq!(stats.links_deleted, 2);
    assert_eq!(stats.cells_updated, 2);
    assert_eq!(stats.cells_deleted, 1);

    assert_eq!(env.cells(), before);
    assert_eq!(env.file_status("events-20230101120000-50.log"), None);
    assert_eq!(env.count("banner_impression_files"), 1);
}

#[tokio::test]
async fn test_purge_then_rerun_matches_uninterrupted_run() {
    let lines = [
        cn_default("2023-01-01T00:01:00Z"),
        cn_default("2023-01-01T00:02:00Z"),
        cn_line("2023-01-01T00:02:30Z", "BannerA", "Camp1", "dewiki", "de", "DE"),
    ];

    let clean = TestEnv::new().await;
    clean.write_log(EventKind::CentralNotice, "events-20230101000000-10.log", &lines);
    clean.consume_kind(EventKind::CentralNotice).await.unwrap();

    let env = TestEnv::new().await;
    crash_after_save(&env, "events-20230101000000-10.log", 10, &lines).await;

    let blocked = env.consume_kind(EventKind::CentralNotice).await;
    assert!(matches!(
        blocked,
        Err(ConsumerError::ProcessingFilesFound { .. })
    ));

    purge_incomplete(&env.pool, EventKind::CentralNotice)
        .await
        .unwrap();
    assert!(env.cells().is_empty());

    env.write_log(EventKind::CentralNotice, "events-20230101000000-10.log", &lines);
    let stats = env.consume_kind(EventKind::CentralNotice).await.unwrap();
    assert_eq!(stats.consumed_files, 1);
    assert_eq!(env.cells(), clean.cells());
}

#[tokio::test]
async fn test_purge_without_residue_is_a_no_op() {
    let env = TestEnv::new().await;
    env.write_log(
        EventKind::CentralNotice,
        "events-20230101000000-100.log",
        &[cn_default("2023-01-01T00:01:00Z")],
    );
    env.consume_kind(EventKind::CentralNotice).await.unwrap();

    let stats = purge_incomplete(&env.pool, EventKind::CentralNotice)
        .await
        .unwrap();
    assert_eq!(stats, Default::default());
    assert_eq!(env.cells()[0].count, 1.0);
}

#[tokio::test]
async fn test_landing_page_purge_keeps_completed_rows() {
    let env = TestEnv::new().await;
    env.write_log(
        EventKind::LandingPage,
        "landingpage-20230101000000.log",
        &[
            lp_line("2023-01-01T00:01:00Z", "B1", "100", "L1"),
            lp_line("2023-01-01T00:02:00Z", "B1", "101", "L1"),
        ],
    );
    env.consume_kind(EventKind::LandingPage).await.unwrap();

    crash_after_flush(
        &env,
        "landingpage-20230101120000.log",
        &[
            // Already seen in the completed file, so no unique row is written.
            lp_line("2023-01-01T12:01:00Z", "B1", "100", "L2"),
            lp_line("2023-01-01T12:02:00Z", "B1", "102", "L2"),
        ],
    )
    .await;
    assert_eq!(env.count("landing_page_impressions_raw"), 4);
    assert_eq!(env.count("donatewiki_unique"), 3);

    let stats = purge_incomplete(&env.pool, EventKind::LandingPage)
        .await
        .unwrap();
    assert_eq!(stats.raw_rows_deleted, 2);
    assert_eq!(stats.unique_rows_deleted, 1);
    assert_eq!(stats.files_deleted, 1);

    assert_eq!(env.count("landing_page_impressions_raw"), 2);
    assert_eq!(env.count("donatewiki_unique"), 2);
    let link: String = env
        .sqlite()
        .query_row(
            "SELECT link_id FROM donatewiki_unique WHERE contact_id = '100'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(link, "L1");
}

#[tokio::test]
async fn test_batch_flushes_once_past_max_batch() {
    let env = TestEnv::new().await;
    let parser = parser(&env);
    let time = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();

    let mut ctx = RunContext::open_for_run(&env.pool, EventKind::LandingPage)
        .await
        .unwrap();
    let handle = ctx
        .begin("landingpage-x.log", "/logs", &time, EventKind::LandingPage, None)
        .await
        .unwrap();
    let mut writer = BatchWriter::new(&handle, 3);

    let mut flushed = Vec::new();
    for i in 0..4 {
        let line = lp_line("2023-01-01T00:01:00Z", "B1", &i.to_string(), "L1");
        let event = parser.parse_landing_page(&line).valid().unwrap();
        flushed.push(writer.add_and_maybe_flush(&mut ctx, &event).await.unwrap());
    }
    assert_eq!(flushed, vec![false, false, false, true]);
    assert_eq!(writer.flushes(), 1);
    assert_eq!(writer.rows_written(), 4);
    assert_eq!(env.count("landing_page_impressions_raw"), 4);

    assert_eq!(writer.flush_remaining(&mut ctx).await.unwrap(), 0);
    assert_eq!(writer.flushes(), 1);
    assert_eq!(writer.rows_written(), 4);
}

#[tokio::test]
async fn test_consume_landing_page_in_batches() {
    let mut env = TestEnv::new().await;
    env.settings.lp_max_batch = 2;
    let lines: Vec<String> = (0..7)
        .map(|i| lp_line("2023-01-01T00:01:00Z", "B1", &format!("c{}", i), "L1"))
        .collect();
    env.write_log(EventKind::LandingPage, "landingpage-20230101000000.log", &lines);

    let stats = env.consume_kind(EventKind::LandingPage).await.unwrap();
    assert_eq!(stats.consumed_events, 7);
    assert_eq!(env.count("landing_page_impressions_raw"), 7);
    assert_eq!(env.count("donatewiki_unique"), 7);
}
