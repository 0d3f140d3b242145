// SPDX-FileCopyrightText: 2026 buildwatch contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

use buildwatch::classify::{Classification, classify};
use buildwatch::model::{BASELINE_ID, NewBuild, Verdict, fetch_history_page};
use buildwatch::report::{NewTestResult, parse_report};
use buildwatch::store::{BuildDatabase, BuildDatabaseDispatch, create_test_db};
use time::macros::datetime;

fn classified_build(transcript: &str, revision: i64) -> NewBuild {
    match classify(transcript) {
        Classification::Outcome(classified) => {
            NewBuild::from_classification(revision, datetime!(2026-08-20 9:30), classified)
        }
        Classification::UpToDate => panic!("unexpected up-to-date transcript"),
    }
}

async fn ingest(
    db: &BuildDatabaseDispatch,
    transcript: &str,
    revision: i64,
    report_xml: Option<&str>,
) -> i64 {
    let build = classified_build(transcript, revision);
    let test_result = report_xml.map(|xml| NewTestResult::from_report(&parse_report(xml).unwrap()));
    db.insert_build(&build, test_result.as_ref()).await.unwrap()
}

/// The full ingestion scenario: failing transcript, attached failing test report, lineage
/// resolving past the failure to the prior good build.
#[tokio::test]
async fn failed_build_links_to_prior_good_build() {
    let db = create_test_db();
    db.insert_baseline().await.unwrap();

    let good_id = ingest(
        &db,
        "compiling...\nlinking...\ntest output written to ./test\n",
        1500,
        Some(r#"<TestResult name="main" result="PASS" assertions_passed="12"/>"#),
    )
    .await;

    let failed_id = ingest(
        &db,
        "compiling...\nfoo.cpp: error: missing semicolon\n",
        1501,
        Some(
            r#"<TestResult name="main" result="FAIL" assertions_passed="10" assertions_failed="2"/>"#,
        ),
    )
    .await;

    let failed = db.fetch_build(failed_id).await.unwrap().unwrap();
    assert_eq!(failed.verdict, Verdict::Error);
    assert_eq!(failed.diagnostics, "foo.cpp: error: missing semicolon");

    let tr = db.fetch_test_result(failed_id).await.unwrap().unwrap();
    assert_eq!(tr.result, "FAIL");
    assert_eq!(tr.assertions_passed, 10);
    assert_eq!(tr.assertions_failed, 2);

    // The broken build anchors to the good build before it, not to itself.
    assert_eq!(failed.last_working_id(&db).await.unwrap(), good_id);

    let good = db.fetch_build(good_id).await.unwrap().unwrap();
    assert_eq!(good.last_working_id(&db).await.unwrap(), good_id);
    assert_eq!(good.binary_name, Some(String::from("test")));
}

#[tokio::test]
async fn lineage_falls_back_to_baseline() {
    let db = create_test_db();
    db.insert_baseline().await.unwrap();

    let b1 = ingest(&db, "a.cpp: error: one\n", 10, None).await;
    let b2 = ingest(&db, "a.cpp: error: two\n", 11, None).await;
    let b3 = ingest(&db, "all good\n", 12, None).await;

    let build2 = db.fetch_build(b2).await.unwrap().unwrap();
    assert_eq!(build2.previous_good(&db).await.unwrap(), BASELINE_ID);

    let build3 = db.fetch_build(b3).await.unwrap().unwrap();
    assert_eq!(build3.verdict, Verdict::Good);
    assert_eq!(build3.last_working_id(&db).await.unwrap(), b3);
    assert_eq!(build3.previous_good(&db).await.unwrap(), BASELINE_ID);
    let _ = b1;
}

#[tokio::test]
async fn history_pages_are_newest_first() {
    let db = create_test_db();

    let mut ids = vec![];
    for revision in 0..40 {
        ids.push(ingest(&db, "fine\n", revision, None).await);
    }

    let page = fetch_history_page(&db, 1, 18).await.unwrap();
    assert_eq!(page.summaries.len(), 18);
    assert_eq!(page.total_pages, 3);
    let expected: Vec<i64> = ids.iter().rev().take(18).copied().collect();
    let actual: Vec<i64> = page.summaries.iter().map(|s| s.id).collect();
    assert_eq!(actual, expected);

    // Pages past the end of the data are empty, not errors.
    let page = fetch_history_page(&db, 9, 18).await.unwrap();
    assert!(page.summaries.is_empty());
    assert_eq!(page.total_pages, 3);
}

// A page size of zero is expressible in configuration; it must yield an empty history rather
// than a divide-by-zero.
#[tokio::test]
async fn zero_page_size_yields_empty_history() {
    let db = create_test_db();
    ingest(&db, "fine\n", 1, None).await;

    let page = fetch_history_page(&db, 1, 0).await.unwrap();
    assert!(page.summaries.is_empty());
    assert_eq!(page.total_pages, 0);
}

#[tokio::test]
async fn history_carries_test_counters_when_present() {
    let db = create_test_db();

    ingest(
        &db,
        "fine\n",
        77,
        Some(r#"<TestResult name="main" result="PASS" assertions_passed="31"/>"#),
    )
    .await;
    ingest(&db, "fine\n", 78, None).await;

    let page = fetch_history_page(&db, 1, 18).await.unwrap();
    assert_eq!(page.summaries.len(), 2);
    // Newest first: revision 78 has no test result, revision 77 has one.
    assert!(page.summaries[0].test.is_none());
    let tr = page.summaries[1].test.as_ref().unwrap();
    assert_eq!(tr.assertions_passed, 31);
    assert_eq!(page.summaries[1].style, "passed");
}

#[tokio::test]
async fn up_to_date_transcript_is_not_persisted() {
    let db = create_test_db();

    assert_eq!(
        classify("scons: `test' is up to date.\n"),
        Classification::UpToDate
    );
    // The caller is responsible for not inserting anything on the skip signal.
    assert_eq!(db.build_count().await.unwrap(), 0);
}
