//! Store, traversal, and rendering working together on an on-disk database.

use std::num::NonZeroUsize;
use std::sync::Arc;

use serde_json::json;

use lineage_core::{
    CommitIterator, CommitRenderer, HistoryNode, HistorySource, LogError, LogPipeline, log_dataset,
};
use lineage_types::{Hash, RenderOptions, TimeZoneSetting};

use crate::common::{Fixture, SharedBuffer, dataset_name, meta};

fn pipeline(k: usize) -> LogPipeline {
    LogPipeline::new(
        Arc::new(CommitRenderer::with_now(1_700_000_000 + 86_400)),
        NonZeroUsize::new(k).unwrap(),
    )
}

fn collect(source: &mut impl HistorySource) -> Vec<HistoryNode> {
    let mut nodes = Vec::new();
    while let Some(node) = source.next_node().unwrap() {
        nodes.push(node);
    }
    nodes
}

#[test]
fn branching_history_is_visited_once_in_height_order() {
    let fixture = Fixture::new();
    let mut db = fixture.open();
    let main = dataset_name("main");
    let topic = dataset_name("topic");

    let base = db.commit_value(&main, json!(0), meta("base")).unwrap();
    let t1 = db
        .merge_commit(&topic, json!("t1"), meta("topic 1"), &[base])
        .unwrap();
    let t2 = db.commit_value(&topic, json!("t2"), meta("topic 2")).unwrap();
    let m1 = db.commit_value(&main, json!(1), meta("main 1")).unwrap();
    let merge = db
        .merge_commit(&main, json!(2), meta("merge topic"), &[t2])
        .unwrap();

    let mut iter = CommitIterator::new(&db, merge).unwrap();
    let nodes = collect(&mut iter);
    let hashes: Vec<Hash> = nodes.iter().map(HistoryNode::hash).collect();

    assert_eq!(hashes.len(), 5);
    assert_eq!(hashes[0], merge);
    assert_eq!(hashes[1], t2, "t2 (height 3) outranks main 1 (height 2)");
    assert!(hashes[2..4].contains(&m1));
    assert!(hashes[2..4].contains(&t1));
    assert_eq!(hashes[4], base);

    let heights: Vec<u64> = nodes.iter().map(|n| n.commit().height()).collect();
    assert!(heights.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn log_renders_merge_graph() {
    let fixture = Fixture::new();
    let mut db = fixture.open();
    let main = dataset_name("main");
    let side = dataset_name("side");

    let base = db.commit_value(&main, json!(0), meta("base")).unwrap();
    let side_tip = db
        .merge_commit(&side, json!("s"), meta("side work"), &[base])
        .unwrap();
    db.commit_value(&main, json!(1), meta("main work")).unwrap();
    let merge = db
        .merge_commit(&main, json!(2), meta("merge side"), &[side_tip])
        .unwrap();

    let out = SharedBuffer::default();
    log_dataset(&db, &main, &pipeline(3), RenderOptions::default(), out.clone())
        .await
        .unwrap();

    let text = out.text();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], format!("* {} (merge) merge side", merge.short()));
    // Two lanes are open while the branches are walked.
    assert!(lines[1].starts_with("* | ") || lines[1].starts_with("| * "), "{text}");
    assert!(lines[2].starts_with("* | ") || lines[2].starts_with("| * "), "{text}");
    assert_eq!(lines[3], format!("* {} base", base.short()));
}

#[tokio::test]
async fn verbose_log_shows_dates_and_values() {
    let fixture = Fixture::new();
    let hash = fixture.commit("people", json!({"name": "ada"}), "add ada");
    let db = fixture.open();

    let options = RenderOptions {
        time_zone: TimeZoneSetting::Utc,
        ..RenderOptions::default().verbose()
    };
    let out = SharedBuffer::default();
    log_dataset(&db, &dataset_name("people"), &pipeline(2), options, out.clone())
        .await
        .unwrap();

    let text = out.text();
    assert_eq!(
        text,
        format!(
            "commit {hash}\nDate:   2023-11-14 22:13:20 +0000 (1 day ago)\n\n    add ada\n\n    {{\n      \"name\": \"ada\"\n    }}\n\n"
        )
    );
}

#[tokio::test]
async fn rebase_exposes_commits_from_other_handles() {
    let fixture = Fixture::new();
    fixture.commit("feed", json!(1), "first");

    let mut reader = fixture.open();
    fixture.commit("feed", json!(2), "second");

    let feed = dataset_name("feed");
    let out = SharedBuffer::default();
    log_dataset(&reader, &feed, &pipeline(2), RenderOptions::default(), out.clone())
        .await
        .unwrap();
    assert_eq!(out.text().lines().count(), 1);

    reader.rebase().unwrap();
    let out = SharedBuffer::default();
    log_dataset(&reader, &feed, &pipeline(2), RenderOptions::default(), out.clone())
        .await
        .unwrap();
    let text = out.text();
    assert_eq!(text.lines().count(), 2);
    assert!(text.lines().next().unwrap().ends_with("second"));
}

#[tokio::test]
async fn missing_dataset_is_a_source_error_before_output() {
    let fixture = Fixture::new();
    fixture.commit("present", json!(1), "x");
    let db = fixture.open();

    let out = SharedBuffer::default();
    let err = log_dataset(&db, &dataset_name("absent"), &pipeline(1), RenderOptions::default(), out.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, LogError::NoHead(_)));
    assert!(out.is_empty());
}
