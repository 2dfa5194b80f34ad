//! Integration test: resolve → select → download → assemble → cleanup, for a
//! single item and for playlists, against a local range server with in-process
//! resolver and encoder fakes.

mod common;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use avfetch_core::assemble::CleanupPolicy;
use avfetch_core::job::{self, JobContext};
use avfetch_core::model::{JobItem, StreamDescriptor};
use avfetch_core::naming::TEMP_ROOT;
use avfetch_core::pool;
use avfetch_core::resolver::ResolvedSource;
use avfetch_core::retry::RetryPolicy;
use avfetch_core::select::Mode;
use common::fakes::{audio_stream, payload, video_stream, ConcatEncoder, MapResolver};
use common::range_server::{self, RangeServer};
use tempfile::tempdir;

const VIDEO_LEN: usize = 48 * 1024;
const AUDIO_LEN: usize = 16 * 1024;

fn serve() -> (RangeServer, Vec<u8>, Vec<u8>) {
    let video = payload(10, VIDEO_LEN);
    let audio = payload(20, AUDIO_LEN);
    let server = range_server::start(vec![
        ("22.mp4", video.clone()),
        ("140.m4a", audio.clone()),
        ("18.mp4", payload(30, 1024)),
    ]);
    (server, video, audio)
}

/// 720p video "22", audio "140", and a lower combined stream that must lose.
fn catalogue(server: &RangeServer) -> Vec<StreamDescriptor> {
    let mut combined = video_stream("18", server.url("18.mp4"));
    combined.media_kind = avfetch_core::model::MediaKind::VideoAudio;
    vec![
        combined,
        video_stream("22", server.url("22.mp4")),
        audio_stream("140", server.url("140.m4a")),
    ]
}

fn single(id: &str, title: &str, catalogue: Vec<StreamDescriptor>) -> ResolvedSource {
    ResolvedSource {
        id: id.into(),
        title: title.into(),
        catalogue,
        entries: None,
    }
}

fn context(dir: &Path, resolver: MapResolver, encoder: Arc<ConcatEncoder>) -> JobContext {
    let mut ctx = JobContext::new(dir, Arc::new(resolver), encoder);
    ctx.transfer_retry = RetryPolicy::immediate(2);
    ctx.resolve_retry = RetryPolicy::immediate(1);
    ctx.cleanup = CleanupPolicy {
        max_attempts: 2,
        delay: Duration::from_millis(1),
    };
    ctx
}

fn concat(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut v = a.to_vec();
    v.extend_from_slice(b);
    v
}

#[tokio::test]
async fn single_item_end_to_end() {
    let (server, video, audio) = serve();
    let dir = tempdir().unwrap();
    let url = "https://example.com/watch?v=abc";
    let mut resolver = MapResolver::default();
    resolver.insert(url, single("abc", "My Clip", catalogue(&server)));
    let encoder = Arc::new(ConcatEncoder::default());
    let (tx, mut rx) = tokio::sync::mpsc::channel(256);
    let ctx = context(dir.path(), resolver, Arc::clone(&encoder)).with_progress(tx);

    let outcome = job::run_item(&ctx, JobItem::new("abc", "", url)).await;

    assert!(outcome.succeeded, "{:?}", outcome.failure_reason);
    let out = dir.path().join("My Clip.mp4");
    assert_eq!(outcome.output_path.as_deref(), Some(out.as_path()));
    assert_eq!(std::fs::read(&out).unwrap(), concat(&video, &audio));

    let inputs = encoder.inputs.lock().unwrap().clone();
    assert_eq!(inputs.len(), 1);
    let (v, a) = &inputs[0];
    assert!(v.as_ref().unwrap().ends_with("video.mp4.part"));
    assert!(a.ends_with("audio.m4a.part"));
    assert!(!v.as_ref().unwrap().exists());
    assert!(!a.exists());
    // The item's own directory is gone; the shared root waits for the sweep.
    let root = dir.path().join(TEMP_ROOT);
    assert_eq!(std::fs::read_dir(&root).unwrap().count(), 0);
    ctx.sweep_temp_root();
    assert!(!root.exists());

    // Only the selected streams were fetched.
    assert_eq!(server.get_count(), 2);

    drop(ctx);
    let mut last = None;
    while let Some(p) = rx.recv().await {
        last = Some(p);
    }
    let last = last.expect("progress reported");
    assert_eq!(last.bytes_downloaded, AUDIO_LEN as u64);
    assert_eq!(&*last.label, "My Clip [audio]");
}

#[tokio::test]
async fn audio_only_transcodes_just_the_audio() {
    let (server, _video, audio) = serve();
    let dir = tempdir().unwrap();
    let encoder = Arc::new(ConcatEncoder::default());
    let mut ctx = context(dir.path(), MapResolver::default(), Arc::clone(&encoder));
    ctx.select.mode = Mode::AudioOnly;
    ctx.output_ext = "mp3".into();

    let outcome = job::run_resolved(&ctx, JobItem::new("abc", "Clip", "u"), catalogue(&server)).await;

    assert!(outcome.succeeded, "{:?}", outcome.failure_reason);
    assert_eq!(std::fs::read(dir.path().join("Clip.mp3")).unwrap(), audio);
    assert_eq!(server.get_count(), 1);
    assert!(encoder.inputs.lock().unwrap()[0].0.is_none());
}

#[tokio::test]
async fn failed_audio_removes_finished_video_only() {
    let (server, _video, _audio) = serve();
    let dir = tempdir().unwrap();
    let ctx = context(dir.path(), MapResolver::default(), Arc::new(ConcatEncoder::default()));
    let cat = vec![
        video_stream("22", server.url("22.mp4")),
        audio_stream("140", server.url("missing.m4a")),
    ];

    let outcome = job::run_resolved(&ctx, JobItem::new("abc", "Clip", "u"), cat).await;

    assert!(!outcome.succeeded);
    assert_eq!(
        outcome.failure_reason.as_deref(),
        Some("audio download failed: HTTP 404")
    );
    let temp = dir.path().join(TEMP_ROOT).join("abc");
    assert!(!temp.join("video.mp4.part").exists());
    assert!(!dir.path().join("Clip.mp4").exists());
}

#[tokio::test]
async fn failed_assembly_keeps_temp_files() {
    let (server, video, audio) = serve();
    let dir = tempdir().unwrap();
    let ctx = context(dir.path(), MapResolver::default(), Arc::new(ConcatEncoder::failing_on("Clip")));

    let outcome = job::run_resolved(&ctx, JobItem::new("abc", "Clip", "u"), catalogue(&server)).await;

    let reason = outcome.failure_reason.unwrap();
    assert!(reason.starts_with("assembly failed"), "{reason}");
    let temp = dir.path().join(TEMP_ROOT).join("abc");
    assert_eq!(std::fs::read(temp.join("video.mp4.part")).unwrap(), video);
    assert_eq!(std::fs::read(temp.join("audio.m4a.part")).unwrap(), audio);
    assert!(!dir.path().join("Clip.mp4").exists());
}

fn playlist_resolver(server: &RangeServer, n: usize) -> (MapResolver, Vec<JobItem>) {
    let mut resolver = MapResolver::default();
    let mut items = Vec::new();
    for i in 1..=n {
        let url = format!("https://example.com/watch?v=v{i}");
        resolver.insert(&url, single(&format!("v{i}"), &format!("Song {i}"), catalogue(server)));
        items.push(JobItem::new(format!("v{i}"), format!("Song {i}"), url).with_ordinal(i as u32));
    }
    (resolver, items)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn playlist_of_five_with_one_assembly_failure() {
    let (server, video, audio) = serve();
    let dir = tempdir().unwrap();
    let (resolver, items) = playlist_resolver(&server, 5);
    let ctx = context(dir.path(), resolver, Arc::new(ConcatEncoder::failing_on("Song 3")))
        .with_playlist_title("Mix");

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let report = pool::run_playlist(Arc::new(ctx), items, 2, Some(tx)).await;

    assert_eq!(report.total, 5);
    assert_eq!(report.success_count(), 4);
    assert_eq!(report.failure_count(), 1);
    assert_eq!(report.summary(), "4/5 succeeded");
    assert!(!report.cancelled);

    let ids: HashSet<_> = report.outcomes.iter().map(|o| o.item.id.as_str()).collect();
    assert_eq!(ids.len(), 5);

    let failed: Vec<_> = report.failures().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].item.ordinal, Some(3));

    for i in [1, 2, 4, 5] {
        let out = dir.path().join("Mix").join(format!("{:02} - Song {}.mp4", i, i));
        assert_eq!(std::fs::read(&out).unwrap(), concat(&video, &audio), "item {i}");
    }
    assert!(!dir.path().join("Mix").join("03 - Song 3.mp4").exists());
    assert!(dir.path().join(TEMP_ROOT).join("0003-v3").join("audio.m4a.part").exists());

    let mut streamed = Vec::new();
    while let Ok(o) = rx.try_recv() {
        streamed.push(o.item.id);
    }
    streamed.sort();
    assert_eq!(streamed, ["v1", "v2", "v3", "v4", "v5"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn duplicate_entries_never_share_temp_paths() {
    let (server, _video, _audio) = serve();
    let dir = tempdir().unwrap();
    let url = "https://example.com/watch?v=same";
    let mut resolver = MapResolver::default();
    resolver.insert(url, single("same", "Same", catalogue(&server)));
    let items: Vec<_> = (0..4).map(|_| JobItem::new("same", "Same", url)).collect();
    let encoder = Arc::new(ConcatEncoder::default());
    let ctx = context(dir.path(), resolver, Arc::clone(&encoder)).with_playlist_title("Dupes");

    let report = pool::run_playlist(Arc::new(ctx), items, 4, None).await;
    assert_eq!(report.success_count(), 4);

    let inputs = encoder.inputs.lock().unwrap().clone();
    let mut paths: Vec<PathBuf> = Vec::new();
    for (v, a) in inputs {
        paths.push(v.unwrap());
        paths.push(a);
    }
    let unique: HashSet<_> = paths.iter().collect();
    assert_eq!(unique.len(), paths.len());
    assert_eq!(paths.len(), 8);

    let outputs: HashSet<_> = report
        .outcomes
        .iter()
        .map(|o| o.output_path.clone().unwrap())
        .collect();
    assert_eq!(outputs.len(), 4);
    assert!(!dir.path().join(TEMP_ROOT).exists());
}
