use super::*;
use crate::services::pipeline::progress::{CancelFlag, ProgressEvent, ProgressReporter};
use crate::test_utils::{init_test_logging, write_tree};
use std::sync::Mutex;
use tempfile::TempDir;

struct Fixture {
    _tmp: TempDir,
    source: PathBuf,
    dest: PathBuf,
}

fn fixture(files: &[(&str, &[u8])]) -> (Fixture, ClassifiedFileSet) {
    init_test_logging();
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("unpacked");
    let dest = tmp.path().join("organized");
    write_tree(&source, files);

    let mut set = ClassifiedFileSet::new();
    for (rel, _) in files {
        let path = source.join(rel);
        set.push(crate::services::scanner::classify(&path), path);
    }
    (
        Fixture {
            _tmp: tmp,
            source,
            dest,
        },
        set,
    )
}

fn reorganizer(cache: &Arc<TransformCache>) -> Reorganizer {
    Reorganizer::new(Arc::clone(cache), 2, 5, 20).unwrap()
}

#[test]
fn test_files_land_in_canonical_dirs() {
    let (fx, set) = fixture(&[
        ("index.html", b"<html></html>"),
        ("src/app.js", b"go();"),
        ("style/site.css", b"a { color: red; }"),
        ("img/logo.png", b"\x89PNG\r\n\x1a\n"),
        ("fonts/f.woff2", b"wOF2"),
        ("manifest.json", b"{}"),
        ("notes.txt", b"skip me"),
    ]);
    let cache = Arc::new(TransformCache::new(100));

    let outcome = reorganizer(&cache)
        .reorganize(&fx.source, &fx.dest, &set, &StageContext::detached())
        .unwrap();

    assert_eq!(outcome.file_count, 6);
    assert_eq!(outcome.framework, Framework::Unknown);
    assert!(!outcome.synthesized_entry);
    for rel in [
        "index.html",
        "js/app.js",
        "css/site.css",
        "assets/images/logo.png",
        "assets/fonts/f.woff2",
        "manifest.json",
    ] {
        assert!(fx.dest.join(rel).is_file(), "missing {rel}");
    }
    assert!(!fx.dest.join("notes.txt").exists());
}

#[test]
fn test_binary_assets_copied_byte_for_byte() {
    let png: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\r\n";
    let (fx, set) = fixture(&[("a/pic.png", png)]);
    let cache = Arc::new(TransformCache::new(100));

    reorganizer(&cache)
        .reorganize(&fx.source, &fx.dest, &set, &StageContext::detached())
        .unwrap();

    assert_eq!(fs::read(fx.dest.join("assets/images/pic.png")).unwrap(), png);
}

#[test]
fn test_code_is_transformed_through_cache() {
    let minified = "a{color:red}".repeat(30);
    let (fx, set) = fixture(&[("min.css", minified.as_bytes())]);
    let cache = Arc::new(TransformCache::new(100));
    let reorganizer = Reorganizer::new(Arc::clone(&cache), 1, 5, 20).unwrap();

    reorganizer
        .reorganize(&fx.source, &fx.dest, &set, &StageContext::detached())
        .unwrap();

    let out = fs::read_to_string(fx.dest.join("css/min.css")).unwrap();
    assert!(out.starts_with("a {\n  color:red\n}\n"));
}

#[test]
fn test_name_collisions_prefer_shallow_paths() {
    let (fx, set) = fixture(&[
        ("deep/nested/index.html", b"<p>deep</p>"),
        ("index.html", b"<p>top</p>"),
        ("a/util.js", b"1"),
        ("b/util.js", b"2"),
    ]);
    let cache = Arc::new(TransformCache::new(100));

    let outcome = reorganizer(&cache)
        .reorganize(&fx.source, &fx.dest, &set, &StageContext::detached())
        .unwrap();

    assert_eq!(outcome.file_count, 4);
    assert_eq!(
        fs::read_to_string(fx.dest.join("index.html")).unwrap(),
        "<p>top</p>"
    );
    assert_eq!(
        fs::read_to_string(fx.dest.join("index-1.html")).unwrap(),
        "<p>deep</p>"
    );
    assert_eq!(fs::read_to_string(fx.dest.join("js/util.js")).unwrap(), "1");
    assert_eq!(fs::read_to_string(fx.dest.join("js/util-1.js")).unwrap(), "2");
}

#[test]
fn test_no_recognized_files_synthesizes_generic_entry() {
    let (fx, set) = fixture(&[("readme.txt", b"hello")]);
    let cache = Arc::new(TransformCache::new(100));

    let outcome = reorganizer(&cache)
        .reorganize(&fx.source, &fx.dest, &set, &StageContext::detached())
        .unwrap();

    assert_eq!(outcome.file_count, 0);
    assert_eq!(outcome.framework, Framework::Unknown);
    assert!(outcome.synthesized_entry);
    assert!(fx.dest.join("index.html").is_file());
}

#[test]
fn test_framework_drives_template() {
    let (fx, set) = fixture(&[
        ("package.json", br#"{"dependencies":{"react":"18"}}"#),
        ("main.js", b"render();"),
    ]);
    let cache = Arc::new(TransformCache::new(100));

    let outcome = reorganizer(&cache)
        .reorganize(&fx.source, &fx.dest, &set, &StageContext::detached())
        .unwrap();

    assert_eq!(outcome.framework, Framework::React);
    let html = fs::read_to_string(fx.dest.join("index.html")).unwrap();
    assert!(html.contains(r#"<div id="root"></div>"#));
}

#[test]
fn test_unreadable_source_is_skipped() {
    let (fx, mut set) = fixture(&[("ok.js", b"1")]);
    set.push(FileCategory::Js, fx.source.join("vanished.js"));
    let cache = Arc::new(TransformCache::new(100));

    let outcome = reorganizer(&cache)
        .reorganize(&fx.source, &fx.dest, &set, &StageContext::detached())
        .unwrap();

    assert_eq!(outcome.file_count, 1);
    assert!(fx.dest.join("js/ok.js").is_file());
}

#[test]
fn test_each_category_evicts_a_tenth() {
    let (fx, set) = fixture(&[("a.png", b"1"), ("b.png", b"2")]);
    let cache = Arc::new(TransformCache::new(100));
    for i in 0..10 {
        cache.put(PathBuf::from(format!("/k{i}")), "v");
    }

    reorganizer(&cache)
        .reorganize(&fx.source, &fx.dest, &set, &StageContext::detached())
        .unwrap();

    // Images only: one category, ceil(10 * 10%) = 1
    assert_eq!(cache.stats().entries, 9);
}

#[test]
fn test_progress_within_stage_range() {
    let files: Vec<(String, Vec<u8>)> = (0..12)
        .map(|i| (format!("f{i}.js"), b"x();".to_vec()))
        .collect();
    let refs: Vec<(&str, &[u8])> = files
        .iter()
        .map(|(n, c)| (n.as_str(), c.as_slice()))
        .collect();
    let (fx, set) = fixture(&refs);
    let cache = Arc::new(TransformCache::new(100));
    let events: Arc<Mutex<Vec<ProgressEvent>>> = Arc::default();
    let sink = Arc::clone(&events);
    let ctx = StageContext::new(
        ProgressReporter::new(Arc::new(move |e: ProgressEvent| {
            sink.lock().unwrap().push(e)
        })),
        CancelFlag::new(),
    );

    reorganizer(&cache)
        .reorganize(&fx.source, &fx.dest, &set, &ctx)
        .unwrap();

    let percents: Vec<u8> = events.lock().unwrap().iter().map(|e| e.percent).collect();
    // start, three code batches of 5/5/2, end
    assert_eq!(percents, vec![60, 70, 80, 85, 85]);
}

#[test]
fn test_cancel_stops_after_batch() {
    let (fx, set) = fixture(&[("a.js", b"1"), ("b.js", b"2")]);
    let cache = Arc::new(TransformCache::new(100));
    let cancel = CancelFlag::new();
    cancel.cancel();
    let ctx = StageContext::new(ProgressReporter::silent(), cancel);

    let err = reorganizer(&cache)
        .reorganize(&fx.source, &fx.dest, &set, &ctx)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Aborted(_)));
}

#[test]
fn test_dest_inside_source_rejected() {
    let (fx, set) = fixture(&[("a.js", b"1")]);
    let cache = Arc::new(TransformCache::new(100));

    let err = reorganizer(&cache)
        .reorganize(&fx.source, &fx.source.join("out"), &set, &StageContext::detached())
        .unwrap_err();
    assert_eq!(err.category(), crate::types::ErrorCategory::ReorganizeFailure);
}
