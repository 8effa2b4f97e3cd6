use super::entry::*;
use super::framework::Framework;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_generic_entry_synthesized_with_assets() {
    let tmp = TempDir::new().unwrap();

    assert!(synthesize_entry(tmp.path(), Framework::Unknown).unwrap());

    let html = fs::read_to_string(tmp.path().join("index.html")).unwrap();
    assert!(html.contains(r#"href="css/style.css""#));
    assert!(html.contains(r#"src="js/script.js""#));
    assert!(html.contains("<main></main>"));
    assert_eq!(fs::read(tmp.path().join("js/script.js")).unwrap(), b"");
    assert_eq!(fs::read(tmp.path().join("css/style.css")).unwrap(), b"");
}

#[test]
fn test_framework_templates_use_mount_points() {
    assert!(entry_document(Framework::React).contains(r#"<div id="root"></div>"#));
    assert!(entry_document(Framework::Vue).contains(r#"<div id="app"></div>"#));
    assert!(entry_document(Framework::Angular).contains("<app-root></app-root>"));
}

#[test]
fn test_existing_entry_left_alone() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("index.html"), "<p>mine</p>").unwrap();

    assert!(!synthesize_entry(tmp.path(), Framework::React).unwrap());
    assert_eq!(
        fs::read_to_string(tmp.path().join("index.html")).unwrap(),
        "<p>mine</p>"
    );
    assert!(!tmp.path().join("js/script.js").exists());
}

#[test]
fn test_existing_script_not_clobbered() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("js")).unwrap();
    fs::write(tmp.path().join("js/script.js"), "run();").unwrap();

    synthesize_entry(tmp.path(), Framework::Unknown).unwrap();
    assert_eq!(
        fs::read_to_string(tmp.path().join("js/script.js")).unwrap(),
        "run();"
    );
}
