use super::framework::Framework;
use super::organizer::{CSS_DIR, JS_DIR};
use std::fs;
use std::io;
use std::path::Path;

pub const ENTRY_FILE: &str = "index.html";
pub const ENTRY_SCRIPT: &str = "script.js";
pub const ENTRY_STYLE: &str = "style.css";

fn mount_element(framework: Framework) -> &'static str {
    match framework {
        Framework::React => r#"<div id="root"></div>"#,
        Framework::Vue => r#"<div id="app"></div>"#,
        Framework::Angular => "<app-root></app-root>",
        Framework::Unknown => "<main></main>",
    }
}

pub fn entry_document(framework: Framework) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>App</title>
  <link rel="stylesheet" href="{CSS_DIR}/{ENTRY_STYLE}">
</head>
<body>
  {mount}
  <script src="{JS_DIR}/{ENTRY_SCRIPT}"></script>
</body>
</html>
"#,
        mount = mount_element(framework),
    )
}

/// Write `index.html` for `framework` unless the tree already has one.
/// The referenced script and stylesheet are created empty when missing.
/// Returns whether an entry document was written.
pub fn synthesize_entry(dest_root: &Path, framework: Framework) -> io::Result<bool> {
    let entry = dest_root.join(ENTRY_FILE);
    if entry.is_file() {
        return Ok(false);
    }

    for (dir, name) in [(JS_DIR, ENTRY_SCRIPT), (CSS_DIR, ENTRY_STYLE)] {
        let path = dest_root.join(dir).join(name);
        if !path.exists() {
            fs::create_dir_all(dest_root.join(dir))?;
            fs::write(&path, "")?;
        }
    }

    fs::write(&entry, entry_document(framework))?;
    log::info!(
        "Synthesized {} entry at {}",
        framework.name(),
        entry.display()
    );
    Ok(true)
}
