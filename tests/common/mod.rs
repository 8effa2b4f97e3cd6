#![allow(dead_code)]

use assetlift::services::archive::Platform;
use assetlift::services::cache::TransformCache;
use assetlift::services::config::PipelineSettings;
use assetlift::services::pipeline::{ProgressEvent, ProgressReporter};
use assetlift::services::resources::{FixedProbe, ResourceGovernor};
use assetlift::Pipeline;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};
use tempfile::TempDir;

static INIT: Once = Once::new();

const GIB: u64 = 1024 * 1024 * 1024;

pub struct TestContext {
    pub tmp: TempDir,
    pub events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl TestContext {
    pub fn new() -> Self {
        INIT.call_once(|| {
            let _ = env_logger::builder().is_test(true).try_init();
        });
        Self {
            tmp: TempDir::new().expect("temp dir"),
            events: Arc::default(),
        }
    }

    pub fn path(&self) -> &Path {
        self.tmp.path()
    }

    pub fn scratch_root(&self) -> PathBuf {
        self.tmp.path().join("scratch")
    }

    pub fn settings(&self) -> PipelineSettings {
        PipelineSettings {
            scratch_root: Some(self.scratch_root()),
            ..PipelineSettings::default()
        }
    }

    /// Pipeline with plenty of simulated memory and an isolated cache.
    pub fn pipeline(&self, settings: PipelineSettings) -> Pipeline {
        let governor = ResourceGovernor::new(
            settings.thresholds,
            Box::new(FixedProbe::with_memory(16 * GIB, 12 * GIB)),
        );
        Pipeline::new(settings)
            .expect("valid settings")
            .with_governor(Arc::new(governor))
            .with_cache(Arc::new(TransformCache::new(100)))
            .with_platform(Platform::Posix)
    }

    pub fn reporter(&self) -> ProgressReporter {
        let sink = Arc::clone(&self.events);
        ProgressReporter::new(Arc::new(move |e: ProgressEvent| {
            sink.lock().expect("event lock").push(e)
        }))
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().expect("event lock").clone()
    }

    pub fn scratch_entries(&self) -> usize {
        fs::read_dir(self.scratch_root())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    pub fn zip(&self, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
        let path = self.tmp.path().join(name);
        let file = fs::File::create(&path).expect("create zip");
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for (entry, content) in files {
            writer.start_file(entry.to_string(), options).expect("start entry");
            writer.write_all(content).expect("write entry");
        }
        writer.finish().expect("finish zip");
        path
    }
}
