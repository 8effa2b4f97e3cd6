use super::context::UiContext;
use assetlift::services::pipeline::{ProgressEvent, ProgressSink, Stage};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::OnceLock;
use std::time::Duration;

/// Renders pipeline events: an indicatif bar on a terminal, plain lines
/// otherwise. The bar is created on the first stage event so it never
/// draws over the pre-flight prompt.
pub struct RunProgress {
    fancy: bool,
    bar: OnceLock<ProgressBar>,
}

impl RunProgress {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            fancy: ctx.use_fancy_output(),
            bar: OnceLock::new(),
        }
    }

    fn bar(&self) -> &ProgressBar {
        self.bar.get_or_init(|| {
            let bar = ProgressBar::new(100);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("  {spinner:.cyan} {prefix:<12} {bar:24.cyan/dim} {pos:>3}% {msg:.dim}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                    .progress_chars("━╸─"),
            );
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        })
    }

    pub fn on_event(&self, event: &ProgressEvent) {
        match event.stage {
            Stage::Warning => {
                self.notice(format!("{} {}", style("warning:").yellow(), event.message))
            }
            Stage::Info => self.notice(event.message.clone()),
            // main prints the error itself
            Stage::Error => self.finish(),
            Stage::Completed => {
                self.finish();
                eprintln!("{} {}", style("[OK]").green(), event.message);
            }
            stage if self.fancy => {
                let bar = self.bar();
                bar.set_prefix(stage_label(stage));
                bar.set_position(u64::from(event.percent));
                bar.set_message(event.message.clone());
            }
            stage => eprintln!(
                "[{:>3}%] {:<12} {}",
                event.percent,
                stage_label(stage),
                event.message
            ),
        }
    }

    /// Print a line without breaking the bar.
    pub fn notice(&self, line: impl Into<String>) {
        let line = line.into();
        match self.bar.get() {
            Some(bar) if !bar.is_finished() => bar.println(line),
            _ => eprintln!("{line}"),
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = self.bar.get() {
            if !bar.is_finished() {
                bar.disable_steady_tick();
                bar.finish_and_clear();
            }
        }
    }
}

impl ProgressSink for RunProgress {
    fn emit(&self, event: ProgressEvent) {
        self.on_event(&event);
    }
}

pub fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Unpacking => "Unpacking",
        Stage::Scanning => "Scanning",
        Stage::Reorganizing => "Reorganizing",
        Stage::Packing => "Packing",
        Stage::Validating => "Validating",
        Stage::Completed => "Done",
        Stage::Error => "Failed",
        Stage::Warning => "Warning",
        Stage::Info => "Info",
    }
}

#[cfg(test)]
#[path = "tests/progress_tests.rs"]
mod tests;
