use std::io::IsTerminal;

/// Environment variables set by common CI systems.
const CI_VARS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "TRAVIS",
    "JENKINS_URL",
    "BUILDKITE",
    "TEAMCITY_VERSION",
    "TF_BUILD",
];

/// Whether the CLI may prompt and draw animated output.
#[derive(Debug, Clone)]
pub struct UiContext {
    interactive: bool,
    auto_yes: bool,
}

impl UiContext {
    pub fn detect() -> Self {
        Self {
            interactive: detect_interactive(),
            auto_yes: false,
        }
    }

    pub fn non_interactive() -> Self {
        Self {
            interactive: false,
            auto_yes: false,
        }
    }

    /// `--yes`: approve every prompt without asking.
    pub fn with_auto_yes(mut self, yes: bool) -> Self {
        self.auto_yes = yes;
        self
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn auto_yes(&self) -> bool {
        self.auto_yes
    }

    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }
}

/// Progress and prompts go to stderr, answers come from stdin; both must be
/// terminals and no CI marker may be set.
fn detect_interactive() -> bool {
    if !std::io::stderr().is_terminal() || !std::io::stdin().is_terminal() {
        return false;
    }
    !CI_VARS.iter().any(|var| std::env::var_os(var).is_some())
}
