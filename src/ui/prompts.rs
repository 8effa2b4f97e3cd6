use super::context::UiContext;
use anyhow::Context;
use console::style;

/// Yes/no prompt. `--yes` approves, a non-interactive session gets
/// `default` without asking.
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> anyhow::Result<bool> {
    if ctx.auto_yes() {
        eprintln!("  {message} {}", style("(auto-approved)").dim());
        return Ok(true);
    }
    if !ctx.is_interactive() {
        log::info!("Not a terminal; answering {default} to: {message}");
        return Ok(default);
    }

    let message = message.to_string();
    let answer = tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message).initial_value(default).interact()
    })
    .await
    .context("confirmation prompt task failed")?
    .context("reading confirmation")?;
    Ok(answer)
}

#[cfg(test)]
#[path = "tests/prompts_tests.rs"]
mod tests;
