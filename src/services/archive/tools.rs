//! Blocking invocation of external unpack tools.
//!
//! Calls block the worker until the process exits. There is no timeout and
//! no cancellation of an in-flight process.

use crate::types::UnpackFailure;
use std::path::Path;
use std::process::{Command, Stdio};

fn spawn_error(tool: &str, e: std::io::Error) -> UnpackFailure {
    if e.kind() == std::io::ErrorKind::NotFound {
        UnpackFailure::ToolMissing {
            tool: tool.to_string(),
        }
    } else {
        UnpackFailure::io(format!("Failed to launch {tool}"), e)
    }
}

fn exit_error(tool: &str, status: std::process::ExitStatus, stderr: &[u8]) -> UnpackFailure {
    UnpackFailure::ToolExit {
        tool: tool.to_string(),
        status: status.to_string(),
        stderr: String::from_utf8_lossy(stderr).trim().to_string(),
    }
}

/// Run `tool args...`, optionally inside `cwd`, and require a zero exit.
pub fn run_tool(tool: &str, args: &[&str], cwd: Option<&Path>) -> Result<(), UnpackFailure> {
    let mut cmd = Command::new(tool);
    cmd.args(args).stdin(Stdio::null());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    log::debug!("Running {tool} {}", args.join(" "));
    let output = cmd.output().map_err(|e| spawn_error(tool, e))?;

    if !output.status.success() {
        return Err(exit_error(tool, output.status, &output.stderr));
    }
    Ok(())
}

/// Run `producer | consumer` inside `cwd`. Both must exit zero; the
/// producer is checked first so its failure is the one reported.
pub fn run_piped(
    producer: (&str, &[&str]),
    consumer: (&str, &[&str]),
    cwd: &Path,
) -> Result<(), UnpackFailure> {
    let (producer_tool, producer_args) = producer;
    let (consumer_tool, consumer_args) = consumer;

    log::debug!(
        "Running {producer_tool} {} | {consumer_tool} {}",
        producer_args.join(" "),
        consumer_args.join(" ")
    );

    let mut upstream = Command::new(producer_tool)
        .args(producer_args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(producer_tool, e))?;

    let pipe = match upstream.stdout.take() {
        Some(out) => out,
        None => {
            let _ = upstream.kill();
            let _ = upstream.wait();
            return Err(UnpackFailure::io(
                format!("{producer_tool} produced no stdout"),
                std::io::Error::from(std::io::ErrorKind::BrokenPipe),
            ));
        }
    };

    let downstream = Command::new(consumer_tool)
        .args(consumer_args)
        .current_dir(cwd)
        .stdin(Stdio::from(pipe))
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn();

    let downstream = match downstream {
        Ok(child) => child,
        Err(e) => {
            let _ = upstream.kill();
            let _ = upstream.wait();
            return Err(spawn_error(consumer_tool, e));
        }
    };

    let consumer_out = downstream
        .wait_with_output()
        .map_err(|e| UnpackFailure::io(format!("Failed to wait for {consumer_tool}"), e))?;
    let producer_out = upstream
        .wait_with_output()
        .map_err(|e| UnpackFailure::io(format!("Failed to wait for {producer_tool}"), e))?;

    if !producer_out.status.success() {
        return Err(exit_error(
            producer_tool,
            producer_out.status,
            &producer_out.stderr,
        ));
    }
    if !consumer_out.status.success() {
        return Err(exit_error(
            consumer_tool,
            consumer_out.status,
            &consumer_out.stderr,
        ));
    }
    Ok(())
}

pub fn path_arg(path: &Path) -> Result<&str, UnpackFailure> {
    path.to_str().ok_or_else(|| {
        UnpackFailure::io(
            format!("Path is not valid UTF-8: {}", path.display()),
            std::io::Error::from(std::io::ErrorKind::InvalidInput),
        )
    })
}
