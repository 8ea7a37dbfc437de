use super::OracleProcess;
use crate::model::OracleOutcome;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command as ProcessCommand, Stdio};

/// Runs a prepared executable (e.g. `vvp tick.out`) in the slot directory.
#[derive(Debug, Clone)]
pub struct ExternalProcess {
    program: String,
    args: Vec<String>,
    workdir: PathBuf,
}

impl ExternalProcess {
    pub fn new(argv: &[String], workdir: &Path) -> Result<Self> {
        let (program, args) = split_argv(argv).context("oracle run command")?;
        Ok(Self {
            program,
            args,
            workdir: workdir.to_path_buf(),
        })
    }
}

impl OracleProcess for ExternalProcess {
    fn run(&self) -> OracleOutcome {
        // No timeout: a hung simulator hangs this invocation.
        let output = ProcessCommand::new(&self.program)
            .args(&self.args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        match output {
            Ok(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr);
                if !stderr.trim().is_empty() {
                    tracing::debug!(program = %self.program, stderr = %stderr.trim_end(), "oracle stderr");
                }
                OracleOutcome::Completed {
                    success: out.status.success(),
                    code: out.status.code(),
                    stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                }
            }
            Err(e) => OracleOutcome::LaunchFailed {
                reason: format!("{}: {e}", self.program),
            },
        }
    }
}

/// Run the one-time preparation command (e.g. compiling the simulation) to completion.
pub fn run_build_step(argv: &[String], workdir: &Path) -> Result<()> {
    let (program, args) = split_argv(argv).context("build command")?;
    tracing::info!(program = %program, args = ?args, "running build step");
    let out = ProcessCommand::new(&program)
        .args(&args)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("launch {program}"))?;

    let stdout = String::from_utf8_lossy(&out.stdout);
    if !stdout.trim().is_empty() {
        tracing::debug!(stdout = %stdout.trim_end(), "build stdout");
    }
    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr);
        bail!(
            "{program} exited with {}: {}",
            out.status,
            stderr.trim()
        );
    }
    Ok(())
}

fn split_argv(argv: &[String]) -> Result<(String, Vec<String>)> {
    match argv.split_first() {
        Some((program, args)) if !program.is_empty() => Ok((program.clone(), args.to_vec())),
        _ => bail!("command is empty"),
    }
}
