//! External stdin/stdout filters.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, bail};
use sitepack_config::TransformId;
use tracing::debug;

use super::{Transform, TransformContext};
use crate::content::Content;

/// Pipes content through an arbitrary program. The content kind is kept.
#[derive(Debug, Clone)]
pub struct CommandTransform {
    program: String,
    args: Vec<String>,
}

impl CommandTransform {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Transform for CommandTransform {
    fn id(&self) -> TransformId {
        TransformId::Command {
            program: self.program.clone(),
            args: self.args.clone(),
        }
    }

    fn apply(&self, input: Content, ctx: &TransformContext<'_>) -> anyhow::Result<Content> {
        let stdout = run_filter(&self.program, &self.args, &input.bytes, ctx.root)?;
        Ok(Content::new(stdout, input.kind))
    }
}

/// Run `program args...` in `cwd`, feeding `input` on stdin and returning
/// stdout. A non-zero exit status is an error carrying stderr.
pub(crate) fn run_filter(
    program: &str,
    args: &[String],
    input: &[u8],
    cwd: &Path,
) -> anyhow::Result<Vec<u8>> {
    debug!(program, ?args, "spawning filter");
    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to start '{program}'"))?;

    // Feed stdin from a separate thread so a chatty child cannot deadlock on
    // a full stdout pipe.
    let mut stdin = child.stdin.take().context("child stdin unavailable")?;
    let input = input.to_vec();
    let writer = std::thread::spawn(move || stdin.write_all(&input));

    let output = child
        .wait_with_output()
        .with_context(|| format!("failed to wait for '{program}'"))?;
    match writer.join() {
        Ok(Ok(())) => {}
        // The child may exit without reading its input; its status decides.
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
        Ok(Err(e)) => return Err(e).with_context(|| format!("failed to write to '{program}'")),
        Err(_) => bail!("stdin writer for '{program}' panicked"),
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("'{program}' exited with {}: {}", output.status, stderr.trim());
    }
    Ok(output.stdout)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::content::ContentKind;
    use crate::transform::testing::Fixture;
    use sitepack_config::BuildMode;

    #[test]
    fn pipes_through_the_program() {
        let fixture = Fixture::new("notes.txt");
        let transform = CommandTransform::new("tr", vec!["a-z".into(), "A-Z".into()]);
        let tmp = std::env::temp_dir();
        let ctx = TransformContext {
            root: &tmp,
            ..fixture.ctx(BuildMode::Development.flags())
        };
        let out = transform.apply(Content::new("hello", ContentKind::File), &ctx).unwrap();
        assert_eq!(out.bytes, b"HELLO");
        assert_eq!(out.kind, ContentKind::File);
    }

    #[test]
    fn failing_program_reports_stderr() {
        let err = run_filter(
            "sh",
            &["-c".into(), "echo broken >&2; exit 3".into()],
            b"",
            &std::env::temp_dir(),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("broken"));
    }

    #[test]
    fn missing_program_fails_to_start() {
        let cwd = std::env::temp_dir();
        let err = run_filter("sitepack-no-such-program", &[], b"", &cwd).unwrap_err();
        assert!(err.to_string().contains("failed to start"));
    }
}
