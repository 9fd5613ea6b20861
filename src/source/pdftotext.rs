use super::{SourceDiag, SourceKind, SourceText, TextSource};
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct PdfTextSource {
    exe: PathBuf,
    layout: bool,
    timeout: Option<Duration>,
}

impl PdfTextSource {
    pub fn new(cfg: &Config) -> Self {
        Self {
            exe: PathBuf::from(cfg.source.pdftotext_exe.trim()),
            layout: cfg.source.pdftotext_layout,
            timeout: (cfg.source.timeout_seconds > 0)
                .then(|| Duration::from_secs(cfg.source.timeout_seconds)),
        }
    }

    fn spawn(&self, args: &[&OsStr]) -> Result<Child> {
        Command::new(&self.exe)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawning {}", self.exe.display()))
    }
}

impl TextSource for PdfTextSource {
    fn doctor(&self) -> Result<Vec<SourceDiag>> {
        let diag = match self
            .spawn(&[OsStr::new("-v")])
            .and_then(|mut child| wait_with_timeout(&mut child, Duration::from_secs(10)))
        {
            Ok(out) => {
                // Older poppler builds print the banner on stderr and exit non-zero.
                let banner = if out.stdout.is_empty() { &out.stderr } else { &out.stdout };
                let version = String::from_utf8_lossy(banner)
                    .lines()
                    .next()
                    .map(|l| l.trim().to_string());
                SourceDiag {
                    name: "pdftotext".into(),
                    ok: true,
                    version,
                    error: None,
                }
            }
            Err(err) => SourceDiag {
                name: "pdftotext".into(),
                ok: false,
                version: None,
                error: Some(format!("{err:#}")),
            },
        };
        Ok(vec![diag])
    }

    fn extract_text(&self, path: &Path) -> Result<SourceText> {
        debug!("pdftotext {} layout={} timeout={:?}", path.display(), self.layout, self.timeout);
        let mut args: Vec<&OsStr> = Vec::new();
        if self.layout {
            args.push(OsStr::new("-layout"));
        }
        args.extend([OsStr::new("-enc"), OsStr::new("UTF-8"), path.as_os_str(), OsStr::new("-")]);

        let mut child = self.spawn(&args)?;
        let output = match self.timeout {
            Some(t) => wait_with_timeout(&mut child, t)?,
            None => child.wait_with_output().with_context(|| "waiting for pdftotext")?,
        };

        if !output.status.success() {
            return Err(anyhow!(
                "pdftotext failed for {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        if text.trim().is_empty() {
            warn!("no embedded text in {} (scanned PDF?)", path.display());
        }
        Ok(SourceText {
            kind: SourceKind::PdfText,
            origin: path.to_path_buf(),
            text,
        })
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Output> {
    // Drain both pipes while waiting so a chatty child cannot block on a full buffer.
    let stdout_reader = child.stdout.take();
    let stderr_reader = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || read_all(stdout_reader));
    let stderr_thread = std::thread::spawn(move || read_all(stderr_reader));

    let start = Instant::now();
    let (status, timed_out) = loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            break (status, false);
        }
        if start.elapsed() > timeout {
            warn!("pdftotext timed out after {:?}", timeout);
            let _ = child.kill();
            break (child.wait().with_context(|| "wait after kill")?, true);
        }
        std::thread::sleep(Duration::from_millis(20));
    };

    let stdout = stdout_thread
        .join()
        .map_err(|_| anyhow!("stdout reader thread panicked"))??;
    let stderr = stderr_thread
        .join()
        .map_err(|_| anyhow!("stderr reader thread panicked"))??;

    if timed_out {
        return Err(anyhow!(
            "pdftotext exceeded timeout ({:?}); stderr: {}",
            timeout,
            String::from_utf8_lossy(&stderr)
        ));
    }
    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

fn read_all<R: Read>(reader: Option<R>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut r) = reader {
        r.read_to_end(&mut buf).with_context(|| "reading child output")?;
    }
    Ok(buf)
}
