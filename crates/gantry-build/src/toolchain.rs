//! Toolchain subprocess contract

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, instrument};

use gantry_core::config::ToolchainConfig;
use gantry_core::{BuildError, Linkage, Target};

use crate::reporter::{BuildEvent, BuildReporter};

/// Number of stderr lines kept for error messages
const STDERR_TAIL: usize = 20;

/// Everything the toolchain needs for one (variant, target) build
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Variant name
    pub variant: String,
    /// Target architecture
    pub target: Target,
    /// Ordered compiler/linker flags
    pub flags: Vec<String>,
    /// Effective runtime linkage
    pub linkage: Linkage,
    /// Directory reserved for this build
    pub output_dir: PathBuf,
    /// Where the stripped binary must be written
    pub binary: PathBuf,
    /// Where the unstripped binary should be written
    pub symbols: PathBuf,
    /// Build-time dependency coordinates
    pub build_dependencies: Vec<String>,
}

/// Compiles one (variant, target) pair
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Toolchain name, for logs
    fn name(&self) -> &str;

    /// Run the build. Success means the process finished cleanly; the driver
    /// checks the produced files afterwards.
    async fn compile(&self, invocation: &Invocation) -> Result<(), BuildError>;
}

/// Toolchain backed by an external program
pub struct CommandToolchain {
    program: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    working_dir: PathBuf,
    reporter: Option<Arc<dyn BuildReporter>>,
}

impl CommandToolchain {
    /// Create a toolchain running `program` from `working_dir`
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
            working_dir: working_dir.into(),
            reporter: None,
        }
    }

    /// Build from configuration; relative paths resolve against `root`
    pub fn from_config(config: &ToolchainConfig, root: &Path) -> Self {
        let working_dir = match &config.working_dir {
            Some(dir) => root.join(dir),
            None => root.to_path_buf(),
        };
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            env: config.env.clone(),
            working_dir,
            reporter: None,
        }
    }

    /// Set the argument template
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Add an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Stream toolchain output to a reporter
    pub fn with_reporter(mut self, reporter: Arc<dyn BuildReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Resolve the program: paths are taken relative to the working
    /// directory, bare names are looked up on `PATH`.
    fn resolve_program(&self, invocation: &Invocation) -> Result<PathBuf, BuildError> {
        let program = Path::new(&self.program);
        if program.components().count() > 1 || program.is_absolute() {
            let path = self.working_dir.join(program);
            if path.is_file() {
                return Ok(path);
            }
            return Err(toolchain_error(
                invocation,
                None,
                format!("program {} not found", path.display()),
            ));
        }

        which::which(&self.program).map_err(|e| {
            toolchain_error(invocation, None, format!("program '{}' not found: {}", self.program, e))
        })
    }

    /// Expand `{variant}`-style placeholders and append the flags
    pub fn expand_args(&self, invocation: &Invocation) -> Vec<String> {
        let placeholders = [
            ("{variant}", invocation.variant.clone()),
            ("{target}", invocation.target.to_string()),
            ("{output_dir}", invocation.output_dir.display().to_string()),
            ("{binary}", invocation.binary.display().to_string()),
            ("{symbols}", invocation.symbols.display().to_string()),
        ];

        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                placeholders
                    .iter()
                    .fold(arg.clone(), |acc, (key, value)| acc.replace(key, value))
            })
            .collect();
        args.extend(invocation.flags.iter().cloned());
        args
    }

    fn environment(&self, invocation: &Invocation) -> Vec<(String, String)> {
        let mut env = vec![
            ("GANTRY_VARIANT".to_string(), invocation.variant.clone()),
            ("GANTRY_TARGET".to_string(), invocation.target.to_string()),
            (
                "GANTRY_OUTPUT_DIR".to_string(),
                invocation.output_dir.display().to_string(),
            ),
            (
                "GANTRY_BINARY".to_string(),
                invocation.binary.display().to_string(),
            ),
            (
                "GANTRY_SYMBOLS".to_string(),
                invocation.symbols.display().to_string(),
            ),
            ("GANTRY_FLAGS".to_string(), invocation.flags.join(" ")),
            ("GANTRY_LINKAGE".to_string(), invocation.linkage.to_string()),
            (
                "GANTRY_BUILD_DEPENDENCIES".to_string(),
                invocation.build_dependencies.join(","),
            ),
        ];
        env.extend(self.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        env
    }

    fn emit(&self, invocation: &Invocation, line: &str, is_stderr: bool) {
        if let Some(reporter) = &self.reporter {
            reporter.report(&BuildEvent::Output {
                variant: invocation.variant.clone(),
                target: invocation.target,
                line: line.to_string(),
                is_stderr,
            });
        }
    }
}

#[async_trait]
impl Toolchain for CommandToolchain {
    fn name(&self) -> &str {
        &self.program
    }

    #[instrument(skip(self, invocation), fields(variant = %invocation.variant, abi = %invocation.target))]
    async fn compile(&self, invocation: &Invocation) -> Result<(), BuildError> {
        let program = self.resolve_program(invocation)?;
        let args = self.expand_args(invocation);
        debug!(program = %program.display(), ?args, "spawning toolchain");

        let mut child = Command::new(&program)
            .args(&args)
            .envs(self.environment(invocation))
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| toolchain_error(invocation, None, format!("failed to spawn: {}", e)))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (_, tail) = tokio::join!(
            self.drain(invocation, stdout, false),
            self.drain(invocation, stderr, true)
        );

        let status = child
            .wait()
            .await
            .map_err(|e| toolchain_error(invocation, None, format!("failed to wait: {}", e)))?;

        if status.success() {
            return Ok(());
        }

        let code = status.code();
        let mut reason = match code {
            Some(code) => format!("exited with code {}", code),
            None => "terminated by signal".to_string(),
        };
        if !tail.is_empty() {
            reason.push_str(": ");
            reason.push_str(&tail.into_iter().collect::<Vec<_>>().join("\n"));
        }
        Err(toolchain_error(invocation, code, reason))
    }
}

impl CommandToolchain {
    /// Forward a stream to the reporter, returning its last lines
    async fn drain<R>(&self, invocation: &Invocation, stream: Option<R>, is_stderr: bool) -> VecDeque<String>
    where
        R: AsyncRead + Unpin,
    {
        let mut tail = VecDeque::with_capacity(STDERR_TAIL);
        let Some(stream) = stream else {
            return tail;
        };

        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(error = %e, is_stderr, "toolchain output stream closed");
                    break;
                }
            }
            let line = String::from_utf8_lossy(&buf)
                .trim_end_matches(['\n', '\r'])
                .to_string();
            self.emit(invocation, &line, is_stderr);
            if is_stderr {
                if tail.len() == STDERR_TAIL {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        }
        tail
    }
}

fn toolchain_error(invocation: &Invocation, exit_code: Option<i32>, reason: String) -> BuildError {
    BuildError::Toolchain {
        variant: invocation.variant.clone(),
        target: invocation.target.to_string(),
        exit_code,
        reason,
    }
}
