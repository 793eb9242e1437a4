use miette::Diagnostic;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

pub type ProbeResult<T> = Result<T, ProbeError>;

/// Everything here is fatal: these conditions mean the toolchain or the
/// request is misconfigured, and the caller has to fix that before a retry
/// could succeed.
#[derive(Debug, Error, Diagnostic)]
pub enum ProbeError {
    #[error("compiler `{compiler}` could not be launched")]
    #[diagnostic(help("install a C compiler or point HOSTCC/CC at an existing one"))]
    ToolchainMissing {
        compiler: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{compiler}` failed ({status}) while compiling {}", source_path.display())]
    #[diagnostic(help("the compiler diagnostics above name the offending expression"))]
    CompileFailed {
        compiler: String,
        source_path: PathBuf,
        status: ExitStatus,
    },

    #[error("probe executable {} exited with {status}", executable.display())]
    RunFailed {
        executable: PathBuf,
        status: ExitStatus,
    },

    #[error("probe output is not valid UTF-8")]
    InvalidOutput(#[from] std::string::FromUtf8Error),

    #[error("expression contains a newline: `{expression}`")]
    #[diagnostic(help("one expression maps to one output line; remove the newline"))]
    NewlineInExpression { expression: String },

    #[error("probe printed {actual} line(s) for {expected} expression(s)")]
    #[diagnostic(help("a format specifier that embeds `\\n` breaks the one-line-per-expression mapping"))]
    LineCountMismatch { expected: usize, actual: usize },

    #[error("scratch file or probe launch error")]
    Io(#[from] std::io::Error),
}
