use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{ProbeError, ProbeResult};

/// Compiler used when neither override is set.
pub const DEFAULT_COMPILER: &str = "cc";

/// Fragment of the banner MSVC prints when invoked with no arguments.
const MSVC_BANNER: &str = "Microsoft (R) C/C++";

/// Compiler overrides, resolved once at the call boundary instead of being
/// read from the environment deep inside the driver.
#[derive(Clone, Debug, Default)]
pub struct ToolchainConfig {
    pub host_cc: Option<String>,
    pub cc: Option<String>,
}

impl ToolchainConfig {
    /// Snapshot `HOSTCC` and `CC` from the environment.
    pub fn from_env() -> Self {
        Self {
            host_cc: env::var("HOSTCC").ok(),
            cc: env::var("CC").ok(),
        }
    }

    /// Precedence: `HOSTCC`, then `CC`, then [`DEFAULT_COMPILER`].
    pub fn compiler(&self) -> &str {
        self.host_cc
            .as_deref()
            .or(self.cc.as_deref())
            .unwrap_or(DEFAULT_COMPILER)
    }
}

/// Command-line argument conventions of a compiler family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    Posix,
    Msvc,
}

impl Dialect {
    /// Intermediate object file the compile step will produce, if this
    /// dialect needs one routed somewhere cleanable.
    pub fn object_path(&self, executable_path: &Path) -> Option<PathBuf> {
        match self {
            Dialect::Posix => None,
            Dialect::Msvc => Some(executable_path.with_extension("obj")),
        }
    }
}

/// How the dialect of a resolved compiler is discovered. Banner sniffing is
/// locale- and version-sensitive, so the strategy stays swappable without
/// touching command assembly.
pub trait DialectDetector {
    fn detect(&self, compiler: &str) -> ProbeResult<Dialect>;
}

/// Default detector: run the compiler with no arguments, discard stdout,
/// and look for the MSVC banner on stderr. A spawn failure means the
/// toolchain is missing entirely and propagates as fatal.
pub struct BannerSniff;

impl DialectDetector for BannerSniff {
    fn detect(&self, compiler: &str) -> ProbeResult<Dialect> {
        let output = Command::new(compiler)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| ProbeError::ToolchainMissing {
                compiler: compiler.to_string(),
                source,
            })?;
        let banner = String::from_utf8_lossy(&output.stderr);
        if banner.contains(MSVC_BANNER) {
            Ok(Dialect::Msvc)
        } else {
            Ok(Dialect::Posix)
        }
    }
}

/// A resolved compiler plus its detected dialect, fixed for one invocation.
#[derive(Clone, Debug)]
pub struct Toolchain {
    compiler: String,
    dialect: Dialect,
}

impl Toolchain {
    pub fn resolve(config: &ToolchainConfig) -> ProbeResult<Self> {
        Self::resolve_with(config, &BannerSniff)
    }

    pub fn resolve_with(
        config: &ToolchainConfig,
        detector: &dyn DialectDetector,
    ) -> ProbeResult<Self> {
        let compiler = config.compiler().to_string();
        let dialect = detector.detect(&compiler)?;
        Ok(Self { compiler, dialect })
    }

    pub fn compiler(&self) -> &str {
        &self.compiler
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn object_path(&self, executable_path: &Path) -> Option<PathBuf> {
        self.dialect.object_path(executable_path)
    }

    /// Compile `source_path` into `executable_path`, synchronously.
    /// Compiler diagnostics go straight to the caller's stderr; a non-zero
    /// exit aborts the whole probe, with no retry.
    pub fn compile(
        &self,
        source_path: &Path,
        executable_path: &Path,
        include_dirs: &[PathBuf],
    ) -> ProbeResult<()> {
        let args = compile_args(self.dialect, source_path, executable_path, include_dirs);
        log::debug!("compiling: {} {args:?}", self.compiler);
        let status = Command::new(&self.compiler)
            .args(&args)
            .status()
            .map_err(|source| ProbeError::ToolchainMissing {
                compiler: self.compiler.clone(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(ProbeError::CompileFailed {
                compiler: self.compiler.clone(),
                source_path: source_path.to_path_buf(),
                status,
            })
        }
    }
}

/// Assemble the compile arguments for `dialect`. Include directories keep
/// their order and duplicates pass through unchanged.
pub fn compile_args(
    dialect: Dialect,
    source_path: &Path,
    executable_path: &Path,
    include_dirs: &[PathBuf],
) -> Vec<OsString> {
    let mut args = Vec::with_capacity(include_dirs.len() + 3);
    for dir in include_dirs {
        let mut flag = OsString::from("-I");
        flag.push(dir);
        args.push(flag);
    }
    match dialect {
        Dialect::Posix => {
            let mut out = OsString::from("-o");
            out.push(executable_path);
            args.push(out);
        }
        Dialect::Msvc => {
            // MSVC rejects the legacy -o spelling and would otherwise drop
            // the object file in the working directory.
            let object_path = executable_path.with_extension("obj");
            let mut exe = OsString::from("-Fe");
            exe.push(executable_path);
            args.push(exe);
            let mut obj = OsString::from("-Fo");
            obj.push(&object_path);
            args.push(obj);
        }
    }
    args.push(source_path.as_os_str().to_os_string());
    args
}
