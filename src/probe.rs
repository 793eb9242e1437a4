use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::error::{ProbeError, ProbeResult};
use crate::scratch::{self, CleanupGuard};
use crate::source;
use crate::toolchain::{BannerSniff, DialectDetector, Toolchain, ToolchainConfig};

/// One probe invocation: which expressions to evaluate and how to print
/// their values.
#[derive(Clone, Debug)]
pub struct ProbeRequest {
    /// C type each expression's value is cast to before printing.
    pub cast_type: String,
    /// printf format matching `cast_type`, without the trailing newline.
    pub printf_format: String,
    /// Expressions in the order their values are wanted back.
    pub expressions: Vec<String>,
    /// Written into the generated file's comment header for traceability.
    pub caller: String,
    /// Tag included in the scratch file names.
    pub label: String,
    /// Extra source inserted before `main`: declarations, includes, macros
    /// the expressions need.
    pub header: String,
    /// Directories passed with `-I`, in order.
    pub include_dirs: Vec<PathBuf>,
    /// Leave the generated source on disk for debugging.
    pub keep_source: bool,
}

impl ProbeRequest {
    pub fn new(
        cast_type: impl Into<String>,
        printf_format: impl Into<String>,
        expressions: Vec<String>,
    ) -> Self {
        Self {
            cast_type: cast_type.into(),
            printf_format: printf_format.into(),
            expressions,
            caller: env!("CARGO_PKG_NAME").to_string(),
            label: String::new(),
            header: String::new(),
            include_dirs: Vec::new(),
            keep_source: false,
        }
    }

    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = caller.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn with_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    pub fn with_keep_source(mut self, keep: bool) -> Self {
        self.keep_source = keep;
        self
    }
}

/// Evaluate `request` with the compiler taken from the environment
/// (`HOSTCC`, then `CC`, then `cc`).
pub fn evaluate(request: &ProbeRequest) -> ProbeResult<Vec<String>> {
    evaluate_with(request, &ToolchainConfig::from_env(), &BannerSniff)
}

/// Evaluate `request` with an explicit toolchain configuration and dialect
/// detector.
///
/// Returns one text line per expression, in request order. Scratch files
/// are removed on every exit path; only the generated source survives, and
/// only when `keep_source` is set.
pub fn evaluate_with(
    request: &ProbeRequest,
    config: &ToolchainConfig,
    detector: &dyn DialectDetector,
) -> ProbeResult<Vec<String>> {
    for expression in &request.expressions {
        if expression.contains('\n') {
            return Err(ProbeError::NewlineInExpression {
                expression: expression.clone(),
            });
        }
    }

    let (file, set) = scratch::create_source(&request.label)?;
    let mut guard = CleanupGuard::new();
    guard.push(set.executable_path.clone());
    if !request.keep_source {
        guard.push(set.source_path.clone());
    }

    write_source(file, request)?;

    let toolchain = Toolchain::resolve_with(config, detector)?;
    if let Some(object_path) = toolchain.object_path(&set.executable_path) {
        guard.push(object_path);
    }
    toolchain.compile(
        &set.source_path,
        &set.executable_path,
        &request.include_dirs,
    )?;

    if request.keep_source {
        log::info!(
            "probe source for {} kept at {}",
            request.caller,
            set.source_path.display()
        );
    } else {
        scratch::remove_if_exists(&set.source_path);
    }

    let output = Command::new(&set.executable_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .output()?;
    if !output.status.success() {
        return Err(ProbeError::RunFailed {
            executable: set.executable_path.clone(),
            status: output.status,
        });
    }

    let text = String::from_utf8(output.stdout)?;
    let lines: Vec<String> = text.trim().lines().map(str::to_string).collect();
    if lines.len() != request.expressions.len() {
        return Err(ProbeError::LineCountMismatch {
            expected: request.expressions.len(),
            actual: lines.len(),
        });
    }
    Ok(lines)
}

fn write_source(mut file: File, request: &ProbeRequest) -> ProbeResult<()> {
    source::render(&mut file, &request.caller, &request.header, |out| {
        source::render_print_statements(
            out,
            &request.cast_type,
            &request.printf_format,
            &request.expressions,
        )
    })?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_are_empty_and_transient() {
        let request = ProbeRequest::new("int", "%d", vec!["1".to_string()]);
        assert_eq!(request.caller, "cprobe");
        assert!(request.label.is_empty());
        assert!(request.header.is_empty());
        assert!(request.include_dirs.is_empty());
        assert!(!request.keep_source);
    }

    #[test]
    fn chained_setters_accumulate_include_dirs() {
        let request = ProbeRequest::new("int", "%d", vec!["1".to_string()])
            .with_include_dir("/inc/a")
            .with_include_dir("/inc/b")
            .with_keep_source(true);
        assert_eq!(
            request.include_dirs,
            vec![PathBuf::from("/inc/a"), PathBuf::from("/inc/b")]
        );
        assert!(request.keep_source);
    }

    #[test]
    fn newline_expressions_are_rejected_up_front() {
        let request = ProbeRequest::new("int", "%d", vec!["1 +\n1".to_string()]);
        let err = evaluate_with(&request, &ToolchainConfig::default(), &BannerSniff)
            .expect_err("newline should be rejected");
        assert!(matches!(err, ProbeError::NewlineInExpression { .. }));
    }

    #[test]
    fn missing_compiler_surfaces_as_toolchain_missing() {
        let request = ProbeRequest::new("int", "%d", vec!["1".to_string()])
            .with_label("missing-cc-unit");
        let config = ToolchainConfig {
            host_cc: Some("cprobe-no-such-compiler-anywhere".into()),
            cc: None,
        };
        let err = evaluate_with(&request, &config, &BannerSniff)
            .expect_err("resolution should fail");
        assert!(matches!(err, ProbeError::ToolchainMissing { .. }));
    }
}
