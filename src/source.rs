use std::io::{self, Write};

/// Write the fixed probe skeleton around a caller-supplied body generator:
/// a comment naming the generating caller, the formatted-output include,
/// the caller's header verbatim, then `main` wrapping whatever `body`
/// emits, ending in a normal-exit return.
pub fn render<W, F>(out: &mut W, caller: &str, header: &str, body: F) -> io::Result<()>
where
    W: Write,
    F: FnOnce(&mut W) -> io::Result<()>,
{
    writeln!(out, "/* Generated by {caller} */")?;
    writeln!(out, "#include <stdio.h>")?;
    if !header.is_empty() {
        writeln!(out, "{header}")?;
    }
    writeln!(out, "int main(void)")?;
    writeln!(out, "{{")?;
    body(out)?;
    writeln!(out, "    return 0;")?;
    writeln!(out, "}}")?;
    Ok(())
}

/// The canonical body generator: one statement per expression, each value
/// cast to `cast_type` and printed with `format` plus a line terminator.
/// Output line *i* therefore corresponds to expression *i*.
pub fn render_print_statements<W: Write>(
    out: &mut W,
    cast_type: &str,
    format: &str,
    expressions: &[String],
) -> io::Result<()> {
    for expression in expressions {
        writeln!(
            out,
            "    printf(\"{format}\\n\", ({cast_type}) {expression});"
        )?;
    }
    Ok(())
}
