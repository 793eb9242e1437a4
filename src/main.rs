use std::env;
use std::path::PathBuf;
use std::process;

use cprobe::probe::{self, ProbeRequest};

const USAGE: &str = "Usage: cprobe [--type TYPE] [--format FMT] [--header CODE] \
[--include DIR]... [--label LABEL] [--caller NAME] [--keep-source] EXPR [EXPR...]";

fn main() -> miette::Result<()> {
    env_logger::init();

    let mut cast_type = String::from("int");
    let mut printf_format = String::from("%d");
    let mut header = String::new();
    let mut label = String::new();
    let mut caller = String::from("cprobe");
    let mut include_dirs: Vec<PathBuf> = Vec::new();
    let mut keep_source = false;
    let mut expressions: Vec<String> = Vec::new();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--type" => cast_type = require_value(&mut args, "--type"),
            "--format" => printf_format = require_value(&mut args, "--format"),
            "--header" => header = require_value(&mut args, "--header"),
            "--include" | "-I" => {
                include_dirs.push(PathBuf::from(require_value(&mut args, "--include")));
            }
            "--label" => label = require_value(&mut args, "--label"),
            "--caller" => caller = require_value(&mut args, "--caller"),
            "--keep-source" => keep_source = true,
            "--help" | "-h" => {
                println!("{USAGE}");
                return Ok(());
            }
            other if other.starts_with('-') => {
                eprintln!("unknown option `{other}`");
                eprintln!("{USAGE}");
                process::exit(1);
            }
            expression => expressions.push(expression.to_string()),
        }
    }

    if expressions.is_empty() {
        eprintln!("{USAGE}");
        process::exit(1);
    }

    let mut request = ProbeRequest::new(cast_type, printf_format, expressions)
        .with_caller(caller)
        .with_label(label)
        .with_header(header)
        .with_keep_source(keep_source);
    for dir in include_dirs {
        request = request.with_include_dir(dir);
    }

    let values = probe::evaluate(&request)?;
    for value in values {
        println!("{value}");
    }
    Ok(())
}

fn require_value(args: &mut impl Iterator<Item = String>, flag: &str) -> String {
    match args.next() {
        Some(value) => value,
        None => {
            eprintln!("missing value for {flag}");
            eprintln!("{USAGE}");
            process::exit(1);
        }
    }
}
