//! CLI tool to validate and inspect CMake listfiles.

use std::fs;
use std::process::ExitCode;

use cmake_parser_rs::{AstNode, ParseOptions, parse_tree, scan};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "CMAKE_PARSER_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";

/// Filter from a `CMAKE_PARSER_LOG` value, falling back to `warn` when
/// unset or invalid.
fn log_filter(spec: Option<&str>) -> EnvFilter {
    spec.and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Send the library's `log` records to stderr through a `tracing`
/// subscriber, keeping stdout for command output.
fn init_logging() {
    let spec = std::env::var(LOG_ENV).ok();
    let result = tracing_subscriber::fmt()
        .with_env_filter(log_filter(spec.as_deref()))
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
    if let Err(e) = result {
        eprintln!("warning: logging disabled: {e}");
    }
}

fn print_usage() {
    eprintln!("Usage: cmake-parse <command> [--skip-comments] [files...]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  validate  Check that listfile(s) parse");
    eprintln!("  tokens    Print the token stream of listfile(s)");
    eprintln!("  tree      Print the parsed tree of listfile(s)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  CMAKE_PARSER_LOG  log filter, e.g. debug or cmake_parser_rs::eval=trace");
    eprintln!("                    (default: warn)");
}

fn count_nodes(nodes: &[AstNode]) -> usize {
    nodes
        .iter()
        .map(|node| {
            1 + match node {
                AstNode::Macro(b)
                | AstNode::Function(b)
                | AstNode::Block(b)
                | AstNode::ForEach(b)
                | AstNode::While(b) => count_nodes(&b.body),
                AstNode::If(i) => {
                    count_nodes(&i.if_true) + i.if_false.as_deref().map_or(0, count_nodes)
                }
                _ => 0,
            }
        })
        .sum()
}

fn main() -> ExitCode {
    init_logging();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return ExitCode::from(2);
    }

    let command = args[1].as_str();
    let skip_comments = args[2..].iter().any(|a| a == "--skip-comments");
    let files: Vec<&String> = args[2..]
        .iter()
        .filter(|a| *a != "--skip-comments")
        .collect();
    let options = ParseOptions::new().skip_comments(skip_comments);

    if files.is_empty() {
        eprintln!("Error: no files specified");
        return ExitCode::from(2);
    }

    let mut had_error = false;

    for path in files {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{path}: {e}");
                had_error = true;
                continue;
            }
        };

        match command {
            "validate" => match parse_tree(&content, options).collect::<Result<Vec<_>, _>>() {
                Ok(nodes) => {
                    eprintln!(
                        "{path}: valid ({} top-level node(s), {} total)",
                        nodes.len(),
                        count_nodes(&nodes)
                    );
                }
                Err(e) => {
                    eprintln!("{path}: {e}");
                    had_error = true;
                }
            },
            "tokens" => {
                for token in scan(&content) {
                    println!(
                        "{}:{}\t{:?}\t{:?}",
                        token.line,
                        token.column,
                        token.kind,
                        token.text().unwrap_or("")
                    );
                }
            }
            "tree" => {
                for node in parse_tree(&content, options) {
                    match node {
                        Ok(node) => println!("{node:#?}"),
                        Err(e) => {
                            eprintln!("{path}: {e}");
                            had_error = true;
                        }
                    }
                }
            }
            _ => {
                eprintln!("Unknown command: {command}");
                return ExitCode::from(2);
            }
        }
    }

    if had_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_defaults_to_warn() {
        assert_eq!(log_filter(None).to_string(), "warn");
    }

    #[test]
    fn log_filter_uses_env_value() {
        assert_eq!(log_filter(Some("debug")).to_string(), "debug");
    }

    #[test]
    fn count_nodes_walks_bodies() {
        let nodes = parse_tree("if(A)\n a()\nelse()\n b()\nendif()\nc()", ParseOptions::new())
            .collect::<Result<Vec<_>, _>>()
            .expect("parse failed");
        assert_eq!(count_nodes(&nodes), 4);
    }
}
