//! cxxfront driver
//!
//! Parses a C++ source file and reports on it or dumps the tree as JSON.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use cxxfront::frontend::ast::Program;
use cxxfront::frontend::symbols::SymbolTable;
use cxxfront::{parse_with_defines, TranslationUnit};

/// C++ front end
#[derive(Parser, Debug)]
#[command(name = "cxxfront")]
#[command(version = "0.1.0")]
#[command(about = "C++ front end: scanner, preprocessor and parser")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Predefine an object-like macro (NAME or NAME=VALUE)
    #[arg(short = 'D', value_name = "NAME[=VALUE]", global = true)]
    define: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a source file and report declarations and warnings
    Check {
        /// Input source file
        input: PathBuf,
    },
    /// Print the tree and symbol table as JSON
    Ast {
        /// Input source file
        input: PathBuf,

        /// Indent the JSON output
        #[arg(long)]
        pretty: bool,
    },
}

/// JSON document printed by `ast`
#[derive(Serialize)]
struct AstDump<'a> {
    program: &'a Program,
    symbols: &'a SymbolTable,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Check { input } => check_file(input, &cli.define),
        Commands::Ast { input, pretty } => dump_ast(input, &cli.define, *pretty),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Split `NAME=VALUE`; a bare `NAME` defines it as `1`
fn parse_define(define: &str) -> Result<(String, String)> {
    let (name, value) = define.split_once('=').unwrap_or((define, "1"));
    let name = name.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("invalid macro name in `-D {}`", define);
    }
    Ok((name.to_string(), value.to_string()))
}

fn parse_file(input: &Path, defines: &[String]) -> Result<TranslationUnit> {
    let source = fs::read_to_string(input)
        .with_context(|| format!("could not read {}", input.display()))?;
    let defines = defines
        .iter()
        .map(|d| parse_define(d))
        .collect::<Result<Vec<_>>>()?;

    let unit = parse_with_defines(&source, defines)
        .with_context(|| format!("parse error in {}", input.display()))?;
    for diagnostic in &unit.diagnostics {
        eprintln!("warning: {}: {}", diagnostic.span, diagnostic.message);
    }
    Ok(unit)
}

/// Parse without emitting anything but a summary
fn check_file(input: &Path, defines: &[String]) -> Result<()> {
    println!("Checking: {}", input.display());
    let unit = parse_file(input, defines)?;

    println!(
        "✅ {} declaration(s), {} symbol(s), {} warning(s)",
        unit.program.decls.len(),
        unit.symbols.len(),
        unit.diagnostics.len()
    );
    Ok(())
}

fn dump_ast(input: &Path, defines: &[String], pretty: bool) -> Result<()> {
    let unit = parse_file(input, defines)?;
    let dump = AstDump {
        program: &unit.program,
        symbols: &unit.symbols,
    };

    let json = if pretty {
        serde_json::to_string_pretty(&dump)?
    } else {
        serde_json::to_string(&dump)?
    };
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_define() {
        assert_eq!(
            parse_define("DEBUG").ok(),
            Some(("DEBUG".to_string(), "1".to_string()))
        );
        assert_eq!(
            parse_define("LEVEL=3").ok(),
            Some(("LEVEL".to_string(), "3".to_string()))
        );
        assert!(parse_define("=3").is_err());
        assert!(parse_define("A-B").is_err());
    }
}
