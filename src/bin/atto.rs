// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Interactive terminal front end for Atto.
//!
//! Read-compile-run loop built on `rustyline` for line editing/history,
//! `colored` for meta-command and error output, and `clap` for the
//! handful of startup flags. Mirrors the teacher's own `repl::run` shape
//! (read → compile → execute → print → continue on error, one line at a
//! time) with `Session` standing in for the teacher's bare `Process`.

use std::path::PathBuf;

use atto::{EvalOutcome, Session, SessionError};
use clap::Parser;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// A small, lazily-evaluated Lisp with a stack-based bytecode VM.
#[derive(Parser, Debug)]
#[command(name = "atto", version, about)]
struct Args {
    /// Batch-evaluate a script file instead of starting an interactive session.
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Evaluate a single expression and exit.
    #[arg(short = 'e', long, value_name = "EXPR", conflicts_with = "file")]
    eval: Option<String>,

    /// Disable colorized output.
    #[arg(long)]
    no_color: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    if args.no_color {
        colored::control::set_override(false);
    }

    let mut session = Session::new();

    if let Some(expr) = args.eval {
        return run_one(&mut session, &expr);
    }

    if let Some(path) = args.file {
        return run_file(&mut session, &path);
    }

    run_repl(&mut session)
}

/// Evaluate a single expression passed via `-e` and print its value.
fn run_one(session: &mut Session, expr: &str) -> anyhow::Result<()> {
    match eval_and_render(session, expr) {
        Ok(Some(rendered)) => println!("{rendered}"),
        Ok(None) => {}
        Err(err) => {
            eprintln!("{}", format!("error: {err}").red());
            std::process::exit(1);
        }
    }
    Ok(())
}

/// Batch-evaluate every top-level form in a script file, one at a time,
/// stopping at the first error.
fn run_file(session: &mut Session, path: &std::path::Path) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
    let mut remaining = source.as_str();
    loop {
        let consumed = remaining.trim_start();
        if consumed.is_empty() {
            return Ok(());
        }
        remaining = consumed;
        match session.eval_str(remaining) {
            Ok(None) => return Ok(()),
            Ok(Some(EvalOutcome::Defined(name))) => {
                println!("{}", format!(":{name}").dimmed());
                remaining = advance_past_one_form(remaining);
            }
            Ok(Some(EvalOutcome::Value(index))) => {
                let rendered = session.print(index)?;
                println!("{rendered}");
                remaining = advance_past_one_form(remaining);
            }
            Err(err) => {
                eprintln!("{}", format!("error: {err}").red());
                std::process::exit(1);
            }
        }
    }
}

/// Skip past the first top-level form in `source`, for `run_file`'s
/// multi-form batch evaluation (the reader itself only ever consumes one
/// form per `read_one` call and does not report how much input it used).
fn advance_past_one_form(source: &str) -> &str {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut started = false;
    let mut end = bytes.len();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' => {
                depth += 1;
                started = true;
            }
            b')' => {
                depth = depth.saturating_sub(1);
                if started && depth == 0 {
                    end = i + 1;
                    break;
                }
            }
            _ if !started && !b.is_ascii_whitespace() => {
                // Bare atom: ends at the next whitespace or paren.
                let rest = &source[i..];
                let atom_len = rest
                    .find(|c: char| c.is_whitespace() || c == '(' || c == ')')
                    .unwrap_or(rest.len());
                end = i + atom_len;
                break;
            }
            _ => {}
        }
    }
    &source[end..]
}

fn run_repl(session: &mut Session) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    let history_path = history_path();
    if let Some(path) = &history_path {
        let _ = editor.load_history(path);
    }

    let mut counter: u64 = 1;
    println!("{}", "atto — a small, lazily-evaluated Lisp".bold());
    println!("{}", "-help for meta-commands, -exit to quit".dimmed());

    loop {
        match editor.readline("atto> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);

                if let Some(command) = line.strip_prefix('-') {
                    if handle_meta_command(session, command) {
                        break;
                    }
                    continue;
                }

                match eval_and_render(session, line) {
                    Ok(Some(rendered)) => {
                        println!("{}", format!("[{counter}] {rendered}").green());
                        counter += 1;
                    }
                    Ok(None) => {}
                    Err(err) => eprintln!("{}", format!("error: {err}").red()),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", format!("readline error: {err}").red());
                break;
            }
        }
    }

    if let Some(path) = &history_path {
        let _ = editor.save_history(path);
    }
    Ok(())
}

/// Dispatch one of the `-`-prefixed meta-commands. Returns `true` if the
/// REPL should exit.
fn handle_meta_command(session: &mut Session, command: &str) -> bool {
    match command {
        "exit" => return true,
        "help" => print_help(),
        "stack" => print!("{}", atto::printer::pretty_print_stack(&session.vm, &session.symbols)),
        "env" => print!("{}", atto::printer::pretty_print_env(&session.global_env)),
        "verbose-on" => {
            session.set_verbose(true);
            println!("{}", "verbose tracing on".dimmed());
        }
        "verbose-off" => {
            session.set_verbose(false);
            println!("{}", "verbose tracing off".dimmed());
        }
        "heap-usage" => {
            let usage = atto::printer::heap_usage(&session.vm.heap);
            println!("{usage}");
        }
        other => eprintln!("{}", format!("unknown meta-command: -{other}").red()),
    }
    false
}

fn print_help() {
    println!(
        "{}",
        "\
-exit          quit the session
-help          show this message
-stack         print the data stack, bottom to top
-env           print every visible binding
-verbose-on    trace every dispatched opcode
-verbose-off   stop tracing opcodes
-heap-usage    print heap occupancy"
            .dimmed()
    );
}

/// Evaluate one line and render its result, if any, as Atto source text.
fn eval_and_render(session: &mut Session, line: &str) -> Result<Option<String>, SessionError> {
    match session.eval_str(line)? {
        None => Ok(None),
        Some(EvalOutcome::Defined(name)) => Ok(Some(format!(":{name}"))),
        Some(EvalOutcome::Value(index)) => {
            let rendered = session.print(index)?;
            Ok(Some(rendered))
        }
    }
}

fn history_path() -> Option<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "atto")?;
    let dir = dirs.config_dir();
    std::fs::create_dir_all(dir).ok()?;
    Some(dir.join("history"))
}
