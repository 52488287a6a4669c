//! Interactive console: the long-running session with a live health indicator.
//!
//! Plain lines are questions; lines starting with `:` are commands. The readiness poller runs
//! for the whole session and is stopped on `:quit`, end of input or Ctrl-C at the prompt. Ctrl-C
//! while a flow runs cancels just that flow.

use crate::context::AppContext;
use crate::ui::form::{CounterLevel, MAX_QUESTION_CHARS, QueryForm};
use crate::ui::{Tab, UiController};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::signal::ctrl_c;

const HELP: &str = "\
Type a question and press enter to ask it.
Commands:
  :upload <path>         upload a document
  :delete                delete the whole collection (asks for confirmation)
  :status                refresh health, readiness and collection info
  :info                  refresh collection info
  :search <question>     search documents without generating an answer
  :stream on|off         stream answers as they are generated
  :sources on|off        include sources in standard answers
  :eval on|off           include evaluation metrics in standard answers
  :tab upload|query|status
  :help                  show this help
  :quit                  leave the console";

/// Parsed console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Blank line.
    Empty,
    /// Ask a question.
    Ask(String),
    /// Upload a document.
    Upload(PathBuf),
    /// Delete the collection.
    Delete,
    /// Refresh system status.
    Status,
    /// Refresh collection info.
    Info,
    /// Search without generation.
    Search(String),
    /// Toggle streaming.
    Stream(bool),
    /// Toggle sources.
    Sources(bool),
    /// Toggle evaluation.
    Eval(bool),
    /// Switch tab.
    Tab(Tab),
    /// Show help.
    Help,
    /// Leave the console.
    Quit,
}

impl Command {
    /// Parse one input line. Errors carry a message for the user.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Self::Empty);
        }
        let Some(command) = line.strip_prefix(':') else {
            return Ok(Self::Ask(line.to_string()));
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };
        match name.to_lowercase().as_str() {
            "upload" if !arg.is_empty() => Ok(Self::Upload(PathBuf::from(arg))),
            "upload" => Err("usage: :upload <path>".into()),
            "delete" => Ok(Self::Delete),
            "status" => Ok(Self::Status),
            "info" => Ok(Self::Info),
            "search" if !arg.is_empty() => Ok(Self::Search(arg.to_string())),
            "search" => Err("usage: :search <question>".into()),
            "stream" => parse_switch(arg).map(Self::Stream),
            "sources" => parse_switch(arg).map(Self::Sources),
            "eval" => parse_switch(arg).map(Self::Eval),
            "tab" => arg
                .parse()
                .map(Self::Tab)
                .map_err(|()| "usage: :tab upload|query|status".to_string()),
            "help" | "h" | "?" => Ok(Self::Help),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            other => Err(format!("unknown command ':{other}' (try :help)")),
        }
    }
}

fn parse_switch(arg: &str) -> Result<bool, String> {
    match arg.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err("expected 'on' or 'off'".into()),
    }
}

/// Run the interactive session until the user leaves.
pub async fn run(ctx: Arc<AppContext>) -> std::io::Result<()> {
    let mut controller = UiController::new(ctx.clone());
    let mut form = QueryForm::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{HELP}");
    ctx.start_health_poll().await;

    let result = loop {
        print_prompt(&ctx, &form).await;
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = ctrl_c() => break Ok(()),
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(error) => break Err(error),
        };

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };

        match command {
            Command::Empty => {}
            Command::Quit => break Ok(()),
            Command::Help => println!("{HELP}"),
            Command::Ask(question) => {
                form.set_question(question);
                if form.counter_level() != CounterLevel::Normal {
                    eprintln!("({}/{MAX_QUESTION_CHARS} characters)", form.char_count());
                }
                interruptible(controller.submit_query(&form)).await;
            }
            Command::Upload(path) => {
                interruptible(controller.upload(&path)).await;
            }
            Command::Delete => {
                let typed = match until_cancelled(confirm(&mut lines), ctrl_c()).await {
                    Some(Ok(typed)) => typed,
                    Some(Err(error)) => break Err(error),
                    None => {
                        eprintln!("\n(cancelled)");
                        continue;
                    }
                };
                interruptible(controller.delete_collection(&typed)).await;
            }
            Command::Status => {
                interruptible(controller.refresh_status()).await;
            }
            Command::Info => {
                interruptible(controller.refresh_collection_info()).await;
            }
            Command::Search(question) => {
                interruptible(controller.search(&question)).await;
            }
            Command::Stream(on) => {
                form.set_streaming(on);
                println!(
                    "streaming {}; sources {}",
                    switch_label(on),
                    switch_label(form.include_sources())
                );
            }
            Command::Sources(on) => {
                if form.set_include_sources(on) {
                    println!("sources {}", switch_label(on));
                } else {
                    eprintln!("sources are unavailable while streaming is on");
                }
            }
            Command::Eval(on) => {
                form.set_enable_evaluation(on);
                println!("evaluation {}", switch_label(on));
            }
            Command::Tab(tab) => {
                interruptible(controller.activate_tab(tab)).await;
            }
        }
    };

    ctx.stop_health_poll().await;
    result
}

/// Run a flow until it finishes or the user presses Ctrl-C, which cancels it.
async fn interruptible<T>(flow: impl Future<Output = T>) -> Option<T> {
    let output = until_cancelled(flow, ctrl_c()).await;
    if output.is_none() {
        eprintln!("\n(cancelled)");
    }
    output
}

async fn until_cancelled<T>(flow: impl Future<Output = T>, cancel: impl Future) -> Option<T> {
    tokio::select! {
        output = flow => Some(output),
        _ = cancel => None,
    }
}

async fn confirm(lines: &mut Lines<BufReader<Stdin>>) -> std::io::Result<String> {
    print!("This deletes every indexed document. Type DELETE to confirm: ");
    let _ = std::io::stdout().flush();
    Ok(lines.next_line().await?.unwrap_or_default().trim_end_matches('\r').to_string())
}

async fn print_prompt(ctx: &AppContext, form: &QueryForm) {
    let health = ctx
        .health_indicator()
        .await
        .map(|indicator| indicator.label())
        .unwrap_or("offline");
    let mode = if form.streaming() { " stream" } else { "" };
    print!("[{health}{mode}] > ");
    let _ = std::io::stdout().flush();
}

fn switch_label(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_are_questions() {
        assert_eq!(
            Command::parse("  What is Rust?  "),
            Ok(Command::Ask("What is Rust?".into()))
        );
        assert_eq!(Command::parse("   "), Ok(Command::Empty));
    }

    #[test]
    fn commands_take_arguments() {
        assert_eq!(
            Command::parse(":upload ./docs/a file.pdf"),
            Ok(Command::Upload(PathBuf::from("./docs/a file.pdf")))
        );
        assert_eq!(Command::parse(":stream on"), Ok(Command::Stream(true)));
        assert_eq!(Command::parse(":SOURCES off"), Ok(Command::Sources(false)));
        assert_eq!(Command::parse(":tab status"), Ok(Command::Tab(Tab::Status)));
        assert_eq!(
            Command::parse(":search vector stores"),
            Ok(Command::Search("vector stores".into()))
        );
        assert_eq!(Command::parse(":q"), Ok(Command::Quit));
    }

    #[test]
    fn malformed_commands_are_reported() {
        assert!(Command::parse(":upload").is_err());
        assert!(Command::parse(":stream maybe").is_err());
        assert!(Command::parse(":tab settings").is_err());
        assert!(Command::parse(":frobnicate").is_err());
    }

    #[tokio::test]
    async fn cancellation_drops_the_running_flow() {
        let cancelled =
            until_cancelled(std::future::pending::<()>(), std::future::ready(())).await;
        assert_eq!(cancelled, None);

        let finished = until_cancelled(async { 7 }, std::future::pending::<()>()).await;
        assert_eq!(finished, Some(7));
    }
}
