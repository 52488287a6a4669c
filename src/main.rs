use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ragdesk::client::{ApiResult, Envelope, UploadFile};
use ragdesk::context::AppContext;
use ragdesk::ui::form::{confirm_delete, validate_upload};
use ragdesk::ui::{QueryForm, QueryMode, TerminalView, UiController, UiError, View};
use ragdesk::{config, console, logging};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "ragdesk",
    version,
    about = "Console for a retrieval-augmented question answering service"
)]
struct Cli {
    /// Base URL of the API (overrides RAGDESK_API_URL).
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Print the raw {data, error} envelope instead of rendered panels.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive session with a live health indicator (default).
    Console,
    /// Upload a document.
    Upload { path: PathBuf },
    /// Ask a question.
    Ask {
        question: String,
        /// Include the retrieved sources.
        #[arg(long)]
        sources: bool,
        /// Include evaluation metrics.
        #[arg(long)]
        evaluate: bool,
        /// Print the answer as it is generated (disables sources).
        #[arg(long, conflicts_with = "sources")]
        stream: bool,
    },
    /// Search documents without generating an answer.
    Search { question: String },
    /// Show collection statistics.
    Info,
    /// Show health, readiness and collection statistics.
    Status,
    /// Delete every indexed document.
    Delete {
        /// Confirmation text; must be DELETE. Prompted for when omitted.
        #[arg(long)]
        confirm: Option<String>,
    },
    /// Poll readiness until interrupted.
    Watch,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when the flow surfaced an error to the user.
async fn run() -> Result<bool> {
    let cli = Cli::parse();
    let mut config = config::load().context("failed to load configuration")?;
    logging::init_tracing(config.log_file.as_deref());
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }

    let command = cli.command.unwrap_or(Command::Console);
    let long_running = matches!(command, Command::Console | Command::Watch);
    let view: Arc<dyn View> = if long_running {
        Arc::new(TerminalView::with_health_badge())
    } else {
        Arc::new(TerminalView::new())
    };
    let ctx = Arc::new(
        AppContext::new(config, view).context("failed to initialize API client")?,
    );

    if cli.json
        && let Some(ok) = run_json(&ctx, &command).await?
    {
        return Ok(ok);
    }

    let controller = UiController::new(ctx.clone());
    let outcome = match command {
        Command::Console => {
            console::run(ctx).await.context("console input failed")?;
            Ok(())
        }
        Command::Upload { path } => controller.upload(&path).await,
        Command::Ask {
            question,
            sources,
            evaluate,
            stream,
        } => {
            let form = query_form(question, sources, evaluate, stream);
            controller.submit_query(&form).await
        }
        Command::Search { question } => controller.search(&question).await,
        Command::Info => controller.refresh_collection_info().await,
        Command::Status => controller.refresh_status().await,
        Command::Delete { confirm } => {
            let typed = match confirm {
                Some(typed) => typed,
                None => prompt_confirmation()?,
            };
            controller.delete_collection(&typed).await
        }
        Command::Watch => {
            ctx.start_health_poll().await;
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl-C")?;
            ctx.stop_health_poll().await;
            Ok(())
        }
    };

    Ok(report(outcome))
}

fn report(outcome: Result<(), UiError>) -> bool {
    match outcome {
        Ok(()) => true,
        Err(error) => {
            tracing::debug!(%error, "Command finished with an error");
            false
        }
    }
}

/// Handle request/response commands in `--json` mode. Returns `None` for commands without a
/// single response to print.
async fn run_json(ctx: &AppContext, command: &Command) -> Result<Option<bool>> {
    let client = ctx.client();
    let printed = match command {
        Command::Upload { path } => {
            let file = UploadFile::from_path(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            validate_upload(&file, &ctx.config().upload)?;
            print_envelope(client.upload_document(&file, |_| {}).await)?
        }
        Command::Ask {
            question,
            sources,
            evaluate,
            stream,
        } => {
            let form = query_form(question.as_str(), *sources, *evaluate, *stream);
            let question = form.question().trim();
            match form.validate()? {
                QueryMode::Standard {
                    include_sources,
                    enable_evaluation,
                } => print_envelope(
                    client
                        .query(question, include_sources, enable_evaluation)
                        .await,
                )?,
                QueryMode::Streaming => {
                    print_envelope(client.query_stream(question, |_| {}).await)?
                }
            }
        }
        Command::Search { question } => {
            let form = query_form(question.as_str(), false, false, false);
            form.validate()?;
            print_envelope(client.search_documents(form.question().trim()).await)?
        }
        Command::Info => print_envelope(client.get_collection_info().await)?,
        Command::Status => {
            let (health, readiness) = tokio::join!(client.health_check(), client.readiness_check());
            let health = Envelope::from(health);
            let readiness = Envelope::from(readiness);
            let ok = health.error.is_none() && readiness.error.is_none();
            print_json(&serde_json::json!({ "health": health, "readiness": readiness }))?;
            ok
        }
        Command::Delete { confirm } => {
            let typed = match confirm {
                Some(typed) => typed.clone(),
                None => prompt_confirmation()?,
            };
            confirm_delete(&typed)?;
            print_envelope(client.delete_collection().await)?
        }
        Command::Console | Command::Watch => return Ok(None),
    };
    Ok(Some(printed))
}

fn query_form(
    question: impl Into<String>,
    sources: bool,
    evaluate: bool,
    stream: bool,
) -> QueryForm {
    let mut form = QueryForm::default();
    form.set_question(question);
    form.set_include_sources(sources);
    form.set_enable_evaluation(evaluate);
    form.set_streaming(stream);
    form
}

fn print_envelope<T: Serialize>(result: ApiResult<T>) -> Result<bool> {
    let envelope = Envelope::from(result);
    let ok = envelope.error.is_none();
    print_json(&envelope)?;
    Ok(ok)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{text}");
    Ok(())
}

fn prompt_confirmation() -> Result<String> {
    print!("This deletes every indexed document. Type DELETE to confirm: ");
    std::io::stdout().flush().ok();
    let mut typed = String::new();
    std::io::stdin()
        .read_line(&mut typed)
        .context("failed to read confirmation")?;
    Ok(typed.trim_end_matches(['\r', '\n']).to_string())
}
