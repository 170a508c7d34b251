// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `quill shell` command implementation.
//!
//! Launches an interactive REPL on one discussion channel: questions stream
//! token-by-token to stdout, discovered papers land in the channel queue, and
//! slash commands drive triage (dismiss/restore/add) and ingestion recovery
//! (upload, continue-with-abstract). Ctrl-C during an answer cancels the
//! in-flight exchange cleanly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use colored::Colorize;
use quill_api::{ApiClient, PaperActionType};
use quill_assistant::{AssistantClient, StaticCredentials};
use quill_config::QuillConfig;
use quill_core::traits::StreamSink;
use quill_core::types::{ChannelId, ExchangeId, ExchangeStatus, ProjectId};
use quill_core::QuillError;
use quill_discovery::Notification;
use quill_exchange::RevealPacing;
use quill_session::{ActionOutcome, AskOptions, ChannelSession};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::warn;

/// Prints stream events to stdout as they are applied to the store.
struct PrintSink {
    tokens_seen: std::sync::atomic::AtomicBool,
}

impl PrintSink {
    fn new() -> Self {
        Self {
            tokens_seen: std::sync::atomic::AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl StreamSink for PrintSink {
    async fn on_token(&self, content: &str) {
        use std::io::Write;
        self.tokens_seen
            .store(true, std::sync::atomic::Ordering::Relaxed);
        print!("{content}");
        let _ = std::io::stdout().flush();
    }

    async fn on_status(&self, message: &str) {
        println!("{}", message.dimmed().italic());
    }
}

/// Runs the `quill shell` interactive REPL.
pub async fn run(config: QuillConfig, project: String, channel: String) -> Result<(), QuillError> {
    let project = ProjectId(project);
    let channel = ChannelId(channel);
    let credentials = Arc::new(StaticCredentials::new(config.auth.token.clone()));

    let transport = Arc::new(AssistantClient::new(
        config.api.base_url.clone(),
        credentials.clone(),
    )?);
    let api = ApiClient::new(config.api.base_url.clone(), credentials)?;

    let pacing = RevealPacing {
        min_char_delay: Duration::from_millis(config.assistant.typewriter_min_ms),
        max_char_delay: Duration::from_millis(config.assistant.typewriter_max_ms),
        max_total: Duration::from_millis(config.assistant.typewriter_total_ms),
    };
    let sink = Arc::new(PrintSink::new());
    let mut session = ChannelSession::new(project.clone(), channel.clone(), transport)
        .with_pacing(pacing, Duration::from_millis(16))
        .with_observer(sink.clone());
    if let Some(author) = &config.client.author {
        session = session.with_author(author.clone());
    }
    let session = Arc::new(session);

    // Rehydrate the channel's persisted exchanges before the first prompt.
    match api.fetch_history(&project, &channel).await {
        Ok(history) => {
            let count = history.len();
            session.load_history(history).await;
            if count > 0 {
                println!("{}", format!("loaded {count} previous exchanges").dimmed());
            }
        }
        Err(e) => warn!(error = %e, "could not load channel history"),
    }

    let mut editor = DefaultEditor::new().map_err(|e| QuillError::Internal(e.to_string()))?;
    println!(
        "{}",
        format!("quill shell: channel {} (/help for commands)", channel.0).bold()
    );

    loop {
        match editor.readline(&"quill> ".green().to_string()) {
            Ok(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(&line);
                if let Some(command) = line.strip_prefix('/') {
                    if !handle_command(command, &session, &api, &project, &channel).await {
                        break;
                    }
                } else {
                    ask(&session, &sink, &config, &line).await;
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("readline error: {e}");
                break;
            }
        }
    }
    Ok(())
}

/// Asks a question, streaming the answer; Ctrl-C cancels it.
async fn ask(
    session: &Arc<ChannelSession>,
    sink: &Arc<PrintSink>,
    config: &QuillConfig,
    question: &str,
) {
    sink.tokens_seen
        .store(false, std::sync::atomic::Ordering::Relaxed);
    let options = AskOptions {
        reasoning: config.assistant.reasoning,
        scope: config.assistant.scope.clone(),
    };
    let mut task = {
        let session = session.clone();
        let question = question.to_string();
        tokio::spawn(async move { session.ask(&question, options).await })
    };

    let joined = tokio::select! {
        result = &mut task => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    let result = match joined {
        Some(result) => result,
        None => {
            if let Some(id) = in_flight_exchange(session).await {
                session.cancel(&id).await;
            }
            task.await
        }
    };

    println!();
    match result {
        Ok(Ok(outcome)) => {
            print_answer(session, sink, &outcome.exchange).await;
            print_outcomes(session, &outcome.outcomes).await;
        }
        Ok(Err(e)) if e.is_cancelled() => println!("{}", "cancelled".dimmed()),
        Ok(Err(e)) => eprintln!("{}", format!("ask failed: {e}").red()),
        Err(e) => eprintln!("{}", format!("ask task failed: {e}").red()),
    }
}

/// Prints the final answer (when it was not streamed) and its sources.
async fn print_answer(session: &Arc<ChannelSession>, sink: &Arc<PrintSink>, id: &ExchangeId) {
    let store = session.store();
    let store = store.lock().await;
    let Some(exchange) = store.exchange(id) else {
        return;
    };
    let formatted = quill_assistant::format::format_message(
        &exchange.response.message,
        &exchange.response.citations,
    );
    if !sink.tokens_seen.load(std::sync::atomic::Ordering::Relaxed) && !formatted.is_empty() {
        println!("{formatted}");
    }
    for citation in &exchange.response.citations {
        let url = citation.url.as_deref().unwrap_or("");
        println!("{}", format!("  [{}] {} {url}", citation.marker, citation.title).dimmed());
    }
}

/// The most recent exchange that has not completed, if any.
async fn in_flight_exchange(session: &Arc<ChannelSession>) -> Option<ExchangeId> {
    let store = session.store();
    let store = store.lock().await;
    store
        .exchanges()
        .iter()
        .rev()
        .find(|e| e.status != ExchangeStatus::Complete)
        .map(|e| e.id.clone())
}

async fn print_outcomes(session: &Arc<ChannelSession>, outcomes: &[ActionOutcome]) {
    for outcome in outcomes {
        match outcome {
            ActionOutcome::SearchResultsShown { query, added, .. } => {
                println!(
                    "{}",
                    format!("{added} new papers for \"{query}\" (/papers to list)").cyan()
                );
            }
            ActionOutcome::IngestionUpdated { updated, verified, .. } => {
                if *verified {
                    println!("{}", format!("{updated} papers updated in the library").cyan());
                } else {
                    println!(
                        "{}",
                        format!("{updated} library updates from history (unconfirmed)").dimmed()
                    );
                }
            }
            ActionOutcome::StaleUpdateIgnored { .. } => {
                println!("{}", "ignored an update for a superseded search".dimmed());
            }
            ActionOutcome::PaperCreated { paper_id } => {
                println!("{}", format!("paper created: {paper_id}").cyan());
            }
            ActionOutcome::PaperUpdated { paper_id } => {
                println!("{}", format!("paper updated: {paper_id}").cyan());
            }
            ActionOutcome::ActionFailed { error, .. } => {
                eprintln!("{}", format!("assistant action failed: {error}").red());
            }
            ActionOutcome::Acknowledged { .. } => {}
        }
    }
    drain_notifications(session).await;
}

async fn drain_notifications(session: &Arc<ChannelSession>) {
    let discovery = session.discovery();
    let mut discovery = discovery.lock().await;
    let channel_state = discovery.channel_mut(session.channel());
    while let Some(notification) = channel_state.queue.take_notification() {
        match notification {
            Notification::ResultsCleared { count } => {
                println!("{}", format!("cleared {count} results from the previous search").dimmed());
            }
            Notification::PapersAdded { count, verified: true } => {
                println!("{}", format!("{count} papers added to the library").cyan());
            }
            Notification::PapersAdded { count, verified: false } => {
                println!("{}", format!("{count} papers possibly added (unconfirmed)").dimmed());
            }
            Notification::ActionFailed { message } => {
                eprintln!("{}", message.red());
            }
        }
    }
}

/// Handles a slash command. Returns false to exit the REPL.
async fn handle_command(
    command: &str,
    session: &Arc<ChannelSession>,
    api: &ApiClient,
    project: &ProjectId,
    channel: &ChannelId,
) -> bool {
    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    match name {
        "quit" | "exit" => return false,
        "help" => {
            println!("/search <query>      search references directly (use | to batch topics)");
            println!("/papers              list discovered papers and ingestion status");
            println!("/dismiss <paper-id>  remove a paper from the queue");
            println!("/restore             restore papers dismissed in this search");
            println!("/add <paper-id>      add a paper to the project library");
            println!("/upload <paper-id> <pdf-path>   retry a failed ingestion by upload");
            println!("/abstract <paper-id> continue a failed ingestion with abstract only");
            println!("/quit                leave the shell");
        }
        "search" => {
            if args.is_empty() {
                eprintln!("usage: /search <query> [| <query> ...]");
            } else {
                run_search(session, api, project, channel, &args.join(" ")).await;
            }
        }
        "papers" => list_papers(session).await,
        "dismiss" => match args.first() {
            Some(id) => {
                let discovery = session.discovery();
                let mut discovery = discovery.lock().await;
                if !discovery.channel_mut(channel).queue.dismiss(id) {
                    eprintln!("no paper with id {id}");
                }
            }
            None => eprintln!("usage: /dismiss <paper-id>"),
        },
        "restore" => {
            let discovery = session.discovery();
            let mut discovery = discovery.lock().await;
            let restored = discovery.channel_mut(channel).queue.restore_dismissed();
            println!("restored {restored} papers");
        }
        "add" => match args.first() {
            Some(id) => add_paper(session, api, project, channel, id).await,
            None => eprintln!("usage: /add <paper-id>"),
        },
        "upload" => match (args.first(), args.get(1)) {
            (Some(id), Some(path)) => upload_pdf(session, api, project, channel, id, path).await,
            _ => eprintln!("usage: /upload <paper-id> <pdf-path>"),
        },
        "abstract" => match args.first() {
            Some(id) => {
                let discovery = session.discovery();
                let mut discovery = discovery.lock().await;
                if discovery.channel_mut(channel).continue_with_abstract(id) {
                    println!("continuing with abstract for {id}");
                } else {
                    eprintln!("{id} has no failed ingestion to resolve");
                }
            }
            None => eprintln!("usage: /abstract <paper-id>"),
        },
        other => eprintln!("unknown command /{other} (try /help)"),
    }
    true
}

/// Explicit reference search: starts a fresh search session for the channel
/// (clearing the previous queue), then fills it from the search endpoint.
async fn run_search(
    session: &Arc<ChannelSession>,
    api: &ApiClient,
    project: &ProjectId,
    channel: &ChannelId,
    raw_query: &str,
) {
    let topics: Vec<String> = raw_query
        .split('|')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if topics.is_empty() {
        eprintln!("usage: /search <query> [| <query> ...]");
        return;
    }

    {
        let discovery = session.discovery();
        let mut discovery = discovery.lock().await;
        discovery.channel_mut(channel).queue.start_search(raw_query);
    }
    drain_notifications(session).await;

    let fetched = if topics.len() > 1 {
        api.batch_search_references(project, &topics)
            .await
            .map(|results| results.into_iter().flat_map(|t| t.papers).collect::<Vec<_>>())
    } else {
        api.search_references(project, &topics[0])
            .await
            .map(|r| r.papers)
    };

    let discovery = session.discovery();
    let mut discovery = discovery.lock().await;
    let channel_state = discovery.channel_mut(channel);
    channel_state.queue.finish_search();
    match fetched {
        Ok(papers) => {
            let added = channel_state.queue.add_papers(&papers);
            println!("{}", format!("{added} papers found (/papers to list)").cyan());
        }
        Err(e) => eprintln!("{}", format!("search failed: {e}").red()),
    }
}

async fn list_papers(session: &Arc<ChannelSession>) {
    let discovery = session.discovery();
    let mut discovery = discovery.lock().await;
    let channel_state = discovery.channel_mut(session.channel());
    if channel_state.queue.is_searching {
        println!("{}", "a search is still in progress".dimmed());
    }
    if channel_state.queue.papers().is_empty() {
        println!("no discovered papers in this channel");
        return;
    }
    if channel_state.ingestion_unverified {
        println!(
            "{}",
            "note: some ingestion states below came from history and are unconfirmed".dimmed()
        );
    }
    for paper in channel_state.queue.papers() {
        let status = channel_state
            .ingestion(&paper.id)
            .map(|s| format!(" [{}]", s.status))
            .unwrap_or_default();
        let year = paper.year.map(|y| format!(" ({y})")).unwrap_or_default();
        println!("  {}  {}{}{}", paper.id.bold(), paper.title, year, status.yellow());
    }
}

/// Adds a discovered paper to the library and tracks its ingestion.
async fn add_paper(
    session: &Arc<ChannelSession>,
    api: &ApiClient,
    project: &ProjectId,
    channel: &ChannelId,
    paper_id: &str,
) {
    let paper = {
        let discovery = session.discovery();
        let mut discovery = discovery.lock().await;
        let channel_state = discovery.channel_mut(channel);
        let Some(paper) = channel_state
            .queue
            .papers()
            .iter()
            .find(|p| p.id == paper_id)
            .cloned()
        else {
            eprintln!("no paper with id {paper_id}");
            return;
        };
        channel_state.begin_add(paper_id);
        paper
    };

    let payload = match serde_json::to_value(&paper) {
        Ok(value) => value,
        Err(e) => {
            eprintln!("failed to encode paper: {e}");
            return;
        }
    };
    match api
        .execute_paper_action(project, PaperActionType::AddReference, payload)
        .await
    {
        Ok(result) => {
            let status = result
                .ingestion_status
                .unwrap_or(quill_core::types::IngestionStatus::Pending);
            let discovery = session.discovery();
            let mut discovery = discovery.lock().await;
            discovery
                .channel_mut(channel)
                .confirm_add(paper_id, result.reference_id, status);
            println!("added {paper_id} to the library [{status}]");
        }
        Err(e) => {
            let discovery = session.discovery();
            let mut discovery = discovery.lock().await;
            discovery.channel_mut(channel).confirm_add(
                paper_id,
                None,
                quill_core::types::IngestionStatus::Failed,
            );
            eprintln!("{}", format!("add failed: {e}").red());
        }
    }
}

/// Retries a failed ingestion by uploading a PDF manually.
async fn upload_pdf(
    session: &Arc<ChannelSession>,
    api: &ApiClient,
    project: &ProjectId,
    channel: &ChannelId,
    paper_id: &str,
    path: &str,
) {
    let reference_id = {
        let discovery = session.discovery();
        let mut discovery = discovery.lock().await;
        let channel_state = discovery.channel_mut(channel);
        let Some(reference_id) = channel_state
            .ingestion(paper_id)
            .and_then(|s| s.reference_id.clone())
        else {
            eprintln!("{paper_id} has no library reference to upload against");
            return;
        };
        if !channel_state.upload_started(paper_id) {
            eprintln!("{paper_id} is not in a failed state");
            return;
        }
        reference_id
    };

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("cannot read {path}: {e}");
            let discovery = session.discovery();
            let mut discovery = discovery.lock().await;
            discovery.channel_mut(channel).upload_finished(paper_id, false);
            return;
        }
    };

    let file_name = std::path::Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("paper.pdf");
    let result = api.upload_pdf(project, &reference_id, file_name, bytes).await;

    let discovery = session.discovery();
    let mut discovery = discovery.lock().await;
    discovery
        .channel_mut(channel)
        .upload_finished(paper_id, result.is_ok());
    match result {
        Ok(()) => println!("uploaded pdf for {paper_id}"),
        Err(e) => eprintln!("{}", format!("upload failed: {e}").red()),
    }
}
