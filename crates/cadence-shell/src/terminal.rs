//! Terminal plumbing: stdin lines, confirmation prompts and event output.

use std::io::{BufRead, Write};
use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, mpsc};

use cadence_builder::{BuilderEvent, Confirm, SaveStatus};
use cadence_client::BoxFuture;

/// Lines typed by the user. Shared between the command loop and prompts.
pub type Lines = Arc<Mutex<mpsc::UnboundedReceiver<String>>>;

/// Read stdin on a dedicated thread so blocking reads stay off the runtime.
pub fn spawn_stdin() -> Lines {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    break;
                }
            }
        }
    });
    Arc::new(Mutex::new(rx))
}

pub async fn next_line(lines: &Lines) -> Option<String> {
    lines.lock().await.recv().await
}

pub fn show_prompt(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}

pub struct TerminalConfirm {
    lines: Lines,
}

impl TerminalConfirm {
    pub fn new(lines: Lines) -> Self {
        Self { lines }
    }
}

impl Confirm for TerminalConfirm {
    fn confirm<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            show_prompt(&format!("{prompt} [y/N] "));
            next_line(&self.lines)
                .await
                .is_some_and(|answer| is_yes(&answer))
        })
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Print builder notifications as they arrive.
pub fn spawn_renderer(mut events: broadcast::Receiver<BuilderEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(line) = describe(&event) {
                        println!("{line}");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "renderer fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

// Errors are printed by the command loop, so `Failed` is not echoed here.
fn describe(event: &BuilderEvent) -> Option<String> {
    match event {
        BuilderEvent::ActiveEditWarning { template_id } => Some(format!(
            "! template #{template_id} is live: only question text, numbers and rubric \
             cells can change. Clone it into a draft to edit its structure."
        )),
        BuilderEvent::SaveStatusChanged(SaveStatus::Saving) => Some("  saving...".to_string()),
        BuilderEvent::SaveStatusChanged(SaveStatus::Saved) => Some("  saved".to_string()),
        BuilderEvent::SaveStatusChanged(SaveStatus::Failed(message)) => {
            Some(format!("  save failed: {message}"))
        }
        BuilderEvent::TemplateCleared => Some("  template no longer exists".to_string()),
        BuilderEvent::FocusQuestionText { question_id } => {
            Some(format!("  question #{question_id} is ready for text"))
        }
        BuilderEvent::QuestionsReordered { count } => Some(format!("  {count} questions reordered")),
        BuilderEvent::CompletenessChanged {
            question_id,
            completeness,
        } => Some(format!("  question #{question_id} rubric {completeness}")),
        _ => None,
    }
}
