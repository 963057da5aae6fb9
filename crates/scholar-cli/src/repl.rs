//! The interactive read-eval loop
//!
//! rustyline provides line editing, persistent history, and completion of
//! the `@` and `/` input forms; chat events are rendered with console
//! styling as they arrive.

use console::style;
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Config, Context, Editor, Helper};

use scholar_core::chat::{ChatEvent, ChatLoop, LoopControl};
use scholar_core::sessions::SessionManager;

const HISTORY_FILE: &str = ".scholar_history";
const MAX_TOOL_OUTPUT_CHARS: usize = 200;

/// Completion over the marker forms and known capability names
pub struct ReplHelper {
    candidates: Vec<String>,
}

impl ReplHelper {
    fn new(candidates: Vec<String>) -> Self {
        Self { candidates }
    }
}

impl Completer for ReplHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        let prefix = &line[..pos];
        if !prefix.starts_with('@') && !prefix.starts_with('/') {
            return Ok((0, Vec::new()));
        }

        let matches = self
            .candidates
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect();

        Ok((0, matches))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;
}

impl Highlighter for ReplHelper {}
impl Validator for ReplHelper {}
impl Helper for ReplHelper {}

/// Completion candidates from the aggregated capability namespace
fn completion_candidates(sessions: &SessionManager) -> Vec<String> {
    let mut candidates = vec!["/prompts".to_string(), "/prompt ".to_string()];

    for prompt in sessions.prompts() {
        candidates.push(format!("/prompt {}", prompt.name));
    }

    for resource in sessions.resources() {
        if let Some(key) = resource.uri.strip_prefix("papers://") {
            candidates.push(format!("@{}", key));
        }
    }

    candidates.sort();
    candidates
}

/// Run the interactive loop until the user quits
pub async fn run(chat: &mut ChatLoop) -> anyhow::Result<()> {
    let config = Config::builder().auto_add_history(true).build();
    let mut rl: Editor<ReplHelper, DefaultHistory> = Editor::with_config(config)?;
    rl.set_helper(Some(ReplHelper::new(completion_candidates(chat.sessions()))));

    let history_path = dirs::home_dir().map(|home| home.join(HISTORY_FILE));
    if let Some(path) = &history_path {
        let _ = rl.load_history(path);
    }

    loop {
        match rl.readline("query> ") {
            Ok(line) => match chat.handle_input(&line, &mut render_event).await {
                Ok(LoopControl::Quit) => break,
                Ok(LoopControl::Continue) => {}
                Err(e) => {
                    // The round is lost, the conversation is not
                    eprintln!("{} {}", style("Error:").red().bold(), e);
                }
            },
            Err(ReadlineError::Interrupted) => {
                println!("(To exit, type 'quit' or press Ctrl-D)");
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    if let Some(path) = &history_path {
        let _ = rl.save_history(path);
    }

    Ok(())
}

fn render_event(event: ChatEvent) {
    match event {
        ChatEvent::AssistantText(text) => {
            println!("{}", text);
        }
        ChatEvent::ToolCallStarted {
            name, arguments, ..
        } => {
            println!(
                "{} {} {}",
                style("tool>").magenta(),
                style(&name).bold(),
                style(arguments.to_string()).dim()
            );
        }
        ChatEvent::ToolCallFinished {
            name,
            success,
            output,
            ..
        } => {
            let marker = if success {
                style("ok").green()
            } else {
                style("failed").red()
            };
            println!(
                "{} {} [{}] {}",
                style("tool>").magenta(),
                style(&name).bold(),
                marker,
                style(truncate(&output, MAX_TOOL_OUTPUT_CHARS)).dim()
            );
        }
        ChatEvent::ResourceContent { uri, text } => {
            println!();
            println!("{} {}", style("Resource:").bold(), uri);
            println!("{}", text);
        }
        ChatEvent::PromptList(prompts) => {
            if prompts.is_empty() {
                println!("No prompts available.");
                return;
            }
            println!("\nAvailable prompts:");
            for prompt in prompts {
                println!(
                    "- {}: {}",
                    style(&prompt.name).bold(),
                    prompt.description.as_deref().unwrap_or("")
                );
                for arg in &prompt.arguments {
                    let required = if arg.required { " (required)" } else { "" };
                    println!("    {}{}", arg.name, required);
                }
            }
            println!();
        }
        ChatEvent::PromptInjected { name } => {
            println!("{}", style(format!("Running prompt '{}'...", name)).dim());
        }
        ChatEvent::Notice(message) => {
            println!("{}", style(message).yellow());
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let flattened = text.replace('\n', " ");
    if flattened.chars().count() <= max_chars {
        return flattened;
    }
    let cut: String = flattened.chars().take(max_chars).collect();
    format!("{}... (truncated)", cut)
}
