//! Terminal chat client
//!
//! Sends one message through the relay and renders the answer as it streams:
//! assistant text on stdout, agent steps on stderr. Ctrl-C cancels.

use agent_stream::config::ClientConfig;
use agent_stream::transport::{HttpTransport, LoggingTransport};
use agent_stream::{ConvState, SessionController, SessionOutcome, StepStatus};
use std::collections::HashMap;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agent_stream=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
        .init();

    let message = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if message.trim().is_empty() {
        eprintln!("usage: agent-chat <message>");
        return Ok(ExitCode::from(2));
    }

    let config = ClientConfig::from_env()?;
    let transport = LoggingTransport::new(HttpTransport::new(&config)?);
    let controller = Arc::new(SessionController::new(transport));

    let mut rx = controller.subscribe();
    let renderer = tokio::spawn(async move {
        let mut view = Renderer::default();
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            view.render(&state);
        }
        view
    });

    let canceller = tokio::spawn({
        let controller = controller.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                controller.cancel();
            }
        }
    });

    let outcome = controller.submit(&message).await;
    canceller.abort();
    let _ = canceller.await;

    // The renderer stops once the last handle to the controller is gone
    let final_state = controller.snapshot();
    drop(controller);
    let mut view = renderer.await?;
    view.render(&final_state);
    Renderer::finish(&final_state);

    Ok(match outcome {
        SessionOutcome::Completed | SessionOutcome::Cancelled => ExitCode::SUCCESS,
        SessionOutcome::Failed(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
        SessionOutcome::Rejected => ExitCode::from(2),
    })
}

/// Prints only what changed since the previous snapshot
#[derive(Default)]
struct Renderer {
    printed: usize,
    steps: HashMap<String, (String, StepStatus)>,
}

impl Renderer {
    fn render(&mut self, state: &ConvState) {
        for step in &state.steps {
            let current = (step.title.clone(), step.status);
            if self.steps.get(&step.id) != Some(&current) {
                let marker = match step.status {
                    StepStatus::Started => "..",
                    StepStatus::Completed => "ok",
                };
                eprintln!("[{marker}] {}", step.title);
                self.steps.insert(step.id.clone(), current);
            }
        }

        let text = state.last_assistant_text().unwrap_or("");
        if let Some(delta) = text.get(self.printed..) {
            if !delta.is_empty() {
                print!("{delta}");
                let _ = std::io::stdout().flush();
                self.printed = text.len();
            }
        }
    }

    fn finish(state: &ConvState) {
        if state.last_assistant_text().is_some_and(|t| !t.is_empty()) {
            println!();
        }
    }
}
