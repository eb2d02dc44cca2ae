use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::sync::atomic::AtomicBool;
use std::{io, path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::{mpsc, Mutex};

use agent_knowledge::client::HttpKnowledgeClient;
use agent_knowledge::identity::{AgentIdentityProvider, FileIdentity};
use agent_knowledge::panel::{ChannelConfirmation, ConfirmRequest, IngestSurface, KnowledgePanel};

mod app;
mod stream;

use app::App;
use stream::KnowledgeStream;

fn identity_path() -> PathBuf {
    std::env::var("KB_AGENT_ID_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".agent-knowledge").join("agent_id"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let base_url = std::env::var("KB_SERVER_URL").unwrap_or_else(|_| "http://127.0.0.1:3040".to_string());
    let api_key = std::env::var("KB_API_KEY").ok().filter(|k| !k.is_empty());

    let identity = FileIdentity::load_or_create(identity_path()).context("failed to load agent identity")?;
    let agent = identity.agent_id().clone();

    let client = Arc::new(HttpKnowledgeClient::new(&base_url, api_key));
    let (confirm, prompts) = ChannelConfirmation::new(4);
    let panel = KnowledgePanel::mount(client.clone(), Arc::new(confirm), agent.clone());

    // The event feed refreshes the panel, including after local ingests
    let surface = Arc::new(Mutex::new(IngestSurface::new(client.clone(), agent.clone())));

    let connected = Arc::new(AtomicBool::new(false));
    let stream = KnowledgeStream::new(
        client,
        agent.clone(),
        panel.refresh_handle(),
        panel.view(),
        connected.clone(),
    );
    let h = tokio::spawn(async move { stream.run().await });

    let app = App::new(agent, panel.clone(), surface, connected);
    let r = run_tui(app, prompts).await;

    panel.unmount();
    h.abort();
    r
}

async fn run_tui(mut app: App, mut prompts: mpsc::Receiver<ConfirmRequest>) -> Result<()> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    let tick_rate = Duration::from_millis(100);

    let result = loop {
        while let Ok(request) = prompts.try_recv() {
            app.ask(request);
        }
        if let Err(e) = terminal.draw(|f| app.render(f)) {
            break Err(e.into());
        }
        match event::poll(tick_rate) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if !app.handle_key(key) {
                        break Ok(());
                    }
                }
                Ok(_) => {}
                Err(e) => break Err(e.into()),
            },
            Ok(false) => {}
            Err(e) => break Err(e.into()),
        }
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}
