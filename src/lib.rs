pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod terminal;

use adapters::openai::OpenAIAssistants;
use adapters::tools::cat::CatImageTool;
use config::ConfigManager;
use domain::conversation::ConversationDriver;
use domain::models::AssistantSpec;
use domain::ports::Renderer;
use domain::tools::ToolRegistry;
use error::Result;
use std::sync::Arc;
use std::time::Duration;
use terminal::TerminalRenderer;
use tokio::io::{AsyncBufReadExt, BufReader};

pub const TITLE: &str = "CatChat";
const INPUT_PLACEHOLDER: &str = "What cat?";

pub async fn run() -> Result<()> {
    let mut manager = ConfigManager::new();
    let cwd = std::env::current_dir()?;
    manager.load(Some(cwd.as_path()))?;
    let config = manager.config().clone();

    logging::init(config.log_level())?;

    let openai = config.openai();
    let service = Arc::new(OpenAIAssistants::new(
        config.openai_api_key()?,
        openai.base_url,
        openai.timeout.map(Duration::from_secs),
    )?);

    let cat_tool = CatImageTool::new(
        config.cat_api_url()?,
        config.cat().timeout.map(Duration::from_secs),
    )?;
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(cat_tool))?;

    let assistant = config.assistant();
    let spec = AssistantSpec {
        name: assistant.name,
        description: assistant.description,
        model: config.model().to_string(),
        instructions: assistant.instructions,
    };

    let mut renderer = TerminalRenderer::stdout();
    renderer.render_title(TITLE);

    let mut driver = ConversationDriver::start(service, registry, spec).await?;

    // Lines typed while a run streams wait in stdin until the turn is over
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        renderer.prompt(INPUT_PLACEHOLDER);
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/history" => driver.render_history(&mut renderer),
            prompt => {
                // Failures are already on screen; the next line is a retry
                let _ = driver.send(prompt, &mut renderer).await;
            }
        }
    }

    tracing::info!(entries = driver.session().transcript.len(), "session ended");
    Ok(())
}
