//! Chat command implementation.

use crate::backends;
use crate::cli::ChatArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use crate::repl::ChatSession;
use carehero_orchestrator::SessionOrchestrator;
use carehero_store::SqliteSessionStore;
use tracing::{info, warn};

/// Execute the chat command.
pub async fn execute_chat(args: ChatArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let mut pipeline = config.pipeline.clone();
    if args.no_discovery {
        pipeline.discovery_enabled = false;
    }

    let services = if pipeline.discovery_enabled {
        match backends::discovery_services(config) {
            Ok(services) => Some(services),
            Err(e) => {
                warn!(error = %e, "Appointment discovery disabled");
                println!(
                    "{}",
                    formatter.warning(&format!(
                        "Appointment search is off: set {} to enable it.",
                        config.search.api_key_env
                    ))
                );
                None
            }
        }
    } else {
        None
    };

    let llm = backends::text_generator(config);
    let history_size = config.settings.history_size;

    match &config.settings.sqlite_path {
        Some(path) => {
            info!(path = %path.display(), "Using SQLite session store");
            let mut store = SqliteSessionStore::new(path)?;
            if pipeline.session_ttl_secs > 0 {
                let purged = store.purge_older_than(pipeline.session_ttl_secs)?;
                info!(purged, "Expired sessions removed");
            }
            let mut orchestrator = SessionOrchestrator::new(store, llm, pipeline)?;
            if let Some(services) = services {
                orchestrator = orchestrator.with_discovery(services);
            }
            ChatSession::new(orchestrator, args.session)
                .run(formatter, history_size)
                .await
        }
        None => {
            let store = pipeline.memory_store();
            let mut orchestrator = SessionOrchestrator::new(store, llm, pipeline)?;
            if let Some(services) = services {
                orchestrator = orchestrator.with_discovery(services);
            }
            ChatSession::new(orchestrator, args.session)
                .run(formatter, history_size)
                .await
        }
    }
}
