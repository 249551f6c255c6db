//! Service wiring
//!
//! The daemon's services are constructed once, explicitly, in dependency
//! order; handlers and the CLI receive what they need by construction.
//! There is no service locator. Per-task resources live in a [`TaskScope`]
//! and are released in reverse creation order when the task ends.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::Config;
use crate::llm::ProviderFactory;
use crate::persist::{FileArchiver, LanguageMapper, PersistenceSink, Repository};
use crate::progress::ProgressBus;
use crate::prompts::PromptLibrary;
use crate::registry::TaskRegistry;
use crate::workflow::Orchestrator;

/// The daemon's singleton services
pub struct Services {
    pub config: Config,
    pub registry: Arc<TaskRegistry>,
    pub bus: Arc<ProgressBus>,
    pub factory: Arc<ProviderFactory>,
    pub prompts: Arc<PromptLibrary>,
    pub repository: Arc<dyn Repository>,
    pub sink: Arc<PersistenceSink>,
    pub archiver: Arc<FileArchiver>,
    pub orchestrator: Arc<Orchestrator>,
}

impl Services {
    /// Wire every service from configuration and a repository
    ///
    /// The heartbeat timer starts with the bus; callers hold the returned
    /// struct for the daemon's lifetime.
    pub fn build(config: Config, repository: Arc<dyn Repository>) -> eyre::Result<Self> {
        let registry = Arc::new(TaskRegistry::new(config.limits.task_ttl()));
        let bus = Arc::new(ProgressBus::new(
            crate::progress::bus::DEFAULT_RING_CAPACITY,
            config.limits.heartbeat_interval(),
        ));
        ProgressBus::spawn_heartbeats(&bus);

        let factory = Arc::new(
            ProviderFactory::from_configs(&config.effective_providers())
                .map_err(|e| eyre::eyre!("failed to build providers: {}", e))?,
        );
        let prompts = Arc::new(PromptLibrary::new(config.storage.prompt_directory.clone()));
        let languages = LanguageMapper::with_overrides(&config.language_overrides);
        let sink = Arc::new(PersistenceSink::new(repository.clone(), languages.clone()));
        let archiver = Arc::new(FileArchiver::new(config.storage.archive_directory.clone()));

        let orchestrator = Arc::new(Orchestrator::new(
            registry.clone(),
            bus.clone(),
            factory.clone(),
            prompts.clone(),
            repository.clone(),
            sink.clone(),
            archiver.clone(),
            languages,
            config.workflow.clone(),
            config.limits.clone(),
        ));

        // Finished tasks stay queryable for the TTL, then fall out of the
        // registry along with their progress channels
        let gc = orchestrator.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(3600));
            tick.tick().await;
            loop {
                tick.tick().await;
                gc.gc();
            }
        });

        Ok(Self {
            config,
            registry,
            bus,
            factory,
            prompts,
            repository,
            sink,
            archiver,
            orchestrator,
        })
    }
}

/// Per-task resources with deterministic teardown
///
/// Cleanups run in reverse creation order, on [`close`](TaskScope::close)
/// or on drop, whichever comes first.
pub struct TaskScope {
    task_id: String,
    cleanups: Vec<(&'static str, Box<dyn FnOnce() + Send>)>,
}

impl TaskScope {
    pub fn new(task_id: &str) -> Self {
        debug!(%task_id, "Opening task scope");
        Self {
            task_id: task_id.to_string(),
            cleanups: Vec::new(),
        }
    }

    /// Register a cleanup to run when the scope closes
    pub fn defer(&mut self, label: &'static str, cleanup: impl FnOnce() + Send + 'static) {
        self.cleanups.push((label, Box::new(cleanup)));
    }

    /// Close the scope, running cleanups newest-first
    pub fn close(mut self) {
        self.run_cleanups();
    }

    fn run_cleanups(&mut self) {
        while let Some((label, cleanup)) = self.cleanups.pop() {
            debug!(task_id = %self.task_id, %label, "Task scope cleanup");
            cleanup();
        }
    }
}

impl Drop for TaskScope {
    fn drop(&mut self) {
        self.run_cleanups();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn test_scope_runs_cleanups_in_reverse_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut scope = TaskScope::new("t-1");

        for label in ["first", "second", "third"] {
            let order = order.clone();
            scope.defer("entry", move || order.lock().unwrap().push(label));
        }
        scope.close();

        assert_eq!(*order.lock().unwrap(), vec!["third", "second", "first"]);
    }

    #[test]
    fn test_scope_cleans_up_on_drop() {
        let count = Arc::new(AtomicUsize::new(0));
        {
            let mut scope = TaskScope::new("t-1");
            let count = count.clone();
            scope.defer("counter", move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
            // Dropped without close()
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_build_services_with_memory_repository() {
        let repository = Arc::new(crate::persist::repository::memory::MemoryRepository::new());
        let mut config = Config::default();
        // No real provider credentials in tests
        config.providers = vec![];
        config.storage.archive_directory = tempfile::tempdir().unwrap().keep();

        // Default providers read API keys from the environment; absent keys
        // must surface as a build error, not a panic
        let result = Services::build(config, repository);
        if std::env::var("ANTHROPIC_API_KEY").is_err() || std::env::var("OPENAI_API_KEY").is_err() {
            assert!(result.is_err());
        }
    }
}
