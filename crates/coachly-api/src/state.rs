//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both the CLI and the
//! REST API. Core services are generic over repository and vendor traits;
//! AppState pins them to the infra implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use dashmap::DashMap;
use tokio::task::AbortHandle;
use uuid::Uuid;

use coachly_core::chat::controller::{ChatController, ChatSettings};
use coachly_core::coach::service::CoachService;
use coachly_core::feed::MessageFeed;
use coachly_core::generation::reply::CoachReplyGenerator;
use coachly_core::generation::summary::SessionSummarizer;
use coachly_core::session::lifecycle::{PendingSession, SessionLifecycleManager};
use coachly_infra::config::{load_global_config, resolve_data_dir, ApiKeys};
use coachly_infra::llm::AnthropicProvider;
use coachly_infra::sqlite::coach::SqliteCoachRepository;
use coachly_infra::sqlite::conversation::SqliteConversationRepository;
use coachly_infra::sqlite::message::SqliteMessageRepository;
use coachly_infra::sqlite::pool::{database_url, DatabasePool};
use coachly_infra::video::TavusClient;
use coachly_types::config::GlobalConfig;
use coachly_types::conversation::ConversationId;
use coachly_types::error::SessionError;
use coachly_types::user::UserId;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteReplyService = CoachReplyGenerator<Arc<AnthropicProvider>, TavusClient>;

pub type ConcreteSummaryService = SessionSummarizer<SqliteMessageRepository, Arc<AnthropicProvider>>;

pub type ConcreteSessionManager = SessionLifecycleManager<
    SqliteConversationRepository,
    SqliteMessageRepository,
    SqliteCoachRepository,
    ConcreteSummaryService,
>;

pub type ConcreteCoachService = CoachService<SqliteCoachRepository>;

pub type ConcreteChat = ChatController<
    SqliteConversationRepository,
    SqliteMessageRepository,
    Arc<ConcreteReplyService>,
>;

/// Open chats untouched for this long are dropped from the cache.
const CHAT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// An open chat plus the task merging feed pushes into it.
pub struct LiveChat {
    pub controller: Arc<ConcreteChat>,
    follower: AbortHandle,
    last_used: Instant,
}

impl Drop for LiveChat {
    fn drop(&mut self) {
        self.follower.abort();
    }
}

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub coach_service: Arc<ConcreteCoachService>,
    pub session_manager: Arc<ConcreteSessionManager>,
    pub replies: Arc<ConcreteReplyService>,
    pub coaches: SqliteCoachRepository,
    pub conversations: SqliteConversationRepository,
    pub messages: SqliteMessageRepository,
    pub feed: MessageFeed,
    /// Recap offers awaiting a decision, keyed by `PendingSession::id`.
    /// At most one per session key.
    pub pending: Arc<DashMap<Uuid, PendingSession>>,
    /// Open chats, one controller per conversation.
    pub chats: Arc<DashMap<ConversationId, LiveChat>>,
    pub chat_idle_timeout: Duration,
    pub config: Arc<GlobalConfig>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize from the default data directory and the environment.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_global_config(&data_dir).await;
        Self::open(data_dir, config, ApiKeys::from_env()).await
    }

    /// Connect to the database under `data_dir` and wire services.
    pub async fn open(data_dir: PathBuf, config: GlobalConfig, keys: ApiKeys) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let db_url = format!("{}?mode=rwc", database_url(&data_dir));
        let db_pool = DatabasePool::new(&db_url)
            .await
            .context("failed to open database")?;

        let feed = MessageFeed::default();
        let coaches = SqliteCoachRepository::new(db_pool.clone());
        let conversations = SqliteConversationRepository::new(db_pool.clone());
        let messages = SqliteMessageRepository::new(db_pool.clone(), feed.clone());

        let llm = keys
            .anthropic
            .map(|key| AnthropicProvider::new(key, config.anthropic_base_url.as_str()))
            .transpose()?
            .map(Arc::new);
        let video = keys
            .tavus
            .map(|key| TavusClient::new(key, &config.video))
            .transpose()?;

        if llm.is_none() {
            tracing::warn!("ANTHROPIC_API_KEY is not set; coach replies and recaps are disabled");
        }

        let replies = Arc::new(CoachReplyGenerator::new(llm.clone(), video, &config));
        let summaries = SessionSummarizer::new(messages.clone(), llm, &config);
        let session_manager = SessionLifecycleManager::new(
            conversations.clone(),
            messages.clone(),
            coaches.clone(),
            summaries,
        );

        Ok(Self {
            coach_service: Arc::new(CoachService::new(coaches.clone())),
            session_manager: Arc::new(session_manager),
            replies,
            coaches,
            conversations,
            messages,
            feed,
            pending: Arc::new(DashMap::new()),
            chats: Arc::new(DashMap::new()),
            chat_idle_timeout: CHAT_IDLE_TIMEOUT,
            config: Arc::new(config),
            data_dir,
        })
    }

    /// The open chat for a conversation, loading it on first use.
    pub async fn chat(&self, id: &ConversationId) -> Result<Arc<ConcreteChat>, SessionError> {
        if let Some(mut live) = self.chats.get_mut(id) {
            live.last_used = Instant::now();
            return Ok(live.controller.clone());
        }

        // Subscribe before loading so nothing inserted in between is missed.
        let subscription = self.feed.subscribe(*id);
        let controller = Arc::new(
            ChatController::open(
                self.conversations.clone(),
                self.messages.clone(),
                &self.coaches,
                self.replies.clone(),
                ChatSettings::from_config(&self.config),
                id,
            )
            .await?,
        );

        let live = self.chats.entry(*id).or_insert_with(|| {
            let follower = {
                let controller = controller.clone();
                tokio::spawn(async move { controller.follow(subscription).await }).abort_handle()
            };
            LiveChat {
                controller,
                follower,
                last_used: Instant::now(),
            }
        });
        Ok(live.controller.clone())
    }

    /// Drop the cached chat for a conversation, stopping its feed follower.
    pub fn close_chat(&self, id: &ConversationId) {
        self.chats.remove(id);
    }

    /// Park a recap offer, replacing any earlier offer for the same key.
    pub fn park_offer(&self, offer: PendingSession) {
        self.pending.retain(|id, parked| {
            let superseded = parked.key == offer.key && *id != offer.id;
            if superseded {
                tracing::debug!(pending_id = %id, "recap offer superseded");
            }
            !superseded
        });
        self.pending.insert(offer.id, offer);
    }

    /// Take the offer `id` if `user` owns it.
    pub fn take_offer(&self, id: &Uuid, user: &UserId) -> Option<PendingSession> {
        self.pending
            .remove_if(id, |_, offer| offer.key.user_id == *user)
            .map(|(_, offer)| offer)
    }

    /// Drop chats unused for `chat_idle_timeout`. Returns how many went.
    pub fn sweep(&self) -> usize {
        let before = self.chats.len();
        let idle = self.chat_idle_timeout;
        self.chats.retain(|_, live| live.last_used.elapsed() < idle);
        let evicted = before.saturating_sub(self.chats.len());
        if evicted > 0 {
            tracing::debug!(evicted, "evicted idle chats");
        }
        evicted
    }

    /// Run [`sweep`](Self::sweep) periodically until the returned task is aborted.
    pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                state.sweep();
            }
        })
    }

    /// The local user for CLI commands, created on first use.
    pub async fn local_user(&self) -> anyhow::Result<UserId> {
        local_user_id(&self.data_dir).await
    }
}

async fn local_user_id(data_dir: &Path) -> anyhow::Result<UserId> {
    let path = data_dir.join("user_id");
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => content
            .trim()
            .parse::<UserId>()
            .with_context(|| format!("invalid user id in {}", path.display())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let user = UserId::new();
            tokio::fs::write(&path, user.to_string())
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(user_id = %user, "created local user");
            Ok(user)
        }
        Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
    }
}
