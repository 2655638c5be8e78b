//! In-memory fakes shared by the unit tests of this crate.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use coachly_types::coach::{Coach, CoachId};
use coachly_types::conversation::{
    Conversation, ConversationId, ConversationStatus, SessionKey, SessionKind,
};
use coachly_types::error::RepositoryError;
use coachly_types::llm::{CompletionRequest, CompletionResponse, LlmError, StopReason, Usage};
use coachly_types::message::{Message, SenderType};
use coachly_types::reply::{
    CoachReply, CoachReplyRequest, GenerationError, VideoConversation, VideoConversationRequest,
};
use coachly_types::user::UserId;

use crate::feed::MessageFeed;
use crate::generation::provider::{LlmProvider, VideoSessionProvider};
use crate::generation::reply::CoachReplyService;
use crate::generation::summary::SummaryService;
use crate::repository::SortOrder;
use crate::repository::coach::{CoachFilter, CoachRepository, CoachSort};
use crate::repository::conversation::ConversationRepository;
use crate::repository::message::MessageRepository;

pub fn sample_coach(creator: UserId) -> Coach {
    let now = Utc::now();
    Coach {
        id: CoachId::new(),
        creator_id: creator,
        name: "Sarah".to_string(),
        title: "Productivity Coach".to_string(),
        description: "I help people build routines that stick.".to_string(),
        avatar_url: None,
        specialties: vec!["habits".to_string()],
        personality_traits: vec!["warm".to_string()],
        system_prompt: "You are Sarah, a productivity coach.".to_string(),
        video_persona_id: None,
        is_public: true,
        use_count: 0,
        created_at: now,
        updated_at: now,
    }
}

#[derive(Default)]
struct StoreState {
    coaches: Vec<Coach>,
    conversations: Vec<Conversation>,
    messages: Vec<Message>,
    failing: HashSet<&'static str>,
    /// Successes left before an operation starts failing.
    fail_after: HashMap<&'static str, usize>,
    calls: usize,
}

/// One store implementing all three repositories, with per-operation
/// failure injection and a call counter.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
    feed: Option<MessageFeed>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(feed: MessageFeed) -> Self {
        Self {
            state: Arc::default(),
            feed: Some(feed),
        }
    }

    /// Make every later call to `op` fail with a query error.
    pub fn fail(&self, op: &'static str) {
        self.state.lock().unwrap().failing.insert(op);
    }

    /// Let `op` succeed `successes` more times, then fail.
    pub fn fail_after(&self, op: &'static str, successes: usize) {
        self.state.lock().unwrap().fail_after.insert(op, successes);
    }

    /// Total repository calls made so far.
    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    pub fn seed_coach(&self, coach: Coach) {
        self.state.lock().unwrap().coaches.push(coach);
    }

    pub fn seed_conversation(&self, conversation: Conversation) {
        self.state.lock().unwrap().conversations.push(conversation);
    }

    pub fn seed_message(&self, message: Message) {
        self.state.lock().unwrap().messages.push(message);
    }

    pub fn coach(&self, id: &CoachId) -> Option<Coach> {
        self.state.lock().unwrap().coaches.iter().find(|c| c.id == *id).cloned()
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.state.lock().unwrap().conversations.clone()
    }

    pub fn messages_for(&self, id: &ConversationId) -> Vec<Message> {
        let state = self.state.lock().unwrap();
        let mut messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| m.conversation_id == *id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        messages
    }

    fn check(&self, op: &'static str) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if let Some(left) = state.fail_after.get_mut(op) {
            if *left == 0 {
                return Err(RepositoryError::Query(format!("injected failure: {op}")));
            }
            *left -= 1;
        }
        if state.failing.contains(op) {
            return Err(RepositoryError::Query(format!("injected failure: {op}")));
        }
        Ok(())
    }

    fn latest_matching(
        &self,
        key: &SessionKey,
        status: Option<ConversationStatus>,
    ) -> Option<Conversation> {
        let state = self.state.lock().unwrap();
        state
            .conversations
            .iter()
            .filter(|c| c.key() == *key && status.is_none_or(|s| c.status == s))
            .max_by_key(|c| c.session_number)
            .cloned()
    }
}

impl CoachRepository for InMemoryStore {
    async fn create(&self, coach: &Coach) -> Result<Coach, RepositoryError> {
        self.check("coach.create")?;
        self.state.lock().unwrap().coaches.push(coach.clone());
        Ok(coach.clone())
    }

    async fn get_by_id(&self, id: &CoachId) -> Result<Option<Coach>, RepositoryError> {
        self.check("coach.get")?;
        Ok(self.coach(id))
    }

    async fn list(&self, filter: &CoachFilter) -> Result<Vec<Coach>, RepositoryError> {
        self.check("coach.list")?;
        let state = self.state.lock().unwrap();
        let mut coaches: Vec<Coach> = state
            .coaches
            .iter()
            .filter(|c| filter.is_public.is_none_or(|p| c.is_public == p))
            .filter(|c| filter.creator_id.is_none_or(|u| c.creator_id == u))
            .cloned()
            .collect();
        match filter.sort_by {
            CoachSort::CreatedAt => coaches.sort_by_key(|c| c.created_at),
            CoachSort::UseCount => coaches.sort_by_key(|c| c.use_count),
        }
        if filter.sort_order == SortOrder::Desc {
            coaches.reverse();
        }
        if let Some(limit) = filter.limit {
            coaches.truncate(limit as usize);
        }
        Ok(coaches)
    }

    async fn update(&self, coach: &Coach) -> Result<Coach, RepositoryError> {
        self.check("coach.update")?;
        let mut state = self.state.lock().unwrap();
        let slot = state
            .coaches
            .iter_mut()
            .find(|c| c.id == coach.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = coach.clone();
        Ok(coach.clone())
    }

    async fn delete(&self, id: &CoachId) -> Result<(), RepositoryError> {
        self.check("coach.delete")?;
        let mut state = self.state.lock().unwrap();
        state.coaches.retain(|c| c.id != *id);
        let removed: HashSet<ConversationId> = state
            .conversations
            .iter()
            .filter(|c| c.coach_id == *id)
            .map(|c| c.id)
            .collect();
        state.conversations.retain(|c| c.coach_id != *id);
        state.messages.retain(|m| !removed.contains(&m.conversation_id));
        Ok(())
    }

    async fn increment_use_count(&self, id: &CoachId) -> Result<(), RepositoryError> {
        self.check("coach.increment")?;
        let mut state = self.state.lock().unwrap();
        let coach = state
            .coaches
            .iter_mut()
            .find(|c| c.id == *id)
            .ok_or(RepositoryError::NotFound)?;
        coach.use_count += 1;
        Ok(())
    }
}

impl ConversationRepository for InMemoryStore {
    async fn create(&self, conversation: &Conversation) -> Result<Conversation, RepositoryError> {
        self.check("conversation.create")?;
        self.state
            .lock()
            .unwrap()
            .conversations
            .push(conversation.clone());
        Ok(conversation.clone())
    }

    async fn get(&self, id: &ConversationId) -> Result<Option<Conversation>, RepositoryError> {
        self.check("conversation.get")?;
        let state = self.state.lock().unwrap();
        Ok(state.conversations.iter().find(|c| c.id == *id).cloned())
    }

    async fn find_active(&self, key: &SessionKey) -> Result<Option<Conversation>, RepositoryError> {
        self.check("conversation.find_active")?;
        Ok(self.latest_matching(key, Some(ConversationStatus::Active)))
    }

    async fn find_latest(&self, key: &SessionKey) -> Result<Option<Conversation>, RepositoryError> {
        self.check("conversation.find_latest")?;
        Ok(self.latest_matching(key, None))
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
        kind: Option<SessionKind>,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        self.check("conversation.list")?;
        let state = self.state.lock().unwrap();
        let mut conversations: Vec<Conversation> = state
            .conversations
            .iter()
            .filter(|c| c.user_id == *user_id && kind.is_none_or(|k| c.kind == k))
            .cloned()
            .collect();
        conversations.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        Ok(conversations)
    }

    async fn update_status(
        &self,
        id: &ConversationId,
        status: ConversationStatus,
    ) -> Result<(), RepositoryError> {
        self.check("conversation.update_status")?;
        let mut state = self.state.lock().unwrap();
        let conversation = state
            .conversations
            .iter_mut()
            .find(|c| c.id == *id)
            .ok_or(RepositoryError::NotFound)?;
        conversation.status = status;
        Ok(())
    }

    async fn touch(&self, id: &ConversationId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        self.check("conversation.touch")?;
        let mut state = self.state.lock().unwrap();
        if let Some(conversation) = state.conversations.iter_mut().find(|c| c.id == *id) {
            conversation.last_message_at = at;
        }
        Ok(())
    }
}

impl MessageRepository for InMemoryStore {
    async fn insert(&self, message: &Message) -> Result<Message, RepositoryError> {
        self.check("message.insert")?;
        self.state.lock().unwrap().messages.push(message.clone());
        if let Some(feed) = &self.feed {
            feed.publish(message);
        }
        Ok(message.clone())
    }

    async fn list(
        &self,
        conversation_id: &ConversationId,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, RepositoryError> {
        self.check("message.list")?;
        let mut messages = self.messages_for(conversation_id);
        if let Some(limit) = limit {
            messages.truncate(limit as usize);
        }
        Ok(messages)
    }

    async fn count(
        &self,
        conversation_id: &ConversationId,
        sender: Option<SenderType>,
    ) -> Result<u32, RepositoryError> {
        self.check("message.count")?;
        let count = self
            .messages_for(conversation_id)
            .iter()
            .filter(|m| sender.is_none_or(|s| m.sender == s))
            .count();
        Ok(count as u32)
    }
}

struct MockLlmState {
    result: Result<String, LlmError>,
    calls: usize,
    last: Option<CompletionRequest>,
}

/// LLM provider answering every request with the same result.
#[derive(Clone)]
pub struct MockLlm {
    state: Arc<Mutex<MockLlmState>>,
}

impl MockLlm {
    fn with_result(result: Result<String, LlmError>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockLlmState {
                result,
                calls: 0,
                last: None,
            })),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::with_result(Ok(text.to_string()))
    }

    pub fn failing(err: LlmError) -> Self {
        Self::with_result(Err(err))
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.state.lock().unwrap().last.clone()
    }
}

impl LlmProvider for MockLlm {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state.last = Some(request.clone());
        let content = state.result.clone()?;
        Ok(CompletionResponse {
            id: "msg_mock".to_string(),
            content,
            model: request.model.clone(),
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
        })
    }
}

/// Video provider that records requests and always succeeds.
#[derive(Clone, Default)]
pub struct MockVideo {
    requests: Arc<Mutex<Vec<VideoConversationRequest>>>,
}

impl MockVideo {
    pub fn requests(&self) -> Vec<VideoConversationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl VideoSessionProvider for MockVideo {
    async fn create_conversation(
        &self,
        request: &VideoConversationRequest,
    ) -> Result<VideoConversation, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(VideoConversation {
            conversation_url: "https://tavus.daily.co/c123".to_string(),
            conversation_id: "c123".to_string(),
        })
    }
}

#[derive(Default)]
struct MockRepliesState {
    scripted: VecDeque<Result<CoachReply, GenerationError>>,
    requests: Vec<CoachReplyRequest>,
}

/// Coach reply service with scripted results. Unscripted calls answer with
/// a fixed text reply. When built with [`MockReplies::gated`], each call
/// waits for the gate to be opened.
#[derive(Clone, Default)]
pub struct MockReplies {
    state: Arc<Mutex<MockRepliesState>>,
    gate: Option<Arc<Notify>>,
}

pub const DEFAULT_REPLY: &str = "Let's work on that together.";

impl MockReplies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let replies = Self {
            state: Arc::default(),
            gate: Some(gate.clone()),
        };
        (replies, gate)
    }

    pub fn push(&self, result: Result<CoachReply, GenerationError>) {
        self.state.lock().unwrap().scripted.push_back(result);
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn requests(&self) -> Vec<CoachReplyRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

impl CoachReplyService for MockReplies {
    async fn reply(&self, request: &CoachReplyRequest) -> Result<CoachReply, GenerationError> {
        let scripted = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request.clone());
            state.scripted.pop_front()
        };
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        scripted.unwrap_or_else(|| {
            Ok(CoachReply::Text {
                content: DEFAULT_REPLY.to_string(),
            })
        })
    }
}

/// Summary service returning a fixed result.
#[derive(Clone)]
pub struct MockSummaries {
    result: Result<String, GenerationError>,
    calls: Arc<Mutex<Vec<ConversationId>>>,
}

impl MockSummaries {
    pub fn returning(summary: &str) -> Self {
        Self {
            result: Ok(summary.to_string()),
            calls: Arc::default(),
        }
    }

    pub fn failing(err: GenerationError) -> Self {
        Self {
            result: Err(err),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<ConversationId> {
        self.calls.lock().unwrap().clone()
    }
}

impl SummaryService for MockSummaries {
    async fn summarize(&self, conversation_id: &ConversationId) -> Result<String, GenerationError> {
        self.calls.lock().unwrap().push(*conversation_id);
        self.result.clone()
    }
}
