//! Send Message use case: the council orchestrator.
//!
//! Entry point for a streaming turn. Picks the pipeline structurally
//! (first user message → council, every later message → chat), routes the
//! execution mode from the budget, drives the stage use cases, persists
//! the completed turn, and triggers retrieval indexing.
//!
//! The turn runs in its own task: the caller holds only the event
//! receiver, and dropping it stops delivery without cancelling the turn.
//! On a stage-fatal failure the turn is fully discarded: nothing is
//! persisted, prior turns are untouched, and a single `error` event is
//! emitted.

use std::sync::Arc;

use chrono::Utc;
use council_domain::{
    ChatPayload, CompleteData, Conversation, ConversationId, DomainError, ExecutionMode, ModelId,
    ModelRegistry, PipelineKind, PromptTemplate, Question, SessionBudgetPolicy, TierCeilings,
    TitleData, TurnEvent, TurnMode, TurnState, TurnStateMachine, Turn, estimate_chat_cost,
    estimate_council_cost, render_context, route,
};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use crate::ports::conversation_store::{ConversationStore, StoreError};
use crate::ports::model_gateway::{ChatMessage, CompletionRequest, GatewayError, ModelGateway};
use crate::ports::turn_logger::TurnLogger;
use crate::retrieval::{RetrievalEngine, TurnDocuments};
use crate::stream::EventSender;
use crate::use_cases::rewrite_query::RewriteQueryUseCase;
use crate::use_cases::run_chat::RunChatUseCase;
use crate::use_cases::run_council::{CouncilError, RunCouncilUseCase};

/// Errors surfaced to the caller of the request surface
#[derive(Error, Debug)]
pub enum SendMessageError {
    #[error("conversation not found: {0}")]
    NotFound(ConversationId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Errors internal to a running turn; their message becomes the `error`
/// event payload.
#[derive(Error, Debug)]
enum TurnError {
    #[error(transparent)]
    Council(#[from] CouncilError),

    #[error("Chairman failed to respond: {0}")]
    Chat(GatewayError),

    #[error(transparent)]
    State(#[from] DomainError),

    #[error("Failed to persist conversation: {0}")]
    Store(#[from] StoreError),
}

/// The orchestrator behind `send_message_stream`.
#[derive(Clone)]
pub struct SendMessageUseCase {
    gateway: Arc<dyn ModelGateway>,
    registry: Arc<ModelRegistry>,
    store: Arc<dyn ConversationStore>,
    retrieval: Arc<RetrievalEngine>,
    logger: Arc<dyn TurnLogger>,
    run_council: RunCouncilUseCase,
    run_chat: RunChatUseCase,
    rewrite: RewriteQueryUseCase,
    utility_model: ModelId,
    tier_ceilings: TierCeilings,
}

impl SendMessageUseCase {
    pub fn new(
        gateway: Arc<dyn ModelGateway>,
        registry: Arc<ModelRegistry>,
        store: Arc<dyn ConversationStore>,
        retrieval: Arc<RetrievalEngine>,
        logger: Arc<dyn TurnLogger>,
        utility_model: ModelId,
        include_self_in_ranking: bool,
    ) -> Self {
        let run_council = RunCouncilUseCase::new(Arc::clone(&gateway), Arc::clone(&registry))
            .with_self_ranking(include_self_in_ranking);
        let run_chat = RunChatUseCase::new(Arc::clone(&gateway), Arc::clone(&registry));
        let rewrite = RewriteQueryUseCase::new(
            Arc::clone(&gateway),
            Arc::clone(&registry),
            utility_model.clone(),
        );

        Self {
            gateway,
            registry,
            store,
            retrieval,
            logger,
            run_council,
            run_chat,
            rewrite,
            utility_model,
            tier_ceilings: TierCeilings::default(),
        }
    }

    /// Override the per-tier retrieval token ceilings.
    pub fn with_tier_ceilings(mut self, ceilings: TierCeilings) -> Self {
        self.tier_ceilings = ceilings;
        self
    }

    /// Create a conversation with the given council and chairman.
    ///
    /// Every model must exist in the registry; the council must not be
    /// empty. A `topic` becomes the initial title and suppresses
    /// automatic title generation on the first turn.
    pub async fn create_conversation(
        &self,
        topic: Option<String>,
        council: Vec<ModelId>,
        chairman: ModelId,
        budget: SessionBudgetPolicy,
    ) -> Result<Conversation, SendMessageError> {
        if council.is_empty() {
            return Err(DomainError::NoCouncilMembers.into());
        }
        for model in council.iter().chain(std::iter::once(&chairman)) {
            self.registry.require(model)?;
        }

        let id = ConversationId::new(format!("conv-{}", Utc::now().timestamp_millis()));
        let mut conversation = Conversation::new(id, council, chairman, budget);
        if let Some(topic) = topic.filter(|t| !t.trim().is_empty()) {
            conversation.title = topic;
        }
        self.store.save(&conversation).await?;
        Ok(conversation)
    }

    /// Start a streaming turn and return its event receiver.
    ///
    /// The turn runs to completion regardless of whether the receiver is
    /// kept; disconnecting only stops event delivery.
    pub async fn send_message_stream(
        &self,
        conversation_id: &ConversationId,
        content: &str,
        mode: TurnMode,
        attachment_ids: Vec<String>,
    ) -> Result<UnboundedReceiver<TurnEvent>, SendMessageError> {
        let conversation = self
            .store
            .load(conversation_id)
            .await?
            .ok_or_else(|| SendMessageError::NotFound(conversation_id.clone()))?;
        let question = Question::new(content)?;

        let (events, rx) =
            EventSender::channel(conversation.id.clone(), Arc::clone(&self.logger));

        let this = self.clone();
        tokio::spawn(async move {
            this.run_turn(conversation, question, mode, attachment_ids, events)
                .await;
        });

        Ok(rx)
    }

    async fn run_turn(
        &self,
        conversation: Conversation,
        question: Question,
        mode: TurnMode,
        attachment_ids: Vec<String>,
        events: EventSender,
    ) {
        let pipeline = mode.resolve(conversation.is_first_message());
        let mut state = TurnStateMachine::new(pipeline);

        let result = match pipeline {
            PipelineKind::Council => {
                self.council_turn(conversation, question, attachment_ids, &events, &mut state)
                    .await
            }
            PipelineKind::Chat => {
                self.chat_turn(conversation, question, attachment_ids, &events, &mut state)
                    .await
            }
        };

        match result {
            Ok(total_cost) => {
                events.emit(TurnEvent::Complete {
                    data: Some(CompleteData { total_cost }),
                });
            }
            Err(e) => {
                // Prior turns stay intact; this turn is discarded unsaved
                if state.advance(TurnState::Error).is_err() {
                    warn!("turn failed after reaching a terminal state: {e}");
                }
                events.emit(TurnEvent::Error {
                    message: e.to_string(),
                });
            }
        }
    }

    /// First turn: full council deliberation plus title generation.
    async fn council_turn(
        &self,
        mut conversation: Conversation,
        question: Question,
        attachment_ids: Vec<String>,
        events: &EventSender,
        state: &mut TurnStateMachine,
    ) -> Result<f64, TurnError> {
        self.log_run_plan(&conversation, question.content(), true);

        // Title generation runs concurrently with the pipeline, on the
        // first turn only, and never when a topic title was provided
        let title_task = self.needs_title(&conversation).then(|| {
            tokio::spawn(generate_title(
                Arc::clone(&self.gateway),
                Arc::clone(&self.registry),
                self.utility_model.clone(),
                question.content().to_string(),
            ))
        });

        let outcome = self
            .run_council
            .execute(
                &question,
                &conversation.council,
                &conversation.chairman,
                events,
                state,
            )
            .await?;

        let title_cost = match title_task {
            Some(task) => {
                let (title, cost) = task.await.unwrap_or_else(|e| {
                    warn!("title task panicked: {e}");
                    ("New Conversation".to_string(), 0.0)
                });
                conversation.title = title.clone();
                events.emit(TurnEvent::TitleComplete {
                    data: TitleData { title },
                });
                cost
            }
            None => 0.0,
        };

        let turn_cost = outcome.cost_usd + title_cost;
        conversation.push_turn(Turn::user(question.content(), attachment_ids));
        let crossed = conversation.push_turn(Turn::council(
            outcome.stage1.clone(),
            outcome.stage2,
            outcome.stage3.clone(),
            turn_cost,
        ));
        self.warn_thresholds(&conversation, &crossed);

        self.store.save(&conversation).await?;

        state.advance(TurnState::Indexed)?;
        let turn_index = conversation.assistant_turn_count() - 1;
        let docs = TurnDocuments {
            conversation: &conversation.id,
            turn_index,
            question: question.content(),
            opinions: &outcome.stage1,
            synthesis: Some((&conversation.chairman, &outcome.stage3.response)),
            created_at_ms: Utc::now().timestamp_millis() as u64,
        };
        if let Err(e) = self.retrieval.index_turn(docs).await {
            warn!("indexing failed for completed turn: {e}");
        }

        state.advance(TurnState::Complete)?;
        Ok(conversation.cost_usd)
    }

    /// Follow-up turn: rewrite, retrieve, single chairman call.
    async fn chat_turn(
        &self,
        mut conversation: Conversation,
        question: Question,
        attachment_ids: Vec<String>,
        events: &EventSender,
        state: &mut TurnStateMachine,
    ) -> Result<f64, TurnError> {
        let mode = self.log_run_plan(&conversation, question.content(), false);

        let title_task = self.needs_title(&conversation).then(|| {
            tokio::spawn(generate_title(
                Arc::clone(&self.gateway),
                Arc::clone(&self.registry),
                self.utility_model.clone(),
                question.content().to_string(),
            ))
        });

        state.advance(TurnState::Rewriting)?;
        let prior_answer = conversation
            .last_assistant_turn()
            .map(|t| t.final_text().to_string());
        let rewrite = self
            .rewrite
            .execute(question.content(), prior_answer.as_deref())
            .await;

        state.advance(TurnState::Retrieving)?;
        let chunks = self
            .retrieval
            .retrieve(
                &conversation.id,
                &rewrite.query,
                self.tier_ceilings.ceiling(mode.context_tier),
            )
            .await;
        let context = (!chunks.is_empty()).then(|| render_context(&chunks));
        info!(
            chunks = chunks.len(),
            tier = ?mode.context_tier,
            "retrieved context for chat turn"
        );

        state.advance(TurnState::ChatRunning)?;
        events.emit(TurnEvent::ChatStart);

        let chat = self
            .run_chat
            .execute(
                &conversation.chairman,
                question.content(),
                &conversation.turns,
                context.as_deref(),
                Some(mode.max_output_tokens),
            )
            .await
            .map_err(TurnError::Chat)?;

        state.advance(TurnState::ChatDone)?;
        events.emit(TurnEvent::ChatResponse {
            data: ChatPayload {
                content: chat.content.clone(),
                reasoning: chat.reasoning.clone(),
            },
        });

        let title_cost = match title_task {
            Some(task) => {
                let (title, cost) = task.await.unwrap_or_else(|e| {
                    warn!("title task panicked: {e}");
                    ("New Conversation".to_string(), 0.0)
                });
                conversation.title = title.clone();
                events.emit(TurnEvent::TitleComplete {
                    data: TitleData { title },
                });
                cost
            }
            None => 0.0,
        };

        let turn_cost = chat.cost_usd + rewrite.cost_usd + title_cost;
        conversation.push_turn(Turn::user(question.content(), attachment_ids));
        let crossed =
            conversation.push_turn(Turn::chat(chat.content.clone(), chat.reasoning, turn_cost));
        self.warn_thresholds(&conversation, &crossed);

        self.store.save(&conversation).await?;

        state.advance(TurnState::Indexed)?;
        let turn_index = conversation.assistant_turn_count() - 1;
        let docs = TurnDocuments {
            conversation: &conversation.id,
            turn_index,
            question: question.content(),
            opinions: &[],
            synthesis: Some((&conversation.chairman, &chat.content)),
            created_at_ms: Utc::now().timestamp_millis() as u64,
        };
        if let Err(e) = self.retrieval.index_turn(docs).await {
            warn!("indexing failed for completed turn: {e}");
        }

        state.advance(TurnState::Complete)?;
        Ok(conversation.cost_usd)
    }

    /// Whether this turn should auto-generate a conversation title.
    fn needs_title(&self, conversation: &Conversation) -> bool {
        conversation.is_first_message() && conversation.title == "New Conversation"
    }

    /// Route the execution mode and log the run plan for this turn.
    fn log_run_plan(
        &self,
        conversation: &Conversation,
        query: &str,
        is_council: bool,
    ) -> ExecutionMode {
        let mode = route(
            conversation.budget.spent_usd,
            conversation.budget.budget_usd,
            query,
        );

        let predicted = if is_council {
            let council_pricing: Vec<_> = conversation
                .council
                .iter()
                .map(|m| self.registry.pricing_or_default(m))
                .collect();
            estimate_council_cost(
                &council_pricing,
                &self.registry.pricing_or_default(&conversation.chairman),
            )
        } else {
            estimate_chat_cost(
                mode.mode,
                self.tier_ceilings.ceiling(mode.context_tier),
                &self.registry.pricing_or_default(&conversation.chairman),
            )
        };

        info!(
            mode = mode.mode.as_str(),
            context_tier = ?mode.context_tier,
            reason = mode.reason.as_str(),
            predicted_cost = predicted,
            "run plan"
        );
        mode
    }

    fn warn_thresholds(&self, conversation: &Conversation, crossed: &[f64]) {
        for threshold in crossed {
            warn!(
                conversation = %conversation.id,
                threshold = threshold * 100.0,
                spent_usd = conversation.budget.spent_usd,
                "budget threshold crossed"
            );
        }
    }
}

/// Generate a short conversation title from the first user message.
///
/// Failures fall back to a generic title; the title call must never
/// affect the pipeline.
async fn generate_title(
    gateway: Arc<dyn ModelGateway>,
    registry: Arc<ModelRegistry>,
    utility_model: ModelId,
    question: String,
) -> (String, f64) {
    let request = CompletionRequest::new(
        utility_model.clone(),
        vec![ChatMessage::user(PromptTemplate::title_prompt(&question))],
    );

    match gateway.complete(request).await {
        Ok(completion) => {
            let cost = registry
                .pricing_or_default(&utility_model)
                .cost_usd(&completion.usage);
            let mut title = completion
                .content
                .trim()
                .trim_matches(|c| c == '"' || c == '\'')
                .to_string();
            if title.is_empty() {
                title = "New Conversation".to_string();
            } else if title.len() > 50 {
                let cut = title
                    .char_indices()
                    .take_while(|(i, _)| *i < 47)
                    .map(|(i, c)| i + c.len_utf8())
                    .last()
                    .unwrap_or(0);
                title.truncate(cut);
                title.push_str("...");
            }
            (title, cost)
        }
        Err(e) => {
            warn!("title generation failed: {e}");
            ("New Conversation".to_string(), 0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::turn_logger::NoTurnLogger;
    use crate::retrieval::RetrievalParams;
    use crate::use_cases::testing::{MockGateway, TestEmbedder, TestStore};
    use council_domain::{Model, ModelRole, Pricing, TokenUsage};

    fn registry() -> ModelRegistry {
        let mut models: Vec<Model> = (0..5)
            .map(|i| {
                Model::new(
                    format!("member-{i}"),
                    format!("Member {i}"),
                    Pricing::new(1.0, 5.0),
                )
                .with_role(ModelRole::Both)
            })
            .collect();
        models.push(
            Model::new("chairman", "Chairman", Pricing::new(2.0, 10.0))
                .with_role(ModelRole::Chairman),
        );
        models.push(Model::new("utility", "Utility", Pricing::new(0.1, 0.4)));
        ModelRegistry::new(models)
    }

    fn orchestrator(
        gateway: MockGateway,
    ) -> (Arc<SendMessageUseCase>, Arc<TestStore>, Arc<RetrievalEngine>) {
        let store = Arc::new(TestStore::new());
        let retrieval = Arc::new(RetrievalEngine::new(
            Arc::new(TestEmbedder),
            RetrievalParams::default(),
        ));
        let use_case = SendMessageUseCase::new(
            Arc::new(gateway),
            Arc::new(registry()),
            Arc::clone(&store) as Arc<dyn ConversationStore>,
            Arc::clone(&retrieval),
            Arc::new(NoTurnLogger),
            ModelId::new("utility"),
            true,
        );
        (Arc::new(use_case), store, retrieval)
    }

    fn council(n: usize) -> Vec<ModelId> {
        (0..n).map(|i| ModelId::new(format!("member-{i}"))).collect()
    }

    async fn drain(mut rx: UnboundedReceiver<TurnEvent>) -> Vec<TurnEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                break;
            }
        }
        events
    }

    #[tokio::test]
    async fn test_first_message_runs_council_with_ordered_events() {
        let (orchestrator, store, _retrieval) = orchestrator(MockGateway::new());
        let conversation = orchestrator
            .create_conversation(
                None,
                council(5),
                ModelId::new("chairman"),
                SessionBudgetPolicy::unlimited(),
            )
            .await
            .unwrap();

        let rx = orchestrator
            .send_message_stream(&conversation.id, "How do RAG systems work?", TurnMode::Auto, vec![])
            .await
            .unwrap();
        let events = drain(rx).await;
        let types: Vec<_> = events.iter().map(|e| e.event_type()).collect();

        assert_eq!(
            types,
            vec![
                "stage1_start",
                "stage1_complete",
                "stage2_start",
                "stage2_complete",
                "stage3_start",
                "stage3_complete",
                "title_complete",
                "complete",
            ]
        );

        // The persisted conversation carries both turns and the title
        let saved = store.load(&conversation.id).await.unwrap().unwrap();
        assert_eq!(saved.turns.len(), 2);
        assert_eq!(saved.title, "Mock Conversation Title");
        assert!(saved.cost_usd > 0.0);
        assert!(saved.turns[1].stage3.is_some());
    }

    #[tokio::test]
    async fn test_one_member_timeout_still_completes() {
        let gateway = MockGateway::new();
        gateway.script("member-3", Err(GatewayError::Timeout));
        let (orchestrator, store, _retrieval) = orchestrator(gateway);
        let conversation = orchestrator
            .create_conversation(
                None,
                council(5),
                ModelId::new("chairman"),
                SessionBudgetPolicy::unlimited(),
            )
            .await
            .unwrap();

        let rx = orchestrator
            .send_message_stream(&conversation.id, "question", TurnMode::Auto, vec![])
            .await
            .unwrap();
        let events = drain(rx).await;

        assert_eq!(events.last().unwrap().event_type(), "complete");
        let stage2_meta = events
            .iter()
            .find_map(|e| match e {
                TurnEvent::Stage2Complete { metadata, .. } => Some(metadata),
                _ => None,
            })
            .unwrap();
        // 4 anonymized responses, 4 aggregate entries
        assert_eq!(stage2_meta.label_to_model.len(), 4);
        assert_eq!(stage2_meta.aggregate_rankings.len(), 4);

        let saved = store.load(&conversation.id).await.unwrap().unwrap();
        assert_eq!(saved.turns[1].stage1.as_ref().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_all_members_fail_discards_turn() {
        let gateway = MockGateway::new();
        for i in 0..3 {
            gateway.script(&format!("member-{i}"), Err(GatewayError::Timeout));
        }
        let (orchestrator, store, _retrieval) = orchestrator(gateway);
        let conversation = orchestrator
            .create_conversation(
                None,
                council(3),
                ModelId::new("chairman"),
                SessionBudgetPolicy::unlimited(),
            )
            .await
            .unwrap();

        let rx = orchestrator
            .send_message_stream(&conversation.id, "question", TurnMode::Auto, vec![])
            .await
            .unwrap();
        let events = drain(rx).await;

        assert_eq!(events.last().unwrap().event_type(), "error");
        // Nothing persisted: no partial turn, prior state intact
        let saved = store.load(&conversation.id).await.unwrap().unwrap();
        assert!(saved.turns.is_empty());
        assert_eq!(saved.cost_usd, 0.0);
    }

    #[tokio::test]
    async fn test_follow_up_runs_chat_pipeline_with_retrieval() {
        let gateway = MockGateway::new();
        // Rewrite call resolves the pronoun
        gateway.script(
            "utility",
            Ok(MockGateway::ok("Mock Conversation Title")), // title (first turn)
        );
        gateway.script(
            "utility",
            Ok(MockGateway::ok(
                "What are the limitations of RAG systems?",
            )),
        );
        let (orchestrator, store, retrieval) = orchestrator(gateway);
        let conversation = orchestrator
            .create_conversation(
                None,
                council(3),
                ModelId::new("chairman"),
                SessionBudgetPolicy::unlimited(),
            )
            .await
            .unwrap();

        // First turn: council
        let rx = orchestrator
            .send_message_stream(&conversation.id, "How do RAG systems work?", TurnMode::Auto, vec![])
            .await
            .unwrap();
        drain(rx).await;

        // The completed turn was indexed: question + 3 opinions + synthesis
        assert_eq!(retrieval.chunk_count(&conversation.id), 5);
        let retrieved = retrieval
            .retrieve(&conversation.id, "What are the limitations of RAG systems?", 4_000)
            .await;
        assert!(!retrieved.is_empty());

        // Follow-up: chat pipeline
        let rx = orchestrator
            .send_message_stream(&conversation.id, "what about its limitations?", TurnMode::Auto, vec![])
            .await
            .unwrap();
        let events = drain(rx).await;
        let types: Vec<_> = events.iter().map(|e| e.event_type()).collect();
        assert_eq!(types, vec!["chat_start", "chat_response", "complete"]);

        let saved = store.load(&conversation.id).await.unwrap().unwrap();
        assert_eq!(saved.turns.len(), 4);
        // Chat turn carries no stage payloads
        assert!(saved.turns[3].stage1.is_none());
        assert!(saved.turns[3].stage3.is_none());
        // The chat turn's question and answer were indexed in turn
        assert_eq!(retrieval.chunk_count(&conversation.id), 7);
    }

    #[tokio::test]
    async fn test_chairman_failure_on_chat_turn_discards_turn() {
        let gateway = MockGateway::new();
        // First council turn succeeds; second (chat) chairman call fails
        gateway.script("chairman", Ok(MockGateway::ok("council synthesis")));
        gateway.script("chairman", Err(GatewayError::Timeout));
        let (orchestrator, store, _retrieval) = orchestrator(gateway);
        let conversation = orchestrator
            .create_conversation(
                None,
                council(3),
                ModelId::new("chairman"),
                SessionBudgetPolicy::unlimited(),
            )
            .await
            .unwrap();

        let rx = orchestrator
            .send_message_stream(&conversation.id, "first question", TurnMode::Auto, vec![])
            .await
            .unwrap();
        drain(rx).await;

        let rx = orchestrator
            .send_message_stream(&conversation.id, "follow up?", TurnMode::Auto, vec![])
            .await
            .unwrap();
        let events = drain(rx).await;
        assert_eq!(events.last().unwrap().event_type(), "error");

        // Only the first turn's pair was persisted
        let saved = store.load(&conversation.id).await.unwrap().unwrap();
        assert_eq!(saved.turns.len(), 2);
    }

    #[tokio::test]
    async fn test_create_conversation_validates_models() {
        let (orchestrator, _store, _retrieval) = orchestrator(MockGateway::new());

        let err = orchestrator
            .create_conversation(
                None,
                vec![ModelId::new("nonexistent")],
                ModelId::new("chairman"),
                SessionBudgetPolicy::unlimited(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nonexistent"));

        let err = orchestrator
            .create_conversation(
                None,
                vec![],
                ModelId::new("chairman"),
                SessionBudgetPolicy::unlimited(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SendMessageError::Domain(DomainError::NoCouncilMembers)
        ));
    }

    #[tokio::test]
    async fn test_unknown_conversation_rejected() {
        let (orchestrator, _store, _retrieval) = orchestrator(MockGateway::new());
        let err = orchestrator
            .send_message_stream(
                &ConversationId::new("missing"),
                "hello",
                TurnMode::Auto,
                vec![],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SendMessageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_subscriber_disconnect_does_not_abort_turn() {
        let (orchestrator, store, _retrieval) = orchestrator(MockGateway::new());
        let conversation = orchestrator
            .create_conversation(
                None,
                council(3),
                ModelId::new("chairman"),
                SessionBudgetPolicy::unlimited(),
            )
            .await
            .unwrap();

        let rx = orchestrator
            .send_message_stream(&conversation.id, "question", TurnMode::Auto, vec![])
            .await
            .unwrap();
        drop(rx);

        // The turn still completes and is durably recorded
        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            let saved = store.load(&conversation.id).await.unwrap().unwrap();
            if saved.turns.len() == 2 {
                return;
            }
        }
        panic!("turn was not persisted after subscriber disconnect");
    }

    #[tokio::test]
    async fn test_turn_costs_accumulate_into_budget() {
        let (orchestrator, store, _retrieval) = orchestrator(MockGateway::new());
        let conversation = orchestrator
            .create_conversation(
                None,
                council(3),
                ModelId::new("chairman"),
                SessionBudgetPolicy::new(Some(10.0)),
            )
            .await
            .unwrap();

        let rx = orchestrator
            .send_message_stream(&conversation.id, "question", TurnMode::Auto, vec![])
            .await
            .unwrap();
        let events = drain(rx).await;

        let total = events
            .iter()
            .find_map(|e| match e {
                TurnEvent::Complete { data: Some(d) } => Some(d.total_cost),
                _ => None,
            })
            .unwrap();
        assert!(total > 0.0);

        let saved = store.load(&conversation.id).await.unwrap().unwrap();
        assert!((saved.budget.spent_usd - total).abs() < 1e-9);
        assert_eq!(saved.cost_usd, saved.budget.spent_usd);

        // Usage was recorded on the mock calls
        let usage: TokenUsage = saved.turns[1]
            .stage1
            .as_ref()
            .unwrap()
            .iter()
            .fold(TokenUsage::default(), |acc, r| acc.add(&r.usage));
        assert!(usage.total() > 0);
    }
}
