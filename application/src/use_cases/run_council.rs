//! Run Council use case
//!
//! Drives the 3-stage deliberation pipeline: parallel stage-1 answers,
//! parallel anonymized peer ranking, chairman synthesis. Lifecycle events
//! are emitted through the turn's [`EventSender`], and legality of each
//! phase transition is enforced by the caller-owned [`TurnStateMachine`].

use std::collections::BTreeMap;
use std::sync::Arc;

use council_domain::{
    AggregateEntry, ConfidenceScore, DomainError, LabelMap, ModelId, ModelRegistry,
    PromptTemplate, Question, Stage1Response, Stage2Ranking, Stage3Result, TurnEvent, TurnState,
    TurnStateMachine, aggregate_rankings, consensus_metrics,
    council::confidence::overall_confidence, orchestration::event::Stage2Metadata,
    parse_ranking_labels,
};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::ports::model_gateway::{
    ChatMessage, CompletionRequest, GatewayError, ModelGateway,
};
use crate::stream::EventSender;

/// Errors that abort a council turn
#[derive(Error, Debug)]
pub enum CouncilError {
    #[error("No council members configured")]
    NoMembers,

    #[error("All council members failed to respond")]
    AllMembersFailed,

    #[error("Chairman failed to synthesize: {0}")]
    SynthesisFailed(GatewayError),

    #[error(transparent)]
    State(#[from] DomainError),
}

/// Complete result of a council deliberation
#[derive(Debug, Clone)]
pub struct CouncilOutcome {
    pub stage1: Vec<Stage1Response>,
    /// Members whose stage-1 call failed terminally, with the reason
    pub failed_members: Vec<(ModelId, String)>,
    pub labels: LabelMap,
    pub stage2: Vec<Stage2Ranking>,
    pub aggregate: Vec<AggregateEntry>,
    pub confidence: ConfidenceScore,
    pub avg_consensus: f64,
    pub stage3: Stage3Result,
    /// Total cost of all stage calls in USD
    pub cost_usd: f64,
}

/// Use case for running a full council deliberation
#[derive(Clone)]
pub struct RunCouncilUseCase {
    gateway: Arc<dyn ModelGateway>,
    registry: Arc<ModelRegistry>,
    include_self_in_ranking: bool,
}

impl RunCouncilUseCase {
    pub fn new(gateway: Arc<dyn ModelGateway>, registry: Arc<ModelRegistry>) -> Self {
        Self {
            gateway,
            registry,
            include_self_in_ranking: true,
        }
    }

    /// Whether evaluators see a resubmitted anonymized copy of their own
    /// stage-1 answer (on by default).
    pub fn with_self_ranking(mut self, include: bool) -> Self {
        self.include_self_in_ranking = include;
        self
    }

    /// Execute the pipeline, emitting stage events as each phase resolves.
    pub async fn execute(
        &self,
        question: &Question,
        council: &[ModelId],
        chairman: &ModelId,
        events: &EventSender,
        state: &mut TurnStateMachine,
    ) -> Result<CouncilOutcome, CouncilError> {
        if council.is_empty() {
            return Err(CouncilError::NoMembers);
        }

        info!(members = council.len(), %chairman, "starting council deliberation");
        let mut cost_usd = 0.0;

        // Stage 1: independent answers, in parallel
        state.advance(TurnState::Stage1Running)?;
        events.emit(TurnEvent::Stage1Start);

        let (stage1, failed_members) = self.stage1(question, council, &mut cost_usd).await;
        if stage1.is_empty() {
            return Err(CouncilError::AllMembersFailed);
        }

        state.advance(TurnState::Stage1Done)?;
        events.emit(TurnEvent::Stage1Complete {
            data: stage1.clone(),
        });

        // Stage 2: anonymized peer ranking, in parallel
        state.advance(TurnState::Stage2Running)?;
        events.emit(TurnEvent::Stage2Start);

        // Labels follow stage-1 completion order, already the order of `stage1`
        let labels = LabelMap::assign(
            &stage1.iter().map(|r| r.model.clone()).collect::<Vec<_>>(),
        );
        let stage2 = self
            .stage2(question, council, &stage1, &labels, &mut cost_usd)
            .await;
        let aggregate = aggregate_rankings(&stage2, &labels);

        state.advance(TurnState::Stage2Done)?;
        events.emit(TurnEvent::Stage2Complete {
            data: stage2.clone(),
            metadata: Stage2Metadata {
                label_to_model: labels
                    .iter()
                    .map(|(label, model)| (label.to_string(), model.clone()))
                    .collect::<BTreeMap<_, _>>(),
                aggregate_rankings: aggregate.clone(),
            },
        });

        // Stage 3: chairman synthesis
        state.advance(TurnState::Stage3Running)?;
        events.emit(TurnEvent::Stage3Start);

        let metrics = consensus_metrics(&stage2, &labels);
        let (confidence, avg_consensus) = overall_confidence(&metrics);

        let anonymized = anonymized_responses(&stage1, &labels);
        let prompt = PromptTemplate::synthesis_prompt(
            question.content(),
            &anonymized,
            &stage2,
            confidence,
            &metrics,
        );
        let request = CompletionRequest::new(
            chairman.clone(),
            vec![
                ChatMessage::system(PromptTemplate::synthesis_system()),
                ChatMessage::user(prompt),
            ],
        );
        let completion = self
            .gateway
            .complete(request)
            .await
            .map_err(CouncilError::SynthesisFailed)?;
        cost_usd += self
            .registry
            .pricing_or_default(chairman)
            .cost_usd(&completion.usage);

        let stage3 = Stage3Result::new(
            chairman.clone(),
            completion.content,
            confidence,
            avg_consensus,
            completion.usage,
        );

        state.advance(TurnState::Stage3Done)?;
        events.emit(TurnEvent::Stage3Complete {
            data: stage3.clone(),
        });

        info!(%confidence, cost_usd, "council deliberation finished");

        Ok(CouncilOutcome {
            stage1,
            failed_members,
            labels,
            stage2,
            aggregate,
            confidence,
            avg_consensus,
            stage3,
            cost_usd,
        })
    }

    /// Stage 1: query all members in parallel; results are collected in
    /// completion order. A failed member is excluded, not fatal.
    async fn stage1(
        &self,
        question: &Question,
        council: &[ModelId],
        cost_usd: &mut f64,
    ) -> (Vec<Stage1Response>, Vec<(ModelId, String)>) {
        let mut join_set = JoinSet::new();

        for model in council {
            let gateway = Arc::clone(&self.gateway);
            let request = CompletionRequest::new(
                model.clone(),
                vec![
                    ChatMessage::system(PromptTemplate::answer_system()),
                    ChatMessage::user(PromptTemplate::answer_prompt(question.content())),
                ],
            );
            let model = model.clone();
            join_set.spawn(async move {
                let result = gateway.complete(request).await;
                (model, result)
            });
        }

        let mut responses = Vec::new();
        let mut failed = Vec::new();

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((model, Ok(completion))) => {
                    debug!(%model, "stage 1 answer received");
                    *cost_usd += self
                        .registry
                        .pricing_or_default(&model)
                        .cost_usd(&completion.usage);
                    responses.push(Stage1Response::new(
                        model,
                        completion.content,
                        completion.usage,
                    ));
                }
                Ok((model, Err(e))) => {
                    warn!(%model, "stage 1 call failed: {e}");
                    failed.push((model, e.to_string()));
                }
                Err(e) => {
                    warn!("stage 1 task join error: {e}");
                }
            }
        }

        (responses, failed)
    }

    /// Stage 2: every council member ranks the anonymized stage-1 set in
    /// parallel. A failed or unparseable ranking degrades that evaluator's
    /// contribution, never the turn.
    async fn stage2(
        &self,
        question: &Question,
        council: &[ModelId],
        stage1: &[Stage1Response],
        labels: &LabelMap,
        cost_usd: &mut f64,
    ) -> Vec<Stage2Ranking> {
        let anonymized = anonymized_responses(stage1, labels);
        let mut join_set = JoinSet::new();

        for evaluator in council {
            let own_label = labels.label_for(evaluator).map(|l| l.to_string());
            let responses: Vec<(String, String)> = anonymized
                .iter()
                .filter(|(label, _)| {
                    self.include_self_in_ranking || Some(label) != own_label.as_ref()
                })
                .cloned()
                .collect();
            if responses.is_empty() {
                continue;
            }

            let gateway = Arc::clone(&self.gateway);
            let request = CompletionRequest::new(
                evaluator.clone(),
                vec![
                    ChatMessage::system(PromptTemplate::ranking_system()),
                    ChatMessage::user(PromptTemplate::ranking_prompt(
                        question.content(),
                        &responses,
                    )),
                ],
            );
            let evaluator = evaluator.clone();
            join_set.spawn(async move {
                let result = gateway.complete(request).await;
                (evaluator, result)
            });
        }

        let mut rankings = Vec::new();

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((evaluator, Ok(completion))) => {
                    *cost_usd += self
                        .registry
                        .pricing_or_default(&evaluator)
                        .cost_usd(&completion.usage);
                    let parsed = parse_ranking_labels(&completion.content, labels);
                    if parsed.is_empty() {
                        warn!(%evaluator, "ranking contained no recognizable labels");
                    }
                    rankings.push(Stage2Ranking::new(
                        evaluator,
                        completion.content,
                        parsed,
                        completion.usage,
                    ));
                }
                Ok((evaluator, Err(e))) => {
                    warn!(%evaluator, "stage 2 call failed: {e}");
                }
                Err(e) => {
                    warn!("stage 2 task join error: {e}");
                }
            }
        }

        rankings
    }
}

/// (label, text) pairs for the anonymized stage-1 set, in label order.
fn anonymized_responses(
    stage1: &[Stage1Response],
    labels: &LabelMap,
) -> Vec<(String, String)> {
    labels
        .iter()
        .zip(stage1)
        .map(|((label, _), response)| (label.to_string(), response.response.clone()))
        .collect()
}
