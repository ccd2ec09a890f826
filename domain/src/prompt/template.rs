//! Prompt templates for the council and chat pipelines.

use std::collections::BTreeMap;

use crate::core::model::ModelId;
use crate::council::confidence::{ConfidenceScore, ModelConsensus, format_consensus_details};
use crate::council::stage::Stage2Ranking;

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// System prompt for stage-1 answers
    pub fn answer_system() -> &'static str {
        r#"You are a knowledgeable expert asked to answer a user's question.
Provide a thoughtful, well-reasoned response. Be concise but comprehensive.
Support your points with reasoning and examples where appropriate.
Focus on accuracy and clarity."#
    }

    /// User prompt for stage-1 answers
    pub fn answer_prompt(question: &str) -> String {
        question.to_string()
    }

    /// System prompt for stage-2 peer ranking
    pub fn ranking_system() -> &'static str {
        r#"You are a critical reviewer evaluating anonymized responses to a question.
Assess quality, accuracy, and completeness objectively. You do not know
which model wrote which response; judge only the content."#
    }

    /// User prompt for stage-2 peer ranking.
    ///
    /// `responses` are (label, text) pairs in label order. The strict
    /// FINAL RANKING format keeps the ranking machine-parseable while the
    /// free-text evaluation above it stays useful to the chairman.
    pub fn ranking_prompt(question: &str, responses: &[(String, String)]) -> String {
        let responses_text = responses
            .iter()
            .map(|(label, text)| format!("{label}:\n{text}"))
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            r#"You are evaluating different responses to the following question:

Question: {question}

Here are the responses from different models (anonymized):

{responses_text}

Your task:
1. First, evaluate each response individually. For each response, explain what it does well and what it does poorly.
2. Then, at the very end of your response, provide a final ranking.

IMPORTANT: Your final ranking MUST be formatted EXACTLY as follows:
- Start with the line "FINAL RANKING:" (all caps, with colon)
- Then list the responses from best to worst as a numbered list
- Each line should be: number, period, space, then ONLY the response label (e.g., "1. Response A")
- Do not add any other text or explanations in the ranking section

Now provide your evaluation and ranking:"#
        )
    }

    /// System prompt for stage-3 synthesis
    pub fn synthesis_system() -> &'static str {
        r#"You are the Chairman of a council of AI models. Multiple models have
answered a user's question and peer-ranked each other's anonymized answers.
Synthesize their work into a single, accurate, well-reasoned final answer.
Be balanced and objective; give weight to well-supported arguments
regardless of source, and do not invent facts the answers did not contain."#
    }

    /// User prompt for stage-3 synthesis.
    pub fn synthesis_prompt(
        question: &str,
        responses: &[(String, String)],
        rankings: &[Stage2Ranking],
        confidence: ConfidenceScore,
        metrics: &BTreeMap<ModelId, ModelConsensus>,
    ) -> String {
        let stage1_text = responses
            .iter()
            .map(|(label, text)| format!("{label}:\n{text}"))
            .collect::<Vec<_>>()
            .join("\n\n");

        let stage2_text = rankings
            .iter()
            .map(|r| format!("Evaluator: {}\nRanking: {}", r.model, r.ranking))
            .collect::<Vec<_>>()
            .join("\n\n");

        let consensus_details = format_consensus_details(metrics);

        format!(
            r#"Original Question: {question}

STAGE 1 - Individual Responses:
{stage1_text}

STAGE 2 - Peer Rankings:
{stage2_text}

Consensus summary:
Overall council confidence: {confidence}
{consensus_details}

Your task as Chairman is to synthesize all of this into a single,
comprehensive, accurate answer to the user's original question. Consider:
- The individual responses and their insights
- The peer rankings and what they reveal about response quality
- Any patterns of agreement or disagreement

Guidelines:
- If confidence is HIGH, you can present a unified answer.
- If confidence is MEDIUM or LOW, clearly mention that the council had mixed views and explain the main perspectives.
- Stick to what the answers actually said - do not invent new facts.

Provide a clear, well-reasoned final answer that represents the council's collective wisdom:"#
        )
    }

    /// System prompt for the chat pipeline (follow-up turns).
    ///
    /// `context` is the rendered block of retrieved chunks, if any.
    pub fn chat_system(context: Option<&str>) -> String {
        let mut prompt = String::from(
            r#"You are the Chairman of an AI council.
You previously presided over a council of models that debated and ranked
answers to the user's questions. Your goal now is to answer follow-up
questions from the user.

You may receive previous council deliberations for this conversation.
Use them only if they are relevant to the user's question.
Do not repeat old answers verbatim; build on them.
"#,
        );

        if let Some(context) = context
            && !context.is_empty()
        {
            prompt.push_str(&format!(
                r#"
Relevant previous council outputs (may be partial):
{context}

Guidance on context labels:
- A chunk labeled 'synthesis' is a previous final decision.
- A chunk labeled 'opinion' is a single model's draft answer, not consensus.
- A chunk labeled 'question' is something the user asked earlier.
"#
            ));
        }

        prompt.push_str("\nBe helpful, authoritative, and transparent about the council's reasoning.");
        prompt
    }

    /// Prompt for rewriting a follow-up into a self-contained query.
    pub fn rewrite_prompt(query: &str, prior_answer: &str) -> String {
        format!(
            r#"Rewrite the user's question to be self-contained by replacing pronouns (it, its, that, they, etc.) with the specific topics from the conversation.

Previous answer:
{prior_answer}

User's question: {query}

Rewritten question (ONE sentence, no explanations):"#
        )
    }

    /// Prompt for generating a short conversation title.
    pub fn title_prompt(question: &str) -> String {
        format!(
            r#"Generate a very short title (3-5 words maximum) that summarizes the following question.
The title should be concise and descriptive. Do not use quotes or punctuation in the title.

Question: {question}

Title:"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::council::stage::TokenUsage;

    #[test]
    fn test_ranking_prompt_contains_labels_and_format() {
        let responses = vec![
            ("Response A".to_string(), "first answer".to_string()),
            ("Response B".to_string(), "second answer".to_string()),
        ];
        let prompt = PromptTemplate::ranking_prompt("What is X?", &responses);
        assert!(prompt.contains("Response A:"));
        assert!(prompt.contains("Response B:"));
        assert!(prompt.contains("FINAL RANKING:"));
        assert!(prompt.contains("What is X?"));
    }

    #[test]
    fn test_synthesis_prompt_includes_confidence() {
        let responses = vec![("Response A".to_string(), "answer".to_string())];
        let rankings = vec![Stage2Ranking::new(
            "m1",
            "Response A is fine",
            vec!["Response A".to_string()],
            TokenUsage::default(),
        )];
        let prompt = PromptTemplate::synthesis_prompt(
            "q",
            &responses,
            &rankings,
            ConfidenceScore::High,
            &BTreeMap::new(),
        );
        assert!(prompt.contains("Overall council confidence: HIGH"));
        assert!(prompt.contains("Evaluator: m1"));
    }

    #[test]
    fn test_chat_system_with_and_without_context() {
        let bare = PromptTemplate::chat_system(None);
        assert!(!bare.contains("Relevant previous council outputs"));

        let with = PromptTemplate::chat_system(Some("[Turn 0] Q: x\n\nA: y"));
        assert!(with.contains("Relevant previous council outputs"));
        assert!(with.contains("A: y"));
    }

    #[test]
    fn test_rewrite_prompt_embeds_both_inputs() {
        let prompt = PromptTemplate::rewrite_prompt("what about its limits?", "RAG systems do X.");
        assert!(prompt.contains("what about its limits?"));
        assert!(prompt.contains("RAG systems do X."));
    }
}
