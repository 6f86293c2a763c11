//! Prompt templates for each cognitive subtask
//!
//! Templates are opaque text with `{user_id}`, `{session_id}`, `{input}` and `{context}`
//! placeholders. Each one asks the engine for a single JSON object tagged with its type.

use unconscious_sdk::{TaskDescriptor, TaskType};

pub const MEMORY_RETRIEVAL_PROMPT: &str = r#"You are the memory layer of a companion for user {user_id} (session {session_id}).
Recall what you know about this user that is relevant to their latest message.

Message:
{input}

Context:
{context}

Answer with exactly one JSON object and nothing else:
{"type": "memory_retrieval", "memories": [{"content": "...", "relevance": 0.0}], "summary": "..."}"#;

pub const EMOTION_CLASSIFICATION_PROMPT: &str = r#"Classify the emotional state expressed by user {user_id} (session {session_id}).

Message:
{input}

Context:
{context}

Answer with exactly one JSON object and nothing else:
{"type": "emotion_classification", "primary": "...", "secondary": ["..."], "intensity": 0.0, "valence": 0.0}"#;

pub const INTENT_RECOGNITION_PROMPT: &str = r#"Identify what user {user_id} (session {session_id}) wants from this turn.

Message:
{input}

Context:
{context}

Answer with exactly one JSON object and nothing else:
{"type": "intent_recognition", "intent": "...", "confidence": 0.0, "sub_intents": ["..."]}"#;

pub const INSIGHT_GENERATION_PROMPT: &str = r#"Look for recurring patterns and non-obvious insights about user {user_id} (session {session_id}).

Message:
{input}

Context:
{context}

Answer with exactly one JSON object and nothing else:
{"type": "insight_generation", "insights": ["..."], "patterns": ["..."]}"#;

pub const ROLE_DETECTION_PROMPT: &str = r#"Detect which roles user {user_id} (session {session_id}) is speaking from (for example parent, engineer, friend).

Message:
{input}

Context:
{context}

Answer with exactly one JSON object and nothing else:
{"type": "role_detection", "roles": ["..."], "active_role": "...", "confidence": 0.0}"#;

pub const EXPERIENCE_SYNTHESIS_PROMPT: &str = r#"Synthesize the lived experience behind this turn for user {user_id} (session {session_id}).
Use the detected roles, emotional state and recalled memories below; any of them may be null.

Message:
{input}

Earlier findings:
{context}

Answer with exactly one JSON object and nothing else:
{"type": "experience_synthesis", "narrative": "...", "themes": ["..."], "guidance": "..."}"#;

pub fn template_for(task_type: TaskType) -> &'static str {
    match task_type {
        TaskType::MemoryRetrieval => MEMORY_RETRIEVAL_PROMPT,
        TaskType::EmotionClassification => EMOTION_CLASSIFICATION_PROMPT,
        TaskType::IntentRecognition => INTENT_RECOGNITION_PROMPT,
        TaskType::InsightGeneration => INSIGHT_GENERATION_PROMPT,
        TaskType::RoleDetection => ROLE_DETECTION_PROMPT,
        TaskType::ExperienceSynthesis => EXPERIENCE_SYNTHESIS_PROMPT,
    }
}

/// Render the prompt for a task
///
/// Identifiers are substituted before the free text so placeholder-looking text inside
/// the message or context is left alone.
pub fn build_prompt(task: &TaskDescriptor) -> String {
    let template = template_for(task.task_type)
        .replace("{user_id}", &task.user_id)
        .replace("{session_id}", &task.session_id);

    // single left-to-right pass over both placeholders
    let mut rendered = String::with_capacity(template.len() + task.input.len());
    let context = task.rendered_context();
    let mut rest = template.as_str();
    loop {
        let next_input = rest.find("{input}");
        let next_context = rest.find("{context}");
        let (pos, placeholder, value) = match (next_input, next_context) {
            (Some(i), Some(c)) if c < i => (c, "{context}", context.as_str()),
            (Some(i), _) => (i, "{input}", task.input.as_str()),
            (None, Some(c)) => (c, "{context}", context.as_str()),
            (None, None) => break,
        };
        rendered.push_str(&rest[..pos]);
        rendered.push_str(value);
        rest = &rest[pos + placeholder.len()..];
    }
    rendered.push_str(rest);
    rendered
}
