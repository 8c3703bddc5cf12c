use kbqa_core::{ServiceError, ServiceResult};
use std::fs;
use std::path::Path;

pub const CONTEXT_PLACEHOLDER: &str = "{context}";
pub const QUESTION_PLACEHOLDER: &str = "{question}";

/// Built-in template. The model is told to wrap its answer and a short topic
/// label in the tags `split_response` looks for.
pub const DEFAULT_TEMPLATE: &str = "\
You are an assistant that answers questions using only the documents provided below.
If the documents do not contain the answer, say that you could not find it.

<documents>
{context}
</documents>

Question: {question}

Write your answer inside <response></response> tags.
Then classify the question with a short topic label (one to three words) inside <topic></topic> tags.";

/// Fills a fixed template with the user's question and the retrieved fragments
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Both placeholders must appear in `template`
    pub fn new(template: impl Into<String>) -> ServiceResult<Self> {
        let template = template.into();
        for placeholder in [CONTEXT_PLACEHOLDER, QUESTION_PLACEHOLDER] {
            if !template.contains(placeholder) {
                return Err(ServiceError::ConfigError(format!(
                    "Prompt template is missing the {} placeholder",
                    placeholder
                )));
            }
        }
        Ok(Self { template })
    }

    pub fn load_from_file(path: &Path) -> ServiceResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ServiceError::ConfigError(format!(
                "Failed to read prompt template {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::new(content)
    }

    /// Builds the prompt in a single pass, so placeholder-like text inside the
    /// question or the fragments is never substituted again.
    pub fn build(&self, question: &str, contexts: &[String]) -> String {
        let context = format_contexts(contexts);
        let mut prompt = String::with_capacity(self.template.len() + context.len() + question.len());
        let mut rest = self.template.as_str();

        while let Some(start) = rest.find('{') {
            prompt.push_str(&rest[..start]);
            let tail = &rest[start..];
            if let Some(after) = tail.strip_prefix(CONTEXT_PLACEHOLDER) {
                prompt.push_str(&context);
                rest = after;
            } else if let Some(after) = tail.strip_prefix(QUESTION_PLACEHOLDER) {
                prompt.push_str(question);
                rest = after;
            } else {
                prompt.push('{');
                rest = &tail[1..];
            }
        }
        prompt.push_str(rest);

        prompt
    }
}

fn format_contexts(contexts: &[String]) -> String {
    contexts
        .iter()
        .enumerate()
        .map(|(i, text)| format!("{}. {}", i + 1, text))
        .collect::<Vec<String>>()
        .join("\n")
}
