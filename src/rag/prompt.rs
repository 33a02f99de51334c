use crate::core::config::settings::PersonaConfig;
use crate::llm::ChatMessage;

/// Two-message chat prompt with `{context}` and `{question}` placeholders.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    system: String,
    human: String,
}

impl PromptTemplate {
    pub fn new(system: impl Into<String>, human: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            human: human.into(),
        }
    }

    pub fn from_persona(persona: &PersonaConfig) -> Self {
        Self::new(&persona.system_template, &persona.human_template)
    }

    pub fn render(&self, context: &str, question: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(fill(&self.system, context, question)),
            ChatMessage::user(fill(&self.human, context, question)),
        ]
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::from_persona(&PersonaConfig::default())
    }
}

// Single pass, so a `{question}` inside the retrieved context is left alone.
fn fill(template: &str, context: &str, question: &str) -> String {
    let mut out = String::with_capacity(template.len() + context.len() + question.len());
    let mut rest = template;
    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix("{context}") {
            out.push_str(context);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{question}") {
            out.push_str(question);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_places_context_in_system_and_question_in_user() {
        let messages = PromptTemplate::default()
            .render("Rome was founded in 753 BC.", "When was Rome founded?");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("historian specialized in the Roman Empire"));
        assert!(messages[0].content.ends_with("Context: Rome was founded in 753 BC."));
        assert_eq!(messages[1], ChatMessage::user("When was Rome founded?"));
    }

    #[test]
    fn placeholders_inside_values_are_not_expanded() {
        let template = PromptTemplate::new("ctx={context} {unknown}", "q={question}");
        let messages = template.render("see {question}", "why?");
        assert_eq!(messages[0].content, "ctx=see {question} {unknown}");
        assert_eq!(messages[1].content, "q=why?");
    }
}
