//! Section-by-section system prompt assembly.
//!
//! One [`PromptSection`] per named section, assembled in the fixed order
//! `base, soul, user_profile, conversation, memory, skills, tools,
//! session_status`. A section whose body is empty is skipped entirely;
//! the rest are rendered as Markdown (`## {heading}`) and joined with
//! blank-line separators.

pub const SECTION_ORDER: &[&str] = &["base", "soul", "user_profile", "conversation", "memory", "skills", "tools", "session_status"];

#[derive(Debug, Clone)]
pub struct PromptSection {
    pub heading: &'static str,
    pub body: String,
}

#[derive(Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(mut self, heading: &'static str, body: impl Into<String>) -> Self {
        self.sections.push(PromptSection { heading, body: body.into() });
        self
    }

    /// Render non-empty sections as Markdown, in the order they were
    /// added (callers are expected to add them in `SECTION_ORDER`).
    pub fn build(self) -> String {
        self.sections
            .into_iter()
            .filter(|s| !s.body.trim().is_empty())
            .map(|s| format!("## {}\n\n{}", heading_title(s.heading), s.body.trim()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn heading_title(heading: &str) -> String {
    match heading {
        "base" => "Identity".to_string(),
        "soul" => "Persona".to_string(),
        "user_profile" => "User Profile".to_string(),
        "conversation" => "Conversation".to_string(),
        "memory" => "Memory".to_string(),
        "skills" => "Skills".to_string(),
        "tools" => "Tools".to_string(),
        "session_status" => "Session Status".to_string(),
        other => other.to_string(),
    }
}
