//! Friendly agent names for step titles
//!
//! The orchestrator labels tool calls as `Executing: <action>` and
//! `Completed: <action>`. Known actions are rewritten to the agent that owns
//! them; anything else passes through untouched.

/// Which half of a tool call a label describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Executing,
    Completed,
}

impl Phase {
    fn prefix(self) -> &'static str {
        match self {
            Phase::Executing => "Executing: ",
            Phase::Completed => "Completed: ",
        }
    }
}

/// One `(action, phase) -> replacement` entry
#[derive(Debug, Clone, Copy)]
pub struct TitleRule {
    pub action: &'static str,
    pub phase: Phase,
    pub replacement: &'static str,
}

const fn rule(action: &'static str, phase: Phase, replacement: &'static str) -> TitleRule {
    TitleRule {
        action,
        phase,
        replacement,
    }
}

/// Lookup order matters: the first action found in a label wins.
pub const TITLE_RULES: &[TitleRule] = &[
    rule("find-material", Phase::Executing, "Materials Agent: Searching for material details"),
    rule("find-material", Phase::Completed, "Materials Agent: Found material details"),
    rule("analyze-risk", Phase::Executing, "Supplier Agent: Analyzing geopolitical risk"),
    rule("analyze-risk", Phase::Completed, "Supplier Agent: Risk analysis complete"),
    rule("get-bom", Phase::Executing, "BOM Agent: Retrieving Bill of Materials"),
    rule("get-bom", Phase::Completed, "BOM Agent: BOM retrieval complete"),
    rule("tavily", Phase::Executing, "Web Search: Searching external sources"),
    rule("tavily", Phase::Completed, "Web Search: Search complete"),
];

/// Rewrite a raw step label using [`TITLE_RULES`]
#[must_use]
pub fn normalize_title(raw: &str) -> String {
    normalize_with(TITLE_RULES, raw)
}

fn normalize_with(rules: &[TitleRule], raw: &str) -> String {
    let Some(action) = rules
        .iter()
        .map(|r| r.action)
        .find(|action| raw.contains(action))
    else {
        return raw.to_string();
    };

    rules
        .iter()
        .filter(|r| r.action == action)
        .fold(raw.to_string(), |title, r| {
            let label = format!("{}{}", r.phase.prefix(), r.action);
            title.replacen(&label, r.replacement, 1)
        })
}
