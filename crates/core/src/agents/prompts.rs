//! Stage prompts.
//!
//! System prompts are bundled at compile time from `defaults/`; the
//! per-message user prompts are built by the functions below.

/// DesignAgent - turns an idea into design directions
pub const DESIGN: &str = include_str!("defaults/design.md");

/// MarketingAgent - brand and campaign strategy
pub const MARKETING: &str = include_str!("defaults/marketing.md");

/// SalesAgent - pricing, channels and enablement
pub const SALES: &str = include_str!("defaults/sales.md");

/// SupportAgent - customer success strategy or single-query answers
pub const SUPPORT: &str = include_str!("defaults/support.md");

/// ContentAgent - launch copy
pub const CONTENT: &str = include_str!("defaults/content.md");

/// Idea used when a message carries none
pub const UNKNOWN_IDEA: &str = "unknown idea";

/// Query SupportAgent answers when no custom query is given
pub const DEFAULT_SUPPORT_QUERY: &str =
    "Handle a customer query about delivery delay and respond politely.";

pub fn design_prompt(idea: &str) -> String {
    format!("Design a product based on the idea: {}", idea)
}

pub fn campaign_prompt(idea: &str, design: Option<&str>) -> String {
    match design {
        Some(design) => format!(
            "Create a marketing campaign for the product idea: {}\n\nDesign analysis:\n{}",
            idea, design
        ),
        None => format!("Create a marketing campaign for the product idea: {}", idea),
    }
}

pub fn launch_campaign_prompt() -> String {
    "Create a creative marketing campaign for launching a new AI-based product.".to_string()
}

pub fn sales_strategy_prompt(idea: &str, campaign: Option<&str>) -> String {
    let mut prompt = format!(
        "You're a professional sales strategist. Based on the product idea: \"{}\", \
         suggest an effective sales pitch, potential client base, and distribution channels.",
        idea
    );
    if let Some(campaign) = campaign {
        prompt.push_str("\n\nMarketing strategy:\n");
        prompt.push_str(campaign);
    }
    prompt
}

pub fn sales_leads_prompt(idea: Option<&str>) -> String {
    match idea {
        Some(idea) => format!(
            "Generate a list of qualified sales lead segments and an outreach plan for: {}",
            idea
        ),
        None => "Generate a list of qualified sales lead segments and an outreach plan \
                 for a new AI-based product."
            .to_string(),
    }
}

pub fn support_prompt(query: &str, sales_plan: Option<&str>) -> String {
    match sales_plan {
        Some(plan) => format!("{}\n\nProduct, marketing and sales plan:\n{}", query, plan),
        None => query.to_string(),
    }
}
