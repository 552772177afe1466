//! Message template resolution and rendering.
//!
//! Resolution order for every send attempt: explicit template argument,
//! then the campaign's stored per-channel template, then a hard-coded
//! default. Rendering uses `{{variable}}` substitution.

use crate::types::{Campaign, Candidate, ChannelKind};

const DEFAULT_EMAIL: &str = "Hi {{name}},\n\nThank you for your interest in {{campaign}}. \
We'd love to tell you more about our programs — reply to this email and an \
admissions counselor will get back to you.\n\nBest,\nThe Admissions Team";

const DEFAULT_WHATSAPP: &str = "Hi {{name}}! This is the admissions team for {{campaign}}. \
We'd love to answer any questions about your application. Reply here anytime.";

const DEFAULT_VOICE: &str = "Hello {{name}}, this is a call from the admissions office \
regarding {{campaign}}. We are excited about your application and will follow up \
with more details by email.";

/// Hard-coded fallback template for a channel.
pub fn default_template(channel: ChannelKind) -> &'static str {
    match channel {
        ChannelKind::Email => DEFAULT_EMAIL,
        ChannelKind::Whatsapp => DEFAULT_WHATSAPP,
        ChannelKind::Voice => DEFAULT_VOICE,
    }
}

/// Substitute `{{name}}` and `{{campaign}}` placeholders.
pub fn render(template: &str, candidate: &Candidate, campaign: &Campaign) -> String {
    template
        .replace("{{name}}", &candidate.name)
        .replace("{{campaign}}", &campaign.name)
}

/// Resolve and render the effective message for one candidate.
pub fn resolve_message(
    explicit: Option<&str>,
    campaign: &Campaign,
    candidate: &Candidate,
    channel: ChannelKind,
) -> String {
    let template = explicit
        .or_else(|| campaign.template_for(channel))
        .unwrap_or_else(|| default_template(channel));
    render(template, candidate, campaign)
}
