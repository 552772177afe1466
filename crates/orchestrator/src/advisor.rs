//! Strategy advisor seam. The advisor is best-effort: any error,
//! timeout, or malformed plan is treated as "no suggestion" and the
//! orchestrator proceeds with caller-supplied parameters.

use std::time::Duration;

use async_trait::async_trait;

use outreach_core::types::{Campaign, Candidate, ChannelKind};

/// A suggested channel ordering and/or pacing delay. Either field may
/// be absent; the orchestrator falls back per field.
#[derive(Debug, Clone, Default)]
pub struct ChannelPlan {
    pub channels: Option<Vec<ChannelKind>>,
    pub delay: Option<Duration>,
}

#[async_trait]
pub trait StrategyAdvisor: Send + Sync {
    async fn suggest(
        &self,
        campaign: &Campaign,
        candidates: &[Candidate],
    ) -> anyhow::Result<ChannelPlan>;
}

/// Never suggests anything.
pub struct NoopAdvisor;

#[async_trait]
impl StrategyAdvisor for NoopAdvisor {
    async fn suggest(
        &self,
        _campaign: &Campaign,
        _candidates: &[Candidate],
    ) -> anyhow::Result<ChannelPlan> {
        Ok(ChannelPlan::default())
    }
}

/// Orders the campaign's channels by contact-field coverage of the
/// candidate set: a channel most candidates are reachable on goes
/// first. Leaves the delay alone.
pub struct HeuristicAdvisor;

impl HeuristicAdvisor {
    fn coverage(channel: ChannelKind, candidates: &[Candidate]) -> usize {
        candidates
            .iter()
            .filter(|c| c.contact_for(channel).is_some())
            .count()
    }
}

#[async_trait]
impl StrategyAdvisor for HeuristicAdvisor {
    async fn suggest(
        &self,
        campaign: &Campaign,
        candidates: &[Candidate],
    ) -> anyhow::Result<ChannelPlan> {
        if campaign.channels.is_empty() || candidates.is_empty() {
            return Ok(ChannelPlan::default());
        }

        let mut ranked: Vec<(usize, ChannelKind)> = campaign
            .channels
            .iter()
            .map(|&ch| (Self::coverage(ch, candidates), ch))
            .collect();
        // Stable sort keeps the campaign's order among equally-covered
        // channels.
        ranked.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(ChannelPlan {
            channels: Some(ranked.into_iter().map(|(_, ch)| ch).collect()),
            delay: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_heuristic_prefers_better_covered_channel() {
        let campaign = Campaign::new(
            "C",
            vec![ChannelKind::Email, ChannelKind::Whatsapp, ChannelKind::Voice],
        );
        // Two of three have phones, one has email.
        let candidates = vec![
            Candidate::new(campaign.id, "A", Some("a@x.edu".into()), Some("1555".into())),
            Candidate::new(campaign.id, "B", None, Some("1556".into())),
            Candidate::new(campaign.id, "C", None, None),
        ];

        let plan = HeuristicAdvisor.suggest(&campaign, &candidates).await.unwrap();
        let channels = plan.channels.unwrap();
        assert_eq!(channels[0], ChannelKind::Whatsapp);
        assert_eq!(channels.last(), Some(&ChannelKind::Email));
    }

    #[tokio::test]
    async fn test_heuristic_empty_inputs_yield_no_suggestion() {
        let campaign = Campaign::new("C", vec![]);
        let plan = HeuristicAdvisor
            .suggest(&campaign, &[Candidate::new(Uuid::new_v4(), "A", None, None)])
            .await
            .unwrap();
        assert!(plan.channels.is_none());
        assert!(plan.delay.is_none());
    }
}
