use crate::feedback::{CustomerTier, FeedbackItem, ImpactTier};

static BUG_POINTS: u32 = 20;
static OTHER_POINTS: u32 = 15;
static ENTERPRISE_BONUS: u32 = 30;
static PRO_BONUS: u32 = 15;
static BASE_TIER_BONUS: u32 = 5;
static MAX_SCORE: u32 = 100;
/// Floor applied when the labeler flags a theme as high impact.
pub static HIGH_IMPACT_FLOOR: u8 = 75;

/// Score and tier of a single theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Impact {
    pub score: u8,
    pub tier: ImpactTier,
    pub enterprise_count: usize,
}

fn item_points(item: &FeedbackItem) -> u32 {
    let kind = if item.is_bug() {
        BUG_POINTS
    } else {
        OTHER_POINTS
    };
    let tier = match item.customer_tier {
        Some(CustomerTier::Enterprise) => ENTERPRISE_BONUS,
        Some(CustomerTier::Pro) => PRO_BONUS,
        Some(CustomerTier::Starter) | None => BASE_TIER_BONUS,
    };
    kind + tier
}

fn volume_bonus(count: usize) -> u32 {
    match count {
        5.. => 30,
        3..=4 => 15,
        2 => 5,
        _ => 0,
    }
}

/// Score a theme from its members. `high_impact` can lift the score to the floor, never lower it.
pub fn score_members(members: &[&FeedbackItem], high_impact: bool) -> Impact {
    let raw: u32 = members.iter().map(|item| item_points(item)).sum::<u32>()
        + volume_bonus(members.len());
    let mut score = raw.min(MAX_SCORE) as u8;
    if high_impact && score < HIGH_IMPACT_FLOOR {
        score = HIGH_IMPACT_FLOOR;
    }
    Impact {
        score,
        tier: ImpactTier::from_score(score),
        enterprise_count: members.iter().filter(|item| item.is_enterprise()).count(),
    }
}
