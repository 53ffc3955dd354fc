//! Mode selection odds

use rand::Rng;

use crate::battle::ai::decision_context::{Assessment, DecisionContext};
use crate::battle::ai::AiMode;
use crate::battle::units::Aggression;

/// Relative odds of each mode, indexed like `AiMode::ALL`
pub fn mode_odds(ctx: &DecisionContext<'_>, assessment: &Assessment, current: AiMode) -> [f32; 4] {
    let odds = &ctx.config.mode_odds;
    let unit = ctx.unit;
    let spotters = assessment.spotters.len() as f32;
    let has_target = assessment.has_target();

    let mut patrol = odds.patrol;
    let mut ambush = if has_target { odds.ambush } else { 0.0 };
    let mut combat = if has_target { odds.combat } else { 0.0 };
    let mut escape = if spotters > 0.0 {
        odds.escape + odds.escape_per_spotter * spotters
    } else {
        0.0
    };

    // Wounded units lean toward escaping
    let wounds = 1.0 - unit.health_ratio();
    escape *= 1.0 + wounds;
    combat *= 1.0 - wounds * 0.5;

    match unit.aggression {
        Aggression::Cautious => {
            escape *= 1.5;
            ambush *= 1.2;
            combat *= 0.5;
        }
        Aggression::Normal => {}
        Aggression::Aggressive => {
            escape *= 0.5;
            ambush *= 0.8;
            combat *= 1.5;
        }
    }

    match current {
        AiMode::Patrol => patrol *= odds.stickiness,
        AiMode::Ambush => ambush *= odds.stickiness,
        AiMode::Combat => combat *= odds.stickiness,
        AiMode::Escape => escape *= odds.stickiness,
    }

    [patrol, ambush, combat, escape]
}

/// Roll the mode for this activation
pub fn choose_mode(
    ctx: &DecisionContext<'_>,
    assessment: &Assessment,
    current: AiMode,
    rng: &mut impl Rng,
) -> AiMode {
    let odds = mode_odds(ctx, assessment, current);
    let total: f32 = odds.iter().sum();
    if total <= 0.0 {
        return AiMode::Patrol;
    }

    let mut roll = rng.gen_range(0.0..total);
    for (mode, weight) in AiMode::ALL.iter().zip(odds) {
        if weight <= 0.0 {
            continue;
        }
        if roll < weight {
            return *mode;
        }
        roll -= weight;
    }
    AiMode::Patrol
}
