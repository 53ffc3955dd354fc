//! Escape: find a tile away from the threats and out of their sight
//!
//! The search scans a fixed offset table around the unit in random order.
//! When nothing there clears the fast-pass threshold, a handful of wide
//! random offsets get a chance to beat the local best. Only the best
//! scoring candidates are checked for reachability, since that is the
//! expensive query.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::trace;

use crate::battle::ai::decision_context::{Assessment, DecisionContext};
use crate::battle::ai::{AiAction, AiMode, EscapeCache};
use crate::core::types::Position;

/// Offsets of the local search table, `(2r + 1)^2` entries including (0, 0)
pub fn escape_offsets(radius: i32) -> Vec<(i32, i32)> {
    let radius = radius.max(0);
    let mut offsets = Vec::with_capacity(((2 * radius + 1) * (2 * radius + 1)) as usize);
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            offsets.push((dx, dy));
        }
    }
    offsets
}

/// Where the unit should run to, if anywhere
pub fn find_escape(
    ctx: &DecisionContext<'_>,
    assessment: &Assessment,
    rng: &mut impl Rng,
) -> Option<Position> {
    let tuning = &ctx.config.escape;
    let origin = ctx.unit.position;
    let threats = ctx.threat_positions(assessment);
    let spotted_by = assessment.spotters.len() as i32;

    let mut offsets = escape_offsets(ctx.config.ai.search_radius);
    offsets.shuffle(rng);

    let mut best: Option<(i32, Position)> = None;
    for (dx, dy) in offsets {
        let candidate = origin.offset(dx, dy, 0);
        if !ctx.map.in_bounds(candidate) || !ctx.can_stand(candidate) {
            continue;
        }
        let score = score_tile(ctx, &threats, spotted_by, tuning.systematic_base, candidate);
        if best.map_or(false, |(s, _)| score <= s) {
            continue;
        }
        if ctx.route_cost(candidate).is_none() {
            continue;
        }
        best = Some((score, candidate));
        if score > tuning.fast_pass_threshold {
            break;
        }
    }

    if best.map_or(true, |(score, _)| score <= tuning.fast_pass_threshold) {
        let radius = tuning.desperate_radius.max(1);
        for _ in 0..tuning.desperate_tries {
            let candidate = origin.offset(
                rng.gen_range(-radius..=radius),
                rng.gen_range(-radius..=radius),
                0,
            );
            if !ctx.map.in_bounds(candidate) || !ctx.can_stand(candidate) {
                continue;
            }
            let score = score_tile(ctx, &threats, spotted_by, tuning.desperate_base, candidate);
            if best.map_or(false, |(s, _)| score <= s) {
                continue;
            }
            if ctx.route_cost(candidate).is_some() {
                best = Some((score, candidate));
            }
        }
    }

    best.map(|(_, tile)| tile)
}

fn nearest_threat(threats: &[Position], from: Position) -> Option<i32> {
    threats.iter().map(|threat| threat.distance(&from)).min()
}

fn score_tile(
    ctx: &DecisionContext<'_>,
    threats: &[Position],
    spotted_by: i32,
    base: i32,
    candidate: Position,
) -> i32 {
    let tuning = &ctx.config.escape;
    let origin = ctx.unit.position;
    let mut score = base;

    if let (Some(now), Some(then)) = (
        nearest_threat(threats, origin),
        nearest_threat(threats, candidate),
    ) {
        score += (then - now) * tuning.threat_distance_weight;
    }

    let spotters = ctx.spotters_of(candidate).len() as i32;
    score -= (spotters - spotted_by) * tuning.exposure_penalty;

    if let Some(tile) = ctx.map.tile(candidate) {
        if tile.is_burning() {
            score -= tuning.fire_penalty;
        }
        if tile.smoke > 0 {
            score += tuning.smoke_bonus;
        }
        if tile.dangerous {
            score -= tuning.dangerous_penalty;
        }
    }

    if candidate == origin && spotted_by == 0 {
        score += tuning.current_tile_preference;
    }

    trace!(unit = ctx.unit.id.0, %candidate, score, "escape candidate");
    score
}

/// Move toward the cached escape tile, or hold it once there
pub(super) fn evaluate(ctx: &DecisionContext<'_>, escape: &EscapeCache) -> Option<AiAction> {
    let unit = ctx.unit;
    match escape {
        EscapeCache::Destination(tile) if *tile == unit.position => {
            Some(AiAction::idle(unit.id, AiMode::Escape, "holding escape tile"))
        }
        EscapeCache::Destination(tile) => {
            AiAction::move_toward(ctx, AiMode::Escape, *tile, "escaping")
        }
        EscapeCache::Stale | EscapeCache::Nowhere => None,
    }
}
