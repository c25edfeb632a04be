//! Spatial queries over living combatants.
//!
//! All functions here are pure. Every test widens the shape by the
//! candidate's collision radius, except the circle test which measures to
//! the candidate's center.
//!
//! Queries only ever *add* secondary targets. Primary targeting is never
//! range-restricted.

use crate::action::ActionRequest;
use crate::components::{Combatant, CombatantId};
use crate::data::{AoeOrigin, AoeShape, TargetScope};
use crate::math::{normalize_angle, Vec2};
use crate::roster::{Roster, RosterFilter};

/// Circle membership: distance from center to candidate ≤ radius.
#[must_use]
pub fn in_circle(center: Vec2, radius: f32, point: Vec2) -> bool {
    center.distance_squared(point) <= radius * radius
}

/// Line membership for a segment `p1 → p2` of full width `width`.
///
/// The candidate's projection must fall within `[-r, length + r]` and its
/// perpendicular distance must be at most `width / 2 + r`. A zero-length
/// segment degenerates to a circle of radius `width / 2 + r`.
#[must_use]
pub fn in_line(p1: Vec2, p2: Vec2, width: f32, point: Vec2, radius: f32) -> bool {
    let reach = width / 2.0 + radius;
    let axis = p2 - p1;
    let Some(dir) = axis.try_normalize() else {
        return in_circle(p1, reach, point);
    };
    let length = axis.length();
    let rel = point - p1;

    let along = rel.dot(dir);
    if along < -radius || along > length + radius {
        return false;
    }

    let perpendicular = (rel.x * dir.y - rel.y * dir.x).abs();
    perpendicular <= reach
}

/// Cone membership.
///
/// `facing` and `half_angle` are in radians. The candidate must be within
/// `radius + r` of the origin and within `half_angle` of the facing
/// direction.
#[must_use]
pub fn in_cone(
    origin: Vec2,
    facing: f32,
    half_angle: f32,
    radius: f32,
    point: Vec2,
    candidate_radius: f32,
) -> bool {
    let rel = point - origin;
    let reach = radius + candidate_radius;
    if rel.dot(rel) > reach * reach {
        return false;
    }
    // A candidate standing on the origin is always inside.
    if rel.try_normalize().is_none() {
        return true;
    }
    normalize_angle(rel.angle() - facing).abs() <= half_angle
}

/// Living combatants inside a circle.
#[must_use]
pub fn query_circle(
    roster: &Roster,
    filter: RosterFilter,
    center: Vec2,
    radius: f32,
) -> Vec<CombatantId> {
    roster
        .living(filter)
        .into_iter()
        .filter(|c| in_circle(center, radius, c.position))
        .map(|c| c.id)
        .collect()
}

/// Living combatants touching a line segment.
#[must_use]
pub fn query_line(
    roster: &Roster,
    filter: RosterFilter,
    p1: Vec2,
    p2: Vec2,
    width: f32,
) -> Vec<CombatantId> {
    roster
        .living(filter)
        .into_iter()
        .filter(|c| in_line(p1, p2, width, c.position, c.collision_radius))
        .map(|c| c.id)
        .collect()
}

/// Living combatants inside a cone.
#[must_use]
pub fn query_cone(
    roster: &Roster,
    filter: RosterFilter,
    origin: Vec2,
    facing: f32,
    half_angle: f32,
    radius: f32,
) -> Vec<CombatantId> {
    roster
        .living(filter)
        .into_iter()
        .filter(|c| in_cone(origin, facing, half_angle, radius, c.position, c.collision_radius))
        .map(|c| c.id)
        .collect()
}

/// Filter selecting the side a skill affects.
#[must_use]
pub fn scope_filter(subject: &Combatant, scope: TargetScope) -> RosterFilter {
    match scope {
        TargetScope::Opponents => RosterFilter::OpponentsOf(subject.team()),
        TargetScope::Allies => RosterFilter::Team(subject.team()),
    }
}

/// Expand an action's target list with everything inside its area of effect.
///
/// Only runs when the skill declares a shape and opts into auto-apply.
/// The existing targets keep their order; new targets are appended in
/// ascending ID order.
#[must_use]
pub fn expand_aoe_targets(roster: &Roster, action: &ActionRequest) -> Vec<CombatantId> {
    let mut targets = action.targets.clone();

    let Some(aoe) = action.skill.expanding_aoe() else {
        return targets;
    };
    let Some(subject) = roster.get(action.subject) else {
        return targets;
    };
    let primary_pos = action
        .primary_target()
        .and_then(|id| roster.position_of(id));

    let origin = match (aoe.origin, primary_pos) {
        (AoeOrigin::Target, Some(pos)) => pos,
        _ => subject.position,
    };
    // Facing points from caster toward the primary target; with no target
    // fall back to the team's attack direction.
    let facing_vec = primary_pos
        .and_then(|pos| (pos - subject.position).try_normalize())
        .unwrap_or(Vec2::new(-subject.team().approach_side(), 0.0));

    let filter = scope_filter(subject, action.skill.scope);
    let found = match aoe.shape {
        AoeShape::Circle { radius } => query_circle(roster, filter, origin, radius),
        AoeShape::Line { length, width } => {
            let end = origin + facing_vec.scale(length);
            query_line(roster, filter, origin, end, width)
        }
        AoeShape::Cone {
            radius,
            angle_degrees,
        } => query_cone(
            roster,
            filter,
            origin,
            facing_vec.angle(),
            (angle_degrees / 2.0).to_radians(),
            radius,
        ),
    };

    for id in found {
        if !targets.contains(&id) {
            targets.push(id);
        }
    }
    tracing::debug!(
        subject = action.subject,
        skill = %action.skill.id,
        count = targets.len(),
        "Expanded area targets"
    );
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AoeSpec, SkillData};
    use std::f32::consts::FRAC_PI_4;

    #[test]
    fn test_circle_boundary_inclusive() {
        assert!(in_circle(Vec2::ZERO, 10.0, Vec2::new(10.0, 0.0)));
        assert!(!in_circle(Vec2::ZERO, 10.0, Vec2::new(10.1, 0.0)));
    }

    #[test]
    fn test_line_projection_window() {
        let p1 = Vec2::ZERO;
        let p2 = Vec2::new(100.0, 0.0);
        // Behind the start but within the candidate radius.
        assert!(in_line(p1, p2, 20.0, Vec2::new(-10.0, 0.0), 16.0));
        // Too far behind.
        assert!(!in_line(p1, p2, 20.0, Vec2::new(-20.0, 0.0), 16.0));
        // Past the end but within radius.
        assert!(in_line(p1, p2, 20.0, Vec2::new(110.0, 0.0), 16.0));
    }

    #[test]
    fn test_line_perpendicular_reach() {
        let p1 = Vec2::ZERO;
        let p2 = Vec2::new(100.0, 0.0);
        // width/2 + r = 10 + 16 = 26
        assert!(in_line(p1, p2, 20.0, Vec2::new(50.0, 26.0), 16.0));
        assert!(!in_line(p1, p2, 20.0, Vec2::new(50.0, 27.0), 16.0));
    }

    #[test]
    fn test_degenerate_line_is_circle() {
        let p = Vec2::new(5.0, 5.0);
        assert!(in_line(p, p, 10.0, Vec2::new(5.0, 15.0), 5.0));
        assert!(!in_line(p, p, 10.0, Vec2::new(5.0, 16.0), 5.0));
    }

    #[test]
    fn test_cone_angle_and_radius() {
        let origin = Vec2::ZERO;
        // Facing +x with a 45 degree half-angle.
        assert!(in_cone(origin, 0.0, FRAC_PI_4, 100.0, Vec2::new(50.0, 40.0), 0.0));
        assert!(!in_cone(origin, 0.0, FRAC_PI_4, 100.0, Vec2::new(40.0, 50.0), 0.0));
        // Radius widened by candidate radius.
        assert!(in_cone(origin, 0.0, FRAC_PI_4, 100.0, Vec2::new(110.0, 0.0), 16.0));
        assert!(!in_cone(origin, 0.0, FRAC_PI_4, 100.0, Vec2::new(120.0, 0.0), 16.0));
    }

    #[test]
    fn test_cone_wraps_around_pi() {
        // Facing -x; a point just across the ±PI seam is inside.
        let facing = std::f32::consts::PI;
        assert!(in_cone(Vec2::ZERO, facing, 0.3, 100.0, Vec2::new(-50.0, -5.0), 0.0));
        assert!(in_cone(Vec2::ZERO, facing, 0.3, 100.0, Vec2::new(-50.0, 5.0), 0.0));
    }

    fn circle_roster() -> (Roster, CombatantId, Vec<CombatantId>) {
        let mut roster = Roster::new();
        let caster = roster.insert(Combatant::player(0, Vec2::new(400.0, 300.0), 16.0));
        let near = roster.insert(Combatant::enemy(0, Vec2::new(390.0, 300.0), 16.0));
        let mid = roster.insert(Combatant::enemy(0, Vec2::new(315.0, 300.0), 16.0));
        let far = roster.insert(Combatant::enemy(0, Vec2::new(280.0, 300.0), 16.0));
        (roster, caster, vec![near, mid, far])
    }

    #[test]
    fn test_circle_aoe_expansion() {
        let (roster, caster, enemies) = circle_roster();
        let skill = SkillData::new("nova").with_aoe(AoeSpec {
            shape: AoeShape::Circle { radius: 80.0 },
            origin: AoeOrigin::Caster,
            apply_to_targets: true,
        });
        // Primary target is the far enemy; the area adds only the near one.
        let action = ActionRequest::new(caster, skill, vec![enemies[2]]);
        let targets = expand_aoe_targets(&roster, &action);
        assert_eq!(targets, vec![enemies[2], enemies[0]]);
    }

    #[test]
    fn test_aoe_never_includes_own_team() {
        let (mut roster, caster, enemies) = circle_roster();
        let ally = roster.insert(Combatant::player(0, Vec2::new(405.0, 300.0), 16.0));
        let skill = SkillData::new("nova").with_aoe(AoeSpec {
            shape: AoeShape::Circle { radius: 80.0 },
            origin: AoeOrigin::Caster,
            apply_to_targets: true,
        });
        let action = ActionRequest::new(caster, skill, vec![enemies[0]]);
        let targets = expand_aoe_targets(&roster, &action);
        assert!(!targets.contains(&ally));
        assert!(!targets.contains(&caster));
    }

    #[test]
    fn test_aoe_opt_out_keeps_targets() {
        let (roster, caster, enemies) = circle_roster();
        let skill = SkillData::new("nova").with_aoe(AoeSpec {
            shape: AoeShape::Circle { radius: 500.0 },
            origin: AoeOrigin::Caster,
            apply_to_targets: false,
        });
        let action = ActionRequest::new(caster, skill, vec![enemies[1]]);
        assert_eq!(expand_aoe_targets(&roster, &action), vec![enemies[1]]);
    }

    #[test]
    fn test_line_aoe_from_caster_toward_target() {
        let mut roster = Roster::new();
        let caster = roster.insert(Combatant::player(0, Vec2::new(500.0, 300.0), 16.0));
        let primary = roster.insert(Combatant::enemy(0, Vec2::new(300.0, 300.0), 16.0));
        let in_path = roster.insert(Combatant::enemy(0, Vec2::new(400.0, 310.0), 16.0));
        let off_path = roster.insert(Combatant::enemy(0, Vec2::new(400.0, 400.0), 16.0));
        let skill = SkillData::new("beam").with_aoe(AoeSpec {
            shape: AoeShape::Line {
                length: 300.0,
                width: 20.0,
            },
            origin: AoeOrigin::Caster,
            apply_to_targets: true,
        });
        let targets = expand_aoe_targets(&roster, &ActionRequest::new(caster, skill, vec![primary]));
        assert!(targets.contains(&in_path));
        assert!(!targets.contains(&off_path));
        assert_eq!(targets[0], primary);
    }
}
