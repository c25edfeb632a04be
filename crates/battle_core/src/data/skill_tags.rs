//! Resolution of raw metadata tags into typed skill fields.
//!
//! Tag text is extracted by an external parser; this core only sees a map
//! of recognized keys to raw string values. Absent keys leave the skill
//! untouched. Malformed values are logged and resolve to the inert default
//! (no knockback, no area, no telegraph) instead of failing.

use std::collections::BTreeMap;

use super::skill_data::{AoeOrigin, AoeShape, AoeSpec, MovementMode, RetreatSpec, SkillData};

/// Raw tag key to value mapping produced by the external parser.
pub type TagMap = BTreeMap<String, String>;

/// Anything that carries parsed metadata tags.
pub trait TagSource {
    /// Recognized tags for this entity.
    fn tags(&self) -> &TagMap;
}

impl TagSource for TagMap {
    fn tags(&self) -> &TagMap {
        self
    }
}

/// Typed view over the tags this core understands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillTags {
    /// `Knockback: <number>`.
    pub knockback: Option<f32>,
    /// `Pull: <number>`.
    pub pull: Option<f32>,
    /// `SkillAoE: CIRCLE,r | LINE,len,w | CONE,r,angle`.
    pub aoe_shape: Option<AoeShape>,
    /// `AoEOrigin: caster|target`.
    pub aoe_origin: Option<AoeOrigin>,
    /// `AoEApply: true|false`.
    pub aoe_apply: Option<bool>,
    /// `Telegraph: <seconds>`.
    pub telegraph_seconds: Option<f32>,
    /// `Retreat: <angle>,<distance>`.
    pub retreat: Option<RetreatSpec>,
    /// `Movement: stay|dashback|rush|passthrough|pierce`.
    pub movement: Option<MovementMode>,
}

impl SkillTags {
    /// Resolve tags from any tag source.
    pub fn resolve(source: &impl TagSource) -> Self {
        let tags = source.tags();
        let mut out = Self::default();

        for (key, raw) in tags {
            let value = raw.trim();
            match key.as_str() {
                "Knockback" => out.knockback = parse_distance(key, value),
                "Pull" => out.pull = parse_distance(key, value),
                "SkillAoE" => out.aoe_shape = parse_shape(value),
                "AoEOrigin" => out.aoe_origin = parse_origin(value),
                "AoEApply" => out.aoe_apply = parse_bool(key, value),
                "Telegraph" => out.telegraph_seconds = parse_distance(key, value),
                "Retreat" => out.retreat = parse_retreat(value),
                "Movement" => out.movement = parse_movement(value),
                _ => {}
            }
        }

        out
    }

    /// Overlay resolved tags onto a skill definition.
    #[must_use]
    pub fn apply_to(&self, mut skill: SkillData) -> SkillData {
        if let Some(knockback) = self.knockback {
            skill.knockback = knockback;
        }
        if let Some(pull) = self.pull {
            skill.pull = pull;
        }
        if let Some(seconds) = self.telegraph_seconds {
            skill.telegraph_seconds = seconds;
        }
        if let Some(retreat) = self.retreat {
            skill.retreat = Some(retreat);
        }
        if let Some(movement) = self.movement {
            skill.movement = movement;
        }
        if let Some(shape) = self.aoe_shape {
            skill.aoe = Some(AoeSpec {
                shape,
                origin: self.aoe_origin.unwrap_or_default(),
                apply_to_targets: self.aoe_apply.unwrap_or(false),
            });
        } else if let Some(aoe) = skill.aoe.as_mut() {
            if let Some(origin) = self.aoe_origin {
                aoe.origin = origin;
            }
            if let Some(apply) = self.aoe_apply {
                aoe.apply_to_targets = apply;
            }
        }
        skill
    }
}

fn parse_number(value: &str) -> Option<f32> {
    value.parse::<f32>().ok().filter(|v| v.is_finite())
}

fn parse_distance(key: &str, value: &str) -> Option<f32> {
    match parse_number(value) {
        Some(v) if v >= 0.0 => Some(v),
        _ => {
            tracing::warn!(tag = key, value, "Ignoring malformed tag value");
            None
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => {
            tracing::warn!(tag = key, value, "Ignoring malformed boolean tag");
            None
        }
    }
}

fn parse_origin(value: &str) -> Option<AoeOrigin> {
    match value.to_ascii_lowercase().as_str() {
        "caster" => Some(AoeOrigin::Caster),
        "target" => Some(AoeOrigin::Target),
        _ => {
            tracing::warn!(value, "Unknown AoEOrigin, using caster");
            None
        }
    }
}

fn parse_movement(value: &str) -> Option<MovementMode> {
    match value.to_ascii_lowercase().as_str() {
        "stay" => Some(MovementMode::Stay),
        "dashback" => Some(MovementMode::Dashback),
        "rush" => Some(MovementMode::Rush),
        "passthrough" => Some(MovementMode::Passthrough),
        "pierce" => Some(MovementMode::Pierce),
        _ => {
            tracing::warn!(value, "Unknown movement mode tag");
            None
        }
    }
}

fn parse_retreat(value: &str) -> Option<RetreatSpec> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    let parsed = match parts.as_slice() {
        [angle, distance] => parse_number(angle).zip(parse_number(distance)),
        _ => None,
    };
    match parsed {
        Some((angle_degrees, distance)) if distance >= 0.0 => Some(RetreatSpec {
            angle_degrees,
            distance,
        }),
        _ => {
            tracing::warn!(value, "Ignoring malformed Retreat tag");
            None
        }
    }
}

fn parse_shape(value: &str) -> Option<AoeShape> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    let Some((kind, args)) = parts.split_first() else {
        return None;
    };
    let nums: Option<Vec<f32>> = args.iter().map(|a| parse_number(a)).collect();

    let shape = match (kind.to_ascii_uppercase().as_str(), nums.as_deref()) {
        ("CIRCLE", Some(&[radius])) if radius > 0.0 => Some(AoeShape::Circle { radius }),
        ("LINE", Some(&[length, width])) if length > 0.0 && width > 0.0 => {
            Some(AoeShape::Line { length, width })
        }
        ("CONE", Some(&[radius, angle_degrees])) if radius > 0.0 && angle_degrees > 0.0 => {
            Some(AoeShape::Cone {
                radius,
                angle_degrees,
            })
        }
        _ => None,
    };

    if shape.is_none() {
        tracing::warn!(value, "Ignoring malformed SkillAoE tag");
    }
    shape
}
