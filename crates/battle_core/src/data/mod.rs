//! Data structures for skill configuration.
//!
//! This module contains pure data structures that describe how a skill
//! moves its user and which area it covers. All structs are designed to be
//! deserialized from RON files, and can be overlaid with tag values
//! resolved by an external metadata parser.
//!
//! **Note:** This module contains no IO - it only defines data types.

mod skill_data;
mod skill_tags;

pub use skill_data::{
    AoeOrigin, AoeShape, AoeSpec, MovementMode, RetreatSpec, SkillData, SkillKind, TargetScope,
};
pub use skill_tags::{SkillTags, TagMap, TagSource};
