//! Data validation utilities.
//!
//! Two kinds of RON files live in a data directory: a battle config
//! (`BattleConfig(...)`) and skill lists (`[SkillData(...), ...]`). Files
//! whose name contains `skill` are read as skill lists, everything else as
//! a config.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use battle_core::config::BattleConfig;
use battle_core::data::{AoeShape, SkillData};
use battle_core::error::BattleError;
use thiserror::Error;

/// Errors raised by the tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Reading a file or directory failed.
    #[error("IO error on {path}: {source}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The battle core rejected the data.
    #[error(transparent)]
    Battle(#[from] BattleError),

    /// A skill definition is unusable.
    #[error("{source_name}: skill '{skill}': {message}")]
    InvalidSkill {
        /// File the skill came from.
        source_name: String,
        /// Skill ID.
        skill: String,
        /// What is wrong.
        message: String,
    },
}

/// Result type alias using [`ToolError`].
pub type Result<T> = std::result::Result<T, ToolError>;

/// A validated data file.
#[derive(Debug, Clone)]
pub enum DataFile {
    /// Battle tuning.
    Config(BattleConfig),
    /// Skill definitions.
    Skills(Vec<SkillData>),
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Load and validate a battle config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
pub fn load_config(path: &Path) -> Result<BattleConfig> {
    let text = read(path)?;
    Ok(BattleConfig::from_ron_str(&source_name(path), &text)?)
}

/// Load and validate a skill list file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
pub fn load_skills(path: &Path) -> Result<Vec<SkillData>> {
    let text = read(path)?;
    parse_skills(&source_name(path), &text)
}

/// Parse a skill list from RON text and validate it.
///
/// # Errors
///
/// Returns an error on malformed RON or an unusable skill.
pub fn parse_skills(source_name: &str, text: &str) -> Result<Vec<SkillData>> {
    let skills: Vec<SkillData> = ron::from_str(text).map_err(|e| BattleError::DataParseError {
        source_name: source_name.to_string(),
        message: e.to_string(),
    })?;
    validate_skills(source_name, &skills)?;
    Ok(skills)
}

/// Check skills for duplicate IDs and impossible values.
///
/// # Errors
///
/// Returns the first problem found.
pub fn validate_skills(source_name: &str, skills: &[SkillData]) -> Result<()> {
    let invalid = |skill: &SkillData, message: &str| ToolError::InvalidSkill {
        source_name: source_name.to_string(),
        skill: skill.id.clone(),
        message: message.to_string(),
    };

    let mut seen = BTreeSet::new();
    for skill in skills {
        if skill.id.is_empty() {
            return Err(invalid(skill, "empty id"));
        }
        if !seen.insert(skill.id.as_str()) {
            return Err(invalid(skill, "duplicate id"));
        }
        for (name, value) in [
            ("knockback", skill.knockback),
            ("pull", skill.pull),
            ("telegraph_seconds", skill.telegraph_seconds),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(skill, &format!("{name} must be a non-negative number")));
            }
        }
        if let Some(retreat) = skill.retreat {
            if !retreat.distance.is_finite() || retreat.distance < 0.0 {
                return Err(invalid(skill, "retreat distance must be non-negative"));
            }
        }
        if let Some(aoe) = skill.aoe {
            let positive = match aoe.shape {
                AoeShape::Circle { radius } => radius > 0.0,
                AoeShape::Line { length, width } => length > 0.0 && width > 0.0,
                AoeShape::Cone {
                    radius,
                    angle_degrees,
                } => radius > 0.0 && angle_degrees > 0.0,
            };
            if !positive {
                return Err(invalid(skill, "AoE dimensions must be positive"));
            }
        }
    }
    Ok(())
}

/// Validate a single data file, choosing the format by file name.
///
/// # Errors
///
/// Returns an error if the file fails validation.
pub fn validate_file(path: &Path) -> Result<DataFile> {
    let is_skills = path
        .file_stem()
        .is_some_and(|s| s.to_string_lossy().contains("skill"));
    if is_skills {
        load_skills(path).map(DataFile::Skills)
    } else {
        load_config(path).map(DataFile::Config)
    }
}

/// Validate all RON data files in a directory.
///
/// Returns how many files were checked.
///
/// # Errors
///
/// Returns an error if any data file fails validation.
pub fn validate_data_directory(path: &Path) -> Result<usize> {
    let entries = std::fs::read_dir(path).map_err(|source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "ron"))
        .collect();
    files.sort();

    for file in &files {
        match validate_file(file)? {
            DataFile::Config(_) => tracing::info!(file = %file.display(), "Config ok"),
            DataFile::Skills(skills) => {
                tracing::info!(file = %file.display(), count = skills.len(), "Skills ok");
            }
        }
    }
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_core::data::MovementMode;

    #[test]
    fn test_parse_skill_list() {
        let text = r#"[
            SkillData(id: "slash", movement: Dashback),
            SkillData(id: "lance", movement: Pierce, knockback: 30.0),
        ]"#;
        let skills = parse_skills("skills.ron", text).unwrap();
        assert_eq!(skills.len(), 2);
        assert_eq!(skills[1].movement, MovementMode::Pierce);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let text = r#"[SkillData(id: "slash"), SkillData(id: "slash")]"#;
        let err = parse_skills("skills.ron", text).unwrap_err();
        assert!(matches!(err, ToolError::InvalidSkill { .. }));
    }

    #[test]
    fn test_negative_knockback_rejected() {
        let skills = vec![SkillData::new("shove").with_knockback(-5.0)];
        assert!(validate_skills("inline", &skills).is_err());
    }

    #[test]
    fn test_malformed_ron_is_parse_error() {
        let err = parse_skills("skills.ron", "[SkillData(id: ]").unwrap_err();
        assert!(matches!(
            err,
            ToolError::Battle(BattleError::DataParseError { .. })
        ));
    }

    #[test]
    fn test_shipped_data_directory_is_valid() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets/data");
        assert_eq!(validate_data_directory(&dir).unwrap(), 2);
    }
}
