//! Joint-name conventions used to complete a partial [`BoneMapping`].

use std::hash::Hash;

use bevy::{
    log::debug,
    reflect::{Reflect, std_traits::ReflectDefault},
};
use regex::{Regex, escape};
use serde::{Deserialize, Serialize};

use super::{
    bones::{FingerBone, HumanBone, Side},
    map::BoneMapping,
    skeleton::Skeleton,
};
use crate::errors::ValidationError;

#[derive(Debug, Reflect, Serialize, Deserialize, Clone, Hash, PartialEq, Eq)]
#[reflect(Default)]
#[serde(default)]
pub struct PatternMapperConfig {
    pub key_left: String,
    pub key_right: String,
    pub pattern_before: String,
    pub pattern_after: String,
}

impl Default for PatternMapperConfig {
    fn default() -> Self {
        Self {
            key_left: "L".into(),
            key_right: "R".into(),
            pattern_before: r"^.*".into(),
            pattern_after: r"$".into(),
        }
    }
}

impl PatternMapperConfig {
    pub fn build(&self) -> Result<PatternMapper, ValidationError> {
        let regex = Regex::new(&format!(
            "({})({}|{})({})",
            &self.pattern_before,
            escape(&self.key_left),
            escape(&self.key_right),
            &self.pattern_after,
        ))
        .map_err(|error| ValidationError::InvalidPattern(error.to_string()))?;

        Ok(PatternMapper {
            config: self.clone(),
            regex,
        })
    }
}

/// Swaps the side key of a joint name, e.g. `upper_arm.L` and `upper_arm.R`.
#[derive(Debug, Clone)]
pub struct PatternMapper {
    config: PatternMapperConfig,
    regex: Regex,
}

impl Hash for PatternMapper {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.config.hash(state);
    }
}

impl Serialize for PatternMapper {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.config.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PatternMapper {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        PatternMapperConfig::deserialize(deserializer)?
            .build()
            .map_err(serde::de::Error::custom)
    }
}

impl PatternMapper {
    pub fn config(&self) -> &PatternMapperConfig {
        &self.config
    }

    /// Name of the opposite-side joint, or `None` if `input` has no side key.
    pub fn flip(&self, input: &str) -> Option<String> {
        let captures = self.regex.captures(input)?;
        let key_capture = captures.get(2)?.as_str();
        let replacement_key = if key_capture == self.config.key_left {
            &self.config.key_right
        } else {
            &self.config.key_left
        };
        Some(
            self.regex
                .replace(input, format!("${{1}}{replacement_key}${{3}}"))
                .into(),
        )
    }

    /// Fills unmapped sided bones from their mapped mirror, when the flipped joint name exists in
    /// `skeleton` and is not mapped yet. Returns how many bones were added.
    pub fn complete_mapping(&self, mapping: &mut BoneMapping, skeleton: &Skeleton) -> usize {
        let mut added = 0;
        let mut taken: Vec<String> = mapping
            .bones
            .values()
            .chain(mapping.left_hand.values())
            .chain(mapping.right_hand.values())
            .cloned()
            .collect();

        let candidate = |name: &str, taken: &mut Vec<String>| -> Option<String> {
            let flipped = self.flip(name)?;
            if skeleton.index_of(&flipped).is_none() || taken.contains(&flipped) {
                return None;
            }
            taken.push(flipped.clone());
            Some(flipped)
        };

        for bone in HumanBone::ALL {
            if bone.side() == Side::Center || mapping.bones.contains_key(&bone) {
                continue;
            }
            let Some(source) = mapping.bones.get(&bone.mirror()).cloned() else {
                continue;
            };
            if let Some(flipped) = candidate(&source, &mut taken) {
                debug!("Mapped {bone:?} to {flipped} by mirroring {source}");
                mapping.bones.insert(bone, flipped);
                added += 1;
            }
        }

        for side in [Side::Left, Side::Right] {
            for finger in FingerBone::ALL {
                if mapping.hand(side).contains_key(&finger) {
                    continue;
                }
                let Some(source) = mapping.hand(side.mirror()).get(&finger).cloned() else {
                    continue;
                };
                if let Some(flipped) = candidate(&source, &mut taken) {
                    mapping.hand_mut(side).insert(finger, flipped);
                    added += 1;
                }
            }
        }

        added
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::humanoid::reference::{reference_mapping, reference_skeleton};

    #[test]
    fn test_flip() {
        let mapper = PatternMapperConfig::default().build().unwrap();
        assert_eq!(mapper.flip("upper_arm.L").as_deref(), Some("upper_arm.R"));
        assert_eq!(mapper.flip("thumb_01.R").as_deref(), Some("thumb_01.L"));
        assert_eq!(mapper.flip("spine"), None);
    }

    #[test]
    fn test_custom_keys() {
        let mapper = PatternMapperConfig {
            key_left: "Left".into(),
            key_right: "Right".into(),
            pattern_before: "^(?:mixamorig:)?".into(),
            pattern_after: ".*$".into(),
        }
        .build()
        .unwrap();
        assert_eq!(
            mapper.flip("mixamorig:LeftForeArm").as_deref(),
            Some("mixamorig:RightForeArm")
        );
    }

    #[test]
    fn test_invalid_pattern() {
        let error = PatternMapperConfig {
            pattern_before: "(".into(),
            ..Default::default()
        }
        .build()
        .unwrap_err();
        assert!(matches!(error, ValidationError::InvalidPattern(_)));
    }

    #[test]
    fn test_complete_mapping_mirrors_missing_side() {
        let skeleton = reference_skeleton().unwrap();
        let full = reference_mapping();
        let mut partial = full.clone();
        for bone in HumanBone::ALL {
            if bone.side() == Side::Right {
                partial.bones.shift_remove(&bone);
            }
        }
        partial.right_hand.clear();

        let mapper = PatternMapperConfig::default().build().unwrap();
        let added = mapper.complete_mapping(&mut partial, &skeleton);

        assert_eq!(added, 9 + 15);
        for bone in HumanBone::ALL {
            assert_eq!(partial.bones.get(&bone), full.bones.get(&bone), "{bone:?}");
        }
        assert_eq!(partial.hand(Side::Right).len(), 15);
    }

    #[test]
    fn test_serde_through_config() {
        let mapper = PatternMapperConfig::default().build().unwrap();
        let serialized = ron::to_string(&mapper).unwrap();
        let restored: PatternMapper = ron::from_str(&serialized).unwrap();
        assert_eq!(restored.config(), mapper.config());
    }
}
