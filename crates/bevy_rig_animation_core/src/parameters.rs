use std::sync::Arc;

use bevy::{log::warn, reflect::Reflect};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::{RigError, RigResult, ValidationError};

#[derive(Reflect, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterKind {
    Float,
    Int,
    Bool,
    /// A boolean that resets itself when a transition it satisfied fires.
    Trigger,
}

#[derive(Reflect, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Trigger(bool),
}

impl Default for ParameterValue {
    fn default() -> Self {
        Self::Float(0.)
    }
}

impl ParameterValue {
    pub fn kind(&self) -> ParameterKind {
        match self {
            Self::Float(_) => ParameterKind::Float,
            Self::Int(_) => ParameterKind::Int,
            Self::Bool(_) => ParameterKind::Bool,
            Self::Trigger(_) => ParameterKind::Trigger,
        }
    }

    pub fn default_for(kind: ParameterKind) -> Self {
        match kind {
            ParameterKind::Float => Self::Float(0.),
            ParameterKind::Int => Self::Int(0),
            ParameterKind::Bool => Self::Bool(false),
            ParameterKind::Trigger => Self::Trigger(false),
        }
    }

    /// Numeric view used by blend trees and comparison conditions.
    pub fn as_f32(&self) -> f32 {
        match *self {
            Self::Float(value) => value,
            Self::Int(value) => value as f32,
            Self::Bool(value) | Self::Trigger(value) => {
                if value {
                    1.
                } else {
                    0.
                }
            }
        }
    }

    pub fn as_bool(&self) -> bool {
        match *self {
            Self::Float(value) => value != 0.,
            Self::Int(value) => value != 0,
            Self::Bool(value) | Self::Trigger(value) => value,
        }
    }
}

/// Parameter declarations of a controller, in authored order.
///
/// The table is constant data shared by every character driven by the controller. Each character
/// gets its own [`ParameterSet`].
#[derive(Debug, Clone, Default)]
pub struct ParameterTable {
    defaults: IndexMap<String, ParameterValue>,
}

impl ParameterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        name: impl Into<String>,
        default: ParameterValue,
    ) -> Result<usize, ValidationError> {
        let name = name.into();
        if self.defaults.contains_key(&name) {
            return Err(ValidationError::DuplicateName(name));
        }
        let (index, _) = self.defaults.insert_full(name, default);
        Ok(index)
    }

    pub fn with(mut self, name: impl Into<String>, default: ParameterValue) -> Self {
        let name = name.into();
        self.defaults.insert(name, default);
        self
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.defaults.get_index_of(name)
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.defaults.get_index(index).map(|(name, _)| name.as_str())
    }

    pub fn kind(&self, index: usize) -> Option<ParameterKind> {
        self.defaults.get_index(index).map(|(_, value)| value.kind())
    }

    pub fn len(&self) -> usize {
        self.defaults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.defaults
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Resolves a parameter name, checking it has one of the expected kinds.
    pub fn resolve(
        &self,
        name: &str,
        accepted: &[ParameterKind],
        expected: &'static str,
    ) -> Result<usize, ValidationError> {
        let index = self
            .index_of(name)
            .ok_or_else(|| ValidationError::UnknownParameter(name.to_string()))?;
        let found = self.defaults[index].kind();
        if !accepted.contains(&found) {
            return Err(ValidationError::ParameterKindMismatch {
                name: name.to_string(),
                found,
                expected,
            });
        }
        Ok(index)
    }
}

/// Per-character parameter values.
///
/// A float mirror of every value is kept up to date so blend trees can read parameters as a
/// plain `&[f32]`.
#[derive(Debug, Clone)]
pub struct ParameterSet {
    table: Arc<ParameterTable>,
    values: Vec<ParameterValue>,
    floats: Vec<f32>,
}

impl ParameterSet {
    pub fn new(table: Arc<ParameterTable>) -> Self {
        let values: Vec<ParameterValue> = table.defaults.values().copied().collect();
        let floats = values.iter().map(ParameterValue::as_f32).collect();
        Self {
            table,
            values,
            floats,
        }
    }

    pub fn table(&self) -> &ParameterTable {
        &self.table
    }

    pub fn get(&self, index: usize) -> Option<ParameterValue> {
        self.values.get(index).copied()
    }

    pub fn get_by_name(&self, name: &str) -> RigResult<ParameterValue> {
        self.table
            .index_of(name)
            .and_then(|index| self.get(index))
            .ok_or_else(|| RigError::UnknownParameter(name.to_string()))
    }

    pub fn floats(&self) -> &[f32] {
        &self.floats
    }

    pub fn as_f32(&self, index: usize) -> f32 {
        self.floats.get(index).copied().unwrap_or(0.)
    }

    pub fn as_bool(&self, index: usize) -> bool {
        self.values.get(index).is_some_and(ParameterValue::as_bool)
    }

    /// Writes a parameter by index. The value must have the declared kind.
    pub fn set(&mut self, index: usize, value: ParameterValue) -> RigResult<()> {
        let Some(slot) = self.values.get_mut(index) else {
            return Err(RigError::InvalidParameter(index));
        };
        if slot.kind() != value.kind() {
            return Err(RigError::ParameterKindMismatch {
                name: self.table.name(index).unwrap_or_default().to_string(),
                found: slot.kind(),
                expected: value.kind(),
            });
        }
        *slot = value;
        self.floats[index] = value.as_f32();
        Ok(())
    }

    pub fn set_by_name(&mut self, name: &str, value: ParameterValue) -> RigResult<()> {
        let result = match self.table.index_of(name) {
            Some(index) => self.set(index, value),
            None => Err(RigError::UnknownParameter(name.to_string())),
        };
        if let Err(error) = &result {
            warn!("Ignoring parameter write: {error}");
        }
        result
    }

    /// Resets a trigger parameter. Other kinds are left untouched.
    pub fn consume_trigger(&mut self, index: usize) {
        if let Some(ParameterValue::Trigger(value)) = self.values.get_mut(index) {
            *value = false;
            self.floats[index] = 0.;
        }
    }

    pub fn reset(&mut self) {
        for (index, (_, default)) in self.table.iter().enumerate() {
            self.values[index] = *default;
            self.floats[index] = default.as_f32();
        }
    }
}
