//! Blend trees: arena-allocated trees of blend nodes, evaluated into a flat list of weighted
//! clip leaves.

mod blend_1d;
mod directional;
mod freeform;

use bevy::{log::warn, math::Vec2};

pub use blend_1d::Blend1D;
pub use directional::SimpleDirectional2D;
pub use freeform::{Freeform2D, FreeformMode};

use crate::{clip::ClipLibrary, errors::ValidationError};

/// How a node turns parameter values into child weights.
#[derive(Debug, Clone, PartialEq)]
pub enum BlendNodeKind {
    /// Leaf playing one clip.
    Clip(usize),
    Blend1D(Blend1D),
    SimpleDirectional2D(SimpleDirectional2D),
    Freeform2D(Freeform2D),
    /// Each child is weighted by its own parameter.
    Direct(Vec<usize>),
}

/// Link from a node to one of its children, with playback modifiers applied to every leaf below.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChildMotion {
    pub node: usize,
    /// Playback speed multiplier. Negative values play backwards.
    pub time_scale: f32,
    /// Normalized offset added to the state's time.
    pub cycle_offset: f32,
    pub mirror: bool,
}

impl ChildMotion {
    pub fn new(node: usize) -> Self {
        Self {
            node,
            time_scale: 1.,
            cycle_offset: 0.,
            mirror: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlendTreeNode {
    pub kind: BlendNodeKind,
    pub children: Vec<ChildMotion>,
}

impl BlendTreeNode {
    pub fn clip(clip: usize) -> Self {
        Self {
            kind: BlendNodeKind::Clip(clip),
            children: vec![],
        }
    }

    pub fn blend_1d(parameter: usize, children: Vec<(ChildMotion, f32)>) -> Self {
        let (children, thresholds) = children.into_iter().unzip();
        Self {
            kind: BlendNodeKind::Blend1D(Blend1D::new(parameter, thresholds)),
            children,
        }
    }

    pub fn simple_directional(parameters: [usize; 2], children: Vec<(ChildMotion, Vec2)>) -> Self {
        let (children, positions) = children.into_iter().unzip();
        Self {
            kind: BlendNodeKind::SimpleDirectional2D(SimpleDirectional2D::new(
                parameters, positions,
            )),
            children,
        }
    }

    pub fn freeform(
        parameters: [usize; 2],
        mode: FreeformMode,
        children: Vec<(ChildMotion, Vec2)>,
    ) -> Self {
        let (children, positions) = children.into_iter().unzip();
        Self {
            kind: BlendNodeKind::Freeform2D(Freeform2D::new(parameters, mode, positions)),
            children,
        }
    }

    pub fn direct(children: Vec<(ChildMotion, usize)>) -> Self {
        let (children, parameters) = children.into_iter().unzip();
        Self {
            kind: BlendNodeKind::Direct(parameters),
            children,
        }
    }

    /// Thresholds, positions or parameters the node carries, one per child.
    fn arity(&self) -> Option<usize> {
        match &self.kind {
            BlendNodeKind::Clip(_) => None,
            BlendNodeKind::Blend1D(blend) => Some(blend.thresholds().len()),
            BlendNodeKind::SimpleDirectional2D(blend) => Some(blend.positions().len()),
            BlendNodeKind::Freeform2D(blend) => Some(blend.positions().len()),
            BlendNodeKind::Direct(parameters) => Some(parameters.len()),
        }
    }

    fn parameters(&self) -> Vec<usize> {
        match &self.kind {
            BlendNodeKind::Clip(_) => vec![],
            BlendNodeKind::Blend1D(blend) => vec![blend.parameter],
            BlendNodeKind::SimpleDirectional2D(blend) => blend.parameters.to_vec(),
            BlendNodeKind::Freeform2D(blend) => blend.parameters.to_vec(),
            BlendNodeKind::Direct(parameters) => parameters.clone(),
        }
    }

    fn child_weights(&self, values: &[f32], out: &mut Vec<f32>) {
        out.clear();
        out.resize(self.children.len(), 0.);
        let read = |index: usize| values.get(index).copied().unwrap_or(0.);
        match &self.kind {
            BlendNodeKind::Clip(_) => {}
            BlendNodeKind::Blend1D(blend) => blend.weights(read(blend.parameter), out),
            BlendNodeKind::SimpleDirectional2D(blend) => {
                let [x, y] = blend.parameters;
                blend.weights(Vec2::new(read(x), read(y)), out);
            }
            BlendNodeKind::Freeform2D(blend) => {
                let [x, y] = blend.parameters;
                blend.weights(Vec2::new(read(x), read(y)), out);
            }
            BlendNodeKind::Direct(parameters) => {
                let mut sum = 0.;
                for (weight, parameter) in out.iter_mut().zip(parameters) {
                    *weight = read(*parameter).clamp(0., 1.);
                    sum += *weight;
                }
                if sum > 1. {
                    out.iter_mut().for_each(|weight| *weight /= sum);
                }
            }
        }
    }
}

/// One weighted clip reached by a tree evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendLeaf {
    pub clip: usize,
    pub weight: f32,
    pub time_scale: f32,
    pub cycle_offset: f32,
    pub mirror: bool,
    pub reverse: bool,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    node: usize,
    weight: f32,
    time_scale: f32,
    cycle_offset: f32,
    mirror: bool,
}

/// Reusable buffers for [`BlendTree::evaluate`].
#[derive(Debug, Clone, Default)]
pub struct BlendScratch {
    stack: Vec<Frame>,
    weights: Vec<f32>,
}

/// Tree of blend nodes stored in an arena. Node 0 is the root and every child comes after its
/// parent.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendTree {
    name: String,
    nodes: Vec<BlendTreeNode>,
}

impl BlendTree {
    pub fn new(name: impl Into<String>, nodes: Vec<BlendTreeNode>) -> Result<Self, ValidationError> {
        let name = name.into();
        if nodes.is_empty() {
            return Err(ValidationError::EmptyBlendTree(name));
        }
        for (index, node) in nodes.iter().enumerate() {
            let Some(arity) = node.arity() else {
                continue;
            };
            if node.children.is_empty() {
                return Err(ValidationError::EmptyBlendNode {
                    tree: name,
                    node: index,
                });
            }
            if arity != node.children.len() {
                return Err(ValidationError::BlendNodeArity {
                    tree: name,
                    node: index,
                    children: node.children.len(),
                    values: arity,
                });
            }
            for child in &node.children {
                if child.node <= index || child.node >= nodes.len() {
                    return Err(ValidationError::InvalidBlendChild {
                        tree: name,
                        node: index,
                        child: child.node,
                    });
                }
            }
        }
        Ok(Self { name, nodes })
    }

    /// A tree holding a single clip.
    pub fn single(name: impl Into<String>, clip: usize) -> Self {
        Self {
            name: name.into(),
            nodes: vec![BlendTreeNode::clip(clip)],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[BlendTreeNode] {
        &self.nodes
    }

    /// Checks clip and parameter indices against the tables they point into.
    pub fn validate_indices(
        &self,
        clip_count: usize,
        parameter_count: usize,
    ) -> Result<(), ValidationError> {
        for node in &self.nodes {
            if let BlendNodeKind::Clip(clip) = node.kind {
                if clip >= clip_count {
                    return Err(ValidationError::InvalidClipIndex(clip));
                }
            }
            if let Some(parameter) = node
                .parameters()
                .into_iter()
                .find(|parameter| *parameter >= parameter_count)
            {
                return Err(ValidationError::InvalidParameterIndex(parameter));
            }
        }
        Ok(())
    }

    /// Writes the weighted leaves of the tree for the given parameter values. Leaves with zero
    /// weight are skipped; the weights of the written leaves sum to at most one.
    pub fn evaluate(&self, values: &[f32], scratch: &mut BlendScratch, out: &mut Vec<BlendLeaf>) {
        out.clear();
        scratch.stack.clear();
        scratch.stack.push(Frame {
            node: 0,
            weight: 1.,
            time_scale: 1.,
            cycle_offset: 0.,
            mirror: false,
        });

        while let Some(frame) = scratch.stack.pop() {
            let Some(node) = self.nodes.get(frame.node) else {
                continue;
            };
            if let BlendNodeKind::Clip(clip) = node.kind {
                out.push(BlendLeaf {
                    clip,
                    weight: frame.weight,
                    time_scale: frame.time_scale,
                    cycle_offset: frame.cycle_offset,
                    mirror: frame.mirror,
                    reverse: frame.time_scale < 0.,
                });
                continue;
            }

            node.child_weights(values, &mut scratch.weights);
            for (child, weight) in node.children.iter().zip(&scratch.weights).rev() {
                let weight = frame.weight * weight;
                if weight <= 0. {
                    continue;
                }
                scratch.stack.push(Frame {
                    node: child.node,
                    weight,
                    time_scale: frame.time_scale * child.time_scale,
                    cycle_offset: frame.cycle_offset + child.cycle_offset,
                    mirror: frame.mirror != child.mirror,
                });
            }
        }
    }
}

/// Weighted duration of a set of leaves, with each clip stretched by its leaf's time scale.
/// Zero when no leaf has a duration.
pub fn leaves_duration(leaves: &[BlendLeaf], clips: &ClipLibrary) -> f32 {
    let mut total_weight = 0.;
    let mut duration = 0.;
    for leaf in leaves {
        let Some(entry) = clips.get(leaf.clip) else {
            warn!("Blend leaf references missing clip {}", leaf.clip);
            continue;
        };
        let speed = leaf.time_scale.abs();
        if speed <= f32::EPSILON {
            continue;
        }
        duration += leaf.weight * entry.duration() / speed;
        total_weight += leaf.weight;
    }
    if total_weight > 0. {
        duration / total_weight
    } else {
        0.
    }
}

fn even_split(out: &mut [f32]) {
    if out.is_empty() {
        return;
    }
    let weight = 1. / out.len() as f32;
    out.fill(weight);
}

/// Gives full weight to a child placed exactly at `query`.
fn exact_match(positions: &[Vec2], query: Vec2, out: &mut [f32]) -> bool {
    let Some(index) = positions
        .iter()
        .position(|position| position.distance_squared(query) < 1e-10)
    else {
        return false;
    };
    out.fill(0.);
    out[index] = 1.;
    true
}
