//! Resource dimensions, quantity vectors and weight vectors
//!
//! Dimensions form a closed, ordered enumeration. Declaration order is part of
//! the contract: it is the fallback ordering the fairness comparator walks
//! after the dominant dimension, so new variants must be appended.

use crate::{DrfError, DrfResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A schedulable resource dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Memory,
    Cpu,
    Gpu,
}

impl ResourceType {
    /// Number of declared dimensions
    pub const COUNT: usize = 3;

    /// Every dimension in declaration order
    pub const ALL: [ResourceType; Self::COUNT] =
        [ResourceType::Memory, ResourceType::Cpu, ResourceType::Gpu];

    /// Position of this dimension in declaration order
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Memory => write!(f, "memory"),
            ResourceType::Cpu => write!(f, "cpu"),
            ResourceType::Gpu => write!(f, "gpu"),
        }
    }
}

impl FromStr for ResourceType {
    type Err = DrfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(ResourceType::Memory),
            "cpu" | "vcores" => Ok(ResourceType::Cpu),
            "gpu" => Ok(ResourceType::Gpu),
            other => Err(DrfError::Config(format!("Unknown resource type: {}", other))),
        }
    }
}

/// Non-negative quantity per resource dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<ResourceType, u64>",
    into = "BTreeMap<ResourceType, u64>"
)]
pub struct Resource {
    values: [u64; ResourceType::COUNT],
}

impl Resource {
    /// Create a resource vector from memory, CPU and GPU quantities
    pub const fn new(memory: u64, cpu: u64, gpu: u64) -> Self {
        Self {
            values: [memory, cpu, gpu],
        }
    }

    /// The all-zero vector
    pub const fn none() -> Self {
        Self {
            values: [0; ResourceType::COUNT],
        }
    }

    /// A vector that every finite quantity fits in
    pub const fn unbounded() -> Self {
        Self {
            values: [u64::MAX; ResourceType::COUNT],
        }
    }

    pub fn get(&self, resource_type: ResourceType) -> u64 {
        self.values[resource_type.index()]
    }

    pub fn set(&mut self, resource_type: ResourceType, value: u64) {
        self.values[resource_type.index()] = value;
    }

    /// Builder-style variant of [`Resource::set`]
    pub fn with(mut self, resource_type: ResourceType, value: u64) -> Self {
        self.set(resource_type, value);
        self
    }

    pub fn memory(&self) -> u64 {
        self.get(ResourceType::Memory)
    }

    pub fn cpu(&self) -> u64 {
        self.get(ResourceType::Cpu)
    }

    pub fn gpu(&self) -> u64 {
        self.get(ResourceType::Gpu)
    }

    /// True when every dimension is zero
    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0)
    }

    /// True when no dimension of `self` exceeds the same dimension of `other`
    pub fn fits_in(&self, other: &Resource) -> bool {
        ResourceType::ALL
            .iter()
            .all(|t| self.get(*t) <= other.get(*t))
    }

    /// Per-dimension saturating sum
    pub fn saturating_add(&self, other: &Resource) -> Resource {
        let mut out = *self;
        for t in ResourceType::ALL {
            out.set(t, self.get(t).saturating_add(other.get(t)));
        }
        out
    }

    /// Per-dimension difference clamped at zero
    pub fn saturating_sub(&self, other: &Resource) -> Resource {
        let mut out = *self;
        for t in ResourceType::ALL {
            out.set(t, self.get(t).saturating_sub(other.get(t)));
        }
        out
    }

    /// Per-dimension difference, `None` if any dimension would go negative
    pub fn checked_sub(&self, other: &Resource) -> Option<Resource> {
        let mut out = *self;
        for t in ResourceType::ALL {
            out.set(t, self.get(t).checked_sub(other.get(t))?);
        }
        Some(out)
    }

    /// Per-dimension minimum
    pub fn component_min(&self, other: &Resource) -> Resource {
        let mut out = *self;
        for t in ResourceType::ALL {
            out.set(t, self.get(t).min(other.get(t)));
        }
        out
    }
}

impl From<BTreeMap<ResourceType, u64>> for Resource {
    fn from(map: BTreeMap<ResourceType, u64>) -> Self {
        let mut resource = Resource::none();
        for (t, v) in map {
            resource.set(t, v);
        }
        resource
    }
}

impl From<Resource> for BTreeMap<ResourceType, u64> {
    fn from(resource: Resource) -> Self {
        ResourceType::ALL
            .iter()
            .map(|t| (*t, resource.get(*t)))
            .collect()
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<")?;
        for (i, t) in ResourceType::ALL.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", t, self.get(*t))?;
        }
        write!(f, ">")
    }
}

/// Positive multiplier per resource dimension
///
/// A larger weight lets a consumer hold proportionally more of that
/// dimension before it is considered equally served.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<ResourceType, f64>",
    into = "BTreeMap<ResourceType, f64>"
)]
pub struct ResourceWeights {
    weights: [f64; ResourceType::COUNT],
}

impl ResourceWeights {
    /// Weight 1.0 on every dimension
    pub const NEUTRAL: ResourceWeights = ResourceWeights {
        weights: [1.0; ResourceType::COUNT],
    };

    /// Per-dimension weights for memory, CPU and GPU
    pub fn new(memory: f64, cpu: f64, gpu: f64) -> DrfResult<Self> {
        let weights = [memory, cpu, gpu];
        for (t, w) in ResourceType::ALL.iter().zip(weights) {
            validate_weight(*t, w)?;
        }
        Ok(Self { weights })
    }

    /// The same weight on every dimension
    pub fn uniform(weight: f64) -> DrfResult<Self> {
        Self::new(weight, weight, weight)
    }

    pub fn get(&self, resource_type: ResourceType) -> f64 {
        self.weights[resource_type.index()]
    }

    /// Replace one dimension's weight
    pub fn with(mut self, resource_type: ResourceType, weight: f64) -> DrfResult<Self> {
        validate_weight(resource_type, weight)?;
        self.weights[resource_type.index()] = weight;
        Ok(self)
    }
}

impl Default for ResourceWeights {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

fn validate_weight(resource_type: ResourceType, weight: f64) -> DrfResult<()> {
    if weight.is_finite() && weight > 0.0 {
        Ok(())
    } else {
        Err(DrfError::InvalidResource(format!(
            "weight for {} must be positive and finite, got {}",
            resource_type, weight
        )))
    }
}

impl TryFrom<BTreeMap<ResourceType, f64>> for ResourceWeights {
    type Error = DrfError;

    fn try_from(map: BTreeMap<ResourceType, f64>) -> Result<Self, Self::Error> {
        let mut weights = ResourceWeights::NEUTRAL;
        for (t, w) in map {
            weights = weights.with(t, w)?;
        }
        Ok(weights)
    }
}

impl From<ResourceWeights> for BTreeMap<ResourceType, f64> {
    fn from(weights: ResourceWeights) -> Self {
        ResourceType::ALL
            .iter()
            .map(|t| (*t, weights.get(*t)))
            .collect()
    }
}

/// The subset of dimensions that take part in share computation and
/// tie-breaking. Iteration always follows declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ResourceType>", into = "Vec<ResourceType>")]
pub struct EnabledResourceTypes {
    mask: [bool; ResourceType::COUNT],
}

impl EnabledResourceTypes {
    /// Every declared dimension
    pub const fn all() -> Self {
        Self {
            mask: [true; ResourceType::COUNT],
        }
    }

    /// Build from an arbitrary collection; duplicates are ignored and an
    /// empty set is a configuration error
    pub fn from_types<I>(types: I) -> DrfResult<Self>
    where
        I: IntoIterator<Item = ResourceType>,
    {
        let mut mask = [false; ResourceType::COUNT];
        for t in types {
            mask[t.index()] = true;
        }
        if !mask.iter().any(|m| *m) {
            return Err(DrfError::Config(
                "enabled resource type set must not be empty".to_string(),
            ));
        }
        Ok(Self { mask })
    }

    pub fn contains(&self, resource_type: ResourceType) -> bool {
        self.mask[resource_type.index()]
    }

    /// Enabled dimensions in declaration order
    pub fn iter(&self) -> impl Iterator<Item = ResourceType> + '_ {
        ResourceType::ALL
            .into_iter()
            .filter(move |t| self.contains(*t))
    }

    pub fn len(&self) -> usize {
        self.mask.iter().filter(|m| **m).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EnabledResourceTypes {
    fn default() -> Self {
        Self::all()
    }
}

impl TryFrom<Vec<ResourceType>> for EnabledResourceTypes {
    type Error = DrfError;

    fn try_from(types: Vec<ResourceType>) -> Result<Self, Self::Error> {
        Self::from_types(types)
    }
}

impl From<EnabledResourceTypes> for Vec<ResourceType> {
    fn from(enabled: EnabledResourceTypes) -> Self {
        enabled.iter().collect()
    }
}
