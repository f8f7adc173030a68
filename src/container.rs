//! Locating the element that bounds a widget's rendered UI.
//!
//! The default strategy climbs a fixed number of parents from the text
//! input. That depth is a property of the widget's markup, not something
//! discovered at runtime, so it breaks silently when the markup changes.
//! Widgets that portal their menu elsewhere in the document need an
//! explicit container anyway.

use crate::error::{Result, SelectError};
use crate::host::Host;

/// Parents between the text input and the widget's outer wrapper.
pub const CONTAINER_DEPTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerStrategy<N> {
    /// Walk [`CONTAINER_DEPTH`] parents up from the input.
    FixedAscent,
    /// Use this node as-is.
    Explicit(N),
}

impl<N> Default for ContainerStrategy<N> {
    fn default() -> Self {
        ContainerStrategy::FixedAscent
    }
}

impl<N: Clone> From<Option<N>> for ContainerStrategy<N> {
    fn from(container: Option<N>) -> Self {
        match container {
            Some(node) => ContainerStrategy::Explicit(node),
            None => ContainerStrategy::FixedAscent,
        }
    }
}

impl<N: Clone> ContainerStrategy<N> {
    pub fn resolve<H>(&self, host: &H, input: &N) -> Result<N>
    where
        H: Host<Node = N> + ?Sized,
    {
        match self {
            ContainerStrategy::Explicit(node) => Ok(node.clone()),
            ContainerStrategy::FixedAscent => container_from_input(host, input),
        }
    }
}

pub fn container_from_input<H: Host + ?Sized>(host: &H, input: &H::Node) -> Result<H::Node> {
    let mut node = input.clone();
    for reached in 0..CONTAINER_DEPTH {
        node = host.parent(&node).ok_or(SelectError::StructureMismatch {
            expected: CONTAINER_DEPTH,
            reached,
        })?;
    }
    Ok(node)
}
