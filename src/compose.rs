use crate::resolver::AncestorHop;
use crate::transform::Transform;

/// Fold a child-to-ancestor hop chain into the pose of the chain's start
/// frame expressed in the ancestor frame.
///
/// Hop `k` carries the pose of `frame_k` in its parent; accumulating
/// right-to-left yields `T(lca <- start) = T(lca <- p_n) * ... * T(p_1 <-
/// start)`. Each multiply re-normalizes the rotation (see
/// [`Transform::mul`](std::ops::Mul)).
pub fn compose_chain(hops: &[AncestorHop]) -> Transform {
    let Some((first, rest)) = hops.split_first() else {
        return Transform::IDENTITY;
    };
    // seeded with the first hop so a single-hop chain returns the stored
    // pose untouched
    let mut result = first.sample.transform;
    for hop in rest {
        result = hop.sample.transform * result;
    }
    result
}

/// Relative pose `target -> source` from the two chains meeting at their
/// common ancestor: `(target -> LCA)⁻¹ ∘ (source -> LCA)`. Both chains
/// empty means target == source, which composes to the identity.
pub fn between(target_chain: &[AncestorHop], source_chain: &[AncestorHop]) -> Transform {
    if target_chain.is_empty() {
        // the target is the common ancestor itself
        return compose_chain(source_chain);
    }
    compose_chain(target_chain).inverse() * compose_chain(source_chain)
}
