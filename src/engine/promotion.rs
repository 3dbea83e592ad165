//! Substitution promotion.
//!
//! A bare placeholder takes its semantic type from the position it appears
//! in. Promotion sets the placeholder's declared type and records the name in
//! the registry; anything that is not a bare placeholder is left untouched.

use tracing::warn;

use crate::ast::AstNode;
use crate::config::ConflictPolicy;
use crate::registry::{RegistryConflict, SubstitutionRegistry, SubstitutionType};

/// Promotes `node` if it is a bare placeholder. The node's declared type is
/// whatever the registry keeps. Returns the conflict, if the registry already
/// held another type for the name.
pub fn promote(
    node: &mut AstNode,
    ty: SubstitutionType,
    registry: &mut SubstitutionRegistry,
    policy: ConflictPolicy,
) -> Option<RegistryConflict> {
    let AstNode::Substitution(sub) = node else {
        return None;
    };
    let conflict = registry.assign(&sub.name, ty, policy);
    sub.declared_type = Some(conflict.as_ref().map_or(ty, |conflict| conflict.kept));
    if let Some(conflict) = &conflict {
        warn!(
            name = %conflict.name,
            previous = %conflict.previous,
            attempted = %conflict.attempted,
            "substitution variable typed twice"
        );
    }
    conflict
}
