//! Advisory warnings about risky version constraints.
//!
//! Nothing here fails a build. The warnings are printed before the runtime
//! is installed so a user sees why a build picked a surprising version.

use crate::VersionConstraint;

/// Warn when the node constraint is missing or either constraint is unbounded.
///
/// `node` is the runtime constraint and `yarn` the package manager
/// constraint; the yarn constraint is only checked for unbounded ranges
/// since leaving it out is a legitimate way to select the npm workflow.
#[must_use]
pub fn advise(node: &VersionConstraint, yarn: &VersionConstraint) -> Vec<String> {
    let mut warnings = Vec::new();

    if !node.is_specified() {
        warnings.push(
            "Node version not specified in package.json; \
             pin a range in engines.node so builds stay reproducible"
                .to_string(),
        );
    }

    for (field, constraint) in [("engines.node", node), ("engines.yarn", yarn)] {
        if constraint.is_wildcard() {
            warnings.push(format!(
                "Dangerous semver range (*) in {field}; \
                 any new major release will be picked up automatically"
            ));
        } else if constraint.is_open_ended() {
            warnings.push(format!(
                "Dangerous semver range (>) in {field}; \
                 add an upper bound such as \"{} <{}\"",
                constraint,
                next_major_hint(constraint)
            ));
        }
    }

    warnings
}

/// Suggest an upper bound one major above the lower bound, if it has one.
fn next_major_hint(constraint: &VersionConstraint) -> String {
    let lower = constraint.range().trim_start_matches(['>', '=', ' ']);
    lower
        .split('.')
        .next()
        .and_then(|major| major.parse::<u64>().ok())
        .and_then(|major| major.checked_add(1))
        .map_or_else(|| "next major".to_string(), |next| next.to_string())
}
