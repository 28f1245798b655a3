//! Final validation of a resolved registry, run before anything is emitted.

use anyhow::Result;
use tracing::debug;

use crate::diag::{check, spec_error, warn_unless};
use crate::model::{ExtensionId, Registry};
use crate::naming::is_decimal_literal;

/// Validate every struct of a registry that went through the resolve passes.
///
/// Hard errors: a struct that no extension (or more than one) emits, a
/// member of an undeclared type, an array size naming a constant that is
/// declared neither by the owning extension nor by the one it depends on.
/// Members of a domain type that no extension emits only produce a warning.
pub fn check_correctness(registry: &mut Registry, type_prefix: &str) -> Result<()> {
    let mut warnings = Vec::new();

    for (_, entry, def) in registry.structs() {
        let name = &entry.name;
        let Some(&owner) = entry.required_by.first() else {
            return Err(spec_error(
                entry.line,
                format!("structure <{name}> not required by any extension"),
            ));
        };
        check!(
            entry.required_by.len() == 1,
            entry.line,
            "structure <{name}> required by more than one extension"
        );

        for member in &def.members {
            let ty = &member.ty.name;
            let member_type = registry.lookup(ty);
            check!(
                member_type.is_some(),
                member.line,
                "struct member uses unknown type <{ty}>"
            );
            if !type_prefix.is_empty() && ty.starts_with(type_prefix) {
                warn_unless(
                    member_type.is_some_and(|t| !t.required_by.is_empty()),
                    member.line,
                    format!(
                        "struct member type <{ty}> used in struct <{name}> is never required for any extension"
                    ),
                    &mut warnings,
                );
            }

            for size in &member.array_sizes {
                if !is_decimal_literal(size) {
                    check_array_size(registry, owner, &member.name, size, member.line)?;
                }
            }
        }
    }

    debug!(warnings = warnings.len(), "checked registry");
    registry.warnings.extend(warnings);
    Ok(())
}

fn check_array_size(
    registry: &Registry,
    owner: ExtensionId,
    member: &str,
    size: &str,
    line: usize,
) -> Result<()> {
    let ext = registry.extension(owner);
    let found = ext.require.constants.contains_key(size)
        || ext
            .depends
            .is_some_and(|d| registry.extension(d).require.constants.contains_key(size));
    check!(
        found,
        line,
        "struct member <{member}> uses unknown constant <{size}> as array size"
    );
    Ok(())
}
