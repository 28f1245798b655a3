//! Header emission: checked [`Registry`] → C++ header text.
//!
//! Every block is produced from a `${name}` template through
//! [`template::substitute`], so a template and the slots filled for it can
//! never drift apart unnoticed.

use std::io::Write;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::{Config, FormatConfig};
use crate::diag::{check, spec_error};
use crate::model::{Member, Registry, StructDef, TypeCategory, TypeEntry};
use crate::naming::{enum_value_name, strip_prefix};
use crate::template;

const HEADER_TEMPLATE: &str = r#"${copyright}

#ifndef ${guard}
#define ${guard}

${includes}

#if !defined( ${videoNamespace} )
#  define ${videoNamespace} ${videoNamespaceDefault}
#endif

namespace ${namespace}
{
namespace ${videoNamespace}
{
${enums}
${structs}
}   // namespace ${videoNamespace}
}   // namespace ${namespace}
#endif
"#;

const ENUMS_TEMPLATE: &str = r#"
  //=============
  //=== ENUMs ===
  //=============

${enums}
"#;

const ENUM_TEMPLATE: &str = r#"  enum class ${enumName}
  {${enumValues}};
"#;

const STRUCTS_TEMPLATE: &str = r#"
  //===============
  //=== STRUCTS ===
  //===============

${structs}
"#;

const STRUCT_TEMPLATE: &str = r#"  struct ${structureType}
  {
    using NativeType = ${nativeType};

    operator ${nativeType} const &() const VULKAN_HPP_NOEXCEPT
    {
      return *reinterpret_cast<const ${nativeType}*>( this );
    }

    operator ${nativeType} &() VULKAN_HPP_NOEXCEPT
    {
      return *reinterpret_cast<${nativeType}*>( this );
    }
${compareOperators}
    public:
${members}
  };
"#;

const COMPARE_TEMPLATE: &str = r#"
    bool operator==( ${name} const & rhs ) const VULKAN_HPP_NOEXCEPT
    {
      return ${compareMembers};
    }

    bool operator!=( ${name} const & rhs ) const VULKAN_HPP_NOEXCEPT
    {
      return !operator==( rhs );
    }
"#;

/// External types known to provide `operator==`. Other external value
/// members are compared bytewise.
const SIMPLE_TYPES: &[&str] = &[
    "char", "double", "DWORD", "float", "HANDLE", "HINSTANCE", "HMONITOR", "HWND", "int", "int8_t",
    "int16_t", "int32_t", "int64_t", "LPCWSTR", "size_t", "uint8_t", "uint16_t", "uint32_t",
    "uint64_t",
];

/// Generate the complete header for a registry that passed
/// [`crate::check::check_correctness`].
pub fn emit_header(cfg: &Config, registry: &Registry) -> Result<String> {
    let emitter = Emitter {
        cfg,
        registry,
        qualified_namespace: cfg.naming.qualified_namespace(),
    };
    emitter.header()
}

struct Emitter<'a> {
    cfg: &'a Config,
    registry: &'a Registry,
    qualified_namespace: String,
}

impl Emitter<'_> {
    fn type_prefix(&self) -> &str {
        &self.cfg.naming.type_prefix
    }

    fn header(&self) -> Result<String> {
        let naming = &self.cfg.naming;
        let includes = self
            .cfg
            .includes
            .iter()
            .map(|include| format!("#include <{include}>"))
            .collect::<Vec<_>>()
            .join("\n");
        let enums = self.enums()?;
        let structs = self.structs()?;
        template::substitute(
            HEADER_TEMPLATE,
            &[
                ("copyright", &self.registry.copyright),
                ("guard", &self.cfg.output.guard),
                ("includes", &includes),
                ("namespace", &naming.namespace),
                ("videoNamespace", &naming.video_namespace),
                ("videoNamespaceDefault", &naming.video_namespace_default),
                ("enums", &enums),
                ("structs", &structs),
            ],
        )
    }

    /// All extensions' sections of the given kind, in declaration order.
    fn sections(
        &self,
        mut block: impl FnMut(&TypeEntry) -> Result<Option<String>>,
    ) -> Result<String> {
        let mut out = String::new();
        for ext in &self.registry.extensions {
            let mut section = String::new();
            for id in &ext.require.types {
                if let Some(text) = block(self.registry.get(*id))? {
                    section.push('\n');
                    section.push_str(&text);
                }
            }
            if !section.is_empty() {
                out.push_str(&format!("\n    //=== {} ===\n", ext.name));
                out.push_str(&section);
            }
        }
        Ok(out)
    }

    fn enums(&self) -> Result<String> {
        let enums = self.sections(|entry| match entry.category() {
            TypeCategory::Enum => self.enum_block(entry).map(Some),
            _ => Ok(None),
        })?;
        template::substitute(ENUMS_TEMPLATE, &[("enums", &enums)])
    }

    fn enum_block(&self, entry: &TypeEntry) -> Result<String> {
        let mut values = String::new();
        let mut used: Vec<String> = Vec::new();
        for value in entry.as_enum().map(|e| e.values.as_slice()).unwrap_or_default() {
            let value_name = enum_value_name(&entry.name, &value.name);
            check!(
                !used.contains(&value_name),
                value.line,
                "enum value <{}> of enum <{}> maps to already used name <{value_name}>",
                value.name,
                entry.name
            );
            values.push_str(&format!("    {value_name} = {},\n", value.value));
            used.push(value_name);
        }
        if let Some(pos) = values.rfind(',') {
            values.remove(pos);
            values = format!("\n{values}  ");
        }
        debug!(name = %entry.name, values = used.len(), "emit enum");
        template::substitute(
            ENUM_TEMPLATE,
            &[
                ("enumName", strip_prefix(&entry.name, self.type_prefix())),
                ("enumValues", &values),
            ],
        )
    }

    fn structs(&self) -> Result<String> {
        let structs = self.sections(|entry| match entry.as_struct() {
            Some(def) => self.struct_block(entry, def).map(Some),
            None => Ok(None),
        })?;
        template::substitute(STRUCTS_TEMPLATE, &[("structs", &structs)])
    }

    fn struct_block(&self, entry: &TypeEntry, def: &StructDef) -> Result<String> {
        let structure_type = strip_prefix(&entry.name, self.type_prefix());
        let compare = self.compare_operators(structure_type, def)?;
        let members = def
            .members
            .iter()
            .map(|member| self.member_line(member))
            .collect::<Result<String>>()?;
        debug!(name = %entry.name, members = def.members.len(), "emit struct");
        template::substitute(
            STRUCT_TEMPLATE,
            &[
                ("structureType", structure_type),
                ("nativeType", &entry.name),
                ("compareOperators", &compare),
                ("members", &members),
            ],
        )
    }

    fn compare_operators(&self, name: &str, def: &StructDef) -> Result<String> {
        let mut compare = String::new();
        for (i, member) in def.members.iter().enumerate() {
            if i > 0 {
                compare.push_str("\n          && ");
            }
            let ty = &member.ty.name;
            let external = self.registry.is_category(ty, TypeCategory::ExternalType);
            let opaque = external
                && member.ty.postfix.is_empty()
                && member.array_sizes.is_empty()
                && !SIMPLE_TYPES.contains(&ty.as_str());
            if opaque {
                compare.push_str(&format!(
                    "( memcmp( &{0}, &rhs.{0}, sizeof( {ty} ) ) == 0 )",
                    member.name
                ));
            } else {
                compare.push_str(&format!("( {0} == rhs.{0} )", member.name));
            }
        }
        template::substitute(COMPARE_TEMPLATE, &[("name", name), ("compareMembers", &compare)])
    }

    /// One member declaration, including its default initializer.
    fn member_line(&self, member: &Member) -> Result<String> {
        let ty = &member.ty;
        let undecorated = ty.prefix.is_empty() && ty.postfix.is_empty();
        let type_text = if member.bit_count.is_some() && ty.name.starts_with(self.type_prefix()) {
            check!(
                undecorated,
                member.line,
                "bitfield member <{}> of type <{}> must not be decorated",
                member.name,
                ty.name
            );
            ty.name.clone()
        } else if member.array_sizes.is_empty() {
            ty.compose(&self.qualified_namespace, self.type_prefix())
        } else {
            check!(
                undecorated,
                member.line,
                "array member <{}> of type <{}> must not be decorated",
                member.name,
                ty.name
            );
            array_wrapper(&self.cfg.naming.namespace, &ty.name, &member.array_sizes)
        };

        let initializer = match &member.bit_count {
            Some(bits) => format!(" : {bits}"),
            None => format!(" = {}", self.default_value(member, &type_text)?),
        };
        Ok(format!("    {type_text} {}{initializer};\n", member.name))
    }

    /// Enum scalars start at the enum's first value, everything else is
    /// value-initialized.
    fn default_value(&self, member: &Member, type_text: &str) -> Result<String> {
        let ty = &member.ty;
        let Some(def) = self.registry.lookup(&ty.name).and_then(TypeEntry::as_enum) else {
            return Ok("{}".to_string());
        };
        if !member.array_sizes.is_empty() || !ty.postfix.is_empty() {
            return Ok("{}".to_string());
        }
        let first = def.values.first().ok_or_else(|| {
            spec_error(
                member.line,
                format!(
                    "struct member <{}> uses enum <{}> which has no values",
                    member.name, ty.name
                ),
            )
        })?;
        Ok(format!("{type_text}::{}", enum_value_name(&ty.name, &first.name)))
    }
}

/// `ns::ArrayWrapper<K>D<element, size1, ..., sizeK>`.
fn array_wrapper(namespace: &str, element: &str, sizes: &[String]) -> String {
    format!(
        "{namespace}::ArrayWrapper{}D<{element}, {}>",
        sizes.len(),
        sizes.join(", ")
    )
}

/// Write `contents` to `path` through a temporary file in the same
/// directory, so a failed run never leaves a truncated header behind.
pub fn write_header(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;
    let mut builder = tempfile::Builder::new();
    if let Some(permissions) = header_permissions(path) {
        builder.permissions(permissions);
    }
    let mut file = builder
        .tempfile_in(dir)
        .with_context(|| format!("creating temporary file in {}", dir.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("writing temporary file {}", file.path().display()))?;
    file.persist(path)
        .with_context(|| format!("writing output to {}", path.display()))?;
    Ok(())
}

/// Mode for the written header: that of the file being replaced, or
/// `0o644` (before the umask) for a new one.
fn header_permissions(path: &Path) -> Option<std::fs::Permissions> {
    if let Ok(meta) = std::fs::metadata(path) {
        return Some(meta.permissions());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Some(std::fs::Permissions::from_mode(0o644))
    }
    #[cfg(not(unix))]
    {
        None
    }
}

/// Run the configured formatter on `path`. Failures are logged and
/// otherwise ignored.
pub fn format_header(format: &FormatConfig, path: &Path) {
    info!(
        program = %format.program.display(),
        path = %path.display(),
        "formatting"
    );
    match Command::new(&format.program)
        .args(&format.args)
        .arg(path)
        .status()
    {
        Ok(status) if status.success() => {}
        Ok(status) => warn!(%status, "formatter failed, output left unformatted"),
        Err(e) => warn!(
            program = %format.program.display(),
            error = %e,
            "could not run formatter, output left unformatted"
        ),
    }
}
