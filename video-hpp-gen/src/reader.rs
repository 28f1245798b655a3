//! Registry XML → [`Registry`] model.
//!
//! Walks `<registry>` depth-first in document order. Each `read_*` function
//! validates its element against the schema before reading it, so every
//! structural problem surfaces as a line-tagged error.

use anyhow::{Result, bail};
use roxmltree::{Document, Node};
use tracing::{debug, info, trace};

use crate::config::Config;
use crate::diag::{check, spec_error};
use crate::model::*;
use crate::naming::{enum_value_prefix, is_decimal_literal, is_hex_literal};
use crate::xml::{
    attributes_of, check_attributes, check_elements, children_of, copyright_message, line_of,
    read_comment, read_modifiers, read_type_info, sibling_text, text_of,
};

/// Read the whole document into a fresh registry. No resolve passes run
/// here; see [`crate::resolve`] and [`crate::check`].
pub fn read_document(cfg: &Config, doc: &Document<'_>) -> Result<Registry> {
    let mut reader = Reader {
        cfg,
        registry: Registry::default(),
    };
    let root = doc.root();
    let line = line_of(root);
    check_elements(
        line,
        children_of(root),
        &[("registry", true)],
        &[],
        &mut reader.registry.warnings,
    )?;
    let registry_element = children_of(root)
        .find(|n| n.has_tag_name("registry"))
        .ok_or_else(|| spec_error(line, "missing required element <registry>"))?;
    reader.read_registry(registry_element)?;

    let registry = reader.registry;
    info!(
        types = registry.types.len(),
        extensions = registry.extensions.len(),
        warnings = registry.warnings.len(),
        "read registry"
    );
    Ok(registry)
}

struct Reader<'c> {
    cfg: &'c Config,
    registry: Registry,
}

impl Reader<'_> {
    fn read_registry(&mut self, element: Node<'_, '_>) -> Result<()> {
        let line = line_of(element);
        let warnings = &mut self.registry.warnings;
        check_attributes(line, &attributes_of(element)?, &[], &[], warnings)?;
        check_elements(
            line,
            children_of(element),
            &[("extensions", true), ("types", true)],
            &["comment", "enums"],
            warnings,
        )?;

        for child in children_of(element) {
            match child.tag_name().name() {
                "comment" => {
                    let comment = read_comment(child, &mut self.registry.warnings)?;
                    if comment.trim_start().starts_with("Copyright") {
                        self.registry.copyright = copyright_message(comment);
                    }
                }
                "enums" => self.read_enums(child)?,
                "extensions" => self.read_extensions(child)?,
                "types" => self.read_types(child)?,
                _ => {}
            }
        }

        if self.registry.copyright.is_empty() {
            bail!("missing copyright message");
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // <types>
    // -----------------------------------------------------------------------

    fn read_types(&mut self, element: Node<'_, '_>) -> Result<()> {
        let line = line_of(element);
        let warnings = &mut self.registry.warnings;
        check_attributes(line, &attributes_of(element)?, &[("comment", &[])], &[], warnings)?;
        check_elements(line, children_of(element), &[("type", false)], &[], warnings)?;

        for child in children_of(element).filter(|c| c.has_tag_name("type")) {
            self.read_types_type(child)?;
        }
        Ok(())
    }

    /// Dispatch one `<type>` on its `category` attribute.
    fn read_types_type(&mut self, element: Node<'_, '_>) -> Result<()> {
        let line = line_of(element);
        let attributes = attributes_of(element)?;

        match attributes.get("category").copied() {
            Some("define") => self.read_type_define(element),
            Some("enum") => self.read_type_enum(element),
            Some("include") => self.read_type_include(element),
            Some("struct") => self.read_type_struct(element),
            Some(other) => Err(spec_error(line, format!("unknown category <{other}> encountered"))),
            None if attributes.contains_key("requires") => self.read_type_requires(element),
            None => {
                check!(
                    attributes.len() == 1 && attributes.get("name") == Some(&"int"),
                    line,
                    "unknown type"
                );
                check!(
                    self.registry.add_type("int", line, TypeDef::Unknown).is_some(),
                    line,
                    "type <int> already specified"
                );
                Ok(())
            }
        }
    }

    fn read_type_define(&mut self, element: Node<'_, '_>) -> Result<()> {
        let line = line_of(element);
        let attributes = attributes_of(element)?;
        let warnings = &mut self.registry.warnings;
        check_attributes(
            line,
            &attributes,
            &[("category", &["define"])],
            &[("requires", &[])],
            warnings,
        )?;
        check_elements(line, children_of(element), &[("name", true)], &["type"], warnings)?;

        let requires = attributes.get("requires").copied();
        let mut name = "";
        let mut ty = "";
        for child in children_of(element) {
            match child.tag_name().name() {
                "name" => name = text_of(child),
                "type" => ty = text_of(child),
                _ => {}
            }
        }

        let is_define = |n: &str| self.registry.is_category(n, TypeCategory::Define);
        check!(
            requires.is_none_or(is_define),
            line,
            "define <{name}> requires unknown type <{}>",
            requires.unwrap_or_default()
        );
        check!(
            ty.is_empty() || is_define(ty),
            line,
            "define <{name}> of unknown type <{ty}>"
        );

        let def = DefineDef {
            requires: requires.map(String::from),
        };
        check!(
            self.registry.add_type(name, line, TypeDef::Define(def)).is_some(),
            line,
            "define <{name}> already specified"
        );
        trace!(name, line, "read define");
        Ok(())
    }

    fn read_type_enum(&mut self, element: Node<'_, '_>) -> Result<()> {
        let line = line_of(element);
        let attributes = attributes_of(element)?;
        let warnings = &mut self.registry.warnings;
        check_attributes(
            line,
            &attributes,
            &[("category", &["enum"]), ("name", &[])],
            &[],
            warnings,
        )?;
        check_elements(line, children_of(element), &[], &[], warnings)?;

        let name = attributes["name"];
        check!(
            self.registry
                .add_type(name, line, TypeDef::Enum(EnumDef::default()))
                .is_some(),
            line,
            "enum <{name}> already specified"
        );
        trace!(name, line, "read enum type");
        Ok(())
    }

    fn read_type_include(&mut self, element: Node<'_, '_>) -> Result<()> {
        let line = line_of(element);
        let attributes = attributes_of(element)?;
        let warnings = &mut self.registry.warnings;
        check_attributes(
            line,
            &attributes,
            &[("category", &["include"]), ("name", &[])],
            &[],
            warnings,
        )?;
        check_elements(line, children_of(element), &[], &[], warnings)?;

        let name = attributes["name"];
        check!(
            self.registry.add_type(name, line, TypeDef::Include).is_some(),
            line,
            "type <{name}> already specified"
        );
        trace!(name, line, "read include");
        Ok(())
    }

    /// `<type name=.. requires=..>`: a type provided by an include.
    fn read_type_requires(&mut self, element: Node<'_, '_>) -> Result<()> {
        let line = line_of(element);
        let attributes = attributes_of(element)?;
        let warnings = &mut self.registry.warnings;
        check_attributes(
            line,
            &attributes,
            &[("name", &[]), ("requires", &[])],
            &[],
            warnings,
        )?;
        check_elements(line, children_of(element), &[], &[], warnings)?;

        let name = attributes["name"];
        let requires = attributes["requires"];
        check!(
            self.registry.is_category(requires, TypeCategory::Include),
            line,
            "type <{name}> requires unknown <{requires}>"
        );
        let def = TypeDef::ExternalType {
            requires: requires.to_string(),
        };
        check!(
            self.registry.add_type(name, line, def).is_some(),
            line,
            "type <{name}> already specified"
        );
        trace!(name, line, "read external type");
        Ok(())
    }

    fn read_type_struct(&mut self, element: Node<'_, '_>) -> Result<()> {
        let line = line_of(element);
        let attributes = attributes_of(element)?;
        let warnings = &mut self.registry.warnings;
        check_attributes(
            line,
            &attributes,
            &[("category", &["struct"]), ("name", &[])],
            &[("comment", &[]), ("requires", &[])],
            warnings,
        )?;
        check_elements(line, children_of(element), &[("member", false)], &["comment"], warnings)?;

        let name = attributes["name"];
        if let Some(requires) = attributes.get("requires") {
            check!(
                self.registry.contains_type(requires),
                line,
                "struct <{name}> requires unknown type <{requires}>"
            );
        }
        check!(
            !self.registry.contains_type(name),
            line,
            "struct <{name}> already specified"
        );

        let mut def = StructDef::default();
        for child in children_of(element).filter(|c| c.has_tag_name("member")) {
            self.read_struct_member(child, &mut def.members)?;
        }
        debug!(name, members = def.members.len(), "read struct");
        self.registry.add_type(name, line, TypeDef::Struct(def));
        Ok(())
    }

    fn read_struct_member(&mut self, element: Node<'_, '_>, members: &mut Vec<Member>) -> Result<()> {
        let line = line_of(element);
        let warnings = &mut self.registry.warnings;
        check_attributes(line, &attributes_of(element)?, &[], &[], warnings)?;
        check_elements(
            line,
            children_of(element),
            &[("name", true), ("type", true)],
            &["comment", "enum"],
            warnings,
        )?;

        let mut member = Member {
            ty: TypeInfo::default(),
            name: String::new(),
            array_sizes: Vec::new(),
            bit_count: None,
            line,
        };
        for child in children_of(element) {
            let child_line = line_of(child);
            check_attributes(child_line, &attributes_of(child)?, &[], &[], warnings)?;
            check_elements(child_line, children_of(child), &[], &[], warnings)?;

            match child.tag_name().name() {
                "enum" => {
                    let size = text_of(child);
                    let previous = sibling_text(child.prev_sibling()).unwrap_or_default();
                    let next = sibling_text(child.next_sibling()).unwrap_or_default();
                    check!(
                        previous.trim_end().ends_with('[') && next.trim_start().starts_with(']'),
                        line,
                        "struct member array specification is ill-formatted: <{size}>"
                    );
                    member.array_sizes.push(size.to_string());
                }
                "name" => {
                    member.name = text_of(child).to_string();
                    let modifiers = read_modifiers(child.next_sibling())?;
                    member.array_sizes.extend(modifiers.array_sizes);
                    member.bit_count = modifiers.bit_count;
                }
                "type" => member.ty = read_type_info(child),
                _ => {}
            }
        }

        let name = &member.name;
        check!(!name.is_empty(), line, "struct member without a name");
        check!(
            member.array_sizes.is_empty() || member.bit_count.is_none(),
            line,
            "struct member <{name}> is both an array and a bitfield"
        );
        check!(
            members.iter().all(|m| m.name != *name),
            line,
            "struct member name <{name}> already used"
        );
        trace!(name = %member.name, ty = %member.ty.name, "  member");
        members.push(member);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // <enums>
    // -----------------------------------------------------------------------

    fn read_enums(&mut self, element: Node<'_, '_>) -> Result<()> {
        let line = line_of(element);
        let attributes = attributes_of(element)?;
        let warnings = &mut self.registry.warnings;
        check_attributes(
            line,
            &attributes,
            &[("name", &[]), ("type", &["enum"])],
            &[],
            warnings,
        )?;
        check_elements(line, children_of(element), &[("enum", false)], &["comment"], warnings)?;

        let name = attributes["name"];
        let id = self
            .registry
            .type_id(name)
            .filter(|id| self.registry.get(*id).category() == TypeCategory::Enum)
            .ok_or_else(|| {
                spec_error(line, format!("enum <{name}> is not listed as enum in the types section"))
            })?;
        let already_filled = self
            .registry
            .get(id)
            .as_enum()
            .is_some_and(|e| !e.values.is_empty());
        check!(!already_filled, line, "enum <{name}> already holds values");

        let mut values = Vec::new();
        for child in children_of(element).filter(|c| c.has_tag_name("enum")) {
            self.read_enums_enum(child, name, &mut values)?;
        }
        debug!(name, values = values.len(), "read enum values");
        if let TypeDef::Enum(def) = &mut self.registry.get_mut(id).def {
            def.values = values;
        }
        Ok(())
    }

    fn read_enums_enum(
        &mut self,
        element: Node<'_, '_>,
        enum_name: &str,
        values: &mut Vec<EnumValue>,
    ) -> Result<()> {
        let line = line_of(element);
        let attributes = attributes_of(element)?;
        let warnings = &mut self.registry.warnings;
        check_attributes(
            line,
            &attributes,
            &[("name", &[]), ("value", &[])],
            &[("comment", &[])],
            warnings,
        )?;
        check_elements(line, children_of(element), &[], &[], warnings)?;

        let name = attributes["name"];
        let value = attributes["value"];
        let prefix = enum_value_prefix(enum_name);
        check!(
            name.starts_with(&prefix),
            line,
            "encountered enum value <{name}> that does not begin with expected prefix <{prefix}>"
        );
        check!(
            is_decimal_literal(value) || is_hex_literal(value),
            line,
            "enum value uses unknown constant <{value}>"
        );
        check!(
            values.iter().all(|v| v.name != name),
            line,
            "enum value <{name}> already part of enum <{enum_name}>"
        );
        values.push(EnumValue {
            name: name.to_string(),
            value: value.to_string(),
            line,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // <extensions>
    // -----------------------------------------------------------------------

    fn read_extensions(&mut self, element: Node<'_, '_>) -> Result<()> {
        let line = line_of(element);
        let warnings = &mut self.registry.warnings;
        check_attributes(line, &attributes_of(element)?, &[], &[], warnings)?;
        check_elements(line, children_of(element), &[("extension", false)], &[], warnings)?;

        for child in children_of(element).filter(|c| c.has_tag_name("extension")) {
            self.read_extension(child)?;
        }
        Ok(())
    }

    fn read_extension(&mut self, element: Node<'_, '_>) -> Result<()> {
        let line = line_of(element);
        let attributes = attributes_of(element)?;
        let warnings = &mut self.registry.warnings;
        check_attributes(
            line,
            &attributes,
            &[("name", &[]), ("comment", &[]), ("supported", &[])],
            &[],
            warnings,
        )?;
        check_elements(line, children_of(element), &[("require", false)], &[], warnings)?;

        let name = attributes["name"];
        check!(
            self.registry.extension_id(name).is_none(),
            line,
            "already encountered extension <{name}>"
        );
        let supported = attributes["supported"];
        check!(
            supported == self.cfg.registry.supported,
            line,
            "extension <{name}> has unknown supported type <{supported}>"
        );

        let mut extension = Extension {
            name: name.to_string(),
            depends: None,
            require: RequireData::default(),
            line,
        };
        for child in children_of(element).filter(|c| c.has_tag_name("require")) {
            self.read_extension_require(child, &mut extension)?;
        }
        debug!(
            name,
            types = extension.require.types.len(),
            constants = extension.require.constants.len(),
            depends = ?extension.depends.map(|d| self.registry.extension(d).name.as_str()),
            "read extension"
        );
        self.registry.extensions.push(extension);
        Ok(())
    }

    fn read_extension_require(&mut self, element: Node<'_, '_>, extension: &mut Extension) -> Result<()> {
        let line = line_of(element);
        let warnings = &mut self.registry.warnings;
        check_attributes(line, &attributes_of(element)?, &[], &[], warnings)?;
        check_elements(line, children_of(element), &[], &["enum", "type"], warnings)?;

        extension.require.line = line;
        for child in children_of(element) {
            match child.tag_name().name() {
                "enum" => self.read_require_enum(child, &mut extension.require.constants)?,
                "type" => self.read_require_type(child, extension)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn read_require_enum(
        &mut self,
        element: Node<'_, '_>,
        constants: &mut std::collections::BTreeMap<String, Constant>,
    ) -> Result<()> {
        let line = line_of(element);
        let attributes = attributes_of(element)?;
        let warnings = &mut self.registry.warnings;
        check_elements(line, children_of(element), &[], &[], warnings)?;
        check_attributes(line, &attributes, &[("name", &[]), ("value", &[])], &[], warnings)?;

        let name = attributes["name"];
        let value = attributes["value"];
        if name.ends_with("_SPEC_VERSION") || name.ends_with("_EXTENSION_NAME") {
            return Ok(());
        }
        check!(
            is_decimal_literal(value) || is_hex_literal(value),
            line,
            "enum value uses unknown constant <{value}>"
        );
        let constant = Constant {
            value: value.to_string(),
            line,
        };
        check!(
            constants.insert(name.to_string(), constant).is_none(),
            line,
            "required enum <{name}> already specified"
        );
        Ok(())
    }

    fn read_require_type(&mut self, element: Node<'_, '_>, extension: &mut Extension) -> Result<()> {
        let line = line_of(element);
        let attributes = attributes_of(element)?;
        let warnings = &mut self.registry.warnings;
        check_attributes(line, &attributes, &[("name", &[])], &[("comment", &[])], warnings)?;
        check_elements(line, children_of(element), &[], &[], warnings)?;

        let name = attributes["name"];
        let ext_name = extension.name.as_str();
        if let Some(header_ext) = self.cfg.registry.header_extension(name) {
            check!(
                extension.depends.is_none(),
                line,
                "extension <{ext_name}> already depends on another header, got <{name}>"
            );
            let depends = self.registry.extension_id(header_ext).ok_or_else(|| {
                spec_error(line, format!("extension <{ext_name}> uses unknown header <{name}>"))
            })?;
            extension.depends = Some(depends);
            return Ok(());
        }

        let id = self
            .registry
            .type_id(name)
            .ok_or_else(|| spec_error(line, format!("unknown required type <{name}>")))?;
        check!(
            !extension.require.types.contains(&id),
            line,
            "type <{name}> already required by extension <{ext_name}>"
        );
        let this = ExtensionId(self.registry.extensions.len());
        self.registry.get_mut(id).required_by.insert(this);
        extension.require.types.push(id);
        Ok(())
    }
}
