//! Stateless helpers over the parsed `roxmltree` document: attribute and
//! child-element access, schema checks, and the text fragments that make up
//! struct member declarations.

use std::collections::BTreeMap;

use anyhow::Result;
use roxmltree::Node;

use crate::diag::{Warning, check, spec_error, warn_unless};
use crate::model::TypeInfo;
use crate::naming::{tokenize, trim_stars};

/// Allowed values per attribute name. An empty value list accepts anything.
pub type AttributeSpec<'s> = &'s [(&'s str, &'s [&'s str])];

/// 1-based line on which `node` starts.
pub fn line_of(node: Node<'_, '_>) -> usize {
    node.document().text_pos_at(node.range().start).row as usize
}

/// Name → value for the attributes of `element`.
pub fn attributes_of<'a>(element: Node<'a, '_>) -> Result<BTreeMap<&'a str, &'a str>> {
    let mut attributes = BTreeMap::new();
    for attribute in element.attributes() {
        check!(
            attributes.insert(attribute.name(), attribute.value()).is_none(),
            line_of(element),
            "attribute <{}> listed more than once",
            attribute.name()
        );
    }
    Ok(attributes)
}

/// Direct child elements of `node`, in document order. Text, comments and
/// processing instructions are skipped. Calling it again restarts the walk.
pub fn children_of<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> + Clone {
    node.children().filter(Node::is_element)
}

/// Text content of `element` (its first child text node), or `""`.
pub fn text_of<'a>(element: Node<'a, '_>) -> &'a str {
    element.text().unwrap_or("")
}

/// Text of `node` if it is a text node. Used to read the fragments between
/// the elements of a member declaration.
pub fn sibling_text<'a>(node: Option<Node<'a, '_>>) -> Option<&'a str> {
    node.filter(Node::is_text).and_then(|n| n.text())
}

/// Check `attributes` against the `required` and `optional` schemas.
///
/// A missing required attribute, or a required attribute with a value
/// outside its allowed set, is an error. Unknown attributes and optional
/// attributes with unexpected values are warnings. Values are
/// comma-separated lists; every token is checked.
pub fn check_attributes(
    line: usize,
    attributes: &BTreeMap<&str, &str>,
    required: AttributeSpec<'_>,
    optional: AttributeSpec<'_>,
    warnings: &mut Vec<Warning>,
) -> Result<()> {
    for (name, allowed) in required {
        let value = attributes
            .get(name)
            .ok_or_else(|| spec_error(line, format!("missing attribute <{name}>")))?;
        if !allowed.is_empty() {
            for token in tokenize(value, ",") {
                check!(
                    allowed.contains(&token),
                    line,
                    "unexpected attribute value <{token}> in attribute <{name}>"
                );
            }
        }
    }

    for (name, value) in attributes {
        if required.iter().any(|(r, _)| r == name) {
            continue;
        }
        let Some((_, allowed)) = optional.iter().find(|(o, _)| o == name) else {
            warn_unless(false, line, format!("unknown attribute <{name}>"), warnings);
            continue;
        };
        if !allowed.is_empty() {
            for token in tokenize(value, ",") {
                warn_unless(
                    allowed.contains(&token),
                    line,
                    format!("unexpected attribute value <{token}> in attribute <{name}>"),
                    warnings,
                );
            }
        }
    }
    Ok(())
}

/// Check the child elements of the element on `line`.
///
/// `required` maps a tag to whether it must appear exactly once (`true`) or
/// at least once (`false`). Tags neither required nor `optional` are
/// warnings.
pub fn check_elements<'a, 'input: 'a>(
    line: usize,
    children: impl Iterator<Item = Node<'a, 'input>>,
    required: &[(&str, bool)],
    optional: &[&str],
    warnings: &mut Vec<Warning>,
) -> Result<()> {
    let mut encountered: BTreeMap<&str, usize> = BTreeMap::new();
    for child in children {
        let tag = child.tag_name().name();
        *encountered.entry(tag).or_default() += 1;
        warn_unless(
            required.iter().any(|(r, _)| *r == tag) || optional.contains(&tag),
            line_of(child),
            format!("unknown element <{tag}>"),
            warnings,
        );
    }
    for (tag, exactly_once) in required {
        let count = encountered.get(tag).copied().unwrap_or(0);
        check!(count > 0, line, "missing required element <{tag}>");
        check!(
            !exactly_once || count == 1,
            line,
            "required element <{tag}> is supposed to be listed exactly once, but is listed {count}"
        );
    }
    Ok(())
}

/// Text of a `<comment>` element, which takes no attributes or children.
pub fn read_comment<'a>(element: Node<'a, '_>, warnings: &mut Vec<Warning>) -> Result<&'a str> {
    let line = line_of(element);
    check_attributes(line, &attributes_of(element)?, &[], &[], warnings)?;
    check_elements(line, children_of(element), &[], &[], warnings)?;
    Ok(text_of(element))
}

/// Turn the registry's license comment into the generated header's banner.
pub fn copyright_message(comment: &str) -> String {
    let mut message = comment.replace('\n', "\n// ").trim_end().to_string();
    message.push_str("\n\n// This header is generated from the Khronos Vulkan XML API Registry.");
    format!("{}\n", message.trim())
}

/// What follows a member's `<name>`: array dimensions or a bit count.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub array_sizes: Vec<String>,
    pub bit_count: Option<String>,
}

/// Parse the text node after a member's `<name>`.
///
/// `[2][3]` yields two array sizes, `: 8` a bit count. A lone `[` opens an
/// `<enum>` child that carries the size and yields nothing here. `;` and `)`
/// are ignored; anything else is an error.
pub fn read_modifiers(node: Option<Node<'_, '_>>) -> Result<Modifiers> {
    let mut modifiers = Modifiers::default();
    let Some(node) = node.filter(Node::is_text) else {
        return Ok(modifiers);
    };
    let line = line_of(node);
    let value = node.text().unwrap_or("").trim();

    match value.as_bytes().first() {
        None | Some(b';') | Some(b')') => {}
        Some(b'[') => {
            let mut end = 0;
            while end + 1 != value.len() {
                let start = value[end..]
                    .find('[')
                    .map(|p| p + end)
                    .ok_or_else(|| spec_error(line, format!("could not find '[' in <{value}>")))?;
                let close = value[start..]
                    .find(']')
                    .map(|p| p + start)
                    .ok_or_else(|| spec_error(line, format!("could not find ']' in <{value}>")))?;
                check!(
                    start + 2 <= close,
                    line,
                    "missing content between '[' and ']' in <{value}>"
                );
                let size = &value[start + 1..close];
                check!(!size.contains('['), line, "mismatched '[' in <{value}>");
                modifiers.array_sizes.push(size.trim().to_string());
                end = close;
            }
        }
        Some(b':') => {
            let bits = value[1..].trim();
            check!(!bits.is_empty(), line, "missing bit count in <{value}>");
            modifiers.bit_count = Some(bits.to_string());
        }
        Some(_) => check!(false, line, "unknown modifier <{value}>"),
    }
    Ok(modifiers)
}

/// Split the `<type>` element of a member into prefix, name and postfix
/// using its neighbouring text nodes.
pub fn read_type_info(element: Node<'_, '_>) -> TypeInfo {
    TypeInfo {
        prefix: sibling_text(element.prev_sibling())
            .map(|t| t.trim().to_string())
            .unwrap_or_default(),
        name: text_of(element).to_string(),
        postfix: sibling_text(element.next_sibling())
            .map(|t| trim_stars(t.trim_end()))
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    fn with_root<R>(xml: &str, f: impl FnOnce(Node<'_, '_>) -> R) -> R {
        let doc = Document::parse(xml).expect("test xml");
        f(doc.root_element())
    }

    #[test]
    fn line_numbers_are_one_based() {
        with_root("<a>\n  <b/>\n\n  <c/>\n</a>", |root| {
            let lines: Vec<usize> = children_of(root).map(line_of).collect();
            assert_eq!(line_of(root), 1);
            assert_eq!(lines, vec![2, 4]);
        });
    }

    #[test]
    fn children_skip_text_and_comments_and_restart() {
        with_root("<a>text<!-- c --><b/>more<c/></a>", |root| {
            let children = children_of(root);
            let first: Vec<&str> = children.clone().map(|c| c.tag_name().name()).collect();
            let second: Vec<&str> = children.map(|c| c.tag_name().name()).collect();
            assert_eq!(first, vec!["b", "c"]);
            assert_eq!(first, second);
        });
    }

    #[test]
    fn required_attribute_values_are_enforced() {
        with_root(r#"<e name="x" supported="vulkan,vulkansc"/>"#, |root| {
            let attrs = attributes_of(root).unwrap();
            let mut warnings = Vec::new();
            let err = check_attributes(
                1,
                &attrs,
                &[("name", &[]), ("supported", &["vulkan"])],
                &[],
                &mut warnings,
            )
            .unwrap_err();
            assert!(err.to_string().contains("unexpected attribute value <vulkansc>"), "{err}");

            let err = check_attributes(1, &attrs, &[("comment", &[])], &[], &mut warnings)
                .unwrap_err();
            assert_eq!(err.to_string(), "spec error on line 1: missing attribute <comment>");
        });
    }

    #[test]
    fn unknown_and_unexpected_optional_attributes_warn() {
        with_root(r#"<e name="x" extra="1" kind="odd"/>"#, |root| {
            let attrs = attributes_of(root).unwrap();
            let mut warnings = Vec::new();
            check_attributes(
                5,
                &attrs,
                &[("name", &[])],
                &[("kind", &["plain"])],
                &mut warnings,
            )
            .unwrap();
            let messages: Vec<&str> = warnings.iter().map(|w| w.message.as_str()).collect();
            assert_eq!(
                messages,
                vec![
                    "unknown attribute <extra>",
                    "unexpected attribute value <odd> in attribute <kind>"
                ]
            );
            assert!(warnings.iter().all(|w| w.line == 5));
        });
    }

    #[test]
    fn element_counts_are_enforced() {
        with_root("<r><types/><types/><bogus/></r>", |root| {
            let mut warnings = Vec::new();
            let err = check_elements(1, children_of(root), &[("types", true)], &[], &mut warnings)
                .unwrap_err();
            assert!(err.to_string().contains("exactly once, but is listed 2"), "{err}");
            assert_eq!(warnings.len(), 1);
            assert_eq!(warnings[0].message, "unknown element <bogus>");

            let err = check_elements(1, children_of(root), &[("extensions", false)], &["types", "bogus"], &mut warnings)
                .unwrap_err();
            assert!(err.to_string().contains("missing required element <extensions>"), "{err}");
        });
    }

    #[test]
    fn copyright_banner() {
        let banner = copyright_message("\nCopyright 2024 Khronos\n\nSPDX: Apache-2.0\n    ");
        assert_eq!(
            banner,
            "// Copyright 2024 Khronos\n// \n// SPDX: Apache-2.0\n//\n\n\
             // This header is generated from the Khronos Vulkan XML API Registry.\n"
        );
    }

    fn modifiers_of(member: &str) -> Result<Modifiers> {
        let doc = Document::parse(member).expect("test xml");
        let name = doc
            .descendants()
            .find(|n| n.has_tag_name("name"))
            .expect("name element");
        read_modifiers(name.next_sibling())
    }

    #[test]
    fn modifiers_array_and_bitfield() {
        let m = modifiers_of("<member><type>uint8_t</type> <name>a</name>[2][16]</member>").unwrap();
        assert_eq!(m.array_sizes, vec!["2".to_string(), "16".to_string()]);
        assert_eq!(m.bit_count, None);

        let m = modifiers_of("<member><type>uint32_t</type> <name>f</name> : 1</member>").unwrap();
        assert_eq!(m.bit_count.as_deref(), Some("1"));
        assert!(m.array_sizes.is_empty());

        let m = modifiers_of("<member><type>uint8_t</type> <name>a</name>[<enum>N</enum>]</member>")
            .unwrap();
        assert_eq!(m, Modifiers::default());

        let m = modifiers_of("<member><type>uint8_t</type> <name>a</name></member>").unwrap();
        assert_eq!(m, Modifiers::default());
    }

    #[test]
    fn malformed_modifiers_are_rejected() {
        let err = modifiers_of("<member><type>t</type> <name>a</name>[4</member>").unwrap_err();
        assert!(err.to_string().contains("could not find ']'"), "{err}");
        let err = modifiers_of("<member><type>t</type> <name>a</name>[]</member>").unwrap_err();
        assert!(err.to_string().contains("missing content"), "{err}");
        let err = modifiers_of("<member><type>t</type> <name>a</name>[[4]]</member>").unwrap_err();
        assert!(err.to_string().contains("mismatched"), "{err}");
        let err = modifiers_of("<member><type>t</type> <name>a</name> = 3</member>").unwrap_err();
        assert!(err.to_string().contains("unknown modifier"), "{err}");
    }

    #[test]
    fn type_info_from_surrounding_text() {
        with_root("<member>const <type>int8_t</type>* <name>p</name></member>", |root| {
            let ty = children_of(root).next().unwrap();
            assert_eq!(
                read_type_info(ty),
                TypeInfo {
                    prefix: "const".to_string(),
                    name: "int8_t".to_string(),
                    postfix: "*".to_string(),
                }
            );
        });
        with_root("<member><type>uint8_t</type> <name>x</name></member>", |root| {
            let ty = children_of(root).next().unwrap();
            assert_eq!(read_type_info(ty).postfix, "");
        });
    }
}
