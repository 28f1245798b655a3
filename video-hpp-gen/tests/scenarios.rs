//! Small hand-written registries: the reference scenarios and the reader's
//! error paths.

use video_hpp_gen::config::Config;
use video_hpp_gen::model::{ExtensionId, Registry};

const COPYRIGHT: &str = "<comment>\nCopyright 2024 The Khronos Group Inc.\n</comment>";

/// A registry using the `Video` domain prefix.
fn registry_xml(types: &str, enums: &str, extensions: &str) -> String {
    format!(
        r#"<registry>
    {COPYRIGHT}
    <types comment="types">
        <type category="include" name="stdint"/>
        <type requires="stdint" name="uint8_t"/>
        <type requires="stdint" name="uint32_t"/>
        {types}
    </types>
    {enums}
    <extensions>
        {extensions}
    </extensions>
</registry>"#
    )
}

fn extension(name: &str, require: &str) -> String {
    format!(
        r#"<extension name="{name}" comment="{name}" supported="vulkan"><require>{require}</require></extension>"#
    )
}

fn video_config() -> Config {
    let mut cfg = Config::default();
    cfg.naming.type_prefix = "Video".to_string();
    cfg
}

fn resolve(xml: &str) -> anyhow::Result<Registry> {
    let doc = roxmltree::Document::parse(xml)?;
    Registry::from_document(&video_config(), &doc)
}

fn error_of(xml: &str) -> String {
    match resolve(xml) {
        Ok(_) => panic!("registry unexpectedly accepted:\n{xml}"),
        Err(e) => e.to_string(),
    }
}

fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[test]
fn scenario_a_enum_prefixes_are_stripped() {
    let xml = registry_xml(
        r#"<type category="enum" name="VideoFoo"/>"#,
        r#"<enums name="VideoFoo" type="enum"><enum name="VIDEO_FOO_BAR" value="1"/></enums>"#,
        &extension("video_codec_foo", r#"<type name="VideoFoo"/>"#),
    );
    let header = video_hpp_gen::generate_from_str(&video_config(), &xml).unwrap();
    let header = squash(&header);
    assert!(header.contains("enum class Foo { eBar = 1 };"), "{header}");
    assert!(header.contains("//=== video_codec_foo ==="), "{header}");
}

#[test]
fn scenario_b_member_struct_moves_before_its_user() {
    let xml = registry_xml(
        r#"<type category="struct" name="VideoA">
            <member><type>VideoB</type> <name>b</name></member>
        </type>
        <type category="struct" name="VideoB">
            <member><type>uint8_t</type> <name>value</name></member>
        </type>"#,
        "",
        &extension(
            "video_codec_ab",
            r#"<type name="VideoA"/><type name="VideoB"/>"#,
        ),
    );
    let registry = resolve(&xml).unwrap();
    assert_eq!(
        registry.required_type_names(ExtensionId(0)),
        vec!["VideoB", "VideoA"]
    );
}

#[test]
fn scenario_b_unlisted_member_struct_is_pulled_in() {
    let xml = registry_xml(
        r#"<type category="struct" name="VideoB">
            <member><type>uint8_t</type> <name>value</name></member>
        </type>
        <type category="struct" name="VideoA">
            <member><type>VideoB</type> <name>b</name></member>
        </type>"#,
        "",
        &extension("video_codec_ab", r#"<type name="VideoA"/>"#),
    );
    let registry = resolve(&xml).unwrap();
    assert_eq!(
        registry.required_type_names(ExtensionId(0)),
        vec!["VideoB", "VideoA"]
    );
    let b = registry.lookup("VideoB").unwrap();
    assert_eq!(b.required_by.iter().copied().collect::<Vec<_>>(), vec![ExtensionId(0)]);
}

const SIZED: &str = r#"<type category="struct" name="VideoS">
    <member><type>uint8_t</type> <name>data</name>[<enum>MY_CONST</enum>]</member>
</type>"#;

#[test]
fn scenario_c_declared_array_size_constant_is_accepted() {
    let xml = registry_xml(
        SIZED,
        "",
        &extension(
            "video_codec_s",
            r#"<enum name="MY_CONST" value="4"/><type name="VideoS"/>"#,
        ),
    );
    let header = video_hpp_gen::generate_from_str(&video_config(), &xml).unwrap();
    assert!(
        header.contains("VULKAN_HPP_NAMESPACE::ArrayWrapper1D<uint8_t, MY_CONST> data = {};"),
        "{header}"
    );
}

#[test]
fn scenario_c_undeclared_array_size_constant_is_an_error() {
    let xml = registry_xml(SIZED, "", &extension("video_codec_s", r#"<type name="VideoS"/>"#));
    let err = error_of(&xml);
    assert!(err.contains("<data>"), "{err}");
    assert!(
        err.ends_with("uses unknown constant <MY_CONST> as array size"),
        "{err}"
    );
}

#[test]
fn scenario_d_missing_copyright() {
    let xml = registry_xml("", "", &extension("video_codec_x", r#"<type name="uint8_t"/>"#))
        .replace(COPYRIGHT, "<comment>Generated registry</comment>");
    let err = video_hpp_gen::generate_from_str(&video_config(), &xml).unwrap_err();
    assert_eq!(err.to_string(), "missing copyright message");

    let without_comment = registry_xml("", "", &extension("video_codec_x", ""))
        .replace(COPYRIGHT, "");
    assert_eq!(error_of(&without_comment), "missing copyright message");
}

#[test]
fn errors_carry_the_line_number() {
    let xml = registry_xml("", "", &extension("video_codec_x", r#"<type name="VideoMissing"/>"#));
    let line = xml
        .lines()
        .position(|l| l.contains("VideoMissing"))
        .unwrap()
        + 1;
    assert_eq!(
        error_of(&xml),
        format!("spec error on line {line}: unknown required type <VideoMissing>")
    );
}

#[test]
fn duplicate_extension_names_are_rejected() {
    let ext = extension("video_codec_x", r#"<type name="uint8_t"/>"#);
    let xml = registry_xml("", "", &format!("{ext}\n{ext}"));
    assert!(error_of(&xml).ends_with("already encountered extension <video_codec_x>"));
}

#[test]
fn unsupported_extension_is_rejected() {
    let xml = registry_xml(
        "",
        "",
        r#"<extension name="video_codec_x" comment="x" supported="disabled"><require/></extension>"#,
    );
    assert!(error_of(&xml).ends_with("extension <video_codec_x> has unknown supported type <disabled>"));
}

#[test]
fn missing_extension_attribute_is_rejected() {
    let xml = registry_xml(
        "",
        "",
        r#"<extension name="video_codec_x" supported="vulkan"><require/></extension>"#,
    );
    assert!(error_of(&xml).ends_with("missing attribute <comment>"));
}

#[test]
fn unknown_codec_header_is_rejected() {
    let xml = registry_xml(
        "",
        "",
        &extension(
            "video_codec_x",
            r#"<type name="vk_video/vulkan_video_codec_missing.h"/>"#,
        ),
    );
    let err = error_of(&xml);
    assert!(err.contains("uses unknown header <vk_video/vulkan_video_codec_missing.h>"), "{err}");
}

#[test]
fn enum_value_prefix_is_enforced() {
    let xml = registry_xml(
        r#"<type category="enum" name="VideoFoo"/>"#,
        r#"<enums name="VideoFoo" type="enum"><enum name="VIDEO_BAR_ONE" value="1"/></enums>"#,
        &extension("video_codec_foo", r#"<type name="VideoFoo"/>"#),
    );
    let err = error_of(&xml);
    assert!(err.contains("does not begin with expected prefix <VIDEO_FOO_>"), "{err}");
}

#[test]
fn bitfield_after_array_is_rejected() {
    let xml = registry_xml(
        r#"<type category="struct" name="VideoS">
            <member><type>uint8_t</type> <name>data</name>[4] : 2</member>
        </type>"#,
        "",
        &extension("video_codec_s", r#"<type name="VideoS"/>"#),
    );
    let err = error_of(&xml);
    assert!(err.ends_with("could not find '[' in <[4] : 2>"), "{err}");
}

#[test]
fn array_size_enum_without_closing_bracket_is_rejected() {
    let xml = registry_xml(
        r#"<type category="struct" name="VideoS">
            <member><type>uint8_t</type> <name>data</name>[<enum>MY_CONST</enum>)</member>
        </type>"#,
        "",
        &extension("video_codec_s", r#"<type name="VideoS"/>"#),
    );
    let err = error_of(&xml);
    assert!(
        err.ends_with("struct member array specification is ill-formatted: <MY_CONST>"),
        "{err}"
    );
}

#[test]
fn unclosed_array_bracket_is_rejected() {
    let xml = registry_xml(
        r#"<type category="struct" name="VideoS">
            <member><type>uint8_t</type> <name>data</name>[4</member>
        </type>"#,
        "",
        &extension("video_codec_s", r#"<type name="VideoS"/>"#),
    );
    assert!(error_of(&xml).ends_with("could not find ']' in <[4>"));
}

#[test]
fn unknown_elements_only_warn() {
    let xml = registry_xml(
        r#"<type category="struct" name="VideoS">
            <member><type>uint8_t</type> <name>value</name></member>
        </type>"#,
        "<platforms/>",
        &extension("video_codec_s", r#"<type name="VideoS"/>"#),
    );
    let registry = resolve(&xml).unwrap();
    assert_eq!(registry.warnings.len(), 1, "{:?}", registry.warnings);
    assert_eq!(registry.warnings[0].message, "unknown element <platforms>");
}

#[test]
fn enum_values_are_listed_once() {
    let block = r#"<enums name="VideoFoo" type="enum"><enum name="VIDEO_FOO_BAR" value="1"/></enums>"#;
    let xml = registry_xml(
        r#"<type category="enum" name="VideoFoo"/>"#,
        &format!("{block}\n{block}"),
        &extension("video_codec_foo", r#"<type name="VideoFoo"/>"#),
    );
    assert!(error_of(&xml).ends_with("enum <VideoFoo> already holds values"));
}

#[test]
fn enum_values_need_a_declared_enum_type() {
    let xml = registry_xml(
        "",
        r#"<enums name="VideoFoo" type="enum"><enum name="VIDEO_FOO_BAR" value="1"/></enums>"#,
        &extension("video_codec_foo", r#"<type name="uint8_t"/>"#),
    );
    assert!(error_of(&xml).ends_with("enum <VideoFoo> is not listed as enum in the types section"));
}

#[test]
fn struct_member_names_are_unique() {
    let xml = registry_xml(
        r#"<type category="struct" name="VideoS">
            <member><type>uint8_t</type> <name>value</name></member>
            <member><type>uint32_t</type> <name>value</name></member>
        </type>"#,
        "",
        &extension("video_codec_s", r#"<type name="VideoS"/>"#),
    );
    assert!(error_of(&xml).ends_with("struct member name <value> already used"));
}

#[test]
fn extension_depends_on_one_codec_header_only() {
    let xml = registry_xml(
        "",
        "",
        &[
            extension("vulkan_video_codec_a", r#"<type name="uint8_t"/>"#),
            extension("vulkan_video_codec_b", r#"<type name="uint8_t"/>"#),
            extension(
                "vulkan_video_codec_c",
                r#"<type name="vk_video/vulkan_video_codec_a.h"/>
                   <type name="vk_video/vulkan_video_codec_b.h"/>"#,
            ),
        ]
        .join("\n"),
    );
    let err = error_of(&xml);
    assert!(
        err.ends_with(
            "extension <vulkan_video_codec_c> already depends on another header, \
             got <vk_video/vulkan_video_codec_b.h>"
        ),
        "{err}"
    );
}

#[test]
fn enum_values_colliding_after_renaming_are_rejected() {
    let xml = registry_xml(
        r#"<type category="enum" name="VideoFoo"/>"#,
        r#"<enums name="VideoFoo" type="enum">
            <enum name="VIDEO_FOO_FAST_PATH" value="0"/>
            <enum name="VIDEO_FOO_FAST__PATH" value="1"/>
        </enums>"#,
        &extension("video_codec_foo", r#"<type name="VideoFoo"/>"#),
    );
    let err = video_hpp_gen::generate_from_str(&video_config(), &xml)
        .unwrap_err()
        .to_string();
    assert!(
        err.ends_with(
            "enum value <VIDEO_FOO_FAST__PATH> of enum <VideoFoo> maps to already used name <eFastPath>"
        ),
        "{err}"
    );
}
