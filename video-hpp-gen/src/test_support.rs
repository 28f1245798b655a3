//! Small registry documents for unit tests.

use crate::model::{ExtensionId, Registry};

/// A complete `<registry>` with a copyright comment, the `stdint` include and
/// the integer types, plus the given `<type>`, `<enums>` and `<extension>`
/// snippets.
pub(crate) fn registry_xml(types: &str, enums: &str, extensions: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<registry>
    <comment>
Copyright 2021-2024 The Khronos Group Inc.
SPDX-License-Identifier: Apache-2.0 OR MIT
    </comment>
    <types comment="video types">
        <type category="include" name="stdint"/>
        <type requires="stdint" name="uint8_t"/>
        <type requires="stdint" name="uint32_t"/>
        <type requires="stdint" name="int32_t"/>
        {types}
    </types>
    {enums}
    <extensions>
        {extensions}
    </extensions>
</registry>
"#
    )
}

/// Names in the require list of the extension at `index`.
pub(crate) fn type_names(registry: &Registry, index: usize) -> Vec<&str> {
    registry.required_type_names(ExtensionId(index))
}
