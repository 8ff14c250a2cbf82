// Dynafire - Zone File Rendering
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Rendering of rich rules into firewalld's persisted zone XML.

use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, Event};
use quick_xml::Writer;

use crate::models::RichRule;

/// Render a `<zone>` document holding one `<rule>` per rich rule.
pub fn render_zone(rules: &[RichRule]) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::with_capacity(64 + rules.len() * 96), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .context("Failed to render zone header")?;

    writer
        .create_element("zone")
        .write_inner_content(|zone| {
            for rule in rules {
                let address = rule.address.to_string();
                zone.create_element("rule")
                    .with_attribute(("family", rule.family.as_str()))
                    .write_inner_content(|body| {
                        body.create_element("source")
                            .with_attribute(("address", address.as_str()))
                            .write_empty()?;
                        body.create_element(rule.action.as_str()).write_empty()?;
                        Ok::<(), quick_xml::Error>(())
                    })?;
            }
            Ok::<(), quick_xml::Error>(())
        })
        .context("Failed to render zone rules")?;

    let mut xml = String::from_utf8(writer.into_inner()).context("Rendered zone is not UTF-8")?;
    xml.push('\n');
    Ok(xml)
}
