//! XML export of a coverage snapshot.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <coverage size="12" covered="6" cover_percentage="50.00">
//!   <point name="top.a" size="2" covered="1" cover_percentage="50.00">
//!     <bin label="0" hits="3"/>
//!     <bin label="1" hits="0"/>
//!   </point>
//!   <cross name="top.cross.ab" size="4" covered="1" cover_percentage="25.00">
//!     <bin label="(0, 0)" hits="3"/>
//!     ...
//!   </cross>
//! </coverage>
//! ```
//!
//! The output contains no timestamps, so equal runs give equal files.

use super::{CoverageReport, ItemKind};
use std::fmt::Write;
use std::path::Path;

impl CoverageReport {
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        let _ = writeln!(
            xml,
            r#"<coverage size="{}" covered="{}" cover_percentage="{:.2}">"#,
            self.total_bins(),
            self.covered_bins(),
            self.percentage()
        );
        for item in &self.items {
            let tag = match item.kind {
                ItemKind::Point => "point",
                ItemKind::Cross => "cross",
            };
            let _ = writeln!(
                xml,
                r#"  <{} name="{}" size="{}" covered="{}" cover_percentage="{:.2}">"#,
                tag,
                escape(&item.name),
                item.size,
                item.covered,
                item.percentage
            );
            for bin in &item.bins {
                let _ = writeln!(
                    xml,
                    r#"    <bin label="{}" hits="{}"/>"#,
                    escape(&bin.label),
                    bin.hits
                );
            }
            let _ = writeln!(xml, "  </{tag}>");
        }
        xml.push_str("</coverage>\n");
        xml
    }

    /// Writes [`Self::to_xml`] to `path`, creating parent directories.
    pub fn export_xml(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_xml())
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
