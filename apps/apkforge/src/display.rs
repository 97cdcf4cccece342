//! Output rendering and formatting

use apkforge_builder::{ApkSections, Section};
use apkforge_errors::Error;
use apkforge_hash::Hash;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde_json::json;
use std::io;
use std::path::PathBuf;

/// Output renderer for CLI results
#[derive(Clone, Copy)]
pub struct OutputRenderer {
    json_output: bool,
}

impl OutputRenderer {
    pub fn new(json_output: bool) -> Self {
        Self { json_output }
    }

    /// Render the artifacts written by `emit`
    pub fn render_artifacts(self, artifacts: &[PathBuf]) -> io::Result<()> {
        if self.json_output {
            let paths: Vec<String> = artifacts.iter().map(|p| p.display().to_string()).collect();
            return print_json(&json!({ "artifacts": paths }));
        }

        for path in artifacts {
            println!("{}", path.display());
        }
        Ok(())
    }

    /// Render an inspected package and its data-hash check
    pub fn render_inspection(
        self,
        apk: &ApkSections,
        verified: &Result<Hash, Error>,
    ) -> io::Result<()> {
        if self.json_output {
            return print_json(&inspection_json(apk, verified));
        }

        let mut sections = new_table(&["Section", "Compressed", "Entries"]);
        if let Some(signature) = &apk.signature {
            add_section_row(&mut sections, "signature", signature);
        }
        add_section_row(&mut sections, "control", &apk.control);
        add_section_row(&mut sections, "data", &apk.data);
        println!("{sections}");

        if let Some((key, blob)) = apk.signature_blob() {
            println!("Signed with {key} ({} byte signature)", blob.len());
        } else {
            println!("Unsigned");
        }
        println!();

        for (key, value) in apk.pkginfo() {
            println!("{key} = {value}");
        }
        println!();

        let mut entries = new_table(&["Mode", "Owner", "Size", "Path"]);
        for entry in &apk.data.entries {
            let path = match &entry.link_name {
                Some(target) => format!("{} -> {target}", entry.path),
                None => entry.path.clone(),
            };
            entries.add_row(vec![
                Cell::new(format!("{:04o}", entry.mode)),
                Cell::new(format!("{}:{}", entry.uid, entry.gid)),
                Cell::new(entry.size),
                Cell::new(path),
            ]);
        }
        println!("{entries}");

        match verified {
            Ok(hash) => println!("datahash OK ({hash})"),
            Err(e) => println!("datahash FAILED: {e}"),
        }
        Ok(())
    }
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.iter().map(|h| Cell::new(*h)));
    table
}

fn add_section_row(table: &mut Table, name: &str, section: &Section) {
    table.add_row(vec![
        Cell::new(name),
        Cell::new(section.compressed.len()),
        Cell::new(section.entries.len()),
    ]);
}

fn inspection_json(apk: &ApkSections, verified: &Result<Hash, Error>) -> serde_json::Value {
    let section = |s: &Section| {
        json!({
            "compressed_size": s.compressed.len(),
            "entries": s.entries.iter().map(|e| json!({
                "path": e.path,
                "mode": e.mode,
                "uid": e.uid,
                "gid": e.gid,
                "size": e.size,
                "link": e.link_name,
                "checksum": e.checksum,
            })).collect::<Vec<_>>(),
        })
    };

    json!({
        "signature": apk.signature_blob().map(|(key, blob)| json!({
            "key": key,
            "size": blob.len(),
        })),
        "pkginfo": apk.pkginfo().iter().map(|(k, v)| json!([k, v])).collect::<Vec<_>>(),
        "control": section(&apk.control),
        "data": section(&apk.data),
        "datahash_ok": verified.is_ok(),
    })
}

fn print_json(value: &serde_json::Value) -> io::Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    println!("{text}");
    Ok(())
}
