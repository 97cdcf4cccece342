//! Control section: `.PKGINFO` plus install scriptlets

use super::archive::{append_root_file, into_unterminated};
use super::compression::gzip_bytes;
use crate::PackageBuild;
use apkforge_errors::{BuildError, Error};
use std::fmt::{self, Write as _};
use std::io;
use tar::Builder;

const PKGINFO_NAME: &str = ".PKGINFO";
const PKGINFO_MODE: u32 = 0o644;
const SCRIPTLET_MODE: u32 = 0o755;

/// Render `.PKGINFO` for a package whose data section is written
///
/// # Errors
///
/// Returns `BuildError::ControlSection` if the data hash is not known yet.
pub fn render_pkginfo(build: &PackageBuild, source_date_epoch: u64) -> Result<String, Error> {
    let Some(data_hash) = build.data_hash.as_deref() else {
        return Err(BuildError::ControlSection {
            message: format!("data hash of {} is not known yet", build.package_name),
        }
        .into());
    };

    let mut out = String::with_capacity(512);
    write_pkginfo(&mut out, build, source_date_epoch, data_hash).map_err(|e| {
        BuildError::ControlSection {
            message: format!("unable to render .PKGINFO: {e}"),
        }
    })?;
    Ok(out)
}

fn write_pkginfo(
    out: &mut String,
    build: &PackageBuild,
    source_date_epoch: u64,
    data_hash: &str,
) -> fmt::Result {
    let deps = &build.dependencies;

    writeln!(out, "# Generated by apkforge.")?;
    writeln!(out, "pkgname = {}", build.package_name)?;
    writeln!(out, "pkgver = {}", build.full_version())?;
    writeln!(out, "arch = {}", build.arch.to_apk())?;
    writeln!(out, "size = {}", build.installed_size)?;
    writeln!(out, "origin = {}", build.origin_name)?;
    writeln!(out, "pkgdesc = {}", build.description)?;
    writeln!(out, "url = {}", build.url)?;
    writeln!(out, "commit = {}", build.commit)?;
    if source_date_epoch != 0 {
        writeln!(out, "builddate = {source_date_epoch}")?;
    }
    for license in &build.licenses {
        writeln!(out, "license = {license}")?;
    }
    for dep in &deps.runtime {
        writeln!(out, "depend = {dep}")?;
    }
    for dep in &deps.provides {
        writeln!(out, "provides = {dep}")?;
    }
    for dep in &deps.replaces {
        writeln!(out, "replaces = {dep}")?;
    }
    for dep in &deps.vendored {
        writeln!(out, "# vendored = {dep}")?;
    }
    if let Some(priority) = deps.provider_priority {
        writeln!(out, "provider_priority = {priority}")?;
    }
    let triggers = &build.scriptlets.trigger.paths;
    if !triggers.is_empty() {
        writeln!(out, "triggers = {}", triggers.join(" "))?;
    }
    writeln!(out, "datahash = {data_hash}")
}

/// Build the gzipped control section
///
/// # Errors
///
/// Returns `BuildError::ControlSection` if `.PKGINFO` cannot be rendered or
/// the archive cannot be written.
pub fn build_control_section(build: &PackageBuild, source_date_epoch: u64) -> Result<Vec<u8>, Error> {
    let pkginfo = render_pkginfo(build, source_date_epoch)?;
    control_archive(build, &pkginfo, source_date_epoch).map_err(|e| {
        BuildError::ControlSection {
            message: e.to_string(),
        }
        .into()
    })
}

fn control_archive(build: &PackageBuild, pkginfo: &str, mtime: u64) -> io::Result<Vec<u8>> {
    let mut builder = Builder::new(Vec::new());
    append_root_file(&mut builder, PKGINFO_NAME, pkginfo.as_bytes(), PKGINFO_MODE, mtime)?;

    for (name, body) in build.scriptlets.files() {
        if !body.is_empty() {
            append_root_file(&mut builder, name, body.as_bytes(), SCRIPTLET_MODE, mtime)?;
        }
    }

    gzip_bytes(&into_unterminated(builder)?)
}
