use std::io::{self, Write};

use serde_json::{json, Value};

use crate::tally::PackageCount;

pub fn banner(top: usize, arch: &str) -> String {
    format!(
        "Top {} packages based on number of associated files for architecture: {}",
        top, arch
    )
}

/// Blank line, banner, blank line.
pub fn write_header<W: Write>(out: &mut W, top: usize, arch: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", banner(top, arch))?;
    writeln!(out)
}

/// `<rank>. <package> <count>` per entry, ranks starting at 1, then a
/// trailing blank line.
pub fn write_ranking<W: Write>(out: &mut W, ranking: &[PackageCount]) -> io::Result<()> {
    for (idx, package) in ranking.iter().enumerate() {
        writeln!(out, "{}. {} {}", idx + 1, package.name, package.files)?;
    }
    writeln!(out)
}

pub fn to_json(arch: &str, ranking: &[PackageCount]) -> Value {
    let packages: Vec<Value> = ranking
        .iter()
        .enumerate()
        .map(|(idx, package)| {
            json!({
                "rank": idx + 1,
                "package": package.name,
                "files": package.files,
            })
        })
        .collect();

    json!({
        "architecture": arch,
        "packages": packages,
    })
}
