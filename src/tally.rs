use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
    str::FromStr,
};

use flate2::read::MultiGzDecoder;
use indexmap::IndexMap;
use log::{debug, info};

use crate::error::{ContentsError, Result};

/// How a Contents line is credited to the packages it lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribution {
    /// Increment every listed package that is already known; an unknown
    /// package instead (re)sets the first listed package of the line to 1.
    /// Keeps reports comparable with earlier published rankings.
    FirstListed,
    /// Increment every listed package, inserting unknown ones at 1.
    Each,
}

impl Default for Attribution {
    fn default() -> Self {
        Attribution::FirstListed
    }
}

impl FromStr for Attribution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first-listed" => Ok(Attribution::FirstListed),
            "each" => Ok(Attribution::Each),
            other => Err(format!(
                "unknown attribution `{}`, expected `first-listed` or `each`",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageCount {
    pub name: String,
    pub files: u64,
}

/// Splits the package field off a Contents line: the last
/// whitespace-delimited token, split on commas. `None` for a line with no
/// tokens.
pub fn packages_of(line: &str) -> Option<Vec<&str>> {
    line.split_whitespace()
        .last()
        .map(|field| field.split(',').collect())
}

/// File counts per package, in discovery order.
#[derive(Debug, Default)]
pub struct PackageTally {
    attribution: Attribution,
    counts: IndexMap<String, u64>,
    lines: usize,
}

impl PackageTally {
    pub fn new(attribution: Attribution) -> Self {
        PackageTally {
            attribution,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn get(&self, package: &str) -> Option<u64> {
        self.counts.get(package).copied()
    }

    pub fn record(&mut self, packages: &[&str]) {
        self.lines += 1;

        let first = match packages.first() {
            Some(first) => *first,
            None => return,
        };

        for package in packages {
            match self.counts.get_mut(*package) {
                Some(count) => *count += 1,
                None => {
                    let key = match self.attribution {
                        Attribution::FirstListed => first,
                        Attribution::Each => *package,
                    };
                    // insert keeps the position of an existing key
                    self.counts.insert(key.to_string(), 1);
                }
            }
        }
    }

    /// Feeds every line of `reader` into the tally. `path` only labels errors.
    pub fn scan<R: BufRead>(&mut self, reader: R, path: &Path) -> Result<()> {
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| ContentsError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let packages = packages_of(&line).ok_or_else(|| ContentsError::MalformedLine {
                path: path.to_path_buf(),
                line: idx + 1,
            })?;
            self.record(&packages);
        }

        debug!(
            "scanned {} lines of {}, {} distinct packages",
            self.lines,
            path.display(),
            self.counts.len()
        );
        Ok(())
    }

    /// All packages by file count, highest first. Equal counts put the
    /// later-discovered package first.
    pub fn ranked(&self) -> Vec<PackageCount> {
        let mut ranked: Vec<PackageCount> = self
            .counts
            .iter()
            .rev()
            .map(|(name, &files)| PackageCount {
                name: name.clone(),
                files,
            })
            .collect();

        ranked.sort_by(|a, b| b.files.cmp(&a.files));
        ranked
    }

    /// The `n` highest-ranked packages. Fails rather than returning a short
    /// list when fewer than `n` packages were seen.
    pub fn top(&self, n: usize) -> Result<Vec<PackageCount>> {
        if self.counts.len() < n {
            return Err(ContentsError::InsufficientPackages {
                found: self.counts.len(),
                wanted: n,
            });
        }

        let mut ranked = self.ranked();
        ranked.truncate(n);
        Ok(ranked)
    }
}

/// Tallies a plain-text Contents file on disk.
pub fn tally_file(path: &Path, attribution: Attribution) -> Result<PackageTally> {
    let file = File::open(path).map_err(ContentsError::io(path))?;
    let mut tally = PackageTally::new(attribution);
    tally.scan(BufReader::new(file), path)?;

    log_totals(&tally, path);
    Ok(tally)
}

/// Tallies a gzip-compressed Contents file, inflating it while scanning.
pub fn tally_archive(path: &Path, attribution: Attribution) -> Result<PackageTally> {
    let file = File::open(path).map_err(ContentsError::io(path))?;
    let mut tally = PackageTally::new(attribution);

    tally
        .scan(BufReader::new(MultiGzDecoder::new(file)), path)
        .map_err(|err| match err {
            // flate2 reports bad headers, corrupt blocks and truncation this way
            ContentsError::Io { path, source }
                if matches!(
                    source.kind(),
                    io::ErrorKind::InvalidInput | io::ErrorKind::UnexpectedEof
                ) =>
            {
                ContentsError::Decompress { path, source }
            }
            other => other,
        })?;

    log_totals(&tally, path);
    Ok(tally)
}

fn log_totals(tally: &PackageTally, path: &Path) {
    info!(
        "{} lines, {} packages in {}",
        tally.lines(),
        tally.len(),
        path.display()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally_of(input: &str, attribution: Attribution) -> PackageTally {
        let mut tally = PackageTally::new(attribution);
        tally
            .scan(input.as_bytes(), Path::new("Contents-test"))
            .unwrap();
        tally
    }

    #[test]
    fn extracts_package_field() {
        assert_eq!(
            packages_of("usr/bin/foo    admin/pkgA,admin/pkgB"),
            Some(vec!["admin/pkgA", "admin/pkgB"])
        );
    }

    #[test]
    fn path_with_spaces_keeps_last_token() {
        assert_eq!(
            packages_of("usr/share/doc/a file name\tutils/pkg"),
            Some(vec!["utils/pkg"])
        );
    }

    #[test]
    fn blank_line_has_no_packages() {
        assert_eq!(packages_of("   \t "), None);
    }

    #[test]
    fn first_listed_resets_leading_package() {
        let tally = tally_of(
            "a/b  pkg1\nc/d  pkg1,pkg2\ne/f  pkg2\ng/h  pkg2\n",
            Attribution::FirstListed,
        );

        assert_eq!(tally.get("pkg1"), Some(1));
        assert_eq!(tally.get("pkg2"), Some(2));
        assert_eq!(
            tally.ranked(),
            vec![
                PackageCount {
                    name: "pkg2".to_string(),
                    files: 2
                },
                PackageCount {
                    name: "pkg1".to_string(),
                    files: 1
                },
            ]
        );
    }

    #[test]
    fn first_listed_never_inserts_trailing_unknowns() {
        let tally = tally_of("x/y  lead,other,third\n", Attribution::FirstListed);

        // lead is inserted, then found by the later unknowns and reset to 1
        assert_eq!(tally.get("lead"), Some(1));
        assert_eq!(tally.get("other"), None);
        assert_eq!(tally.get("third"), None);
    }

    #[test]
    fn each_credits_every_listed_package() {
        let tally = tally_of(
            "a/b  pkg1\nc/d  pkg1,pkg2\ne/f  pkg2\ng/h  pkg2\n",
            Attribution::Each,
        );

        assert_eq!(tally.get("pkg1"), Some(2));
        assert_eq!(tally.get("pkg2"), Some(3));
    }

    #[test]
    fn ties_rank_later_discovery_first() {
        let tally = tally_of("a  first\nb  second\nc  third\n", Attribution::Each);
        let names: Vec<String> = tally.ranked().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["third", "second", "first"]);
    }

    #[test]
    fn top_fails_with_too_few_packages() {
        let tally = tally_of("a  one\nb  two\n", Attribution::FirstListed);
        match tally.top(10) {
            Err(ContentsError::InsufficientPackages { found, wanted }) => {
                assert_eq!(found, 2);
                assert_eq!(wanted, 10);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn top_truncates_and_is_non_increasing() {
        let mut input = String::new();
        for pkg in 0..15 {
            for file in 0..=pkg {
                input.push_str(&format!("usr/share/p{}/f{}  section/p{}\n", pkg, file, pkg));
            }
        }
        let tally = tally_of(&input, Attribution::FirstListed);
        let top = tally.top(10).unwrap();

        assert_eq!(top.len(), 10);
        assert_eq!(top[0].name, "section/p14");
        assert_eq!(top[0].files, 15);
        assert!(top.windows(2).all(|w| w[0].files >= w[1].files));
    }

    #[test]
    fn blank_line_is_reported_with_its_number() {
        let mut tally = PackageTally::new(Attribution::FirstListed);
        let err = tally
            .scan("a  one\n\nb  two\n".as_bytes(), Path::new("Contents-x"))
            .unwrap_err();

        match err {
            ContentsError::MalformedLine { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn plain_file_named_like_an_archive_is_read_as_text() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("Contents-odd.gz");
        std::fs::write(&path, "usr/bin/a  utils/a\nusr/bin/b  utils/a\n").unwrap();

        let tally = tally_file(&path, Attribution::FirstListed).unwrap();
        assert_eq!(tally.get("utils/a"), Some(2));
    }

    #[test]
    fn corrupt_archive_is_a_decompress_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("Contents-foo.gz");
        std::fs::write(&path, "usr/bin/a  utils/a\n").unwrap();

        match tally_archive(&path, Attribution::FirstListed) {
            Err(ContentsError::Decompress { .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn truncated_archive_is_a_decompress_error() {
        use flate2::{write::GzEncoder, Compression};
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"usr/bin/a  utils/a\n".repeat(200).as_slice()).unwrap();
        let mut bytes = encoder.finish().unwrap();
        bytes.truncate(bytes.len() / 2);

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("Contents-cut.gz");
        std::fs::write(&path, bytes).unwrap();

        match tally_archive(&path, Attribution::FirstListed) {
            Err(ContentsError::Decompress { .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
