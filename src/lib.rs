pub mod error;
pub mod fetch;
pub mod report;
pub mod tally;

use std::path::Path;

pub use error::{ContentsError, Result};
pub use fetch::{Fetcher, Mirror};
pub use tally::{Attribution, PackageCount, PackageTally};

pub const DEFAULT_TOP: usize = 10;

/// Tallies the Contents file at `path` and returns its `top` biggest
/// packages. A `.gz` file is inflated while it is scanned.
pub fn rank_file(path: &Path, attribution: Attribution, top: usize) -> Result<Vec<PackageCount>> {
    let tally = if path.extension().map_or(false, |ext| ext == "gz") {
        tally::tally_archive(path, attribution)?
    } else {
        tally::tally_file(path, attribution)?
    };

    tally.top(top)
}
