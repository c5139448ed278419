//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "heapscope",
    version,
    about = "Summarize a sampling heap profile as an allocation tree",
    after_help = "\
EXAMPLES:
    heapscope app.heapprofile                     Summary and top allocation sites
    heapscope app.heapprofile --top 20            Show more allocation sites
    heapscope app.heapprofile --export tree.json  Write the tree as nested JSON"
)]
pub struct Args {
    /// Saved sampling heap profile (.heapprofile JSON)
    #[arg(value_name = "PROFILE")]
    pub profile: PathBuf,

    /// Number of allocation sites to list
    #[arg(long, default_value = "10")]
    pub top: usize,

    /// Export the built tree to file as nested JSON
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Leave subtrees smaller than this many bytes out of the export
    #[arg(long, default_value = "0", requires = "export")]
    pub min_size: u64,

    /// Reject profiles nested deeper than this
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["heapscope", "app.heapprofile"]).unwrap();
        assert_eq!(args.profile, PathBuf::from("app.heapprofile"));
        assert_eq!(args.top, 10);
        assert_eq!(args.min_size, 0);
        assert!(args.export.is_none());
        assert!(!args.quiet);
    }

    #[test]
    fn test_min_size_requires_export() {
        let result = Args::try_parse_from(["heapscope", "app.heapprofile", "--min-size", "64"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_profile_is_required() {
        assert!(Args::try_parse_from(["heapscope"]).is_err());
    }
}
