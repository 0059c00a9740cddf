use clap::Parser;

use crate::cache::ReplacementPolicy;
use crate::vm::PageReplacement;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Read commands from a file instead of stdin.
    #[arg(short, long)]
    pub script: Option<String>,

    /// Initial replacement policy for all three cache levels.
    #[arg(long, value_enum, default_value_t = ReplacementPolicy::Lru)]
    pub cache_policy: ReplacementPolicy,

    /// Initial page replacement policy.
    #[arg(long, value_enum, default_value_t = PageReplacement::Lru)]
    pub page_policy: PageReplacement,
}

static NUM_PARSER_ERR: &str = "Invalid number. Must be base-10, or start with 0x or 0b.";

/// Parses a base-10, `0x`-hex, or `0b`-binary unsigned integer.
pub fn parse_num(s: &str) -> Result<u64, &'static str> {
    match s.get(0..2) {
        Some("0x") => u64::from_str_radix(&s[2..], 16).map_err(|_| NUM_PARSER_ERR),
        Some("0b") => u64::from_str_radix(&s[2..], 2).map_err(|_| NUM_PARSER_ERR),
        _ => s.parse::<u64>().map_err(|_| NUM_PARSER_ERR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_bases() {
        assert_eq!(parse_num("1024"), Ok(1024));
        assert_eq!(parse_num("0x40"), Ok(64));
        assert_eq!(parse_num("0b101"), Ok(5));
        assert!(parse_num("twelve").is_err());
        assert!(parse_num("0xzz").is_err());
        assert!(parse_num("-5").is_err());
    }
}
