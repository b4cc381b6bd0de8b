//! Shortest differential addition chains.
//!
//! `xMUL` multiplies a point by one small odd prime `ℓ` by walking a
//! differential addition chain from the seed window `(P, 2P, 3P)`. The
//! chain for each `ℓ` is found once by exhaustive search over the branching
//! rule `(r0, r1, r2) → (r0, r2, r2+r0) | (r1, r2, r2+r1)`, pruned at
//! `1.5·log₂ℓ` steps, keeping the first chain of minimum length.
//!
//! Chains are pure functions of `ℓ`, so the table is cached on disk as one
//! whitespace-separated bit line per prime. The cache is advisory: entries
//! are replayed over the integers on load and the whole table is
//! regenerated (and best-effort rewritten) when the file is missing, short,
//! or fails replay.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::params::Params;

/// Search depth bound: `⌊3·bitlen(ℓ)/2⌋`, a superset of `1.5·log₂ℓ` that
/// cannot change the minimum.
fn depth_bound(ell: u64) -> usize {
    let bits = 64 - ell.leading_zeros();
    usize::try_from(3 * bits / 2).unwrap_or(usize::MAX)
}

fn search(ell: u64, r: (u64, u64, u64), chain: &mut Vec<u8>, bound: usize, best: &mut Option<Vec<u8>>) {
    let (r0, r1, r2) = r;
    if r2 == ell {
        if best.as_ref().is_none_or(|b| chain.len() < b.len()) {
            *best = Some(chain.clone());
        }
        return;
    }
    if r2 > ell || chain.len() > bound {
        return;
    }
    if let Some(b) = best.as_ref() {
        if b.len() <= chain.len() {
            return;
        }
    }
    chain.push(1);
    search(ell, (r0, r2, r2 + r0), chain, bound, best);
    chain.pop();
    chain.push(0);
    search(ell, (r1, r2, r2 + r1), chain, bound, best);
    chain.pop();
}

/// The shortest differential addition chain reaching `ℓ` from `(1, 2, 3)`.
///
/// Ties break toward the lexicographically-first chain in search order,
/// making the table deterministic.
#[must_use]
pub fn sdac(ell: u64) -> Vec<u8> {
    let mut best = None;
    let mut chain = Vec::new();
    search(ell, (1, 2, 3), &mut chain, depth_bound(ell), &mut best);
    // Every odd ell >= 3 is reachable within the bound; ell = 3 is the
    // seed itself (empty chain).
    best.unwrap_or_default()
}

/// Chains for every prime in `l`.
#[must_use]
pub fn generate_sdacs(l: &[u64]) -> Vec<Vec<u8>> {
    l.iter().map(|&ell| sdac(ell)).collect()
}

/// Replay `chain` over the integers and check it reaches `ell`.
fn chain_reaches(chain: &[u8], ell: u64) -> bool {
    let (mut r0, mut r1, mut r2) = (1u64, 2, 3);
    for &bit in chain {
        if bit > 1 {
            return false;
        }
        let sel = if bit == 1 { r0 } else { r1 };
        r0 = sel;
        r1 = r2;
        r2 += sel;
    }
    r2 == ell
}

fn parse_table(text: &str, l: &[u64]) -> Option<Vec<Vec<u8>>> {
    let mut chains = Vec::with_capacity(l.len());
    let mut lines = text.lines();
    for &ell in l {
        let line = lines.next()?;
        let chain = line
            .split_whitespace()
            .map(str::parse::<u8>)
            .collect::<Result<Vec<u8>, _>>()
            .ok()?;
        if !chain_reaches(&chain, ell) {
            return None;
        }
        chains.push(chain);
    }
    Some(chains)
}

fn render_table(chains: &[Vec<u8>]) -> String {
    let mut out = String::new();
    for chain in chains {
        let line: Vec<String> = chain.iter().map(u8::to_string).collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    out
}

fn cache_dir() -> PathBuf {
    env::var_os("CSIDH_SDAC_DIR")
        .map_or_else(|| env::temp_dir().join("csidh-sdacs"), PathBuf::from)
}

fn store(path: &Path, chains: &[Vec<u8>]) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let mut file = fs::File::create(path)?;
    file.write_all(render_table(chains).as_bytes())
}

/// The per-prime chain table, loaded or regenerated at construction.
#[derive(Clone, Debug)]
pub struct SdacTable {
    chains: Vec<Vec<u8>>,
}

impl SdacTable {
    /// Load the cached table for `params`, or regenerate it.
    ///
    /// Cache failures (unreadable file, failed replay, unwritable
    /// directory) degrade silently to the in-memory table.
    #[must_use]
    pub fn load_or_generate(params: &Params) -> Self {
        let path = cache_dir().join(params.prime.label());
        if let Ok(text) = fs::read_to_string(&path) {
            if let Some(chains) = parse_table(&text, params.l) {
                return Self { chains };
            }
        }
        let chains = generate_sdacs(params.l);
        // Best effort: a read-only cache directory is not an error.
        let _unused = store(&path, &chains);
        Self { chains }
    }

    /// Generate without touching the filesystem.
    #[must_use]
    pub fn generate(params: &Params) -> Self {
        Self { chains: generate_sdacs(params.l) }
    }

    /// The chain for `L[j]`.
    #[must_use]
    pub fn chain(&self, j: usize) -> &[u8] {
        &self.chains[j]
    }

    /// Chain length for `L[j]` (drives the strategy cost model).
    #[must_use]
    pub fn len_of(&self, j: usize) -> usize {
        self.chains[j].len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{Params, Prime};

    #[test]
    fn known_chains() {
        assert_eq!(sdac(3), Vec::<u8>::new());
        assert_eq!(sdac(5), vec![0]);
        assert_eq!(sdac(7), vec![1, 0]);
        assert_eq!(sdac(587), vec![1, 0, 1, 1, 0, 0, 0, 1, 0, 0, 0, 0]);
        assert_eq!(sdac(983), vec![1, 0, 1, 0, 1, 0, 1, 0, 0, 0, 0, 1, 0]);
    }

    #[test]
    fn every_p512_chain_replays() {
        let params = Params::new(Prime::P512).unwrap();
        let chains = generate_sdacs(params.l);
        for (chain, &ell) in chains.iter().zip(params.l) {
            assert!(chain_reaches(chain, ell), "chain for {ell} must reach it");
        }
    }

    #[test]
    fn table_round_trips_through_text() {
        let params = Params::new(Prime::P512).unwrap();
        let chains = generate_sdacs(params.l);
        let text = render_table(&chains);
        assert_eq!(parse_table(&text, params.l).unwrap(), chains);
    }

    #[test]
    fn corrupt_table_is_rejected() {
        let params = Params::new(Prime::P512).unwrap();
        let mut chains = generate_sdacs(params.l);
        // flip one bit of one chain: replay must fail
        chains[5][0] ^= 1;
        let text = render_table(&chains);
        assert!(parse_table(&text, params.l).is_none());
        // truncated tables are rejected too
        assert!(parse_table("", params.l).is_none());
    }

    #[test]
    fn store_and_reload() {
        let params = Params::new(Prime::P512).unwrap();
        let chains = generate_sdacs(params.l);
        let path = env::temp_dir()
            .join("csidh-sdacs-test")
            .join(format!("{}-{}", params.prime.label(), std::process::id()));
        store(&path, &chains).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(parse_table(&text, params.l).unwrap(), chains);
        let _unused = fs::remove_file(&path);
    }
}
