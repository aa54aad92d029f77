use std::sync::OnceLock;

use crate::common::metadata::{BARS_IN_MODULE, MODULES_IN_CODEWORD, NUMBER_OF_CODEWORDS};

// Cluster symbol tables
//------------------------------------------------------------------------------
// Every codeword is 17 modules split into 4 bars and 4 spaces, each 1..=6
// modules wide and starting with a bar. The cluster number
// (b0 - b2 + b4 - b6) mod 9 is 0, 3 or 6 and identifies the row mod 3 the
// codeword may appear in. Per cluster the symbology uses 929 patterns; the
// tables here enumerate all valid run-length compositions per cluster in
// ascending bit-pattern order and keep the first 929.

const RUNS: usize = BARS_IN_MODULE;
const MIN_RUN: i32 = 1;
const MAX_RUN: i32 = 6;

pub struct SymbolTables {
    /// `(pattern, cluster, value)` sorted by pattern for binary search.
    symbols: Vec<(u32, u8, u16)>,
    /// Pattern by `[cluster / 3][value]`.
    patterns: [Vec<u32>; 3],
    /// Module widths of each symbol as fractions of 17, for nearest-ratio
    /// matching of distorted codewords. Indexed in step with `symbols`.
    ratios: Vec<[f32; RUNS]>,
}

impl SymbolTables {
    /// Shared instance; building enumerates ~10k compositions once.
    pub fn get() -> &'static Self {
        static TABLES: OnceLock<SymbolTables> = OnceLock::new();
        TABLES.get_or_init(Self::build)
    }

    fn build() -> Self {
        let mut per_cluster: [Vec<u32>; 3] = Default::default();
        let mut runs = [0i32; RUNS];
        enumerate_compositions(&mut runs, 0, MODULES_IN_CODEWORD as i32, &mut per_cluster);

        for patterns in per_cluster.iter_mut() {
            patterns.sort_unstable();
            patterns.truncate(NUMBER_OF_CODEWORDS as usize);
        }

        let mut symbols = Vec::with_capacity(3 * NUMBER_OF_CODEWORDS as usize);
        for (index, patterns) in per_cluster.iter().enumerate() {
            let cluster = (index * 3) as u8;
            for (value, &pattern) in patterns.iter().enumerate() {
                symbols.push((pattern, cluster, value as u16));
            }
        }
        symbols.sort_unstable_by_key(|&(pattern, _, _)| pattern);

        let ratios = symbols
            .iter()
            .map(|&(pattern, _, _)| {
                let counts = module_bit_counts(pattern);
                counts.map(|c| c as f32 / MODULES_IN_CODEWORD as f32)
            })
            .collect();

        Self { symbols, patterns: per_cluster, ratios }
    }

    /// Looks a 17-bit module pattern up in the merged symbol list.
    pub fn codeword(&self, pattern: u32) -> Option<(u8, u16)> {
        let index = self.symbols.binary_search_by_key(&pattern, |&(p, _, _)| p).ok()?;
        let (_, cluster, value) = self.symbols[index];
        Some((cluster, value))
    }

    /// Encoder-side lookup: the bit pattern of `value` in the given cluster.
    pub fn pattern(&self, cluster: u8, value: u16) -> u32 {
        debug_assert!(cluster % 3 == 0 && cluster <= 6);
        self.patterns[(cluster / 3) as usize][value as usize]
    }

    /// The symbol whose module-width ratios sit closest (in squared
    /// distance) to the measured run lengths. Used when exact pattern
    /// matching fails on a distorted codeword.
    pub fn closest_pattern(&self, module_bit_count: &[i32; RUNS]) -> Option<u32> {
        let total: i32 = module_bit_count.iter().sum();
        if total < 1 {
            return None;
        }
        let measured = module_bit_count.map(|c| c as f32 / total as f32);

        let mut best_distance = f32::MAX;
        let mut best = None;
        for (&(pattern, _, _), ratio) in self.symbols.iter().zip(&self.ratios) {
            let distance: f32 =
                measured.iter().zip(ratio).map(|(m, r)| (m - r) * (m - r)).sum();
            if distance < best_distance {
                best_distance = distance;
                best = Some(pattern);
            }
        }
        best
    }
}

/// Cluster number of a run-length sequence:
/// `(b0 - b2 + b4 - b6) mod 9`, which is 0, 3 or 6 for valid codewords.
pub fn cluster_number(runs: &[i32; RUNS]) -> i32 {
    (runs[0] - runs[2] + runs[4] - runs[6]).rem_euclid(9)
}

fn enumerate_compositions(
    runs: &mut [i32; RUNS],
    depth: usize,
    remaining: i32,
    out: &mut [Vec<u32>; 3],
) {
    if depth == RUNS - 1 {
        if !(MIN_RUN..=MAX_RUN).contains(&remaining) {
            return;
        }
        runs[depth] = remaining;
        let cluster = cluster_number(runs);
        if cluster % 3 == 0 {
            out[(cluster / 3) as usize].push(pattern_of(runs));
        }
        return;
    }
    let left = (RUNS - depth - 1) as i32;
    for run in MIN_RUN..=MAX_RUN.min(remaining - left * MIN_RUN) {
        runs[depth] = run;
        enumerate_compositions(runs, depth + 1, remaining - run, out);
    }
}

fn pattern_of(runs: &[i32; RUNS]) -> u32 {
    let mut pattern = 0u32;
    for (index, &run) in runs.iter().enumerate() {
        for _ in 0..run {
            pattern = (pattern << 1) | u32::from(index % 2 == 0);
        }
    }
    pattern
}

/// Splits a 17-bit pattern back into its 8 run lengths.
pub fn module_bit_counts(pattern: u32) -> [i32; RUNS] {
    let mut result = [0i32; RUNS];
    let mut previous = 0;
    let mut index = RUNS as i32 - 1;
    let mut codeword = pattern;
    loop {
        if (codeword & 0x1) != previous {
            previous = codeword & 0x1;
            index -= 1;
            if index < 0 {
                break;
            }
        }
        result[index as usize] += 1;
        codeword >>= 1;
    }
    result
}
