//! State encodings and Y/N/dash pattern arithmetic.
//!
//! A state is a full assignment of every option. Character `i` of a Y/N
//! string is option `i` of the master list, and bit `i` of the decimal value
//! is set when that option is taken. A dash pattern leaves some options
//! unspecified (`-`) and so stands for a set of states.

/// Encode a decimal state as a Y/N string over `option_count` options.
pub fn dec_to_yn(decimal: u64, option_count: usize) -> String {
    (0..option_count)
        .map(|i| if decimal & (1u64 << i) != 0 { 'Y' } else { 'N' })
        .collect()
}

/// Decode a Y/N string into its decimal value. Characters other than `Y`
/// count as not taken.
pub fn yn_to_dec(yn: &str) -> u64 {
    yn.chars()
        .enumerate()
        .filter(|(_, c)| *c == 'Y')
        .fold(0, |acc, (i, _)| acc | (1u64 << i))
}

/// Expand a dash pattern into every Y/N string it covers.
pub fn expand_pattern(pattern: &str) -> Vec<String> {
    let mut out = vec![String::with_capacity(pattern.len())];
    for c in pattern.chars() {
        if c == '-' {
            let mut next = Vec::with_capacity(out.len() * 2);
            for prefix in out {
                let mut y = prefix.clone();
                y.push('Y');
                let mut n = prefix;
                n.push('N');
                next.push(y);
                next.push(n);
            }
            out = next;
        } else {
            for s in &mut out {
                s.push(c);
            }
        }
    }
    out
}

/// Number of states covered by a dash pattern.
pub fn pattern_size(pattern: &str) -> u64 {
    1u64 << pattern.chars().filter(|c| *c == '-').count()
}

/// Subtract the states matching `remove` from the set described by
/// `patterns`, keeping the result as disjoint dash patterns.
///
/// Returns the remaining patterns and the number of states removed.
pub fn remove_pattern(patterns: &[String], remove: &str) -> (Vec<String>, u64) {
    let rem: Vec<char> = remove.chars().collect();
    let mut kept = Vec::new();
    let mut removed = 0u64;

    for pattern in patterns {
        let p: Vec<char> = pattern.chars().collect();
        let disjoint = p
            .iter()
            .zip(&rem)
            .any(|(a, b)| *a != '-' && *b != '-' && a != b);
        if disjoint {
            kept.push(pattern.clone());
            continue;
        }

        let free = p
            .iter()
            .zip(&rem)
            .filter(|(a, b)| **a == '-' && **b == '-')
            .count();
        removed += 1u64 << free;

        // Peel off one half-space per position the removed pattern pins down.
        let mut current = p.clone();
        for k in 0..p.len() {
            if p[k] == '-' && rem[k] != '-' {
                let mut piece = current.clone();
                piece[k] = if rem[k] == 'Y' { 'N' } else { 'Y' };
                kept.push(piece.into_iter().collect());
                current[k] = rem[k];
            }
        }
    }

    (kept, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_dec_yn_bit_order() {
        assert_eq!(dec_to_yn(0, 3), "NNN");
        assert_eq!(dec_to_yn(1, 3), "YNN");
        assert_eq!(dec_to_yn(6, 3), "NYY");
        assert_eq!(yn_to_dec("NYY"), 6);
    }

    #[test]
    fn test_expand_pattern() {
        let mut states = expand_pattern("Y-N-");
        states.sort();
        assert_eq!(states, vec!["YNNN", "YNNY", "YYNN", "YYNY"]);
        assert_eq!(pattern_size("Y-N-"), 4);
    }

    #[test]
    fn test_remove_single_state() {
        let (kept, removed) = remove_pattern(&["--".to_string()], "YY");
        assert_eq!(removed, 1);
        let mut states: Vec<String> = kept.iter().flat_map(|p| expand_pattern(p)).collect();
        states.sort();
        assert_eq!(states, vec!["NN", "NY", "YN"]);
    }

    #[test]
    fn test_remove_disjoint_pattern_is_noop() {
        let (kept, removed) = remove_pattern(&["Y-".to_string()], "N-");
        assert_eq!(removed, 0);
        assert_eq!(kept, vec!["Y-".to_string()]);
    }

    #[test]
    fn test_remove_overlapping_half() {
        let (kept, removed) = remove_pattern(&["---".to_string()], "-Y-");
        assert_eq!(removed, 4);
        let total: u64 = kept.iter().map(|p| pattern_size(p)).sum();
        assert_eq!(total, 4);
        for p in &kept {
            for s in expand_pattern(p) {
                assert_eq!(s.chars().nth(1), Some('N'));
            }
        }
    }

    proptest! {
        #[test]
        fn prop_decimal_round_trip(dec in 0u64..1024) {
            prop_assert_eq!(yn_to_dec(&dec_to_yn(dec, 10)), dec);
        }

        #[test]
        fn prop_remove_partitions_state_space(remove in "[YN-]{4}") {
            let (kept, removed) = remove_pattern(&["----".to_string()], &remove);
            let remaining: u64 = kept.iter().map(|p| pattern_size(p)).sum();
            prop_assert_eq!(remaining + removed, 16);
            for p in &kept {
                for s in expand_pattern(p) {
                    let matches = s.chars().zip(remove.chars()).all(|(a, b)| b == '-' || a == b);
                    prop_assert!(!matches);
                }
            }
        }
    }
}
