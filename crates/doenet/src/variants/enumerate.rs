//! Counting and decoding of combinatorial outcomes.
//!
//! Each decoder is a bijection from `0..count` onto the outcomes it counts,
//! which is what makes every unique variant index land on a distinct
//! combination.

pub fn factorial(n: u64) -> Option<u64> {
    (1..=n).try_fold(1u64, |acc, i| acc.checked_mul(i))
}

/// Ordered picks of `k` distinct elements out of `n`.
pub fn permutations(n: u64, k: u64) -> Option<u64> {
    if k > n {
        return Some(0);
    }
    ((n - k + 1)..=n).try_fold(1u64, |acc, i| acc.checked_mul(i))
}

pub fn binomial(n: u64, k: u64) -> Option<u64> {
    if k > n {
        return Some(0);
    }
    let k = k.min(n - k);
    let mut result: u128 = 1;
    for i in 0..k {
        result = result * u128::from(n - i) / u128::from(i + 1);
        if result > u128::from(u64::MAX) {
            return None;
        }
    }
    u64::try_from(result).ok()
}

/// Elementary symmetric polynomial `e_k` of `values`.
pub fn elementary_symmetric(values: &[u64], k: usize) -> Option<u64> {
    let mut e = vec![0u64; k + 1];
    e[0] = 1;
    for value in values {
        for j in (1..=k).rev() {
            e[j] = e[j].checked_add(e[j - 1].checked_mul(*value)?)?;
        }
    }
    Some(e[k])
}

/// Number of outcomes of picking `k` options whose own content offers
/// `counts[j]` outcomes each.
pub fn select_count(counts: &[u64], k: u64, with_replacement: bool) -> Option<u64> {
    if with_replacement {
        let total = counts.iter().try_fold(0u64, |acc, count| acc.checked_add(*count))?;
        return total.checked_pow(u32::try_from(k).ok()?);
    }
    if k as usize > counts.len() {
        return None;
    }
    factorial(k)?.checked_mul(elementary_symmetric(counts, k as usize)?)
}

pub fn decode_tuple(mut digit: u64, n: u64, k: u64) -> Vec<u64> {
    (0..k)
        .map(|_| {
            let value = digit % n.max(1);
            digit /= n.max(1);
            value
        })
        .collect()
}

/// Factorial number system: the `i`th pick has `n - i` choices left.
pub fn decode_permutation(mut digit: u64, n: u64, k: u64) -> Vec<u64> {
    let mut available: Vec<u64> = (0..n).collect();
    let mut picks = Vec::with_capacity(k as usize);
    for i in 0..k.min(n) {
        let base = n - i;
        let position = (digit % base) as usize;
        digit /= base;
        picks.push(available.remove(position));
    }
    picks
}

/// Combinatorial number system; the result is sorted ascending.
pub fn decode_combination(mut digit: u64, n: u64, k: u64) -> Vec<u64> {
    let mut picks = Vec::with_capacity(k as usize);
    let mut upper = n;
    for i in (1..=k).rev() {
        let mut candidate = upper;
        while candidate > 0 {
            candidate -= 1;
            match binomial(candidate, i) {
                Some(count) if count <= digit => {
                    digit -= count;
                    break;
                }
                _ => {}
            }
        }
        picks.push(candidate);
        upper = candidate;
    }
    picks.reverse();
    picks
}

/// Multisets of size `k` over `n` values via stars and bars.
pub fn decode_multiset(digit: u64, n: u64, k: u64) -> Vec<u64> {
    if n == 0 {
        return Vec::new();
    }
    decode_combination(digit, n + k - 1, k)
        .into_iter()
        .enumerate()
        .map(|(i, value)| value - i as u64)
        .collect()
}

pub fn multiset_count(n: u64, k: u64) -> Option<u64> {
    if n == 0 {
        return Some(if k == 0 { 1 } else { 0 });
    }
    binomial(n + k - 1, k)
}

/// Decode a select outcome into `(option, digit for that option's content)`
/// pairs, one per pick.
pub fn decode_select(mut digit: u64, counts: &[u64], k: u64, with_replacement: bool) -> Option<Vec<(usize, u64)>> {
    if with_replacement {
        let total = counts.iter().sum::<u64>();
        if total == 0 {
            return None;
        }
        let mut picks = Vec::with_capacity(k as usize);
        for _ in 0..k {
            let mut value = digit % total;
            digit /= total;
            let option = counts.iter().position(|count| {
                if value < *count {
                    true
                } else {
                    value -= count;
                    false
                }
            })?;
            picks.push((option, value));
        }
        return Some(picks);
    }

    let mut remaining: Vec<usize> = (0..counts.len()).collect();
    let mut picks = Vec::with_capacity(k as usize);
    for left in (0..k).rev() {
        let mut chosen = None;
        for (position, option) in remaining.iter().enumerate() {
            let rest = remaining
                .iter()
                .filter(|other| *other != option)
                .map(|other| counts[*other])
                .collect::<Vec<_>>();
            let completions = factorial(left)?.checked_mul(elementary_symmetric(&rest, left as usize)?)?;
            let block = counts[*option].checked_mul(completions)?;
            if digit < block {
                chosen = Some(position);
                break;
            }
            digit -= block;
        }
        let option = remaining.remove(chosen?);
        let count = counts[option].max(1);
        picks.push((option, digit % count));
        digit /= count;
    }
    Some(picks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn counts() {
        assert_eq!(factorial(5), Some(120));
        assert_eq!(permutations(5, 2), Some(20));
        assert_eq!(binomial(6, 3), Some(20));
        assert_eq!(multiset_count(3, 2), Some(6));
        assert_eq!(elementary_symmetric(&[1, 2, 3], 2), Some(11));
        assert_eq!(select_count(&[1, 2, 3], 2, false), Some(22));
        assert_eq!(select_count(&[1, 2, 3], 2, true), Some(36));
        assert_eq!(factorial(40), None);
    }

    #[test]
    fn permutation_decoding_is_a_bijection() {
        let outcomes = (0..20).map(|d| decode_permutation(d, 5, 2)).collect::<HashSet<_>>();
        assert_eq!(outcomes.len(), 20);
        assert!(outcomes.iter().all(|picks| picks[0] != picks[1]));
    }

    #[test]
    fn combination_and_multiset_decoding() {
        let combinations = (0..20).map(|d| decode_combination(d, 6, 3)).collect::<HashSet<_>>();
        assert_eq!(combinations.len(), 20);
        assert!(combinations.iter().all(|c| c.windows(2).all(|w| w[0] < w[1]) && c[2] < 6));

        let multisets = (0..6).map(|d| decode_multiset(d, 3, 2)).collect::<HashSet<_>>();
        assert_eq!(multisets.len(), 6);
        assert!(multisets.iter().all(|m| m[0] <= m[1] && m[1] < 3));
    }

    #[test]
    fn select_decoding_covers_nested_counts() {
        let counts = [1, 2, 3];
        for with_replacement in [false, true] {
            let total = select_count(&counts, 2, with_replacement).unwrap();
            let outcomes = (0..total)
                .map(|d| decode_select(d, &counts, 2, with_replacement).unwrap())
                .collect::<HashSet<_>>();
            assert_eq!(outcomes.len() as u64, total);
            for picks in &outcomes {
                assert!(picks.iter().all(|(option, sub)| *sub < counts[*option]));
                if !with_replacement {
                    assert_ne!(picks[0].0, picks[1].0);
                }
            }
        }
    }
}
