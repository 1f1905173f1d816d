/// Ratcliff/Obershelp name similarity used by fuzzy matching.
///
/// The ratio is `2 * M / T`, where `T` is the total character count of both
/// strings and `M` the number of characters in matching blocks: the longest
/// common substring, then recursively the longest common substrings to its
/// left and right. Comparison is case-insensitive.

/// Similarity ratio in `0.0..=1.0`. Two empty strings are identical.
///
/// Block selection is order-sensitive when several longest blocks tie, so
/// both argument orders are scored and the larger count kept; this makes the
/// ratio symmetric.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matches = matching_characters(&a, &b).max(matching_characters(&b, &a));
    2.0 * matches as f64 / total as f64
}

/// Total length of all matching blocks between `a` and `b`.
pub fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }

    total
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]` as
/// `(start_in_a, start_in_b, len)`. Ties go to the earliest start in `a`,
/// then the earliest in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0);
    let width = bhi - blo + 1;
    // run[j - blo + 1] = length of the common run ending at a[i - 1], b[j]
    let mut prev = vec![0usize; width];
    let mut cur = vec![0usize; width];

    for i in alo..ahi {
        for slot in cur.iter_mut() {
            *slot = 0;
        }
        for j in blo..bhi {
            if a[i] == b[j] {
                let k = prev[j - blo] + 1;
                cur[j - blo + 1] = k;
                if k > best.2 {
                    best = (i + 1 - k, j + 1 - k, k);
                }
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    best
}
