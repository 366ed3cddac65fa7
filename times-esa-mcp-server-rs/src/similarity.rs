pub fn distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    if len_a == 0 || len_b == 0 {
        return 0.0;
    }
    let max_len = std::cmp::max(len_a, len_b);
    let dist = distance(a, b);
    if dist >= max_len {
        return 0.0;
    }
    1.0 - dist as f64 / max_len as f64
}
