/// `n` evenly spaced points over `[start, end]`, both endpoints included.
///
/// A degenerate range (`start == end`) yields `n` copies of `start`.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            // Pin the endpoint so it does not drift by rounding.
            out[n - 1] = end;
            out
        }
    }
}
