// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Evenly spaced sampling helpers for trajectory generation.

fn step(start: f64, stop: f64, num: usize, endpoint: bool) -> f64 {
    let den = if endpoint { num - 1 } else { num };
    if den == 0 {
        return 0.0;
    }
    (stop - start) / den as f64
}

/// `num` evenly spaced samples over `[start, stop]` (`endpoint = true`) or
/// `[start, stop)` (`endpoint = false`).
///
/// ```
/// use meshlink_transform::linspace;
/// assert_eq!(linspace(0.0, 1.0, 5, true), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
/// assert!(linspace(0.0, 1.0, 0, true).is_empty());
/// ```
pub fn linspace(start: f64, stop: f64, num: usize, endpoint: bool) -> Vec<f64> {
    if num == 0 {
        return Vec::new();
    }
    let dt = step(start, stop, num, endpoint);
    let mut out: Vec<f64> = (0..num).map(|i| start + i as f64 * dt).collect();
    if endpoint && num > 1 {
        out[num - 1] = stop;
    }
    out
}

/// Planar points `(radius·cos t, radius·sin t)` for `t` sampled like
/// [`linspace`].
pub fn circspace(start: f64, stop: f64, radius: f64, num: usize, endpoint: bool) -> Vec<[f64; 2]> {
    linspace(start, stop, num, endpoint)
        .into_iter()
        .map(|t| {
            let (s, c) = t.sin_cos();
            [radius * c, radius * s]
        })
        .collect()
}
