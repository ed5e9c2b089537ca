//! Zero-mean normalised cross-correlation for a single window
//!
//! Plain normalised cross-correlation scores a flat patch close to 1.0
//! against any mostly flat template. Subtracting both means first leaves
//! only the shape, so the score is 1.0 for a match at any brightness and
//! near 0.0 for unrelated content.

/// Score `needle` against the window of `haystack` whose top-left corner is
/// `at`. Both images are row-major luma bytes. The result is in `-1.0..=1.0`.
/// A window outside the haystack, or one where either side is perfectly
/// flat, scores 0.0.
pub fn zero_mean_correlation(
    haystack: &[u8],
    haystack_width: u32,
    needle: &[u8],
    needle_width: u32,
    at: (u32, u32),
) -> f32 {
    if needle_width == 0 || haystack_width == 0 || needle.is_empty() {
        return 0.0;
    }

    let nw = needle_width as usize;
    let nh = needle.len() / nw;
    let hw = haystack_width as usize;
    let (x0, y0) = (at.0 as usize, at.1 as usize);
    if nh == 0 || x0 + nw > hw || (y0 + nh) * hw > haystack.len() {
        return 0.0;
    }

    let window_row = move |row: usize| {
        let start = (y0 + row) * hw + x0;
        &haystack[start..start + nw]
    };
    let needle_row = move |row: usize| &needle[row * nw..(row + 1) * nw];

    let count = (nw * nh) as f64;
    let needle_mean = (0..nh).flat_map(needle_row).map(|&p| f64::from(p)).sum::<f64>() / count;
    let window_mean = (0..nh).flat_map(window_row).map(|&p| f64::from(p)).sum::<f64>() / count;

    let mut cross = 0.0;
    let mut needle_var = 0.0;
    let mut window_var = 0.0;
    for row in 0..nh {
        for (&w, &t) in window_row(row).iter().zip(needle_row(row)) {
            let dw = f64::from(w) - window_mean;
            let dt = f64::from(t) - needle_mean;
            cross += dw * dt;
            needle_var += dt * dt;
            window_var += dw * dw;
        }
    }

    let denominator = (needle_var * window_var).sqrt();
    if denominator == 0.0 {
        0.0
    } else {
        (cross / denominator) as f32
    }
}
