//! Dot-separated integer version comparison and script-variant selection.
//!
//! Versions are compared component-wise as integers, short-circuiting on the
//! first differing component; missing trailing components count as 0, so
//! "1.2" == "1.2.0". Non-numeric components compare as 0.

use std::cmp::Ordering;

/// Compare two dot-separated version strings.
pub fn compare(a: &str, b: &str) -> Ordering {
    let pa: Vec<u64> = a.split('.').map(|c| c.trim().parse().unwrap_or(0)).collect();
    let pb: Vec<u64> = b.split('.').map(|c| c.trim().parse().unwrap_or(0)).collect();
    let len = pa.len().max(pb.len());
    for i in 0..len {
        let ca = pa.get(i).copied().unwrap_or(0);
        let cb = pb.get(i).copied().unwrap_or(0);
        match ca.cmp(&cb) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Select the best available variant for a requested version.
///
/// The highest available version that is `<=` the requested version wins.
/// If the request predates every variant, the oldest variant is returned
/// instead, so selection never comes up empty while at least one variant
/// exists.
pub fn select<'a>(available: &'a [String], requested: &str) -> Option<&'a str> {
    let mut best: Option<&str> = None;
    for v in available {
        if compare(v, requested) != Ordering::Greater {
            match best {
                Some(b) if compare(v, b) != Ordering::Greater => {}
                _ => best = Some(v),
            }
        }
    }
    best.or_else(|| {
        available
            .iter()
            .map(String::as_str)
            .min_by(|a, b| compare(a, b))
    })
}
