//! Frame size degradation to keep the aggregate decode load within a macroblock budget.
//!
//! The algorithm is iterative rather than globally optimal. On every pass the requests sharing
//! the currently largest frame size are lowered together to the next smaller tier of the ladder,
//! until the sum of `frame size × live slots` fits the limit or there is no smaller tier left.
//! Requests below the maximum are left alone until they become the maximum.
//!
//! Degradation always starts from the requested sizes. Nothing is remembered between runs, so
//! when load goes away, previously degraded requests get their full size back.

/// Frame sizes degradation steps through, largest first (1080p, 720p, 360p, 180p, 90p).
pub const TIER_LADDER: [u32; 5] = [8192, 3600, 920, 240, 60];

/// The load one video request puts on the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Demand {
    /// Requested frame size ceiling in macroblocks.
    pub max_fs: u32,
    /// Number of the request's slots with a live source.
    ///
    /// Slots without a decodable source cost nothing, and a request without live
    /// slots is never degraded.
    pub live_slots: u64,
}

impl Demand {
    fn cost(&self, max_fs: u32) -> u64 {
        max_fs as u64 * self.live_slots
    }
}

/// Work out the effective frame size for each demand, in the same order.
///
/// `ladder` must be sorted largest first. The result never exceeds the requested size. If
/// even the smallest tier doesn't fit, the best effort is returned and the limit stays exceeded.
pub fn degrade(demands: &[Demand], ladder: &[u32], max_macroblocks: u64) -> Vec<u32> {
    let mut effective: Vec<u32> = demands.iter().map(|d| d.max_fs).collect();
    let mut ceiling = None;

    loop {
        let total: u64 = demands
            .iter()
            .zip(&effective)
            .map(|(d, fs)| d.cost(*fs))
            .sum();

        if total <= max_macroblocks {
            break;
        }

        let current_max = demands
            .iter()
            .zip(&effective)
            .filter(|(d, _)| d.live_slots > 0)
            .map(|(_, fs)| *fs)
            .max();

        let Some(current_max) = current_max else {
            break;
        };

        let Some(next) = ladder.iter().copied().find(|tier| *tier < current_max) else {
            warn!(
                "Even with frame size limited to {} the requests need {} macroblocks \
                (limit {}), consider reducing the number of requests",
                current_max, total, max_macroblocks
            );
            break;
        };

        for (d, fs) in demands.iter().zip(effective.iter_mut()) {
            if d.live_slots > 0 && *fs == current_max {
                *fs = next;
            }
        }

        ceiling = Some(next);
    }

    if let Some(ceiling) = ceiling {
        warn!(
            "Too many streams with high frame size, frame size limited to {}",
            ceiling
        );
    }

    effective
}
