//! Pairwise overlap between obstacle clearance volumes.

use crate::obstacle::Obstacle;
use crate::spatial::GeoFrame;

/// Whether the avoid areas of `a` and `b` overlap at `alt`.
///
/// Tangent areas do not count as overlapping. Symmetric in `a` and `b`.
pub fn does_overlap(frame: &GeoFrame, a: &Obstacle, b: &Obstacle, alt: f64) -> bool {
    let radius_a = a.avoid_radius(alt);
    let radius_b = b.avoid_radius(alt);

    if radius_a <= 0.0 || radius_b <= 0.0 {
        return false;
    }

    // Measure from the same end regardless of argument order so the result
    // does not depend on which latitude the projection is anchored at.
    let (first, second) = order_by_position(a, b);
    let dist_xy = frame.horizontal_distance(&first.position(), &second.position());

    radius_a + radius_b > dist_xy
}

/// Indices of every obstacle transitively overlapping `obstacles[seed]` at
/// `alt`, including the seed. Empty when the seed has no avoid area at `alt`.
pub fn overlap_cluster(frame: &GeoFrame, obstacles: &[Obstacle], seed: usize, alt: f64) -> Vec<usize> {
    let Some(seed_obstacle) = obstacles.get(seed) else {
        return Vec::new();
    };
    if seed_obstacle.avoid_radius(alt) <= 0.0 {
        return Vec::new();
    }

    let mut cluster = vec![seed];
    let mut in_cluster = vec![false; obstacles.len()];
    in_cluster[seed] = true;

    let mut cursor = 0;
    while cursor < cluster.len() {
        let current = &obstacles[cluster[cursor]];
        for (idx, candidate) in obstacles.iter().enumerate() {
            if in_cluster[idx] {
                continue;
            }
            if does_overlap(frame, current, candidate, alt) {
                in_cluster[idx] = true;
                cluster.push(idx);
            }
        }
        cursor += 1;
    }

    cluster
}

fn order_by_position<'a>(a: &'a Obstacle, b: &'a Obstacle) -> (&'a Obstacle, &'a Obstacle) {
    let pa = a.position();
    let pb = b.position();
    if (pa.lat, pa.lon) <= (pb.lat, pb.lon) {
        (a, b)
    } else {
        (b, a)
    }
}
