//! Broad phase: sweep-and-prune over axis-aligned bounds

use kinetic_core::Aabb;

/// Candidate pair of body indices, lower index first
pub type CandidatePair = (usize, usize);

#[derive(Clone, Copy)]
struct Endpoint {
    value: f32,
    index: usize,
    is_min: bool,
}

/// Pairs of indices whose bounds overlap, sorted
///
/// Bounds that merely touch count as overlapping.
pub fn sweep_and_prune(bounds: &[Aabb]) -> Vec<CandidatePair> {
    if bounds.len() < 2 {
        return Vec::new();
    }

    let mut endpoints = Vec::with_capacity(bounds.len() * 2);
    for (index, aabb) in bounds.iter().enumerate() {
        endpoints.push(Endpoint {
            value: aabb.min.x,
            index,
            is_min: true,
        });
        endpoints.push(Endpoint {
            value: aabb.max.x,
            index,
            is_min: false,
        });
    }
    // Openings sort before closings at equal x
    endpoints.sort_by(|a, b| a.value.total_cmp(&b.value).then(b.is_min.cmp(&a.is_min)));

    let mut pairs = Vec::new();
    let mut active: Vec<usize> = Vec::new();
    for endpoint in endpoints {
        if endpoint.is_min {
            for &other in &active {
                if bounds[endpoint.index].overlaps(&bounds[other]) {
                    pairs.push((endpoint.index.min(other), endpoint.index.max(other)));
                }
            }
            active.push(endpoint.index);
        } else {
            active.retain(|&i| i != endpoint.index);
        }
    }

    pairs.sort_unstable();
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinetic_core::Vec2;

    fn square(x: f32, y: f32) -> Aabb {
        Aabb::from_center_half_extents(Vec2::new(x, y), Vec2::ONE)
    }

    #[test]
    fn test_no_overlap() {
        assert!(sweep_and_prune(&[square(0.0, 0.0), square(5.0, 0.0)]).is_empty());
    }

    #[test]
    fn test_overlap_on_x_only_is_rejected() {
        assert!(sweep_and_prune(&[square(0.0, 0.0), square(0.5, 10.0)]).is_empty());
    }

    #[test]
    fn test_touching_and_overlapping() {
        let pairs = sweep_and_prune(&[
            square(4.0, 0.0),
            square(0.0, 0.0),
            square(1.0, 0.5),
            square(2.0, 0.0),
        ]);
        assert_eq!(pairs, vec![(0, 3), (1, 2), (1, 3), (2, 3)]);
    }
}
