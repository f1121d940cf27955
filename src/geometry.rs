use glam::Vec2;
use log::trace;
use rayon::prelude::*;

use crate::config::QuadrilateralParams;

/// Real-valued axis-aligned box, `min` inclusive and `max` inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Corners clockwise from the top-left (image coordinates, y down).
    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }

    /// Grows every side by `dx`/`dy`, then clamps to `[0, max_x] x [0, max_y]`.
    pub fn expand_clamped(&self, dx: f32, dy: f32, max_x: f32, max_y: f32) -> Bounds {
        Bounds {
            min: Vec2::new((self.min.x - dx).max(0.0), (self.min.y - dy).max(0.0)),
            max: Vec2::new((self.max.x + dx).min(max_x), (self.max.y + dy).min(max_y)),
        }
    }

    pub fn of_points(pts: &[Vec2]) -> Option<Bounds> {
        let first = *pts.first()?;
        Some(pts.iter().fold(
            Bounds {
                min: first,
                max: first,
            },
            |b, p| Bounds {
                min: b.min.min(*p),
                max: b.max.max(*p),
            },
        ))
    }
}

/// Finds a box around most of a point set, ignoring a minority of outliers.
pub trait BoundingBoxEstimator: Send + Sync {
    /// Box enclosing at least `accuracy` (0..=1) of `points`.
    fn bounding_box(&self, points: &[Vec2], accuracy: f64) -> Option<Bounds>;
}

/// Exact smallest-area box enclosing `ceil(accuracy * n)` of the points.
///
/// Every contiguous run of the x-sorted points is a candidate x-range; for
/// each the tightest y-window holding enough points is taken. O(n^3).
#[derive(Debug, Clone, Copy, Default)]
pub struct SmallestAreaBox;

impl BoundingBoxEstimator for SmallestAreaBox {
    fn bounding_box(&self, points: &[Vec2], accuracy: f64) -> Option<Bounds> {
        let n = points.len();
        if n == 0 {
            return None;
        }
        let k = ((accuracy.clamp(0.0, 1.0) * n as f64).ceil() as usize).clamp(1, n);
        let mut sorted = points.to_vec();
        sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));

        (0..=n - k)
            .into_par_iter()
            .filter_map(|i| {
                let mut ys: Vec<f32> = Vec::with_capacity(n - i);
                let mut best: Option<Bounds> = None;
                for j in i..n {
                    let y = sorted[j].y;
                    let pos = ys.partition_point(|v| *v <= y);
                    ys.insert(pos, y);
                    if ys.len() < k {
                        continue;
                    }
                    let (lo, hi) = (0..=ys.len() - k)
                        .map(|t| (ys[t], ys[t + k - 1]))
                        .min_by(|a, b| (a.1 - a.0).total_cmp(&(b.1 - b.0)))?;
                    let candidate = Bounds {
                        min: Vec2::new(sorted[i].x, lo),
                        max: Vec2::new(sorted[j].x, hi),
                    };
                    if best.is_none_or(|b| candidate.area() < b.area()) {
                        best = Some(candidate);
                    }
                }
                best.map(|b| (i, b))
            })
            .min_by(|a, b| a.1.area().total_cmp(&b.1.area()).then(a.0.cmp(&b.0)))
            .map(|(_, b)| b)
    }
}

/// Decides whether a projected template outline can be a real detection.
pub trait QuadrilateralCheck: Send + Sync {
    /// `corners` are patch-local and ordered around the outline.
    fn is_plausible(&self, corners: &[Vec2; 4], patch_width: i32, patch_height: i32) -> bool;
}

/// Convex, non-self-intersecting, not too thin and sized in proportion to
/// the patch.
#[derive(Debug, Clone, Default)]
pub struct QuadrilateralValidator {
    pub params: QuadrilateralParams,
}

impl QuadrilateralValidator {
    pub fn new(params: QuadrilateralParams) -> Self {
        Self { params }
    }
}

/// Signed area by the shoelace formula, positive for clockwise corners in
/// image coordinates.
pub fn signed_area(corners: &[Vec2; 4]) -> f64 {
    (0..4)
        .map(|i| {
            let (a, b) = (corners[i], corners[(i + 1) % 4]);
            a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64
        })
        .sum::<f64>()
        / 2.0
}

impl QuadrilateralCheck for QuadrilateralValidator {
    fn is_plausible(&self, corners: &[Vec2; 4], patch_width: i32, patch_height: i32) -> bool {
        let p = &self.params;
        if corners.iter().any(|c| !c.is_finite()) {
            trace!("quad rejected: non-finite corner");
            return false;
        }

        // Same turn direction at every corner: convex and simple.
        let turns: Vec<f64> = (0..4)
            .map(|i| {
                let e0 = corners[(i + 1) % 4] - corners[i];
                let e1 = corners[(i + 2) % 4] - corners[(i + 1) % 4];
                e0.x as f64 * e1.y as f64 - e0.y as f64 * e1.x as f64
            })
            .collect();
        if !(turns.iter().all(|t| *t > 0.0) || turns.iter().all(|t| *t < 0.0)) {
            trace!("quad rejected: not convex {:?}", turns);
            return false;
        }

        let sides: Vec<f64> = (0..4)
            .map(|i| corners[i].distance(corners[(i + 1) % 4]) as f64)
            .collect();
        if sides.iter().any(|s| *s < p.min_side) {
            trace!("quad rejected: side shorter than {}", p.min_side);
            return false;
        }
        for (a, b) in [(sides[0], sides[2]), (sides[1], sides[3])] {
            if a.max(b) / a.min(b) > p.max_side_ratio {
                trace!("quad rejected: opposite sides {:.1} and {:.1}", a, b);
                return false;
            }
        }

        let patch_area = patch_width.max(0) as f64 * patch_height.max(0) as f64;
        let area = signed_area(corners).abs();
        if area < p.min_area_fraction * patch_area || area > p.max_area_fraction * patch_area {
            trace!("quad rejected: area {:.1} against patch area {}", area, patch_area);
            return false;
        }
        true
    }
}
