use crate::error::GeometryError;
use crate::point::{ControlPointSet, Point2D, PointSide, MIN_PAIRS};

/// Relative threshold below which two points of a set count as coincident.
const COINCIDENT_TOL: f64 = 1e-16;

/// Relative triangle-area threshold below which three points count as collinear.
const COLLINEAR_TOL: f64 = 1e-8;

/// Relative threshold on the normalizing element below which the solution
/// counts as rank deficient.
const RANK_TOL: f64 = 1e-10;

/// A 3x3 planar perspective transform mapping moving-image coordinates to
/// reference-image coordinates.
///
/// The matrix is stored row-major and normalized so that the bottom-right
/// element equals one. Immutable once computed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography([[f64; 3]; 3]);

impl Homography {
    /// The identity transform.
    pub fn identity() -> Self {
        Self([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]])
    }

    /// Create a transform from a row-major 3x3 matrix.
    pub fn from_matrix(m: [[f64; 3]; 3]) -> Self {
        Self(m)
    }

    /// The row-major 3x3 matrix of the transform.
    pub fn as_matrix(&self) -> &[[f64; 3]; 3] {
        &self.0
    }

    /// Apply the transform to a point in homogeneous coordinates.
    pub fn map(&self, p: Point2D) -> Point2D {
        let m = &self.0;
        let w = m[2][0] * p.x + m[2][1] * p.y + m[2][2];
        Point2D::new(
            (m[0][0] * p.x + m[0][1] * p.y + m[0][2]) / w,
            (m[1][0] * p.x + m[1][1] * p.y + m[1][2]) / w,
        )
    }

    /// The determinant of the transform matrix.
    #[rustfmt::skip]
    pub fn determinant(&self) -> f64 {
        let m = &self.0;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1]) -
        m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0]) +
        m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// The inverse of the transform.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::SingularTransform`] if the matrix is not
    /// invertible.
    #[rustfmt::skip]
    pub fn inverse(&self) -> Result<Homography, GeometryError> {
        let det = self.determinant();
        if det.abs() < 1e-12 {
            return Err(GeometryError::SingularTransform);
        }

        let m = &self.0;
        let adj = [
            [
                m[1][1] * m[2][2] - m[1][2] * m[2][1],
                m[0][2] * m[2][1] - m[0][1] * m[2][2],
                m[0][1] * m[1][2] - m[0][2] * m[1][1],
            ],
            [
                m[1][2] * m[2][0] - m[1][0] * m[2][2],
                m[0][0] * m[2][2] - m[0][2] * m[2][0],
                m[0][2] * m[1][0] - m[0][0] * m[1][2],
            ],
            [
                m[1][0] * m[2][1] - m[1][1] * m[2][0],
                m[0][1] * m[2][0] - m[0][0] * m[2][1],
                m[0][0] * m[1][1] - m[0][1] * m[1][0],
            ],
        ];

        let inv_det = 1.0 / det;
        let mut inv = [[0.0; 3]; 3];
        for (inv_row, adj_row) in inv.iter_mut().zip(adj.iter()) {
            for (inv_v, adj_v) in inv_row.iter_mut().zip(adj_row.iter()) {
                *inv_v = adj_v * inv_det;
            }
        }

        Ok(Homography(inv))
    }
}

/// Estimate the homography that maps the moving points of a control point set
/// onto its reference points.
///
/// Uses the direct linear transform: each correspondence contributes two
/// linear equations in the eight unknowns, and the stacked 2Nx9 system is
/// solved with an SVD. With exactly four pairs the solution is exact; with
/// more pairs it is the algebraic least-squares fit. The estimate is invariant
/// to the order of the pairs.
///
/// # Errors
///
/// Fails with [`GeometryError::NotEnoughPoints`] for fewer than four pairs,
/// and with a degeneracy error (coincident points, collinear points, or a
/// rank deficient system) instead of returning a garbage matrix.
pub fn estimate_homography(points: &ControlPointSet) -> Result<Homography, GeometryError> {
    let n = points.len();
    if n < MIN_PAIRS {
        return Err(GeometryError::NotEnoughPoints {
            got: n,
            min: MIN_PAIRS,
        });
    }

    check_degenerate(&points.reference_points(), PointSide::Reference)?;
    check_degenerate(&points.moving_points(), PointSide::Moving)?;

    // stack the 2Nx9 direct linear transform system, moving -> reference
    let mut mat_a = faer::Mat::<f64>::zeros(2 * n, 9);
    for (i, pair) in points.pairs().iter().enumerate() {
        let (x, y) = (pair.moving.x, pair.moving.y);
        let (u, v) = (pair.reference.x, pair.reference.y);

        mat_a.write(2 * i, 0, x);
        mat_a.write(2 * i, 1, y);
        mat_a.write(2 * i, 2, 1.0);
        mat_a.write(2 * i, 6, -u * x);
        mat_a.write(2 * i, 7, -u * y);
        mat_a.write(2 * i, 8, -u);

        mat_a.write(2 * i + 1, 3, x);
        mat_a.write(2 * i + 1, 4, y);
        mat_a.write(2 * i + 1, 5, 1.0);
        mat_a.write(2 * i + 1, 6, -v * x);
        mat_a.write(2 * i + 1, 7, -v * y);
        mat_a.write(2 * i + 1, 8, -v);
    }

    // solve -> homography vector is the right singular vector of the smallest
    // singular value
    let svd = mat_a.svd();
    let h = svd.v().col(8);

    let mut m = [
        [h[0], h[1], h[2]],
        [h[3], h[4], h[5]],
        [h[6], h[7], h[8]],
    ];

    // normalize the bottom-right element to one
    let max_abs = m
        .iter()
        .flatten()
        .fold(0.0f64, |acc, &v| acc.max(v.abs()));
    if m[2][2].abs() < max_abs * RANK_TOL {
        return Err(GeometryError::RankDeficient);
    }
    let scale = 1.0 / m[2][2];
    for row in m.iter_mut() {
        for v in row.iter_mut() {
            *v *= scale;
        }
    }

    let homography = Homography::from_matrix(m);
    if homography.determinant().abs() < 1e-8 {
        return Err(GeometryError::RankDeficient);
    }

    Ok(homography)
}

/// Check one side of a correspondence set for coincident or collinear points.
fn check_degenerate(pts: &[Point2D], side: PointSide) -> Result<(), GeometryError> {
    let mut spread = 0.0f64;
    for i in 0..pts.len() {
        for j in (i + 1)..pts.len() {
            spread = spread.max(dist2(pts[i], pts[j]));
        }
    }

    for i in 0..pts.len() {
        for j in (i + 1)..pts.len() {
            if dist2(pts[i], pts[j]) <= spread * COINCIDENT_TOL {
                return Err(GeometryError::CoincidentPoints {
                    side,
                    first: i + 1,
                    second: j + 1,
                });
            }
        }
    }

    for i in 0..pts.len() {
        for j in (i + 1)..pts.len() {
            for k in (j + 1)..pts.len() {
                let (a, b, c) = (pts[i], pts[j], pts[k]);
                let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
                let legs = dist2(a, b).max(dist2(a, c)).max(dist2(b, c));
                if cross.abs() <= legs * COLLINEAR_TOL {
                    return Err(GeometryError::CollinearPoints {
                        side,
                        first: i + 1,
                        second: j + 1,
                        third: k + 1,
                    });
                }
            }
        }
    }

    Ok(())
}

fn dist2(a: Point2D, b: Point2D) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::ControlPointPair;
    use approx::assert_relative_eq;

    fn pairs_from(reference: &[(f64, f64)], moving: &[(f64, f64)]) -> ControlPointSet {
        ControlPointSet::from_pairs(
            reference
                .iter()
                .zip(moving.iter())
                .map(|(&(rx, ry), &(mx, my))| {
                    ControlPointPair::new(Point2D::new(rx, ry), Point2D::new(mx, my))
                })
                .collect(),
        )
    }

    fn max_reprojection_error(h: &Homography, points: &ControlPointSet) -> f64 {
        points
            .pairs()
            .iter()
            .map(|pair| {
                let mapped = h.map(pair.moving);
                dist2(mapped, pair.reference).sqrt()
            })
            .fold(0.0, f64::max)
    }

    #[test]
    fn estimate_identity() -> Result<(), GeometryError> {
        let corners = [(0.0, 0.0), (100.0, 0.0), (0.0, 100.0), (100.0, 100.0)];
        let points = pairs_from(&corners, &corners);

        let h = estimate_homography(&points)?;
        let expected = Homography::identity();

        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(
                    h.as_matrix()[i][j],
                    expected.as_matrix()[i][j],
                    epsilon = 1e-9
                );
            }
        }
        Ok(())
    }

    #[test]
    fn estimate_translation() -> Result<(), GeometryError> {
        let moving = [(0.0, 0.0), (80.0, 0.0), (0.0, 60.0), (80.0, 60.0)];
        let reference = [(5.0, -3.0), (85.0, -3.0), (5.0, 57.0), (85.0, 57.0)];
        let points = pairs_from(&reference, &moving);

        let h = estimate_homography(&points)?;
        assert_relative_eq!(h.as_matrix()[0][2], 5.0, epsilon = 1e-9);
        assert_relative_eq!(h.as_matrix()[1][2], -3.0, epsilon = 1e-9);
        assert!(max_reprojection_error(&h, &points) < 1e-6);

        Ok(())
    }

    #[test]
    fn estimate_perspective_exact() -> Result<(), GeometryError> {
        // a proper perspective transform, not an affinity
        let truth = Homography::from_matrix([
            [1.2, 0.1, 4.0],
            [-0.05, 0.9, 2.0],
            [1e-4, -2e-4, 1.0],
        ]);

        let moving = [(0.0, 0.0), (120.0, 10.0), (15.0, 90.0), (110.0, 100.0)];
        let reference: Vec<(f64, f64)> = moving
            .iter()
            .map(|&(x, y)| {
                let p = truth.map(Point2D::new(x, y));
                (p.x, p.y)
            })
            .collect();

        let points = pairs_from(&reference, &moving);
        let h = estimate_homography(&points)?;

        assert!(max_reprojection_error(&h, &points) < 1e-6);
        Ok(())
    }

    #[test]
    fn estimate_least_squares_with_noise() -> Result<(), GeometryError> {
        let truth = Homography::from_matrix([
            [1.1, 0.0, 3.0],
            [0.0, 1.1, -2.0],
            [0.0, 0.0, 1.0],
        ]);

        let moving = [
            (0.0, 0.0),
            (100.0, 0.0),
            (0.0, 100.0),
            (100.0, 100.0),
            (50.0, 50.0),
        ];
        let mut reference: Vec<(f64, f64)> = moving
            .iter()
            .map(|&(x, y)| {
                let p = truth.map(Point2D::new(x, y));
                (p.x, p.y)
            })
            .collect();

        // perturb one correspondence so the system becomes inconsistent
        reference[4].0 += 0.5;
        reference[4].1 -= 0.5;

        let points = pairs_from(&reference, &moving);
        let h = estimate_homography(&points)?;

        let err = max_reprojection_error(&h, &points);
        assert!(err > 1e-6, "noisy system should not fit exactly, err={err}");
        assert!(err < 2.0, "least-squares fit drifted too far, err={err}");

        Ok(())
    }

    #[test]
    fn estimate_order_invariant() -> Result<(), GeometryError> {
        let moving = [(0.0, 0.0), (90.0, 5.0), (10.0, 80.0), (95.0, 85.0)];
        let reference = [(2.0, 1.0), (88.0, 3.0), (12.0, 84.0), (90.0, 88.0)];

        let points = pairs_from(&reference, &moving);
        let shuffled = pairs_from(
            &[reference[2], reference[0], reference[3], reference[1]],
            &[moving[2], moving[0], moving[3], moving[1]],
        );

        let h1 = estimate_homography(&points)?;
        let h2 = estimate_homography(&shuffled)?;

        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(
                    h1.as_matrix()[i][j],
                    h2.as_matrix()[i][j],
                    epsilon = 1e-9
                );
            }
        }
        Ok(())
    }

    #[test]
    fn estimate_too_few_points() {
        let points = pairs_from(
            &[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)],
            &[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)],
        );
        assert_eq!(
            estimate_homography(&points),
            Err(GeometryError::NotEnoughPoints { got: 3, min: 4 })
        );
    }

    #[test]
    fn estimate_collinear_reference() {
        let reference = [(0.0, 0.0), (10.0, 10.0), (20.0, 20.0), (5.0, 30.0)];
        let moving = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0)];
        let points = pairs_from(&reference, &moving);

        assert_eq!(
            estimate_homography(&points),
            Err(GeometryError::CollinearPoints {
                side: PointSide::Reference,
                first: 1,
                second: 2,
                third: 3,
            })
        );
    }

    #[test]
    fn estimate_collinear_moving() {
        let reference = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0)];
        let moving = [(0.0, 5.0), (10.0, 5.0), (20.0, 5.0), (5.0, 30.0)];
        let points = pairs_from(&reference, &moving);

        assert_eq!(
            estimate_homography(&points),
            Err(GeometryError::CollinearPoints {
                side: PointSide::Moving,
                first: 1,
                second: 2,
                third: 3,
            })
        );
    }

    #[test]
    fn estimate_coincident_points() {
        let reference = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0)];
        let moving = [(3.0, 4.0), (3.0, 4.0), (0.0, 10.0), (10.0, 10.0)];
        let points = pairs_from(&reference, &moving);

        assert_eq!(
            estimate_homography(&points),
            Err(GeometryError::CoincidentPoints {
                side: PointSide::Moving,
                first: 1,
                second: 2,
            })
        );
    }

    #[test]
    fn inverse_roundtrip() -> Result<(), GeometryError> {
        let h = Homography::from_matrix([
            [1.5, 0.2, -10.0],
            [-0.1, 0.8, 5.0],
            [1e-3, 2e-3, 1.0],
        ]);
        let inv = h.inverse()?;

        let p = Point2D::new(42.0, 17.0);
        let roundtrip = inv.map(h.map(p));
        assert_relative_eq!(roundtrip.x, p.x, epsilon = 1e-9);
        assert_relative_eq!(roundtrip.y, p.y, epsilon = 1e-9);

        Ok(())
    }

    #[test]
    fn inverse_singular() {
        let h = Homography::from_matrix([
            [1.0, 2.0, 3.0],
            [2.0, 4.0, 6.0],
            [0.0, 0.0, 1.0],
        ]);
        assert_eq!(h.inverse(), Err(GeometryError::SingularTransform));
    }
}
