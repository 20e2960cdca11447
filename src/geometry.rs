//! 2D vector algebra lives in [`glam::Vec2`]; this module only adds the
//! handful of polygon helpers glam doesn't provide.

use glam::Vec2;

/// Signed area of a closed polygon via the shoelace formula. Positive for
/// counter-clockwise vertex winding.
pub fn signed_area(vertices: &[Vec2]) -> f32 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum * 0.5
}

/// Unsigned area of a closed polygon.
pub fn area(vertices: &[Vec2]) -> f32 {
    signed_area(vertices).abs()
}

/// Outward-facing normal at vertex `i`, taken as the perpendicular of the
/// segment from `prev` to `next`, normalized. Undefined (returns `Vec2::ZERO`)
/// if the segment degenerates to a point.
pub fn outward_normal(prev: Vec2, next: Vec2) -> Vec2 {
    let edge = next - prev;
    let perp = Vec2::new(edge.y, -edge.x);
    perp.try_normalize().unwrap_or(Vec2::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_square_area_is_one() {
        let square = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        assert!((area(&square) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_polygon_has_zero_area() {
        assert_eq!(area(&[Vec2::ZERO, Vec2::ZERO]), 0.0);
    }
}
