//! Small geometric primitives shared by the graph and the spatial index.

use glam::Vec3;

use crate::random::XorShift128;

/// A ray with a normalized direction.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray, normalizing the direction.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }
}

/// A bounding sphere used for fast rejection tests.
#[derive(Clone, Copy, Debug)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

/// Whether the ray's closest approach to the sphere center is within the
/// sphere radius. Coarse by design: the line through the ray is tested, so
/// geometry behind the origin is not culled here.
pub fn ray_intersects_sphere(ray: &Ray, sphere: &BoundingSphere) -> bool {
    let to_center = sphere.center - ray.origin;
    let projected = to_center.project_onto(ray.direction);
    to_center.distance(projected) <= sphere.radius
}

/// Uniformly distributed point on the unit sphere.
pub fn random_unit_vector(random: &mut XorShift128) -> Vec3 {
    let theta = random.real(0.0, std::f64::consts::TAU);
    let phi = random.real_inclusive(-1.0, 1.0).acos();
    let sin_phi = phi.sin();
    Vec3::new(
        (theta.cos() * sin_phi) as f32,
        (theta.sin() * sin_phi) as f32,
        phi.cos() as f32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_hits_sphere_dead_center() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let sphere = BoundingSphere {
            center: Vec3::ZERO,
            radius: 1.0,
        };
        assert!(ray_intersects_sphere(&ray, &sphere));
    }

    #[test]
    fn test_ray_grazes_and_misses_sphere() {
        let sphere = BoundingSphere {
            center: Vec3::ZERO,
            radius: 1.0,
        };
        let graze = Ray::new(Vec3::new(1.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(ray_intersects_sphere(&graze, &sphere));

        let miss = Ray::new(Vec3::new(1.5, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(!ray_intersects_sphere(&miss, &sphere));
    }

    #[test]
    fn test_random_unit_vector_has_unit_length() {
        let mut random = XorShift128::from_master(5);
        for _ in 0..100 {
            let v = random_unit_vector(&mut random);
            assert!((v.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_random_unit_vector_covers_all_octants() {
        let mut random = XorShift128::from_master(5);
        let mut octants = [false; 8];
        for _ in 0..500 {
            let v = random_unit_vector(&mut random);
            let index = (v.x > 0.0) as usize | ((v.y > 0.0) as usize) << 1 | ((v.z > 0.0) as usize) << 2;
            octants[index] = true;
        }
        assert!(octants.iter().all(|&hit| hit));
    }
}
