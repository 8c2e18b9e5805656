//! Hierarchical spatial index over the planet's tiles.
//!
//! A bounding-sphere tree built once over the sealed graph: interior nodes
//! split the tile set in half along the longest centroid axis, leaves hold a
//! handful of tiles. Ray queries walk every branch whose sphere the ray
//! touches and keep the nearest exact tile hit, so overlapping sibling
//! spheres cannot shadow a closer tile.

use glam::Vec3;

use crate::geometry::{ray_intersects_sphere, BoundingSphere, Ray};
use crate::graph::{PlanetGraph, Tile, TileId};

/// Leaves hold at most this many tiles.
const MAX_LEAF_TILES: usize = 8;

/// Node spheres get this much slack over their exact covering radius.
const SPHERE_SLACK: f32 = 1.02;

/// A tile hit by a ray, with the ray parameter at the tile's plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub tile: TileId,
    pub distance: f32,
}

enum Node {
    Interior {
        sphere: BoundingSphere,
        children: [Box<Node>; 2],
    },
    Leaf {
        sphere: BoundingSphere,
        tiles: Vec<TileId>,
    },
}

/// Bounding-sphere tree over all tiles of a sealed graph.
pub struct SpatialPartition {
    root: Node,
}

impl SpatialPartition {
    /// Build the index over every tile of the graph.
    pub fn build(graph: &PlanetGraph) -> Self {
        let mut tiles: Vec<TileId> = graph.tiles().iter().map(|t| t.id).collect();
        Self {
            root: build_node(graph, &mut tiles),
        }
    }

    /// The nearest tile the ray hits, if any. `None` is the ordinary miss
    /// outcome, not an error.
    pub fn intersect_ray(&self, graph: &PlanetGraph, ray: &Ray) -> Option<RayHit> {
        intersect_node(&self.root, graph, ray)
    }
}

fn build_node(graph: &PlanetGraph, tiles: &mut [TileId]) -> Node {
    let sphere = covering_sphere(graph, tiles);
    if tiles.len() <= MAX_LEAF_TILES {
        return Node::Leaf {
            sphere,
            tiles: tiles.to_vec(),
        };
    }

    let axis = longest_centroid_axis(graph, tiles);
    let mid = tiles.len() / 2;
    tiles.sort_unstable_by(|&a, &b| {
        let a = graph.tile(a).average_position[axis];
        let b = graph.tile(b).average_position[axis];
        a.total_cmp(&b)
    });
    let (near, far) = tiles.split_at_mut(mid);

    Node::Interior {
        sphere,
        children: [
            Box::new(build_node(graph, near)),
            Box::new(build_node(graph, far)),
        ],
    }
}

/// Sphere covering the bounding spheres of all listed tiles, with slack.
fn covering_sphere(graph: &PlanetGraph, tiles: &[TileId]) -> BoundingSphere {
    let center = tiles
        .iter()
        .map(|&t| graph.tile(t).bounding_sphere.center)
        .sum::<Vec3>()
        / tiles.len() as f32;
    let radius = tiles
        .iter()
        .map(|&t| {
            let sphere = graph.tile(t).bounding_sphere;
            center.distance(sphere.center) + sphere.radius
        })
        .fold(0.0_f32, f32::max);
    BoundingSphere {
        center,
        radius: radius * SPHERE_SLACK,
    }
}

fn longest_centroid_axis(graph: &PlanetGraph, tiles: &[TileId]) -> usize {
    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    for &tile in tiles {
        let p = graph.tile(tile).average_position;
        min = min.min(p);
        max = max.max(p);
    }
    let extent = max - min;
    if extent.x >= extent.y && extent.x >= extent.z {
        0
    } else if extent.y >= extent.z {
        1
    } else {
        2
    }
}

fn intersect_node(node: &Node, graph: &PlanetGraph, ray: &Ray) -> Option<RayHit> {
    match node {
        Node::Interior { sphere, children } => {
            if !ray_intersects_sphere(ray, sphere) {
                return None;
            }
            let mut best: Option<RayHit> = None;
            for child in children {
                if let Some(hit) = intersect_node(child, graph, ray) {
                    if best.map_or(true, |b| hit.distance < b.distance) {
                        best = Some(hit);
                    }
                }
            }
            best
        }
        Node::Leaf { sphere, tiles } => {
            if !ray_intersects_sphere(ray, sphere) {
                return None;
            }
            let mut best: Option<RayHit> = None;
            for &tile in tiles {
                if let Some(distance) = intersect_tile(graph.tile(tile), graph, ray) {
                    if best.map_or(true, |b| distance < b.distance) {
                        best = Some(RayHit { tile, distance });
                    }
                }
            }
            best
        }
    }
}

/// Exact ray/tile test. Returns the ray parameter at the tile's supporting
/// plane when the ray pierces the tile polygon from its front side.
fn intersect_tile(tile: &Tile, graph: &PlanetGraph, ray: &Ray) -> Option<f32> {
    if !ray_intersects_sphere(ray, &tile.bounding_sphere) {
        return None;
    }

    // The ray origin must be strictly in front of the tile's plane; tiles on
    // the far side of the planet face away and are never picked.
    let normal = tile.normal;
    if normal.dot(ray.origin - tile.average_position) <= 0.0 {
        return None;
    }

    let denominator = normal.dot(ray.direction);
    if denominator >= 0.0 {
        return None;
    }
    let distance = normal.dot(tile.average_position - ray.origin) / denominator;
    if distance <= 0.0 {
        return None;
    }
    let point = ray.origin + ray.direction * distance;

    // Half-plane test against each edge. Side planes pass through the
    // planet center, so corner positions double as plane spans. Relies on
    // the ring's clockwise-from-outside winding.
    let ring = tile.corners();
    for i in 0..ring.len() {
        let j = (i + 1) % ring.len();
        let side = graph
            .corner(ring[j])
            .position
            .cross(graph.corner(ring[i]).position);
        if side.dot(point) < 0.0 {
            return None;
        }
    }
    Some(distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::build_base_topology;

    fn graph() -> PlanetGraph {
        build_base_topology(1000.0).expect("base topology builds")
    }

    #[test]
    fn test_ray_down_a_tile_normal_hits_that_tile() {
        let graph = graph();
        let partition = SpatialPartition::build(&graph);
        for tile in graph.tiles() {
            let ray = Ray::new(tile.average_position + tile.normal * 500.0, -tile.normal);
            let hit = partition
                .intersect_ray(&graph, &ray)
                .unwrap_or_else(|| panic!("expected a hit on {tile}"));
            assert_eq!(hit.tile, tile.id);
            // Origin sits 500 above the supporting plane, approaching head-on.
            assert!((hit.distance - 500.0).abs() < 1e-2);
        }
    }

    #[test]
    fn test_ray_away_from_planet_misses() {
        let graph = graph();
        let partition = SpatialPartition::build(&graph);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 3000.0), Vec3::Z);
        assert!(partition.intersect_ray(&graph, &ray).is_none());
    }

    #[test]
    fn test_ray_through_planet_reports_near_side_tile() {
        let graph = graph();
        let partition = SpatialPartition::build(&graph);
        for tile in graph.tiles() {
            // Aim at the planet center: the ray exits through the far side
            // too, but only the near tile faces the origin.
            let origin = tile.average_position.normalize() * 3000.0;
            let ray = Ray::new(origin, -origin.normalize());
            let hit = partition.intersect_ray(&graph, &ray).expect("hit");
            assert_eq!(hit.tile, tile.id);
            assert!(hit.distance < 3000.0);
        }
    }

    #[test]
    fn test_hit_point_lies_inside_reported_tile() {
        let graph = graph();
        let partition = SpatialPartition::build(&graph);
        let mut random = crate::random::XorShift128::from_master(99);
        for _ in 0..50 {
            let direction = crate::geometry::random_unit_vector(&mut random);
            let ray = Ray::new(direction * 2500.0, -direction);
            let hit = partition.intersect_ray(&graph, &ray).expect("hit");
            let point = ray.origin + ray.direction * hit.distance;
            let tile = graph.tile(hit.tile);
            assert!(point.distance(tile.bounding_sphere.center) <= tile.bounding_sphere.radius + 1.0);
        }
    }
}
