//! Base planet topology: the dodecahedral dual of an icosahedron.
//!
//! Twelve pentagonal tiles (one per icosahedron vertex), twenty degree-3
//! corners (one per face) and thirty borders (one per edge). Subdivision and
//! relaxation build on the same [`GraphBuilder`] contract but live outside
//! this crate; the base mesh is enough to exercise every graph and spatial
//! query, and it is what the generation pipeline starts from.

use glam::Vec3;

use crate::graph::{BorderId, CornerId, GraphBuilder, GraphError, PlanetGraph, TileId};

const PHI: f32 = 1.618_034;

/// Vertices of an icosahedron, unnormalized.
fn icosahedron_vertices() -> [Vec3; 12] {
    [
        Vec3::new(-1.0, PHI, 0.0),
        Vec3::new(1.0, PHI, 0.0),
        Vec3::new(-1.0, -PHI, 0.0),
        Vec3::new(1.0, -PHI, 0.0),
        Vec3::new(0.0, -1.0, PHI),
        Vec3::new(0.0, 1.0, PHI),
        Vec3::new(0.0, -1.0, -PHI),
        Vec3::new(0.0, 1.0, -PHI),
        Vec3::new(PHI, 0.0, -1.0),
        Vec3::new(PHI, 0.0, 1.0),
        Vec3::new(-PHI, 0.0, -1.0),
        Vec3::new(-PHI, 0.0, 1.0),
    ]
}

/// Faces of the icosahedron as vertex triples. Five faces meet at every
/// vertex; every edge is shared by exactly two faces.
fn icosahedron_faces() -> [[usize; 3]; 20] {
    [
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ]
}

/// Build the sealed base topology on a sphere of the given radius.
pub fn build_base_topology(radius: f32) -> Result<PlanetGraph, GraphError> {
    let vertices = icosahedron_vertices();
    let faces = icosahedron_faces();

    let mut builder = GraphBuilder::new(radius);

    let tiles: Vec<TileId> = vertices
        .iter()
        .map(|v| builder.add_tile(v.normalize() * radius, 5))
        .collect();

    let corners: Vec<CornerId> = faces
        .iter()
        .map(|face| {
            let centroid = (vertices[face[0]] + vertices[face[1]] + vertices[face[2]]) / 3.0;
            builder.add_corner(centroid.normalize() * radius, 3, 3, 3)
        })
        .collect();

    // One border per icosahedron edge. A Vec keyed on the sorted vertex
    // pair keeps iteration order deterministic.
    let mut edges: Vec<((usize, usize), Vec<usize>)> = Vec::with_capacity(30);
    for (face_index, face) in faces.iter().enumerate() {
        for k in 0..3 {
            let a = face[k];
            let b = face[(k + 1) % 3];
            let key = (a.min(b), a.max(b));
            match edges.iter_mut().find(|(existing, _)| *existing == key) {
                Some((_, shared)) => shared.push(face_index),
                None => edges.push((key, vec![face_index])),
            }
        }
    }

    let mut corner_borders: Vec<Vec<BorderId>> = vec![Vec::new(); corners.len()];
    for ((va, vb), shared_faces) in &edges {
        // Each border touches four others, two through each endpoint corner.
        let border = builder.add_border(4);
        for &face in shared_faces {
            builder.link_border_corner(border, corners[face])?;
            corner_borders[face].push(border);
        }
        builder.link_border_tile(border, tiles[*va])?;
        builder.link_border_tile(border, tiles[*vb])?;
        builder.connect_tiles(tiles[*va], tiles[*vb])?;
        if let [fa, fb] = shared_faces[..] {
            builder.connect_corners(corners[fa], corners[fb])?;
        }
    }

    for incident in &corner_borders {
        for i in 0..incident.len() {
            for j in (i + 1)..incident.len() {
                builder.connect_borders(incident[i], incident[j])?;
            }
        }
    }

    let mut vertex_faces: Vec<Vec<usize>> = vec![Vec::new(); vertices.len()];
    for (face_index, face) in faces.iter().enumerate() {
        for &v in face {
            vertex_faces[v].push(face_index);
        }
    }

    for (v, &tile) in tiles.iter().enumerate() {
        let ring = corner_ring(&faces, &vertex_faces[v]);
        for &face in &normalize_winding(ring, &corners, &builder, vertices[v]) {
            builder.link_tile_corner(tile, corners[face])?;
        }
    }

    builder.seal()
}

/// Order a vertex's incident faces into a ring: consecutive faces share an
/// edge through the vertex.
fn corner_ring(faces: &[[usize; 3]; 20], incident: &[usize]) -> Vec<usize> {
    let mut ring = vec![incident[0]];
    while ring.len() < incident.len() {
        let current = ring[ring.len() - 1];
        let next = incident.iter().copied().find(|&candidate| {
            !ring.contains(&candidate) && shares_edge(faces, current, candidate)
        });
        match next {
            Some(face) => ring.push(face),
            // Unreachable for well-formed face data; seal() reports the
            // short ring as an arity violation.
            None => break,
        }
    }
    ring
}

fn shares_edge(faces: &[[usize; 3]; 20], a: usize, b: usize) -> bool {
    faces[a].iter().filter(|v| faces[b].contains(v)).count() == 2
}

/// Reverse the ring if it winds counterclockwise as seen from outside the
/// sphere. Picking geometry requires clockwise rings.
fn normalize_winding(
    mut ring: Vec<usize>,
    corners: &[CornerId],
    builder: &GraphBuilder,
    outward: Vec3,
) -> Vec<usize> {
    let positions: Vec<Vec3> = ring
        .iter()
        .map(|&face| builder.corner_position(corners[face]))
        .collect();
    let mut winding = Vec3::ZERO;
    for i in 0..positions.len() {
        winding += positions[i].cross(positions[(i + 1) % positions.len()]);
    }
    if winding.dot(outward) > 0.0 {
        ring.reverse();
    }
    ring
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> PlanetGraph {
        build_base_topology(1000.0).expect("base topology builds")
    }

    #[test]
    fn test_entity_counts_match_the_dodecahedron() {
        let graph = graph();
        assert_eq!(graph.tiles().len(), 12);
        assert_eq!(graph.borders().len(), 30);
        assert_eq!(graph.corners().len(), 20);
    }

    #[test]
    fn test_every_tile_is_a_pentagon() {
        let graph = graph();
        for tile in graph.tiles() {
            assert_eq!(tile.edge_count(), 5);
            assert_eq!(tile.corners().len(), 5);
            assert_eq!(tile.borders().len(), 5);
            assert_eq!(tile.tiles().len(), 5);
        }
    }

    #[test]
    fn test_every_corner_has_degree_three() {
        let graph = graph();
        for corner in graph.corners() {
            assert_eq!(corner.corners().len(), 3);
            assert_eq!(corner.borders().len(), 3);
            assert_eq!(corner.tiles().len(), 3);
        }
    }

    #[test]
    fn test_all_positions_lie_on_the_sphere() {
        let graph = graph();
        for corner in graph.corners() {
            assert!((corner.position.length() - 1000.0).abs() < 1e-2);
        }
        for tile in graph.tiles() {
            assert!((tile.position.length() - 1000.0).abs() < 1e-2);
        }
    }

    #[test]
    fn test_consecutive_ring_corners_are_adjacent() {
        let graph = graph();
        for tile in graph.tiles() {
            let ring = tile.corners();
            for i in 0..ring.len() {
                let a = graph.corner(ring[i]);
                let b = ring[(i + 1) % ring.len()];
                assert!(a.corners().contains(&b), "ring gap in {tile}");
            }
        }
    }

    #[test]
    fn test_tile_rings_wind_clockwise_from_outside() {
        let graph = graph();
        for tile in graph.tiles() {
            let ring = tile.corners();
            let mut winding = Vec3::ZERO;
            for i in 0..ring.len() {
                let a = graph.corner(ring[i]).position;
                let b = graph.corner(ring[(i + 1) % ring.len()]).position;
                winding += a.cross(b);
            }
            assert!(winding.dot(tile.position) < 0.0, "{tile} winds the wrong way");
        }
    }

    #[test]
    fn test_border_endpoints_are_distinct() {
        let graph = graph();
        for border in graph.borders() {
            let [ca, cb] = border.corners();
            assert_ne!(ca, cb);
            let [ta, tb] = border.tiles();
            assert_ne!(ta, tb);
        }
    }
}
