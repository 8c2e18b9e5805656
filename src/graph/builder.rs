//! Construction phase of the planet graph.
//!
//! Every entity is allocated with pre-declared adjacency degrees; link calls
//! fill slots and never resize. Linking past a declared degree is a
//! construction bug and fails with [`GraphError::ArityViolation`]. All link
//! methods install both directions of a relation, which is what keeps the
//! bidirectional-reference invariant true by construction; `seal()` verifies
//! it anyway before handing out an immutable [`PlanetGraph`].

use glam::Vec3;

use super::{Border, BorderId, Corner, CornerId, GraphError, PlanetGraph, Tile, TileId};
use crate::geometry::BoundingSphere;

/// Every border joins exactly two corners and separates exactly two tiles.
const BORDER_ENDPOINTS: usize = 2;

struct PendingCorner {
    position: Vec3,
    corner_slots: usize,
    border_slots: usize,
    tile_slots: usize,
    corners: Vec<CornerId>,
    borders: Vec<BorderId>,
    tiles: Vec<TileId>,
}

struct PendingBorder {
    border_slots: usize,
    corners: Vec<CornerId>,
    tiles: Vec<TileId>,
    borders: Vec<BorderId>,
}

struct PendingTile {
    position: Vec3,
    edge_count: usize,
    corners: Vec<CornerId>,
    borders: Vec<BorderId>,
    tiles: Vec<TileId>,
}

/// Builder for a [`PlanetGraph`].
pub struct GraphBuilder {
    radius: f32,
    corners: Vec<PendingCorner>,
    borders: Vec<PendingBorder>,
    tiles: Vec<PendingTile>,
}

impl GraphBuilder {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            corners: Vec::new(),
            borders: Vec::new(),
            tiles: Vec::new(),
        }
    }

    /// Allocate a corner with pre-sized adjacency slots (degree 2 or 3).
    pub fn add_corner(
        &mut self,
        position: Vec3,
        corner_count: usize,
        border_count: usize,
        tile_count: usize,
    ) -> CornerId {
        let id = CornerId(self.corners.len() as u32);
        self.corners.push(PendingCorner {
            position,
            corner_slots: corner_count,
            border_slots: border_count,
            tile_slots: tile_count,
            corners: Vec::with_capacity(corner_count),
            borders: Vec::with_capacity(border_count),
            tiles: Vec::with_capacity(tile_count),
        });
        id
    }

    /// Allocate a border. Corner and tile slots are always two; only the
    /// adjacent-border degree varies.
    pub fn add_border(&mut self, border_count: usize) -> BorderId {
        let id = BorderId(self.borders.len() as u32);
        self.borders.push(PendingBorder {
            border_slots: border_count,
            corners: Vec::with_capacity(BORDER_ENDPOINTS),
            tiles: Vec::with_capacity(BORDER_ENDPOINTS),
            borders: Vec::with_capacity(border_count),
        });
        id
    }

    /// Allocate a tile with `edge_count` edges. Corner, border and neighbor
    /// counts all equal the edge count (ring closure by declaration).
    pub fn add_tile(&mut self, position: Vec3, edge_count: usize) -> TileId {
        let id = TileId(self.tiles.len() as u32);
        self.tiles.push(PendingTile {
            position,
            edge_count,
            corners: Vec::with_capacity(edge_count),
            borders: Vec::with_capacity(edge_count),
            tiles: Vec::with_capacity(edge_count),
        });
        id
    }

    /// Move a corner. Distortion and relaxation passes run before sealing.
    pub fn set_corner_position(&mut self, corner: CornerId, position: Vec3) {
        self.corners[corner.0 as usize].position = position;
    }

    pub fn corner_position(&self, corner: CornerId) -> Vec3 {
        self.corners[corner.0 as usize].position
    }

    /// Record two corners as adjacent (both directions).
    pub fn connect_corners(&mut self, a: CornerId, b: CornerId) -> Result<(), GraphError> {
        self.corner_link(a, b)?;
        self.corner_link(b, a)
    }

    /// Attach a corner as an endpoint of a border (and the border to the
    /// corner's border list).
    pub fn link_border_corner(&mut self, border: BorderId, corner: CornerId) -> Result<(), GraphError> {
        let slot = &mut self.borders[border.0 as usize];
        push_slot(&mut slot.corners, BORDER_ENDPOINTS, "border", border.0, corner)?;
        let slot = &mut self.corners[corner.0 as usize];
        push_slot(&mut slot.borders, slot.border_slots, "corner", corner.0, border)
    }

    /// Attach a tile to one side of a border (and the border to the tile's
    /// border set).
    pub fn link_border_tile(&mut self, border: BorderId, tile: TileId) -> Result<(), GraphError> {
        let slot = &mut self.borders[border.0 as usize];
        push_slot(&mut slot.tiles, BORDER_ENDPOINTS, "border", border.0, tile)?;
        let slot = &mut self.tiles[tile.0 as usize];
        push_slot(&mut slot.borders, slot.edge_count, "tile", tile.0, border)
    }

    /// Record two borders as adjacent (both directions).
    pub fn connect_borders(&mut self, a: BorderId, b: BorderId) -> Result<(), GraphError> {
        let slot = &mut self.borders[a.0 as usize];
        push_slot(&mut slot.borders, slot.border_slots, "border", a.0, b)?;
        let slot = &mut self.borders[b.0 as usize];
        push_slot(&mut slot.borders, slot.border_slots, "border", b.0, a)
    }

    /// Append a corner to a tile's ring (and the tile to the corner's tile
    /// list). Ring order is the caller's responsibility: corners must be
    /// appended clockwise as seen from outside the sphere.
    pub fn link_tile_corner(&mut self, tile: TileId, corner: CornerId) -> Result<(), GraphError> {
        let slot = &mut self.tiles[tile.0 as usize];
        push_slot(&mut slot.corners, slot.edge_count, "tile", tile.0, corner)?;
        let slot = &mut self.corners[corner.0 as usize];
        push_slot(&mut slot.tiles, slot.tile_slots, "corner", corner.0, tile)
    }

    /// Record two tiles as neighbors (both directions).
    pub fn connect_tiles(&mut self, a: TileId, b: TileId) -> Result<(), GraphError> {
        let slot = &mut self.tiles[a.0 as usize];
        push_slot(&mut slot.tiles, slot.edge_count, "tile", a.0, b)?;
        let slot = &mut self.tiles[b.0 as usize];
        push_slot(&mut slot.tiles, slot.edge_count, "tile", b.0, a)
    }

    fn corner_link(&mut self, from: CornerId, to: CornerId) -> Result<(), GraphError> {
        let slot = &mut self.corners[from.0 as usize];
        push_slot(&mut slot.corners, slot.corner_slots, "corner", from.0, to)
    }

    /// Verify every declared slot is filled and every reference has its
    /// back-reference, then freeze the graph and compute per-tile derived
    /// data (average position, outward normal, bounding sphere).
    pub fn seal(self) -> Result<PlanetGraph, GraphError> {
        self.verify_slots_filled()?;
        self.verify_symmetry()?;

        let corners: Vec<Corner> = self
            .corners
            .iter()
            .enumerate()
            .map(|(i, pending)| Corner {
                id: CornerId(i as u32),
                position: pending.position,
                corners: pending.corners.clone(),
                borders: pending.borders.clone(),
                tiles: pending.tiles.clone(),
            })
            .collect();

        let borders: Vec<Border> = self
            .borders
            .iter()
            .enumerate()
            .map(|(i, pending)| Border {
                id: BorderId(i as u32),
                corners: [pending.corners[0], pending.corners[1]],
                tiles: [pending.tiles[0], pending.tiles[1]],
                borders: pending.borders.clone(),
            })
            .collect();

        let tiles: Vec<Tile> = self
            .tiles
            .iter()
            .enumerate()
            .map(|(i, pending)| {
                let ring: Vec<Vec3> = pending
                    .corners
                    .iter()
                    .map(|&c| corners[c.0 as usize].position)
                    .collect();
                let average_position =
                    ring.iter().copied().sum::<Vec3>() / ring.len() as f32;
                let normal = average_position.normalize_or_zero();
                let radius = ring
                    .iter()
                    .map(|p| p.distance(average_position))
                    .fold(0.0_f32, f32::max);
                Tile {
                    id: TileId(i as u32),
                    position: pending.position,
                    average_position,
                    normal,
                    bounding_sphere: BoundingSphere {
                        center: average_position,
                        radius,
                    },
                    elevation: 0.0,
                    temperature: 0.0,
                    moisture: 0.0,
                    biome: None,
                    plate: None,
                    corners: pending.corners.clone(),
                    borders: pending.borders.clone(),
                    tiles: pending.tiles.clone(),
                }
            })
            .collect();

        Ok(PlanetGraph {
            radius: self.radius,
            plates: Vec::new(),
            corners,
            borders,
            tiles,
        })
    }

    fn verify_slots_filled(&self) -> Result<(), GraphError> {
        for (i, corner) in self.corners.iter().enumerate() {
            check_full(&corner.corners, corner.corner_slots, "corner", i as u32)?;
            check_full(&corner.borders, corner.border_slots, "corner", i as u32)?;
            check_full(&corner.tiles, corner.tile_slots, "corner", i as u32)?;
        }
        for (i, border) in self.borders.iter().enumerate() {
            check_full(&border.corners, BORDER_ENDPOINTS, "border", i as u32)?;
            check_full(&border.tiles, BORDER_ENDPOINTS, "border", i as u32)?;
            check_full(&border.borders, border.border_slots, "border", i as u32)?;
        }
        for (i, tile) in self.tiles.iter().enumerate() {
            check_full(&tile.corners, tile.edge_count, "tile", i as u32)?;
            check_full(&tile.borders, tile.edge_count, "tile", i as u32)?;
            check_full(&tile.tiles, tile.edge_count, "tile", i as u32)?;
        }
        Ok(())
    }

    fn verify_symmetry(&self) -> Result<(), GraphError> {
        for (i, border) in self.borders.iter().enumerate() {
            for corner in &border.corners {
                if !self.corners[corner.0 as usize].borders.contains(&BorderId(i as u32)) {
                    return Err(asymmetry("border", i as u32, "corner", corner.0));
                }
            }
            for tile in &border.tiles {
                if !self.tiles[tile.0 as usize].borders.contains(&BorderId(i as u32)) {
                    return Err(asymmetry("border", i as u32, "tile", tile.0));
                }
            }
        }
        for (i, corner) in self.corners.iter().enumerate() {
            for other in &corner.corners {
                if !self.corners[other.0 as usize].corners.contains(&CornerId(i as u32)) {
                    return Err(asymmetry("corner", i as u32, "corner", other.0));
                }
            }
            for tile in &corner.tiles {
                if !self.tiles[tile.0 as usize].corners.contains(&CornerId(i as u32)) {
                    return Err(asymmetry("corner", i as u32, "tile", tile.0));
                }
            }
        }
        for (i, tile) in self.tiles.iter().enumerate() {
            for other in &tile.tiles {
                if !self.tiles[other.0 as usize].tiles.contains(&TileId(i as u32)) {
                    return Err(asymmetry("tile", i as u32, "tile", other.0));
                }
            }
        }
        Ok(())
    }
}

fn push_slot<T>(
    list: &mut Vec<T>,
    declared: usize,
    entity: &'static str,
    id: u32,
    value: T,
) -> Result<(), GraphError> {
    if list.len() >= declared {
        return Err(GraphError::ArityViolation {
            entity,
            id,
            declared,
            linked: list.len() + 1,
        });
    }
    list.push(value);
    Ok(())
}

fn check_full<T>(list: &[T], declared: usize, entity: &'static str, id: u32) -> Result<(), GraphError> {
    if list.len() != declared {
        return Err(GraphError::ArityViolation {
            entity,
            id,
            declared,
            linked: list.len(),
        });
    }
    Ok(())
}

fn asymmetry(from_entity: &'static str, from: u32, to_entity: &'static str, to: u32) -> GraphError {
    GraphError::AsymmetricReference {
        from_entity,
        from,
        to_entity,
        to,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlinking_a_corner_fails() {
        let mut builder = GraphBuilder::new(1.0);
        let a = builder.add_corner(Vec3::X, 1, 0, 0);
        let b = builder.add_corner(Vec3::Y, 1, 0, 0);
        let c = builder.add_corner(Vec3::Z, 1, 0, 0);

        builder.connect_corners(a, b).unwrap();
        let result = builder.connect_corners(a, c);
        assert!(matches!(
            result,
            Err(GraphError::ArityViolation {
                entity: "corner",
                declared: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_border_accepts_exactly_two_corners() {
        let mut builder = GraphBuilder::new(1.0);
        let border = builder.add_border(0);
        let corners: Vec<_> = (0..3)
            .map(|i| builder.add_corner(Vec3::splat(i as f32), 0, 2, 0))
            .collect();

        builder.link_border_corner(border, corners[0]).unwrap();
        builder.link_border_corner(border, corners[1]).unwrap();
        assert!(matches!(
            builder.link_border_corner(border, corners[2]),
            Err(GraphError::ArityViolation { entity: "border", .. })
        ));
    }

    #[test]
    fn test_sealing_with_unfilled_slots_fails() {
        let mut builder = GraphBuilder::new(1.0);
        builder.add_corner(Vec3::X, 3, 3, 3);
        assert!(matches!(
            builder.seal(),
            Err(GraphError::ArityViolation {
                entity: "corner",
                declared: 3,
                linked: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_seal_computes_tile_derived_data() {
        let graph = crate::topology::build_base_topology(10.0).unwrap();
        for tile in graph.tiles() {
            assert!((tile.normal.length() - 1.0).abs() < 1e-5);
            assert!(tile.bounding_sphere.radius > 0.0);
            // Every ring corner is inside the bounding sphere.
            for &corner in tile.corners() {
                let distance = graph.corner(corner).position.distance(tile.bounding_sphere.center);
                assert!(distance <= tile.bounding_sphere.radius + 1e-4);
            }
        }
    }
}
