//! Planar mesh graph of the planet surface.
//!
//! The surface is a polygonal mesh stored as three entity arenas: `Corner`
//! (vertex), `Border` (edge joining two corners and separating two tiles) and
//! `Tile` (polygonal cell). Entities reference each other by id, never by
//! pointer, so the mutual corner/border/tile cycles carry no ownership.
//!
//! Construction happens through [`GraphBuilder`], which pre-sizes every
//! adjacency list and rejects overlinking. `seal()` freezes the adjacency
//! structure; relation queries are only available on the sealed
//! [`PlanetGraph`].

mod builder;

pub use builder::GraphBuilder;

use glam::Vec3;
use thiserror::Error;

use crate::geometry::BoundingSphere;
use crate::plates::Plate;

/// Errors raised by graph construction and relation queries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// An adjacency list was linked past (or sealed short of) its declared
    /// degree. Construction-time bug; not recoverable.
    #[error("{entity} {id}: {linked} links for {declared} declared adjacency slots")]
    ArityViolation {
        entity: &'static str,
        id: u32,
        declared: usize,
        linked: usize,
    },
    /// A relation query was given an entity that is not adjacent to the
    /// receiver. Recoverable; callers probing ambiguous adjacency handle it
    /// locally.
    #[error("{entity} {given} is not adjacent to border {border}")]
    InvalidArgument {
        entity: &'static str,
        given: u32,
        border: u32,
    },
    /// One entity references another without the matching back-reference.
    /// Detected at seal time; construction-time bug.
    #[error("{from_entity} {from} references {to_entity} {to}, but not vice versa")]
    AsymmetricReference {
        from_entity: &'static str,
        from: u32,
        to_entity: &'static str,
        to: u32,
    },
}

/// Identifier of a [`Corner`] in the graph arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CornerId(pub u32);

/// Identifier of a [`Border`] in the graph arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BorderId(pub u32);

/// Identifier of a [`Tile`] in the graph arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub u32);

/// Identifier of a [`Plate`] owned by the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlateId(pub u32);

/// Coarse surface classification, assigned by generation steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Biome {
    Ocean,
    Coast,
    Plains,
    Mountains,
}

/// A vertex of the mesh. Degree 3 on a subdivided icosahedron dual.
#[derive(Clone, Debug)]
pub struct Corner {
    pub id: CornerId,
    /// Position on (or near) the sphere surface, scaled by the planet
    /// radius. Mutable only before the graph is sealed.
    pub position: Vec3,
    pub(crate) corners: Vec<CornerId>,
    pub(crate) borders: Vec<BorderId>,
    pub(crate) tiles: Vec<TileId>,
}

impl Corner {
    /// Adjacent corners (one across each border).
    pub fn corners(&self) -> &[CornerId] {
        &self.corners
    }

    /// Borders meeting at this corner.
    pub fn borders(&self) -> &[BorderId] {
        &self.borders
    }

    /// Tiles sharing this corner.
    pub fn tiles(&self) -> &[TileId] {
        &self.tiles
    }

    /// Vector from this corner to another.
    pub fn vector_to(&self, other: &Corner) -> Vec3 {
        other.position - self.position
    }
}

impl std::fmt::Display for Corner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Corner {} <{:.0}, {:.0}, {:.0}>",
            self.id.0, self.position.x, self.position.y, self.position.z
        )
    }
}

/// An edge joining exactly two corners and separating exactly two tiles.
#[derive(Clone, Debug)]
pub struct Border {
    pub id: BorderId,
    pub(crate) corners: [CornerId; 2],
    pub(crate) tiles: [TileId; 2],
    pub(crate) borders: Vec<BorderId>,
}

impl Border {
    /// The two endpoint corners.
    pub fn corners(&self) -> [CornerId; 2] {
        self.corners
    }

    /// The two tiles separated by this border.
    pub fn tiles(&self) -> [TileId; 2] {
        self.tiles
    }

    /// Borders sharing an endpoint corner with this one.
    pub fn borders(&self) -> &[BorderId] {
        &self.borders
    }
}

impl std::fmt::Display for Border {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Border {}", self.id.0)
    }
}

/// A polygonal cell of the mesh (pentagon, hexagon or heptagon).
///
/// The corner ring is wound clockwise as seen from outside the sphere; the
/// picking test in the spatial index relies on that winding.
#[derive(Clone, Debug)]
pub struct Tile {
    pub id: TileId,
    /// Cell centroid on the sphere surface.
    pub position: Vec3,
    /// Centroid of the corner ring, computed at seal time. Picking geometry
    /// works off this point rather than `position`.
    pub average_position: Vec3,
    /// Outward surface normal, computed at seal time.
    pub normal: Vec3,
    /// Sphere around the corner ring, computed at seal time.
    pub bounding_sphere: BoundingSphere,
    /// Elevation relative to sea level; `> 0` is land.
    pub elevation: f32,
    pub temperature: f32,
    pub moisture: f32,
    pub biome: Option<Biome>,
    pub plate: Option<PlateId>,
    pub(crate) corners: Vec<CornerId>,
    pub(crate) borders: Vec<BorderId>,
    pub(crate) tiles: Vec<TileId>,
}

impl Tile {
    /// Boundary corners, in clockwise ring order (seen from outside).
    pub fn corners(&self) -> &[CornerId] {
        &self.corners
    }

    /// Borders of this tile.
    pub fn borders(&self) -> &[BorderId] {
        &self.borders
    }

    /// Neighboring tiles.
    pub fn tiles(&self) -> &[TileId] {
        &self.tiles
    }

    /// Number of edges (equals the corner, border and neighbor counts).
    pub fn edge_count(&self) -> usize {
        self.corners.len()
    }

    /// Whether this tile sits above sea level.
    pub fn is_land(&self) -> bool {
        self.elevation > 0.0
    }
}

impl std::fmt::Display for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Tile {} ({} neighbors) <{:.0}, {:.0}, {:.0}>",
            self.id.0,
            self.tiles.len(),
            self.position.x,
            self.position.y,
            self.position.z
        )
    }
}

/// The sealed planet surface graph.
///
/// Adjacency structure and corner positions are frozen; scalar tile fields
/// (elevation, temperature, moisture, biome, plate) remain writable so that
/// generation steps can populate them after sealing.
#[derive(Clone, Debug)]
pub struct PlanetGraph {
    pub radius: f32,
    /// Tectonic plates, populated by generation steps after sealing.
    pub plates: Vec<Plate>,
    pub(crate) corners: Vec<Corner>,
    pub(crate) borders: Vec<Border>,
    pub(crate) tiles: Vec<Tile>,
}

impl PlanetGraph {
    pub fn corner(&self, id: CornerId) -> &Corner {
        &self.corners[id.0 as usize]
    }

    pub fn border(&self, id: BorderId) -> &Border {
        &self.borders[id.0 as usize]
    }

    pub fn tile(&self, id: TileId) -> &Tile {
        &self.tiles[id.0 as usize]
    }

    /// Mutable tile access for generation steps. Adjacency lists stay
    /// private; only scalar fields can change post-seal.
    pub fn tile_mut(&mut self, id: TileId) -> &mut Tile {
        &mut self.tiles[id.0 as usize]
    }

    pub fn plate(&self, id: PlateId) -> &Plate {
        &self.plates[id.0 as usize]
    }

    pub fn corners(&self) -> &[Corner] {
        &self.corners
    }

    pub fn borders(&self) -> &[Border] {
        &self.borders
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// The corner on the far side of a border.
    ///
    /// Fails with [`GraphError::InvalidArgument`] if `corner` is not one of
    /// the border's two endpoints.
    pub fn opposite_corner(&self, border: BorderId, corner: CornerId) -> Result<CornerId, GraphError> {
        let [a, b] = self.border(border).corners;
        if corner == a {
            Ok(b)
        } else if corner == b {
            Ok(a)
        } else {
            Err(GraphError::InvalidArgument {
                entity: "corner",
                given: corner.0,
                border: border.0,
            })
        }
    }

    /// The tile on the far side of a border.
    ///
    /// Fails with [`GraphError::InvalidArgument`] if `tile` is not one of
    /// the border's two tiles.
    pub fn opposite_tile(&self, border: BorderId, tile: TileId) -> Result<TileId, GraphError> {
        let [a, b] = self.border(border).tiles;
        if tile == a {
            Ok(b)
        } else if tile == b {
            Ok(a)
        } else {
            Err(GraphError::InvalidArgument {
                entity: "tile",
                given: tile.0,
                border: border.0,
            })
        }
    }

    /// Euclidean distance between a border's two corners.
    pub fn border_length(&self, border: BorderId) -> f32 {
        let [a, b] = self.border(border).corners;
        self.corner(a).position.distance(self.corner(b).position)
    }

    /// Whether a border is a coastline: exactly one of its two tiles is
    /// land. Two land tiles or two ocean tiles are not a land boundary.
    pub fn is_land_boundary(&self, border: BorderId) -> bool {
        let [a, b] = self.border(border).tiles;
        self.tile(a).is_land() != self.tile(b).is_land()
    }
}
