//! Tectonic plates and their rigid-body motion field.

use glam::Vec3;

use crate::graph::{BorderId, CornerId, TileId};

/// A tectonic plate: a connected set of tiles sharing a rigid motion.
///
/// The motion at any surface point is the sum of two rotations: a drift
/// around the plate's drift axis and a spin around the plate's root tile.
#[derive(Clone, Debug)]
pub struct Plate {
    /// Tile the plate grew from; also the spin axis anchor.
    pub root: TileId,
    /// Debug/render color, linear RGB.
    pub color: [f32; 3],
    /// Unit axis of the plate's drift rotation.
    pub drift_axis: Vec3,
    /// Angular rate of the drift rotation, radians per unit time.
    pub drift_rate: f32,
    /// Angular rate of the spin around the root tile.
    pub spin_rate: f32,
    /// Elevation the plate pulls its tiles toward.
    pub desired_elevation: f32,
    /// Oceanic plates sink below sea level, continental ones rise above it.
    pub oceanic: bool,
    pub tiles: Vec<TileId>,
    /// Corners on the plate's outer rim.
    pub boundary_corners: Vec<CornerId>,
    /// Borders separating this plate from its neighbors.
    pub boundary_borders: Vec<BorderId>,
}

impl Plate {
    /// Surface velocity of the plate at `position`, given the root tile's
    /// position. Drift and spin both scale with the distance from the point
    /// to its projection on the respective rotation axis.
    pub fn calculate_movement(&self, position: Vec3, root_position: Vec3) -> Vec3 {
        let drift = scaled_rotation(self.drift_axis, position, self.drift_rate);
        let spin = scaled_rotation(root_position, position, self.spin_rate);
        drift + spin
    }
}

/// Tangential velocity of a rotation around `axis` at `position`, with speed
/// `rate` times the distance from `position` to the axis. Points on the axis
/// itself have no tangential component.
fn scaled_rotation(axis: Vec3, position: Vec3, rate: f32) -> Vec3 {
    let tangent = axis.cross(position);
    if tangent.length_squared() < f32::EPSILON {
        return Vec3::ZERO;
    }
    let radius = position.distance(position.project_onto(axis));
    tangent.normalize() * (rate * radius)
}
