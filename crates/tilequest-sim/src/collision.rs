//! Static collision world built from map data.
//!
//! This module provides:
//! - Collision shapes (rectangles and polygons)
//! - The `CollisionQuery` interface used by movement code
//! - World construction from object and tile layers
//! - Movement helpers (per-axis sliding, fallback stepping)
//! - Spawn relocation out of solid geometry

use crate::geometry::{ellipse_polygon, rect_intersects_polygon, rects_overlap};
use crate::map::{Layer, MapModel, MapObject, TileShape};
use serde::{Deserialize, Serialize};
use tilequest_common::{Rect, Vec2};
use tracing::{debug, info, warn};

/// Object layers that mark boss arenas rather than walls.
pub const BOSS_AREA_LAYERS: [&str; 4] = ["Boss Level 1", "Boss level 2", "Boss Level 3", "Final Boss Blue"];

/// Tile layer name fragments treated as decoration.
const DECOR_KEYWORDS: [&str; 3] = ["decor", "background", "water"];

/// Tile layer name fragments treated as walkable ground.
const WALKABLE_KEYWORDS: [&str; 6] = ["ground", "floor", "grass", "tile layer 1", "base", "terrain"];

/// Step between relocation rings, in pixels.
const RELOCATE_STEP: i32 = 16;

/// Largest relocation ring radius, in pixels.
const RELOCATE_MAX_RADIUS: i32 = 128;

/// A single static collision shape in world pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CollisionShape {
    /// Axis-aligned rectangle
    Rect(Rect),
    /// Closed polygon
    Polygon(Vec<Vec2>),
}

impl CollisionShape {
    /// Whether `rect` overlaps this shape.
    #[must_use]
    pub fn overlaps(&self, rect: &Rect) -> bool {
        match self {
            Self::Rect(shape) => rects_overlap(rect, shape),
            Self::Polygon(points) => rect_intersects_polygon(rect, points),
        }
    }
}

/// Collision query interface for movement code.
pub trait CollisionQuery {
    /// Returns true if no solid shape overlaps `rect`.
    fn can_occupy(&self, rect: &Rect) -> bool;
}

/// Mock collision query for tests: a list of blocking rectangles.
#[derive(Debug, Default, Clone)]
pub struct MockCollision {
    blocked: Vec<Rect>,
}

impl MockCollision {
    /// Creates an open field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a blocking rectangle.
    pub fn block(&mut self, rect: Rect) {
        self.blocked.push(rect);
    }
}

impl CollisionQuery for MockCollision {
    fn can_occupy(&self, rect: &Rect) -> bool {
        !self.blocked.iter().any(|b| rects_overlap(rect, b))
    }
}

/// Unordered set of static shapes; read-only once built.
#[derive(Debug, Clone, Default)]
pub struct CollisionWorld {
    shapes: Vec<CollisionShape>,
}

impl CollisionWorld {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a world from prepared shapes.
    #[must_use]
    pub fn from_shapes(shapes: Vec<CollisionShape>) -> Self {
        Self { shapes }
    }

    /// Builds the world from every layer in map order, descending into groups.
    #[must_use]
    pub fn build(map: &MapModel, tile_size: u32) -> Self {
        let mut builder = WorldBuilder {
            map,
            tile_size,
            shapes: Vec::new(),
        };

        for layer in &map.document().layers {
            builder.add_layer(layer);
        }

        info!("Collision world built with {} shapes", builder.shapes.len());
        Self::from_shapes(builder.shapes)
    }

    /// All shapes.
    #[must_use]
    pub fn shapes(&self) -> &[CollisionShape] {
        &self.shapes
    }

    /// Number of shapes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Whether the world has no shapes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

impl CollisionQuery for CollisionWorld {
    fn can_occupy(&self, rect: &Rect) -> bool {
        !self.shapes.iter().any(|s| s.overlaps(rect))
    }
}

fn is_excluded_object_layer(name: &str) -> bool {
    name.to_lowercase().contains("spawn") || BOSS_AREA_LAYERS.contains(&name)
}

fn is_decor_or_walkable(name: &str) -> bool {
    let name = name.to_lowercase();
    DECOR_KEYWORDS
        .iter()
        .chain(WALKABLE_KEYWORDS.iter())
        .any(|k| name.contains(k))
}

fn or_default(value: f32, fallback: f32) -> f32 {
    if value == 0.0 {
        fallback
    } else {
        value
    }
}

struct WorldBuilder<'a> {
    map: &'a MapModel,
    tile_size: u32,
    shapes: Vec<CollisionShape>,
}

impl WorldBuilder<'_> {
    fn add_layer(&mut self, layer: &Layer) {
        match layer {
            Layer::Objects(objects) => {
                if is_excluded_object_layer(&objects.name) {
                    debug!("Skipping non-collision object layer '{}'", objects.name);
                    return;
                }
                for object in &objects.objects {
                    self.add_object(object);
                }
            },
            Layer::Tiles(tiles) => {
                if !tiles.visible || is_decor_or_walkable(&tiles.name) {
                    return;
                }
                for (coord, gid) in tiles.tiles(self.map.width()) {
                    self.add_tile(gid, coord.to_pixel(self.tile_size));
                }
            },
            Layer::Group(group) => {
                for child in &group.layers {
                    self.add_layer(child);
                }
            },
            Layer::Image {} => {},
        }
    }

    fn is_sheep_tile(&self, gid: u32) -> bool {
        self.map
            .tileset_for_tile(gid)
            .is_some_and(|t| t.name.to_lowercase().contains("sheep"))
    }

    /// Transforms tileset shapes anchored at `origin`; `default_size` fills missing sizes.
    fn push_tile_shapes(&mut self, shapes: &[TileShape], origin: Vec2, default_size: Vec2) {
        for shape in shapes {
            let base = origin + Vec2::new(shape.x, shape.y);
            if let Some(points) = &shape.polygon {
                self.shapes
                    .push(CollisionShape::Polygon(points.iter().map(|&p| base + p).collect()));
            } else {
                let bounds = Rect::new(
                    base.x,
                    base.y,
                    or_default(shape.width, default_size.x),
                    or_default(shape.height, default_size.y),
                );
                if shape.ellipse {
                    self.shapes.push(CollisionShape::Polygon(ellipse_polygon(&bounds)));
                } else {
                    self.shapes.push(CollisionShape::Rect(bounds));
                }
            }
        }
    }

    fn add_object(&mut self, object: &MapObject) {
        let name = object.name.to_lowercase();
        if name.contains("spawn") || name.contains("sheep") {
            return;
        }

        let mut origin = Vec2::new(object.x, object.y);
        let mut size = Vec2::new(object.width, object.height);

        if let Some(gid) = object.gid {
            let (tile_w, tile_h) = self.map.tileset_for_tile(gid).map_or(
                (self.tile_size, self.tile_size),
                |t| (t.tile_width, t.tile_height),
            );
            size.x = or_default(size.x, tile_w as f32);
            size.y = or_default(size.y, tile_h as f32);
            // Tile objects are anchored at their bottom edge.
            origin.y = object.y - size.y;

            if self.is_sheep_tile(gid) {
                return;
            }
            if let Some(shapes) = self.map.tile_collision_shapes(gid) {
                if !shapes.is_empty() {
                    let shapes = shapes.to_vec();
                    self.push_tile_shapes(&shapes, origin, size);
                    return;
                }
            }
        }

        let outline = object
            .polygon
            .as_ref()
            .filter(|p| !p.is_empty())
            .or_else(|| object.polyline.as_ref().filter(|p| !p.is_empty()));
        if let Some(points) = outline {
            self.shapes.push(CollisionShape::Polygon(
                points.iter().map(|&p| origin + Vec2::from(p)).collect(),
            ));
        } else if size.x != 0.0 && size.y != 0.0 {
            self.shapes
                .push(CollisionShape::Rect(Rect::new(origin.x, origin.y, size.x, size.y)));
        }
    }

    fn add_tile(&mut self, gid: u32, position: Vec2) {
        if self.is_sheep_tile(gid) {
            return;
        }
        let Some(shapes) = self.map.tile_collision_shapes(gid) else {
            return;
        };
        if shapes.is_empty() {
            return;
        }

        let map_tile_h = self.map.tile_height() as f32;
        let tileset_tile_h = self
            .map
            .tileset_for_tile(gid)
            .map_or(self.tile_size as f32, |t| t.tile_height as f32);
        // Tall tiles grow upward from the grid cell.
        let y_offset = if tileset_tile_h > map_tile_h {
            -(tileset_tile_h - map_tile_h)
        } else {
            0.0
        };

        let shapes = shapes.to_vec();
        let size = self.tile_size as f32;
        self.push_tile_shapes(&shapes, position + Vec2::new(0.0, y_offset), Vec2::splat(size));
    }
}

// ============================================================================
// Movement helpers
// ============================================================================

/// The character's collision probe for a sprite at `position`.
///
/// Covers the lower half of the sprite and 90% of its width; the inset side is
/// the one the character faces away from.
#[must_use]
pub fn character_probe(position: Vec2, size: Vec2, facing_right: bool) -> Rect {
    let x = if facing_right {
        position.x
    } else {
        position.x + size.x * 0.1
    };
    Rect::new(x, position.y + size.y * 0.5, size.x * 0.9, size.y * 0.5)
}

/// Moves along each axis independently, X first, so blocked motion slides.
#[must_use]
pub fn slide_move<C, F>(collision: &C, position: Vec2, delta: Vec2, probe: F) -> Vec2
where
    C: CollisionQuery + ?Sized,
    F: Fn(Vec2) -> Rect,
{
    let mut result = position;
    let try_x = Vec2::new(position.x + delta.x, position.y);
    if collision.can_occupy(&probe(try_x)) {
        result.x = try_x.x;
    }
    let try_y = Vec2::new(result.x, position.y + delta.y);
    if collision.can_occupy(&probe(try_y)) {
        result.y = try_y.y;
    }
    result
}

/// Moves a full-body rectangle by `delta`: combined step first, then X-only
/// followed by Y-only when the combined step is blocked.
#[must_use]
pub fn step_with_fallback<C>(collision: &C, body: &Rect, delta: Vec2) -> Vec2
where
    C: CollisionQuery + ?Sized,
{
    let start = body.position();
    if delta == Vec2::ZERO {
        return start;
    }
    let combined = start + delta;
    if collision.can_occupy(&body.at(combined)) {
        return combined;
    }

    let mut result = start;
    if delta.x != 0.0 {
        let candidate = Vec2::new(start.x + delta.x, start.y);
        if collision.can_occupy(&body.at(candidate)) {
            result = candidate;
        }
    }
    if delta.y != 0.0 {
        let candidate = Vec2::new(result.x, result.y + delta.y);
        if collision.can_occupy(&body.at(candidate)) {
            result = candidate;
        }
    }
    result
}

/// Finds a free position near `start` when the spawn overlaps geometry.
///
/// Rings of radius 16..=128 px are searched in 16 px steps, eight offsets per
/// ring. Returns `start` unchanged when it is already free or nothing is found.
#[must_use]
pub fn resolve_starting_position<C, F>(collision: &C, start: Vec2, probe: F) -> Vec2
where
    C: CollisionQuery + ?Sized,
    F: Fn(Vec2) -> Rect,
{
    if collision.can_occupy(&probe(start)) {
        return start;
    }

    for radius in (RELOCATE_STEP..=RELOCATE_MAX_RADIUS).step_by(RELOCATE_STEP as usize) {
        for dx in [-radius, 0, radius] {
            for dy in [-radius, 0, radius] {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let candidate = start + Vec2::new(dx as f32, dy as f32);
                if collision.can_occupy(&probe(candidate)) {
                    debug!("Relocated spawn from {:?} to {:?}", start, candidate);
                    return candidate;
                }
            }
        }
    }

    warn!("Spawn at {:?} overlaps collision and no free position was found", start);
    start
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAR_SIZE: Vec2 = Vec2::new(68.0, 68.0);

    fn probe(position: Vec2) -> Rect {
        character_probe(position, CHAR_SIZE, true)
    }

    #[test]
    fn test_probe_shrinks_trailing_side() {
        let right = character_probe(Vec2::new(100.0, 100.0), CHAR_SIZE, true);
        assert_eq!(right.x, 100.0);
        assert_eq!(right.y, 134.0);
        assert!((right.width - 61.2).abs() < 1e-4);
        assert_eq!(right.height, 34.0);

        let left = character_probe(Vec2::new(100.0, 100.0), CHAR_SIZE, false);
        assert!((left.x - 106.8).abs() < 1e-4);
        assert!((left.right() - 168.0).abs() < 1e-4);
    }

    #[test]
    fn test_world_dispatches_shape_kinds() {
        let world = CollisionWorld::from_shapes(vec![
            CollisionShape::Rect(Rect::new(0.0, 0.0, 10.0, 10.0)),
            CollisionShape::Polygon(vec![
                Vec2::new(100.0, 100.0),
                Vec2::new(150.0, 100.0),
                Vec2::new(125.0, 150.0),
            ]),
        ]);
        assert!(!world.can_occupy(&Rect::new(5.0, 5.0, 2.0, 2.0)));
        assert!(!world.can_occupy(&Rect::new(120.0, 110.0, 5.0, 5.0)));
        assert!(world.can_occupy(&Rect::new(10.0, 0.0, 5.0, 5.0)));
        assert!(world.can_occupy(&Rect::new(60.0, 60.0, 5.0, 5.0)));
    }

    #[test]
    fn test_slide_move_blocks_one_axis() {
        let mut collision = MockCollision::new();
        // Wall to the right of the probe.
        collision.block(Rect::new(70.0, 0.0, 50.0, 500.0));
        let moved = slide_move(&collision, Vec2::ZERO, Vec2::new(10.0, 10.0), probe);
        assert_eq!(moved, Vec2::new(0.0, 10.0));
    }

    #[test]
    fn test_slide_move_free() {
        let collision = MockCollision::new();
        let moved = slide_move(&collision, Vec2::ZERO, Vec2::new(3.0, -4.0), probe);
        assert_eq!(moved, Vec2::new(3.0, -4.0));
    }

    #[test]
    fn test_step_with_fallback_slides_along_wall() {
        let mut collision = MockCollision::new();
        collision.block(Rect::new(0.0, 60.0, 200.0, 20.0));
        let body = Rect::new(10.0, 0.0, 50.0, 50.0);
        let moved = step_with_fallback(&collision, &body, Vec2::new(5.0, 15.0));
        assert_eq!(moved, Vec2::new(15.0, 0.0));
    }

    #[test]
    fn test_step_with_fallback_stuck() {
        let mut collision = MockCollision::new();
        collision.block(Rect::new(0.0, 0.0, 500.0, 500.0));
        let body = Rect::new(10.0, 10.0, 50.0, 50.0);
        assert_eq!(
            step_with_fallback(&collision, &body, Vec2::new(5.0, 5.0)),
            Vec2::new(10.0, 10.0)
        );
    }

    #[test]
    fn test_resolve_start_free() {
        let collision = MockCollision::new();
        let start = Vec2::new(40.0, 40.0);
        assert_eq!(resolve_starting_position(&collision, start, probe), start);
    }

    #[test]
    fn test_resolve_start_moves_to_first_ring() {
        let mut collision = MockCollision::new();
        // Small block only under the starting probe.
        collision.block(Rect::new(10.0, 40.0, 20.0, 20.0));
        let start = Vec2::ZERO;
        let resolved = resolve_starting_position(&collision, start, probe);
        assert_ne!(resolved, start);
        assert!(collision.can_occupy(&probe(resolved)));
        assert!((resolved - start).length() <= 128.0 * std::f32::consts::SQRT_2 + 1e-3);
    }

    #[test]
    fn test_resolve_start_unresolvable() {
        let mut collision = MockCollision::new();
        collision.block(Rect::new(-1000.0, -1000.0, 2000.0, 2000.0));
        let start = Vec2::new(5.0, 5.0);
        assert_eq!(resolve_starting_position(&collision, start, probe), start);
    }

    #[test]
    fn test_build_from_map() {
        let json = r#"{
            "width": 3, "height": 2, "tilewidth": 64, "tileheight": 64,
            "layers": [
                {"type": "tilelayer", "name": "Ground", "width": 3, "data": [1, 1, 1, 1, 1, 1]},
                {"type": "tilelayer", "name": "Walls", "width": 3, "data": [0, 1, 2, 0, 0, 3]},
                {"type": "tilelayer", "name": "Hidden", "visible": false, "width": 3, "data": [1, 0, 0, 0, 0, 0]},
                {"type": "objectgroup", "name": "Colliders", "objects": [
                    {"id": 1, "name": "rock", "x": 10, "y": 10, "width": 30, "height": 20},
                    {"id": 2, "name": "spawn marker", "x": 0, "y": 0, "width": 30, "height": 20},
                    {"id": 3, "name": "", "x": 200, "y": 0, "polygon": [{"x": 0, "y": 0}, {"x": 10, "y": 0}, {"x": 5, "y": 10}]},
                    {"id": 4, "name": "", "x": 300, "y": 300, "gid": 1},
                    {"id": 5, "name": "", "x": 5, "y": 5}
                ]},
                {"type": "objectgroup", "name": "Boss Level 1", "objects": [
                    {"id": 6, "x": 0, "y": 0, "width": 500, "height": 500}
                ]}
            ],
            "tilesets": [
                {"firstgid": 1, "name": "walls", "tilewidth": 64, "tileheight": 64, "tiles": [
                    {"id": 0, "objectgroup": {"objects": [{"id": 1, "x": 0, "y": 32, "width": 64, "height": 32}]}},
                    {"id": 1, "objectgroup": {"objects": [{"id": 1, "x": 0, "y": 0, "width": 32, "height": 32, "ellipse": true}]}}
                ]},
                {"firstgid": 3, "name": "Sheep", "tilewidth": 64, "tileheight": 64, "tiles": [
                    {"id": 0, "objectgroup": {"objects": [{"id": 1, "x": 0, "y": 0, "width": 64, "height": 64}]}}
                ]}
            ]
        }"#;
        let map = MapModel::from_json_str(json).expect("map parses");
        let world = CollisionWorld::build(&map, 64);

        // rock rect, polygon, gid object shape, wall tile rect, wall tile ellipse.
        assert_eq!(world.len(), 5);
        assert!(world
            .shapes()
            .contains(&CollisionShape::Rect(Rect::new(10.0, 10.0, 30.0, 20.0))));
        // Tile object anchored at its bottom: y = 300 - 64, shape offset y 32.
        assert!(world
            .shapes()
            .contains(&CollisionShape::Rect(Rect::new(300.0, 268.0, 64.0, 32.0))));
        // Wall tile at column 1.
        assert!(world
            .shapes()
            .contains(&CollisionShape::Rect(Rect::new(64.0, 32.0, 64.0, 32.0))));
        let polygons = world
            .shapes()
            .iter()
            .filter(|s| matches!(s, CollisionShape::Polygon(_)))
            .count();
        assert_eq!(polygons, 2);
    }

    #[test]
    fn test_build_descends_into_groups() {
        let json = r#"{
            "width": 4, "height": 4, "tilewidth": 64, "tileheight": 64,
            "layers": [
                {"type": "group", "name": "Town", "layers": [
                    {"type": "objectgroup", "name": "Fences", "objects": [
                        {"id": 1, "x": 10, "y": 20, "width": 30, "height": 40}
                    ]},
                    {"type": "group", "name": "Markers", "layers": [
                        {"type": "objectgroup", "name": "Spawn Point Character", "objects": [
                            {"id": 2, "x": 0, "y": 0, "width": 64, "height": 64}
                        ]}
                    ]}
                ]}
            ]
        }"#;
        let map = MapModel::from_json_str(json).expect("map parses");
        let world = CollisionWorld::build(&map, 64);
        assert_eq!(
            world.shapes(),
            &[CollisionShape::Rect(Rect::new(10.0, 20.0, 30.0, 40.0))]
        );
    }

    #[test]
    fn test_tall_tileset_shifts_up() {
        let json = r#"{
            "width": 1, "height": 2, "tilewidth": 64, "tileheight": 64,
            "layers": [{"type": "tilelayer", "name": "Trees", "width": 1, "data": [0, 1]}],
            "tilesets": [{"firstgid": 1, "name": "trees", "tilewidth": 64, "tileheight": 128, "tiles": [
                {"id": 0, "objectgroup": {"objects": [{"id": 1, "x": 16, "y": 96, "width": 32, "height": 32}]}}
            ]}]
        }"#;
        let map = MapModel::from_json_str(json).expect("map parses");
        let world = CollisionWorld::build(&map, 64);
        assert_eq!(
            world.shapes(),
            &[CollisionShape::Rect(Rect::new(16.0, 96.0, 32.0, 32.0))]
        );
    }
}
