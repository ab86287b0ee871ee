//! Parsed tile-map model.
//!
//! This module provides:
//! - Serde types for Tiled JSON maps (tile layers, object layers, groups)
//! - Tileset lookup by global tile id
//! - Per-tile collision shape metadata
//! - Spawn point queries
//! - The live tile animation table

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tilequest_common::{MapError, MapResult, Rect, TileCoord, Vec2};
use tracing::{debug, info, warn};

/// Bits Tiled stores in a gid for flipping and rotation.
const GID_FLAG_MASK: u32 = 0xE000_0000;

/// Name of the object layer holding the player spawn point.
pub const PLAYER_SPAWN_LAYER: &str = "Spawn Point Character";

/// Strips flip/rotation flags from a global tile id.
#[must_use]
pub fn clean_gid(gid: u32) -> u32 {
    gid & !GID_FLAG_MASK
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Tiled JSON document
// ============================================================================

/// A point inside an object's polygon or polyline, relative to the object.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MapPoint {
    /// X offset
    pub x: f32,
    /// Y offset
    pub y: f32,
}

impl From<MapPoint> for Vec2 {
    fn from(p: MapPoint) -> Self {
        Vec2::new(p.x, p.y)
    }
}

/// An object placed on an object layer (or inside a tile's collision group).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MapObject {
    /// Object id
    pub id: u32,
    /// Object name
    pub name: String,
    /// X position
    pub x: f32,
    /// Y position (bottom edge for tile objects)
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
    /// Global tile id for tile objects
    pub gid: Option<u32>,
    /// Closed polygon points
    pub polygon: Option<Vec<MapPoint>>,
    /// Open polyline points
    pub polyline: Option<Vec<MapPoint>>,
    /// Whether this object is an ellipse
    pub ellipse: bool,
}

/// Tile data, either decoded ids or an encoded string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayerData {
    /// Plain array of global tile ids
    Tiles(Vec<u32>),
    /// Base64 or compressed payload
    Encoded(String),
}

impl LayerData {
    fn tiles(&self) -> &[u32] {
        match self {
            Self::Tiles(tiles) => tiles,
            Self::Encoded(_) => &[],
        }
    }
}

/// A chunk of an infinite tile layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk origin column
    pub x: i32,
    /// Chunk origin row
    pub y: i32,
    /// Chunk width in tiles
    pub width: u32,
    /// Chunk height in tiles
    pub height: u32,
    /// Tile ids
    pub data: LayerData,
}

/// A grid of tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayer {
    /// Layer name
    #[serde(default)]
    pub name: String,
    /// Visibility flag
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Width in tiles (finite maps)
    #[serde(default)]
    pub width: Option<u32>,
    /// Flat tile data (finite maps)
    #[serde(default)]
    pub data: Option<LayerData>,
    /// Chunked tile data (infinite maps)
    #[serde(default)]
    pub chunks: Option<Vec<Chunk>>,
    /// Encoding declared for the data
    #[serde(default)]
    pub encoding: Option<String>,
}

impl TileLayer {
    /// Collects every non-empty tile as (grid coordinate, gid).
    pub fn tiles(&self, map_width: u32) -> Vec<(TileCoord, u32)> {
        let mut tiles = Vec::new();
        if let Some(chunks) = &self.chunks {
            for chunk in chunks {
                let origin = TileCoord::new(chunk.x, chunk.y);
                for (i, &gid) in chunk.data.tiles().iter().enumerate() {
                    if gid != 0 {
                        tiles.push((origin.offset(TileCoord::from_index(i, chunk.width)), gid));
                    }
                }
            }
        } else if let Some(data) = &self.data {
            let width = self.width.unwrap_or(map_width);
            for (i, &gid) in data.tiles().iter().enumerate() {
                if gid != 0 {
                    tiles.push((TileCoord::from_index(i, width), gid));
                }
            }
        }
        tiles
    }

    fn is_encoded(&self) -> bool {
        matches!(self.data, Some(LayerData::Encoded(_)))
            || self
                .chunks
                .iter()
                .flatten()
                .any(|c| matches!(c.data, LayerData::Encoded(_)))
    }
}

/// A layer of free-placed objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectLayer {
    /// Layer name
    #[serde(default)]
    pub name: String,
    /// Visibility flag
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Objects on this layer
    #[serde(default)]
    pub objects: Vec<MapObject>,
}

/// A folder of nested layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupLayer {
    /// Group name
    #[serde(default)]
    pub name: String,
    /// Child layers
    #[serde(default)]
    pub layers: Vec<Layer>,
}

/// A map layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Layer {
    /// Tile grid
    #[serde(rename = "tilelayer")]
    Tiles(TileLayer),
    /// Object layer
    #[serde(rename = "objectgroup")]
    Objects(ObjectLayer),
    /// Layer group
    #[serde(rename = "group")]
    Group(GroupLayer),
    /// Image layer (no simulation content)
    #[serde(rename = "imagelayer")]
    Image {},
}

/// One frame of a tile animation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationFrame {
    /// Local tile id shown during this frame
    pub tileid: u32,
    /// Frame duration in milliseconds
    pub duration: u32,
}

/// Collision group attached to a tile.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TileObjectGroup {
    /// Collision objects
    #[serde(default)]
    pub objects: Vec<MapObject>,
}

/// Per-tile metadata inside a tileset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDefinition {
    /// Local tile id
    pub id: u32,
    /// Collision shapes
    #[serde(default)]
    pub objectgroup: Option<TileObjectGroup>,
    /// Animation frames
    #[serde(default)]
    pub animation: Option<Vec<AnimationFrame>>,
}

/// A tileset entry in the map document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilesetRef {
    /// First global id covered by this tileset
    pub firstgid: u32,
    /// External tileset file, if not embedded
    #[serde(default)]
    pub source: Option<String>,
    /// Tileset name
    #[serde(default)]
    pub name: String,
    /// Tile width in pixels
    #[serde(default)]
    pub tilewidth: Option<u32>,
    /// Tile height in pixels
    #[serde(default)]
    pub tileheight: Option<u32>,
    /// Per-tile metadata
    #[serde(default)]
    pub tiles: Vec<TileDefinition>,
}

/// Root of a Tiled JSON map document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiledMap {
    /// Width in tiles
    #[serde(default)]
    pub width: u32,
    /// Height in tiles
    #[serde(default)]
    pub height: u32,
    /// Tile width in pixels
    pub tilewidth: u32,
    /// Tile height in pixels
    pub tileheight: u32,
    /// Whether the map uses chunked layers
    #[serde(default)]
    pub infinite: bool,
    /// Top-level layers
    #[serde(default)]
    pub layers: Vec<Layer>,
    /// Tilesets
    #[serde(default)]
    pub tilesets: Vec<TilesetRef>,
}

// ============================================================================
// Resolved model
// ============================================================================

/// Tileset summary used for gid resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilesetInfo {
    /// First global id
    pub firstgid: u32,
    /// Tileset name
    pub name: String,
    /// Tile width in pixels
    pub tile_width: u32,
    /// Tile height in pixels
    pub tile_height: u32,
}

impl TilesetInfo {
    /// Local id of `gid` within this tileset.
    #[must_use]
    pub fn local_id(&self, gid: u32) -> u32 {
        clean_gid(gid).saturating_sub(self.firstgid)
    }
}

/// Collision metadata attached to a tile, relative to the tile's top-left.
#[derive(Debug, Clone, PartialEq)]
pub struct TileShape {
    /// X offset
    pub x: f32,
    /// Y offset
    pub y: f32,
    /// Width (0 when unspecified)
    pub width: f32,
    /// Height (0 when unspecified)
    pub height: f32,
    /// Polygon points relative to (x, y)
    pub polygon: Option<Vec<Vec2>>,
    /// Whether the shape is an ellipse
    pub ellipse: bool,
}

impl From<&MapObject> for TileShape {
    fn from(o: &MapObject) -> Self {
        Self {
            x: o.x,
            y: o.y,
            width: o.width,
            height: o.height,
            polygon: o
                .polygon
                .as_ref()
                .filter(|p| !p.is_empty())
                .map(|p| p.iter().copied().map(Vec2::from).collect()),
            ellipse: o.ellipse,
        }
    }
}

/// A spawn location read from an object layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    /// Anchor position (see the query that produced it)
    pub position: Vec2,
    /// Object width
    pub width: f32,
    /// Object height
    pub height: f32,
}

/// Live animation state for one animated tile.
#[derive(Debug, Clone, PartialEq)]
pub struct TileAnimation {
    /// Frames as (global tile id, duration ms)
    pub frames: Vec<(u32, u32)>,
    /// Current frame index
    pub current_frame: usize,
    /// Milliseconds spent on the current frame
    pub elapsed_ms: f32,
}

/// Animation table keyed by global tile id.
#[derive(Debug, Clone, Default)]
pub struct TileAnimations {
    entries: HashMap<u32, TileAnimation>,
    total_elapsed: f32,
}

impl TileAnimations {
    /// Advances every animation by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        self.total_elapsed += dt;
        for anim in self.entries.values_mut() {
            if anim.frames.is_empty() {
                continue;
            }
            anim.elapsed_ms += dt * 1000.0;
            if anim.elapsed_ms >= anim.frames[anim.current_frame].1 as f32 {
                anim.elapsed_ms = 0.0;
                anim.current_frame = (anim.current_frame + 1) % anim.frames.len();
            }
        }
    }

    /// Tile id currently shown for `gid` (itself when not animated).
    #[must_use]
    pub fn current_tile(&self, gid: u32) -> u32 {
        let gid = clean_gid(gid);
        self.entries
            .get(&gid)
            .and_then(|a| a.frames.get(a.current_frame))
            .map_or(gid, |f| f.0)
    }

    /// Animation for a gid.
    #[must_use]
    pub fn get(&self, gid: u32) -> Option<&TileAnimation> {
        self.entries.get(&clean_gid(gid))
    }

    /// Number of animated tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no tile is animated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Seconds of animation time accumulated since load.
    #[must_use]
    pub fn total_elapsed(&self) -> f32 {
        self.total_elapsed
    }
}

/// A parsed map ready for collision building and spawning.
#[derive(Debug, Clone)]
pub struct MapModel {
    document: TiledMap,
    tilesets: Vec<TilesetInfo>,
    shapes: HashMap<u32, Vec<TileShape>>,
    animations: TileAnimations,
}

impl MapModel {
    /// Parses a Tiled JSON document.
    pub fn from_json_str(json: &str) -> MapResult<Self> {
        let document: TiledMap =
            serde_json::from_str(json).map_err(|e| MapError::Parse(e.to_string()))?;
        Self::from_document(document)
    }

    /// Builds the model from an already-deserialized document.
    pub fn from_document(document: TiledMap) -> MapResult<Self> {
        if document.tilewidth == 0 || document.tileheight == 0 {
            return Err(MapError::InvalidTileSize {
                width: document.tilewidth,
                height: document.tileheight,
            });
        }

        for layer in flatten_layers(&document.layers) {
            if let Layer::Tiles(tiles) = layer {
                if tiles.is_encoded() {
                    return Err(MapError::UnsupportedEncoding {
                        layer: tiles.name.clone(),
                        encoding: tiles.encoding.clone().unwrap_or_else(|| "base64".into()),
                    });
                }
            }
        }

        let mut tilesets = Vec::with_capacity(document.tilesets.len());
        let mut shapes = HashMap::new();
        let mut animations = TileAnimations::default();

        for ts in &document.tilesets {
            if let Some(source) = &ts.source {
                warn!(
                    "Tileset '{}' (firstgid {}) is external; its collision shapes are unavailable",
                    source, ts.firstgid
                );
            }
            tilesets.push(TilesetInfo {
                firstgid: ts.firstgid,
                name: ts.name.clone(),
                tile_width: ts.tilewidth.unwrap_or(document.tilewidth),
                tile_height: ts.tileheight.unwrap_or(document.tileheight),
            });

            for tile in &ts.tiles {
                let gid = ts.firstgid + tile.id;
                if let Some(group) = &tile.objectgroup {
                    let tile_shapes: Vec<TileShape> =
                        group.objects.iter().map(TileShape::from).collect();
                    if !tile_shapes.is_empty() {
                        shapes.insert(gid, tile_shapes);
                    }
                }
                if let Some(frames) = &tile.animation {
                    animations.entries.insert(
                        gid,
                        TileAnimation {
                            frames: frames
                                .iter()
                                .map(|f| (ts.firstgid + f.tileid, f.duration))
                                .collect(),
                            current_frame: 0,
                            elapsed_ms: 0.0,
                        },
                    );
                }
            }
        }
        tilesets.sort_by_key(|t| t.firstgid);

        info!(
            "Loaded map {}x{} tiles: {} tilesets, {} tiles with shapes, {} animated tiles",
            document.width,
            document.height,
            tilesets.len(),
            shapes.len(),
            animations.len()
        );

        Ok(Self {
            document,
            tilesets,
            shapes,
            animations,
        })
    }

    /// The underlying document.
    #[must_use]
    pub fn document(&self) -> &TiledMap {
        &self.document
    }

    /// All layers with groups expanded, in document order.
    #[must_use]
    pub fn layers(&self) -> Vec<&Layer> {
        flatten_layers(&self.document.layers)
    }

    /// Map tile height in pixels.
    #[must_use]
    pub fn tile_height(&self) -> u32 {
        self.document.tileheight
    }

    /// Map width in tiles.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.document.width
    }

    /// Resolves a gid to the tileset with the largest `firstgid <= gid`.
    #[must_use]
    pub fn tileset_for_tile(&self, gid: u32) -> Option<&TilesetInfo> {
        let gid = clean_gid(gid);
        if gid == 0 {
            return None;
        }
        self.tilesets.iter().rev().find(|t| t.firstgid <= gid)
    }

    /// Collision shapes declared for a gid.
    #[must_use]
    pub fn tile_collision_shapes(&self, gid: u32) -> Option<&[TileShape]> {
        self.shapes.get(&clean_gid(gid)).map(Vec::as_slice)
    }

    /// First object of the player spawn layer, anchored at its top-left.
    #[must_use]
    pub fn spawn_point(&self) -> Option<SpawnPoint> {
        let layer = self.object_layer(PLAYER_SPAWN_LAYER)?;
        layer.objects.first().map(|o| SpawnPoint {
            position: Vec2::new(o.x, o.y),
            width: o.width,
            height: o.height,
        })
    }

    /// Objects of a spawn layer, anchored at their centres.
    #[must_use]
    pub fn enemy_spawn_points(&self, layer_name: &str) -> Vec<SpawnPoint> {
        let Some(layer) = self.object_layer(layer_name) else {
            debug!("No spawn layer named '{}'", layer_name);
            return Vec::new();
        };
        layer
            .objects
            .iter()
            .map(|o| SpawnPoint {
                position: Vec2::new(o.x + o.width / 2.0, o.y + o.height / 2.0),
                width: o.width,
                height: o.height,
            })
            .collect()
    }

    /// Finds an object layer by exact name.
    #[must_use]
    pub fn object_layer(&self, name: &str) -> Option<&ObjectLayer> {
        self.layers().into_iter().find_map(|layer| match layer {
            Layer::Objects(objects) if objects.name == name => Some(objects),
            _ => None,
        })
    }

    /// Animation table.
    #[must_use]
    pub fn animations(&self) -> &TileAnimations {
        &self.animations
    }

    /// Mutable animation table.
    pub fn animations_mut(&mut self) -> &mut TileAnimations {
        &mut self.animations
    }

    /// World-pixel extent of the map.
    ///
    /// Infinite maps report the union of their chunks.
    #[must_use]
    pub fn pixel_bounds(&self) -> Rect {
        let tw = self.document.tilewidth as f32;
        let th = self.document.tileheight as f32;
        if !self.document.infinite {
            return Rect::new(
                0.0,
                0.0,
                self.document.width as f32 * tw,
                self.document.height as f32 * th,
            );
        }

        let mut min = Vec2::splat(f32::MAX);
        let mut max = Vec2::splat(f32::MIN);
        for layer in self.layers() {
            if let Layer::Tiles(tiles) = layer {
                for chunk in tiles.chunks.iter().flatten() {
                    min = min.min(Vec2::new(chunk.x as f32 * tw, chunk.y as f32 * th));
                    max = max.max(Vec2::new(
                        (chunk.x + chunk.width as i32) as f32 * tw,
                        (chunk.y + chunk.height as i32) as f32 * th,
                    ));
                }
            }
        }
        if min.x > max.x {
            return Rect::default();
        }
        Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }
}

fn flatten_layers(layers: &[Layer]) -> Vec<&Layer> {
    let mut out = Vec::new();
    for layer in layers {
        match layer {
            Layer::Group(group) => out.extend(flatten_layers(&group.layers)),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: &str = r#"{
        "width": 4, "height": 3, "tilewidth": 64, "tileheight": 64, "infinite": false,
        "layers": [
            {"type": "tilelayer", "name": "Walls", "width": 4, "data": [0, 1, 0, 0, 0, 0, 2, 0, 0, 0, 0, 0]},
            {"type": "group", "name": "Spawns", "layers": [
                {"type": "objectgroup", "name": "Spawn Point Character",
                 "objects": [{"id": 1, "name": "", "x": 100, "y": 50, "width": 20, "height": 10}]},
                {"type": "objectgroup", "name": "Yellow Knights Spawn Point",
                 "objects": [{"id": 2, "x": 300, "y": 300, "width": 40, "height": 20}]}
            ]},
            {"type": "imagelayer", "name": "Sky", "image": "sky.png"}
        ],
        "tilesets": [
            {"firstgid": 1, "name": "walls", "tilewidth": 64, "tileheight": 64,
             "tiles": [
                {"id": 0, "objectgroup": {"objects": [{"id": 1, "x": 0, "y": 32, "width": 64, "height": 32}]}},
                {"id": 1, "animation": [{"tileid": 1, "duration": 100}, {"tileid": 2, "duration": 100}]}
             ]},
            {"firstgid": 10, "name": "trees", "tilewidth": 64, "tileheight": 128, "tiles": []}
        ]
    }"#;

    fn model() -> MapModel {
        MapModel::from_json_str(MAP).expect("test map parses")
    }

    #[test]
    fn test_tileset_lookup() {
        let map = model();
        assert!(map.tileset_for_tile(0).is_none());
        assert_eq!(map.tileset_for_tile(3).map(|t| t.firstgid), Some(1));
        let trees = map.tileset_for_tile(12).expect("tileset");
        assert_eq!(trees.name, "trees");
        assert_eq!(trees.local_id(12), 2);
        assert_eq!(trees.tile_height, 128);
    }

    #[test]
    fn test_flip_flags_masked() {
        let map = model();
        let flipped = 1 | 0x8000_0000;
        assert!(map.tile_collision_shapes(flipped).is_some());
    }

    #[test]
    fn test_tile_shapes() {
        let map = model();
        let shapes = map.tile_collision_shapes(1).expect("shapes");
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].y, 32.0);
        assert!(map.tile_collision_shapes(2).is_none());
    }

    #[test]
    fn test_spawn_points_inside_groups() {
        let map = model();
        let player = map.spawn_point().expect("spawn");
        assert_eq!(player.position, Vec2::new(100.0, 50.0));

        let knights = map.enemy_spawn_points("Yellow Knights Spawn Point");
        assert_eq!(knights.len(), 1);
        assert_eq!(knights[0].position, Vec2::new(320.0, 310.0));
        assert!(map.enemy_spawn_points("Nope").is_empty());
    }

    #[test]
    fn test_tile_iteration() {
        let map = model();
        let layers = map.layers();
        let Layer::Tiles(walls) = layers[0] else {
            panic!("first layer is a tile layer");
        };
        let tiles = walls.tiles(map.width());
        assert_eq!(tiles, vec![(TileCoord::new(1, 0), 1), (TileCoord::new(2, 1), 2)]);
    }

    #[test]
    fn test_animation_tick() {
        let mut map = model();
        assert_eq!(map.animations().current_tile(2), 2);
        map.animations_mut().tick(0.1);
        assert_eq!(map.animations().current_tile(2), 3);
        map.animations_mut().tick(0.1);
        assert_eq!(map.animations().current_tile(2), 2);
        assert!((map.animations().total_elapsed() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_pixel_bounds() {
        let map = model();
        assert_eq!(map.pixel_bounds(), Rect::new(0.0, 0.0, 256.0, 192.0));
    }

    #[test]
    fn test_chunked_layer() {
        let json = r#"{
            "tilewidth": 64, "tileheight": 64, "infinite": true,
            "layers": [{"type": "tilelayer", "name": "Walls", "chunks": [
                {"x": -16, "y": 0, "width": 2, "height": 2, "data": [0, 5, 0, 0]}
            ]}],
            "tilesets": []
        }"#;
        let map = MapModel::from_json_str(json).expect("parses");
        let layers = map.layers();
        let Layer::Tiles(layer) = layers[0] else {
            panic!("tile layer");
        };
        assert_eq!(layer.tiles(0), vec![(TileCoord::new(-15, 0), 5)]);
        assert_eq!(map.pixel_bounds(), Rect::new(-1024.0, 0.0, 128.0, 128.0));
    }

    #[test]
    fn test_encoded_layer_rejected() {
        let json = r#"{
            "width": 1, "height": 1, "tilewidth": 64, "tileheight": 64,
            "layers": [{"type": "tilelayer", "name": "Walls", "encoding": "base64", "data": "AAAA"}]
        }"#;
        assert!(matches!(
            MapModel::from_json_str(json),
            Err(MapError::UnsupportedEncoding { .. })
        ));
    }

    #[test]
    fn test_invalid_tile_size() {
        let json = r#"{"width": 1, "height": 1, "tilewidth": 0, "tileheight": 64}"#;
        assert!(matches!(
            MapModel::from_json_str(json),
            Err(MapError::InvalidTileSize { .. })
        ));
        assert!(matches!(
            MapModel::from_json_str("not json"),
            Err(MapError::Parse(_))
        ));
    }
}
