//! ----------------------------------------------------------------------------
//! Per-block polygon BSP
//!
//! * Built once per [`BlockDef`](crate::world::BlockDef) from the polygon
//!   plane equations. Polygons are never split: a polygon straddling a
//!   splitter goes to the side holding its centroid.
//! * Nodes live in a flat `Vec` and refer to each other by index.
//! * [`BspTree::visit`] yields polygon ids **front-to-back** for a camera at
//!   a block-relative position; reversing the callback order gives
//!   back-to-front.
//! ----------------------------------------------------------------------------

use glam::Vec3;

use crate::world::{
    geometry::{Polygon, PolygonId},
    math::EPSILON,
};

pub type NodeId = u16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BspNode {
    pub polygon: PolygonId,
    pub front: Option<NodeId>,
    pub rear: Option<NodeId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BspTree {
    nodes: Vec<BspNode>,
    root: NodeId,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Front,
    Rear,
    Spanning,
}

impl BspTree {
    /// Build a tree over `polygons`; `None` when there is nothing to order.
    pub fn build(polygons: &[Polygon], vertices: &[Vec3]) -> Option<Self> {
        if polygons.is_empty() || polygons.len() > NodeId::MAX as usize {
            return None;
        }
        let ids: Vec<PolygonId> = (0..polygons.len() as PolygonId).collect();
        let mut nodes = Vec::with_capacity(polygons.len());
        let root = Self::build_node(&ids, polygons, vertices, &mut nodes)?;
        Some(Self { nodes, root })
    }

    fn build_node(
        ids: &[PolygonId],
        polygons: &[Polygon],
        vertices: &[Vec3],
        nodes: &mut Vec<BspNode>,
    ) -> Option<NodeId> {
        if ids.is_empty() {
            return None;
        }

        let splitter = Self::pick_splitter(ids, polygons, vertices);
        let plane = polygons[splitter as usize].plane;

        let mut front = Vec::new();
        let mut rear = Vec::new();
        for &id in ids.iter().filter(|&&id| id != splitter) {
            let poly = &polygons[id as usize];
            let side = match Self::classify(poly, splitter, polygons, vertices) {
                Side::Front => Side::Front,
                Side::Rear => Side::Rear,
                Side::Spanning if plane.distance(poly.centroid) >= -EPSILON => Side::Front,
                Side::Spanning => Side::Rear,
            };
            match side {
                Side::Rear => rear.push(id),
                _ => front.push(id),
            }
        }

        let slot = nodes.len();
        nodes.push(BspNode {
            polygon: splitter,
            front: None,
            rear: None,
        });
        let f = Self::build_node(&front, polygons, vertices, nodes);
        let r = Self::build_node(&rear, polygons, vertices, nodes);
        nodes[slot].front = f;
        nodes[slot].rear = r;
        Some(slot as NodeId)
    }

    /// Splitter with the fewest straddling polygons, ties broken by balance
    /// and then by definition order.
    fn pick_splitter(ids: &[PolygonId], polygons: &[Polygon], vertices: &[Vec3]) -> PolygonId {
        let mut best = ids[0];
        let mut best_score = (usize::MAX, usize::MAX);
        for &cand in ids {
            let (mut f, mut r, mut s) = (0usize, 0usize, 0usize);
            for &other in ids.iter().filter(|&&o| o != cand) {
                match Self::classify(&polygons[other as usize], cand, polygons, vertices) {
                    Side::Front => f += 1,
                    Side::Rear => r += 1,
                    Side::Spanning => s += 1,
                }
            }
            let score = (s, f.abs_diff(r));
            if score < best_score {
                best_score = score;
                best = cand;
            }
        }
        best
    }

    /// Where `poly` lies relative to the plane of `splitter`. Coplanar
    /// polygons facing the same way count as front.
    fn classify(
        poly: &Polygon,
        splitter: PolygonId,
        polygons: &[Polygon],
        vertices: &[Vec3],
    ) -> Side {
        let plane = polygons[splitter as usize].plane;
        let (mut front, mut rear) = (false, false);
        for d in &poly.defs {
            let dist = plane.distance(vertices[d.vertex as usize]);
            if dist > EPSILON {
                front = true;
            } else if dist < -EPSILON {
                rear = true;
            }
        }
        match (front, rear) {
            (true, true) => Side::Spanning,
            (false, true) => Side::Rear,
            (true, false) => Side::Front,
            (false, false) if poly.plane.normal.dot(plane.normal) >= 0.0 => Side::Front,
            (false, false) => Side::Rear,
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &BspNode {
        &self.nodes[id as usize]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walk the tree front-to-back for a camera at `camera` (relative to the
    /// block origin), calling `f` for every polygon. Activity and visibility
    /// filtering is the caller's job.
    pub fn visit<F: FnMut(PolygonId)>(&self, polygons: &[Polygon], camera: Vec3, f: &mut F) {
        self.visit_node(self.root, polygons, camera, f);
    }

    fn visit_node<F: FnMut(PolygonId)>(
        &self,
        id: NodeId,
        polygons: &[Polygon],
        camera: Vec3,
        f: &mut F,
    ) {
        let node = self.nodes[id as usize];
        let in_front = polygons[node.polygon as usize].plane.in_front(camera);
        let (near, far) = if in_front {
            (node.front, node.rear)
        } else {
            (node.rear, node.front)
        };

        // Near side first …
        if let Some(n) = near {
            self.visit_node(n, polygons, camera, f);
        }
        f(node.polygon);
        // … then whatever the splitter hides.
        if let Some(n) = far {
            self.visit_node(n, polygons, camera, f);
        }
    }
}

/// Definition-order fallback for blocks without a tree.
pub fn visit_unordered<F: FnMut(PolygonId)>(polygons: &[Polygon], f: &mut F) {
    for id in 0..polygons.len() as PolygonId {
        f(id);
    }
}
