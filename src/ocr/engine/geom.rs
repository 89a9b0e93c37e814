#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct BBoxPx {
    pub(super) x: u32,
    pub(super) y: u32,
    pub(super) w: u32,
    pub(super) h: u32,
}

pub(super) fn union_bbox(a: &BBoxPx, b: &BBoxPx) -> BBoxPx {
    let x1 = a.x.min(b.x);
    let y1 = a.y.min(b.y);
    let x2 = (a.x + a.w).max(b.x + b.w);
    let y2 = (a.y + a.h).max(b.y + b.h);
    BBoxPx {
        x: x1,
        y: y1,
        w: x2 - x1,
        h: y2 - y1,
    }
}

/// Clockwise corners starting at the top-left.
pub(super) fn to_polygon(bbox: &BBoxPx) -> [[f64; 2]; 4] {
    let x1 = bbox.x as f64;
    let y1 = bbox.y as f64;
    let x2 = (bbox.x + bbox.w) as f64;
    let y2 = (bbox.y + bbox.h) as f64;
    [[x1, y1], [x2, y1], [x2, y2], [x1, y2]]
}
