//! HeuristicAnalyzer - degraded local vision fallback
//!
//! ## Responsibilities
//!
//! - Face presence estimation from skin-tone cell clustering
//! - Motion estimation against the retained previous frame
//! - Blank-frame rejection via edge density
//!
//! Lower fidelity than the model server: face boxes are coarse, face count
//! is approximate, and object labeling is unavailable. The returned shapes
//! are identical, so callers cannot tell the backends apart.

use crate::detection::FaceBox;
use crate::frame_sampler::Frame;
use tokio::sync::RwLock;

/// Analysis cell edge in pixels
const CELL: u32 = 16;
/// Minimum skin-pixel ratio for a cell to join a cluster
const SKIN_CELL_RATIO: f32 = 0.35;
/// Minimum cells per accepted face cluster
const MIN_CLUSTER_CELLS: usize = 4;
/// Minimum fraction of adjacent cell pairs with a luma step; below this the
/// frame is considered blank (covered lens, black frame)
const EDGE_DENSITY_FLOOR: f32 = 0.003;
/// Luma step between adjacent cells counted as an edge
const EDGE_LUMA_STEP: i16 = 24;
/// Mean per-cell luma change against the previous frame counted as motion
const MOTION_LUMA_STEP: f32 = 10.0;

/// Downsampled luma plane retained between frames
struct LumaGrid {
    cells: Vec<u8>,
    grid_w: u32,
    grid_h: u32,
}

/// Heuristic fallback backend
pub struct HeuristicAnalyzer {
    prev_luma: RwLock<Option<LumaGrid>>,
}

impl HeuristicAnalyzer {
    /// Create new analyzer
    pub fn new() -> Self {
        Self {
            prev_luma: RwLock::new(None),
        }
    }

    /// Estimate face boxes for a frame.
    ///
    /// Returns raw candidates with heuristic confidences; the caller applies
    /// the confidence cut.
    pub async fn find_faces(&self, frame: &Frame) -> Vec<FaceBox> {
        if !frame.is_ready() {
            return Vec::new();
        }

        let grid_w = (frame.width / CELL).max(1);
        let grid_h = (frame.height / CELL).max(1);
        let mut skin_ratio = vec![0.0f32; (grid_w * grid_h) as usize];
        let mut luma = vec![0u8; (grid_w * grid_h) as usize];

        for gy in 0..grid_h {
            for gx in 0..grid_w {
                let (ratio, mean_luma) = cell_stats(frame, gx, gy, grid_w, grid_h);
                skin_ratio[(gy * grid_w + gx) as usize] = ratio;
                luma[(gy * grid_w + gx) as usize] = mean_luma;
            }
        }

        let motion = {
            let mut prev = self.prev_luma.write().await;
            let motion = prev.as_ref().and_then(|p| {
                (p.grid_w == grid_w && p.grid_h == grid_h).then(|| cell_diff(&p.cells, &luma))
            });
            *prev = Some(LumaGrid {
                cells: luma.clone(),
                grid_w,
                grid_h,
            });
            motion
        };

        if edge_density(&luma, grid_w, grid_h) < EDGE_DENSITY_FLOOR {
            tracing::debug!("Frame rejected as blank (no luma structure)");
            return Vec::new();
        }

        let clusters = skin_clusters(&skin_ratio, grid_w, grid_h);

        clusters
            .into_iter()
            .filter(|c| c.cells.len() >= MIN_CLUSTER_CELLS)
            .map(|c| {
                let mean_ratio = c
                    .cells
                    .iter()
                    .map(|&i| skin_ratio[i])
                    .sum::<f32>()
                    / c.cells.len() as f32;

                let moving = motion
                    .as_ref()
                    .map(|m| {
                        let cluster_motion = c.cells.iter().map(|&i| m[i] as f32).sum::<f32>()
                            / c.cells.len() as f32;
                        cluster_motion > MOTION_LUMA_STEP
                    })
                    .unwrap_or(false);

                let confidence =
                    (0.5 + 0.35 * mean_ratio + if moving { 0.1 } else { 0.0 }).min(0.95);

                FaceBox {
                    x: (c.min_x * CELL) as f32,
                    y: (c.min_y * CELL) as f32,
                    width: ((c.max_x - c.min_x + 1) * CELL) as f32,
                    height: ((c.max_y - c.min_y + 1) * CELL) as f32,
                    confidence,
                }
            })
            .collect()
    }
}

impl Default for HeuristicAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Skin ratio and mean luma for one grid cell
fn cell_stats(frame: &Frame, gx: u32, gy: u32, grid_w: u32, grid_h: u32) -> (f32, u8) {
    let x0 = gx * CELL;
    let y0 = gy * CELL;
    // Edge cells absorb the remainder
    let x1 = if gx == grid_w - 1 {
        frame.width
    } else {
        x0 + CELL
    };
    let y1 = if gy == grid_h - 1 {
        frame.height
    } else {
        y0 + CELL
    };

    let mut skin = 0u32;
    let mut total = 0u32;
    let mut luma_sum = 0u64;

    for y in y0..y1 {
        for x in x0..x1 {
            let i = ((y * frame.width + x) * 3) as usize;
            let (r, g, b) = (frame.data[i], frame.data[i + 1], frame.data[i + 2]);
            if is_skin(r, g, b) {
                skin += 1;
            }
            luma_sum += (r as u64 * 299 + g as u64 * 587 + b as u64 * 114) / 1000;
            total += 1;
        }
    }

    if total == 0 {
        return (0.0, 0);
    }
    (skin as f32 / total as f32, (luma_sum / total as u64) as u8)
}

/// RGB skin-tone test
fn is_skin(r: u8, g: u8, b: u8) -> bool {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    r > 95
        && g > 40
        && b > 20
        && (max - min) > 15
        && (r as i16 - g as i16).abs() > 15
        && r > g
        && r > b
}

/// Fraction of adjacent cell pairs with a significant luma step
fn edge_density(luma: &[u8], grid_w: u32, grid_h: u32) -> f32 {
    let mut edges = 0u32;
    let mut pairs = 0u32;

    for gy in 0..grid_h {
        for gx in 0..grid_w {
            let here = luma[(gy * grid_w + gx) as usize] as i16;
            if gx + 1 < grid_w {
                pairs += 1;
                if (here - luma[(gy * grid_w + gx + 1) as usize] as i16).abs() > EDGE_LUMA_STEP {
                    edges += 1;
                }
            }
            if gy + 1 < grid_h {
                pairs += 1;
                if (here - luma[((gy + 1) * grid_w + gx) as usize] as i16).abs() > EDGE_LUMA_STEP {
                    edges += 1;
                }
            }
        }
    }

    if pairs == 0 {
        return 0.0;
    }
    edges as f32 / pairs as f32
}

/// Absolute per-cell luma change between two same-size grids
fn cell_diff(prev: &[u8], current: &[u8]) -> Vec<u8> {
    prev.iter()
        .zip(current.iter())
        .map(|(&p, &c)| (p as i16 - c as i16).unsigned_abs().min(255) as u8)
        .collect()
}

/// Connected group of skin cells
struct Cluster {
    cells: Vec<usize>,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

/// Group skin cells into 4-connected clusters
fn skin_clusters(skin_ratio: &[f32], grid_w: u32, grid_h: u32) -> Vec<Cluster> {
    let mut visited = vec![false; skin_ratio.len()];
    let mut clusters = Vec::new();

    for start in 0..skin_ratio.len() {
        if visited[start] || skin_ratio[start] <= SKIN_CELL_RATIO {
            continue;
        }

        let mut cluster = Cluster {
            cells: Vec::new(),
            min_x: grid_w,
            min_y: grid_h,
            max_x: 0,
            max_y: 0,
        };
        let mut stack = vec![start];
        visited[start] = true;

        while let Some(idx) = stack.pop() {
            let gx = idx as u32 % grid_w;
            let gy = idx as u32 / grid_w;
            cluster.cells.push(idx);
            cluster.min_x = cluster.min_x.min(gx);
            cluster.min_y = cluster.min_y.min(gy);
            cluster.max_x = cluster.max_x.max(gx);
            cluster.max_y = cluster.max_y.max(gy);

            let mut neighbors = Vec::with_capacity(4);
            if gx > 0 {
                neighbors.push(idx - 1);
            }
            if gx + 1 < grid_w {
                neighbors.push(idx + 1);
            }
            if gy > 0 {
                neighbors.push(idx - grid_w as usize);
            }
            if gy + 1 < grid_h {
                neighbors.push(idx + grid_w as usize);
            }

            for n in neighbors {
                if !visited[n] && skin_ratio[n] > SKIN_CELL_RATIO {
                    visited[n] = true;
                    stack.push(n);
                }
            }
        }

        clusters.push(cluster);
    }

    clusters
}
