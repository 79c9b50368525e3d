//! Incremental 3-D Delaunay tetrahedralization (Bowyer-Watson)
//!
//! The mesh starts as a cube of half-width `extent` split into six
//! tetrahedra that share the main diagonal. Every inserted site must lie
//! strictly inside the cube, so the convex hull never changes and every
//! query inside the cube falls in exactly one tetrahedron.
//!
//! Vertices `0..8` are the cube corners, indexed bitwise
//! (bit 0 → x, bit 1 → y, bit 2 → z; set bit = `+extent`).
//!
//! Point location is a stochastic visibility walk with a brute-force scan
//! as a last resort. All tetrahedra are kept positively oriented.
//!
//! Reference:
//! Bowyer, A. (1981). Computing Dirichlet tessellations. The Computer Journal, 24(2).
//! Devillers, O., Pion, S., Teillaud, M. (2002). Walking in a triangulation. IJFCS, 13(2).

use std::collections::HashMap;

use lira_core::{Error, Result};

use super::Site;

/// Number of synthetic cube-corner vertices
pub const CORNER_COUNT: usize = 8;

#[derive(Debug, Clone)]
struct Tet {
    v: [usize; 4],
    /// `adj[i]` shares the face opposite `v[i]`
    adj: [Option<usize>; 4],
    alive: bool,
    /// Equals the mesh epoch while the tetrahedron is in the current cavity
    mark: u64,
}

/// A Delaunay tetrahedralization of sites inside a bounding cube.
#[derive(Debug, Clone)]
pub struct Tetrahedralization {
    points: Vec<Site>,
    tets: Vec<Tet>,
    /// Dead slots available for reuse
    free: Vec<usize>,
    /// One live tetrahedron incident to each vertex
    vertex_tet: Vec<usize>,
    last: usize,
    rng: u64,
    /// Insertion counter stamped on cavity members
    epoch: u64,
    /// Tetrahedra destroyed by insertions so far
    removed: usize,
}

impl Tetrahedralization {
    /// Create the initial six-tetrahedron cube `[-extent, extent]³`.
    pub fn new(extent: f64) -> Self {
        let points = (0..CORNER_COUNT)
            .map(|i| {
                let c = |bit: usize| if i & bit != 0 { extent } else { -extent };
                Site::new(c(1), c(2), c(4))
            })
            .collect();

        let mut mesh = Self {
            points,
            tets: Vec::with_capacity(64),
            free: Vec::new(),
            vertex_tet: vec![0; CORNER_COUNT],
            last: 0,
            rng: 0x9E37_79B9_7F4A_7C15,
            epoch: 0,
            removed: 0,
        };

        // Kuhn decomposition: every path 000 → 111 along cube edges
        const PATHS: [(usize, usize); 6] = [(1, 3), (1, 5), (2, 3), (2, 6), (4, 5), (4, 6)];
        for (a, b) in PATHS {
            let mut v = [0, a, b, 7];
            if orient(&mesh.corners_of(&v)) < 0.0 {
                v.swap(0, 1);
            }
            mesh.tets.push(Tet {
                v,
                adj: [None; 4],
                alive: true,
                mark: 0,
            });
        }

        let mut faces: HashMap<[usize; 3], (usize, usize)> = HashMap::new();
        for t in 0..mesh.tets.len() {
            for i in 0..4 {
                let key = face_key(&mesh.tets[t].v, i);
                if let Some((u, k)) = faces.remove(&key) {
                    mesh.tets[t].adj[i] = Some(u);
                    mesh.tets[u].adj[k] = Some(t);
                } else {
                    faces.insert(key, (t, i));
                }
            }
        }

        for t in 0..mesh.tets.len() {
            for &j in &mesh.tets[t].v {
                mesh.vertex_tet[j] = t;
            }
        }
        mesh
    }

    /// Number of vertices, including the cube corners
    pub fn vertex_count(&self) -> usize {
        self.points.len()
    }

    /// Number of live tetrahedra
    pub fn tetrahedron_count(&self) -> usize {
        self.tets.iter().filter(|t| t.alive).count()
    }

    pub fn point(&self, vertex: usize) -> Site {
        self.points[vertex]
    }

    pub fn points(&self) -> &[Site] {
        &self.points
    }

    /// Total number of tetrahedra replaced by insertions
    pub fn removed_count(&self) -> usize {
        self.removed
    }

    /// Vertex indices of every live tetrahedron
    pub fn tetrahedra(&self) -> impl Iterator<Item = [usize; 4]> + '_ {
        self.tets.iter().filter(|t| t.alive).map(|t| t.v)
    }

    /// Insert a site and return its vertex index.
    ///
    /// A site equal to an existing vertex is not inserted again; the
    /// existing index is returned.
    pub fn insert(&mut self, p: Site) -> Result<usize> {
        let mut rng = self.rng;
        let located = self.walk(&p, self.last, &mut rng);
        self.rng = rng;

        let t = located.ok_or_else(|| outside(&p))?;
        if let Some(&j) = self.tets[t].v.iter().find(|&&j| self.points[j] == p) {
            return Ok(j);
        }

        let cavity = self.cavity(t, &p)?;
        let boundary = self.cavity_boundary(&cavity);

        let pi = self.points.len();
        self.points.push(p);

        let mut created = Vec::with_capacity(boundary.len());
        let mut edges: HashMap<(usize, usize), (usize, usize)> = HashMap::new();
        for (c, i) in boundary {
            let mut v = self.tets[c].v;
            v[i] = pi;
            let outer = self.tets[c].adj[i];

            let mut adj = [None; 4];
            adj[i] = outer;
            let nt = self.allocate(Tet {
                v,
                adj,
                alive: true,
                mark: 0,
            });

            if let Some(n) = outer {
                // Vertex of the outer tetrahedron opposite the shared face
                if let Some(k) = (0..4).find(|&k| !v.contains(&self.tets[n].v[k])) {
                    self.tets[n].adj[k] = Some(nt);
                }
            }

            for j in (0..4).filter(|&j| j != i) {
                let mut others = (0..4).filter(|&m| m != i && m != j).map(|m| v[m]);
                let (a, b) = match (others.next(), others.next()) {
                    (Some(a), Some(b)) => (a.min(b), a.max(b)),
                    _ => continue,
                };
                if let Some((u, k)) = edges.remove(&(a, b)) {
                    self.tets[nt].adj[j] = Some(u);
                    self.tets[u].adj[k] = Some(nt);
                } else {
                    edges.insert((a, b), (nt, j));
                }
            }
            created.push(nt);
        }
        debug_assert!(edges.is_empty(), "cavity boundary is not closed");

        for &c in &cavity {
            self.tets[c].alive = false;
            self.tets[c].adj = [None; 4];
            self.free.push(c);
        }
        self.removed += cavity.len();

        self.vertex_tet.push(created[0]);
        for &nt in &created {
            for &j in &self.tets[nt].v {
                self.vertex_tet[j] = nt;
            }
        }
        self.last = created[0];
        Ok(pi)
    }

    /// Find the tetrahedron containing `q`, starting the walk from one
    /// incident to `hint` when given.
    ///
    /// Returns `None` when `q` lies outside the bounding cube.
    pub fn locate(&self, q: &Site, hint: Option<usize>) -> Option<usize> {
        let start = hint
            .and_then(|v| self.vertex_tet.get(v).copied())
            .filter(|&t| self.tets[t].alive)
            .unwrap_or(self.last);

        let mut rng = (q.x.to_bits() ^ q.y.to_bits().rotate_left(21) ^ q.z.to_bits().rotate_left(42)) | 1;
        self.walk(q, start, &mut rng)
    }

    /// Vertices of tetrahedron `tet` and the barycentric weights of `q`.
    pub fn barycentric(&self, tet: usize, q: &Site) -> ([usize; 4], [f64; 4]) {
        let v = self.tets[tet].v;
        let p = self.corners_of(&v);
        let total = orient(&p);

        let weights = std::array::from_fn(|i| {
            let mut pq = p;
            pq[i] = *q;
            orient(&pq) / total
        });
        (v, weights)
    }

    fn corners_of(&self, v: &[usize; 4]) -> [Site; 4] {
        [self.points[v[0]], self.points[v[1]], self.points[v[2]], self.points[v[3]]]
    }

    fn allocate(&mut self, tet: Tet) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.tets[slot] = tet;
                slot
            }
            None => {
                self.tets.push(tet);
                self.tets.len() - 1
            }
        }
    }

    /// Tetrahedra whose circumsphere contains `p`, grown until `p` sees
    /// every boundary face from the inside.
    ///
    /// Members are stamped with a fresh epoch; [`Self::cavity_boundary`]
    /// relies on those stamps.
    fn cavity(&mut self, seed: usize, p: &Site) -> Result<Vec<usize>> {
        self.epoch += 1;
        let epoch = self.epoch;

        self.tets[seed].mark = epoch;
        let mut cavity = vec![seed];
        let mut stack = vec![seed];
        while let Some(c) = stack.pop() {
            for n in self.tets[c].adj.into_iter().flatten() {
                if self.tets[n].mark == epoch {
                    continue;
                }
                let v = self.corners_of(&self.tets[n].v);
                if insphere(&v, p) < 0.0 {
                    self.tets[n].mark = epoch;
                    cavity.push(n);
                    stack.push(n);
                }
            }
        }

        // Round-off can leave a cavity that is not star-shaped from p.
        // A face seen from outside stays so, hence only the faces of
        // newly added members need checking.
        let mut pending = cavity.clone();
        while let Some(c) = pending.pop() {
            for i in 0..4 {
                let n = self.tets[c].adj[i];
                if n.is_some_and(|n| self.tets[n].mark == epoch) {
                    continue;
                }
                let mut f = self.corners_of(&self.tets[c].v);
                f[i] = *p;
                if orient(&f) <= 0.0 {
                    let n = n.ok_or_else(|| outside(p))?;
                    self.tets[n].mark = epoch;
                    cavity.push(n);
                    pending.push(n);
                }
            }
        }
        Ok(cavity)
    }

    /// Faces `(tet, i)` on the boundary of the cavity just computed
    fn cavity_boundary(&self, cavity: &[usize]) -> Vec<(usize, usize)> {
        let mut boundary = Vec::new();
        for &c in cavity {
            for i in 0..4 {
                match self.tets[c].adj[i] {
                    Some(n) if self.tets[n].mark == self.epoch => {}
                    _ => boundary.push((c, i)),
                }
            }
        }
        boundary
    }

    fn walk(&self, q: &Site, start: usize, rng: &mut u64) -> Option<usize> {
        let mut t = start;
        let max_steps = 4 * self.tets.len() + 64;

        for _ in 0..max_steps {
            let tet = &self.tets[t];
            if tet.v.iter().any(|&j| self.points[j] == *q) {
                return Some(t);
            }

            *rng = xorshift(*rng);
            let k = (*rng >> 62) as usize;

            let p = self.corners_of(&tet.v);
            let mut next = None;
            for r in 0..4 {
                let i = (r + k) % 4;
                let mut pq = p;
                pq[i] = *q;
                if orient(&pq) < 0.0 {
                    match tet.adj[i] {
                        Some(n) => {
                            next = Some(n);
                            break;
                        }
                        None => return None,
                    }
                }
            }

            match next {
                Some(n) => t = n,
                None => return Some(t),
            }
        }

        tracing::trace!(x = q.x, y = q.y, z = q.z, "walk did not settle, scanning all tetrahedra");
        self.scan(q)
    }

    /// Live tetrahedron maximizing the smallest barycentric weight of `q`
    fn scan(&self, q: &Site) -> Option<usize> {
        let mut best = None;
        let mut best_weight = f64::NEG_INFINITY;
        for t in (0..self.tets.len()).filter(|&t| self.tets[t].alive) {
            let (_, w) = self.barycentric(t, q);
            let min = w.iter().copied().fold(f64::INFINITY, f64::min);
            if min > best_weight {
                best_weight = min;
                best = Some(t);
            }
        }
        best.filter(|_| best_weight >= 0.0)
    }
}

fn outside(p: &Site) -> Error {
    Error::InvalidParameter {
        name: "site",
        value: format!("({}, {}, {})", p.x, p.y, p.z),
        reason: "outside the bounding cube of the tetrahedralization".into(),
    }
}

fn face_key(v: &[usize; 4], skip: usize) -> [usize; 3] {
    let mut key = [0; 3];
    let mut n = 0;
    for (j, &vj) in v.iter().enumerate() {
        if j != skip {
            key[n] = vj;
            n += 1;
        }
    }
    key.sort_unstable();
    key
}

#[inline]
pub(crate) fn xorshift(mut x: u64) -> u64 {
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x
}

#[inline]
fn sub(a: &Site, b: &Site) -> [f64; 3] {
    [a.x - b.x, a.y - b.y, a.z - b.z]
}

#[inline]
fn det3(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> f64 {
    a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0]) + a[2] * (b[0] * c[1] - b[1] * c[0])
}

/// Six times the signed volume of `(p0, p1, p2, p3)`.
///
/// Differences are taken against the vertex of smallest magnitude; with
/// corner vertices at ±1e10 any other pivot loses all significant digits
/// of the small edges.
pub(crate) fn orient(p: &[Site; 4]) -> f64 {
    let k = (0..4)
        .min_by(|&a, &b| p[a].magnitude().total_cmp(&p[b].magnitude()))
        .unwrap_or(0);

    let mut rows = [[0.0; 3]; 3];
    let mut r = 0;
    for (j, pj) in p.iter().enumerate() {
        if j != k {
            rows[r] = sub(pj, &p[k]);
            r += 1;
        }
    }
    let d = det3(rows[0], rows[1], rows[2]);
    // Moving p[k] to the front is k transpositions
    if k % 2 == 1 {
        -d
    } else {
        d
    }
}

/// Negative when `e` lies inside the circumsphere of the positively
/// oriented tetrahedron `p`.
fn insphere(p: &[Site; 4], e: &Site) -> f64 {
    let rows: [[f64; 4]; 4] = std::array::from_fn(|i| {
        let [x, y, z] = sub(&p[i], e);
        [x, y, z, x * x + y * y + z * z]
    });
    let minor = |skip: usize| {
        let mut m = [[0.0; 3]; 3];
        let mut r = 0;
        for (i, row) in rows.iter().enumerate() {
            if i != skip {
                m[r] = [row[0], row[1], row[2]];
                r += 1;
            }
        }
        det3(m[0], m[1], m[2])
    };
    -rows[0][3] * minor(0) + rows[1][3] * minor(1) - rows[2][3] * minor(2) + rows[3][3] * minor(3)
}
