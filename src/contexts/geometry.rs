//! Aggregate geometry of communities: mass, center, size and hulls.

use bevy_math::Vec3;
use parry3d::na::Point3;
use parry3d::transformation;

/// Floor for community sizes so single-node communities stay visible.
pub const MIN_COMMUNITY_SIZE: f64 = 0.1;
/// Mass contributed by every member on top of its degree.
pub const MASS_PER_NODE: f64 = 0.01;

/// Aggregate properties of a group of positioned nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupProps {
    pub mass: f64,
    pub center: Vec3,
    pub size: f64,
}

/// Mass, mean position and radius of `(degree, position)` samples.
pub fn group_props(members: &[(f64, Vec3)]) -> GroupProps {
    if members.is_empty() {
        return GroupProps {
            mass: 0.0,
            center: Vec3::ZERO,
            size: MIN_COMMUNITY_SIZE,
        };
    }

    let mass = members.iter().map(|(degree, _)| degree + MASS_PER_NODE).sum();
    let center = members.iter().map(|(_, p)| *p).sum::<Vec3>() / members.len() as f32;
    let radius = members
        .iter()
        .map(|(_, p)| p.distance(center) as f64)
        .fold(0.0_f64, f64::max);

    GroupProps {
        mass,
        center,
        size: radius.max(MIN_COMMUNITY_SIZE),
    }
}

/// Triangle mesh enclosing a group, relative to its center.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hull {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl Hull {
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

/// Unit icosahedron vertices.
fn icosahedron() -> [Vec3; 12] {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    [
        Vec3::new(-1.0, t, 0.0),
        Vec3::new(1.0, t, 0.0),
        Vec3::new(-1.0, -t, 0.0),
        Vec3::new(1.0, -t, 0.0),
        Vec3::new(0.0, -1.0, t),
        Vec3::new(0.0, 1.0, t),
        Vec3::new(0.0, -1.0, -t),
        Vec3::new(0.0, 1.0, -t),
        Vec3::new(t, 0.0, -1.0),
        Vec3::new(t, 0.0, 1.0),
        Vec3::new(-t, 0.0, -1.0),
        Vec3::new(-t, 0.0, 1.0),
    ]
    .map(Vec3::normalize)
}

const ICOSAHEDRON_FACES: [[u32; 3]; 20] = [
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
];

/// Icosahedron of `radius` around `center`, relative to `origin`.
fn sphere_hull(center: Vec3, radius: f32, origin: Vec3) -> Hull {
    Hull {
        vertices: icosahedron()
            .iter()
            .map(|v| center - origin + *v * radius)
            .collect(),
        triangles: ICOSAHEDRON_FACES.to_vec(),
    }
}

/// Convex hull of spheres of `radius` around each point, relative to `origin`.
///
/// Degenerate inputs (a single point, coplanar samples the hull routine
/// rejects) fall back to a sphere around `origin` sized to enclose them.
pub fn convex_hull(points: &[Vec3], radius: f32, origin: Vec3) -> Hull {
    if points.is_empty() {
        return Hull::default();
    }

    let samples: Vec<Point3<f32>> = points
        .iter()
        .flat_map(|p| icosahedron().map(move |v| *p - origin + v * radius))
        .map(|v| Point3::new(v.x, v.y, v.z))
        .collect();

    match transformation::try_convex_hull(&samples) {
        Ok((vertices, triangles)) if !triangles.is_empty() => Hull {
            vertices: vertices.iter().map(|p| Vec3::new(p.x, p.y, p.z)).collect(),
            triangles,
        },
        _ => {
            let spread = points
                .iter()
                .map(|p| p.distance(origin))
                .fold(0.0_f32, f32::max);
            sphere_hull(origin, spread + radius, origin)
        }
    }
}
