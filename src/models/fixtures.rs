//! Synthetic datasets shared by unit tests.

use bevy_math::Vec3;

use super::{LinkFileData, NetworkFileData, NodeFileData, NodeId, PropBag, PropValue};

pub const ROOT: NodeId = 0;
pub const COMMUNITIES: i32 = 5;
pub const MEMBERS: i32 = 10;

/// Virtual root of community `c`.
pub fn community_root(c: i32) -> NodeId {
    1 + c
}

/// Real member `k` of community `c`.
pub fn member(c: i32, k: i32) -> NodeId {
    100 + c * MEMBERS + k
}

/// 50 real nodes in 5 communities under one virtual root, with 80 links.
///
/// Each community has a 10-ring plus two chords (60 inner links); every
/// community links its first four members to the next community (20 outer).
pub fn friends_network() -> NetworkFileData {
    friends_layout(|id| fibonacci_point(id, 1.0))
}

/// Same topology with positions produced by `place`.
pub fn friends_layout(place: impl Fn(NodeId) -> Vec3) -> NetworkFileData {
    let mut nodes = Vec::new();
    nodes.push(NodeFileData {
        idx: ROOT,
        label: "root".into(),
        virtual_node: true,
        child_idx: (0..COMMUNITIES).map(community_root).collect(),
        pos_3d: Some(Vec3::ZERO.to_array()),
        ..Default::default()
    });

    for c in 0..COMMUNITIES {
        nodes.push(NodeFileData {
            idx: community_root(c),
            label: format!("group-{}", c),
            virtual_node: true,
            height: 1,
            anc_idx: ROOT,
            child_idx: (0..MEMBERS).map(|k| member(c, k)).collect(),
            pos_3d: Some(place(community_root(c)).to_array()),
            ..Default::default()
        });
    }

    for c in 0..COMMUNITIES {
        for k in 0..MEMBERS {
            let id = member(c, k);
            let mut props = PropBag::new();
            props.insert("smoker".into(), PropValue::Bool(k % 2 == 0));
            props.insert("gpa".into(), PropValue::Number(2.0 + k as f64 * 0.2));
            let grade = if k == 9 {
                PropValue::Null
            } else {
                PropValue::Number((9 + k % 4) as f64)
            };
            props.insert("grade".into(), grade);

            nodes.push(NodeFileData {
                idx: id,
                label: format!("student-{}", id),
                anc_idx: community_root(c),
                pos_3d: Some(place(id).to_array()),
                props,
                ..Default::default()
            });
        }
    }

    let mut links = Vec::new();
    let mut push = |source: NodeId, target: NodeId| {
        let link_idx = links.len() as i32;
        links.push(LinkFileData {
            link_idx,
            source_idx: source,
            target_idx: target,
            ..Default::default()
        });
    };

    for c in 0..COMMUNITIES {
        for k in 0..MEMBERS {
            push(member(c, k), member(c, (k + 1) % MEMBERS));
        }
        push(member(c, 0), member(c, 5));
        push(member(c, 2), member(c, 7));
    }
    for c in 0..COMMUNITIES {
        for k in 0..4 {
            push(member(c, k), member((c + 1) % COMMUNITIES, k));
        }
    }

    NetworkFileData {
        coded: false,
        root_idx: ROOT,
        nodes,
        links,
    }
}

/// Deterministic point on a sphere of `radius` for an ID.
pub fn fibonacci_point(id: NodeId, radius: f32) -> Vec3 {
    let golden = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let i = id as f32 + 0.5;
    let theta = 2.0 * std::f32::consts::PI * i / golden;
    let phi = (1.0 - 2.0 * (i / 200.0).fract()).acos();
    Vec3::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos()) * radius
}
