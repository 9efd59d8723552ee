//! Node assignment from wires and port positions.

use std::collections::HashMap;

use qucs_format::WireRecord;

use crate::instance::ComponentInstance;

/// Node name given to everything touching a ground symbol.
pub const GROUND_NODE: &str = "gnd";

#[derive(Debug, Default)]
struct Nodes {
    ids: HashMap<(i32, i32), usize>,
    parent: Vec<usize>,
    /// How many wire ends and pins sit on each point.
    attachments: Vec<usize>,
}

impl Nodes {
    fn point(&mut self, at: (i32, i32)) -> usize {
        let next = self.parent.len();
        let id = *self.ids.entry(at).or_insert(next);
        if id == next {
            self.parent.push(id);
            self.attachments.push(0);
        }
        let root = self.find(id);
        self.attachments[root] += 1;
        id
    }

    fn find(&mut self, mut id: usize) -> usize {
        while self.parent[id] != id {
            self.parent[id] = self.parent[self.parent[id]];
            id = self.parent[id];
        }
        id
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb] = ra;
            self.attachments[ra] += self.attachments[rb];
        }
    }
}

/// Derive the connection of every port of `instances` from `wires`.
///
/// Ports on the same point, or on points joined by wires, share a node. A
/// wire label names its node, a ground symbol names its node
/// [`GROUND_NODE`]; other nodes are named `_net0`, `_net1`, ... in order of
/// first appearance. A port touching nothing else stays unconnected.
pub fn derive_connections(wires: &[WireRecord], instances: &mut [ComponentInstance]) {
    let mut nodes = Nodes::default();
    let mut labels: Vec<(usize, &str)> = Vec::new();

    for wire in wires {
        let a = nodes.point((wire.x1, wire.y1));
        let b = nodes.point((wire.x2, wire.y2));
        nodes.union(a, b);
        if let Some(label) = &wire.label {
            labels.push((a, label.as_str()));
        }
    }

    let pins: Vec<Vec<usize>> = instances
        .iter()
        .map(|inst| {
            inst.port_positions()
                .into_iter()
                .map(|at| nodes.point(at))
                .collect()
        })
        .collect();

    let mut names: HashMap<usize, String> = HashMap::new();
    for (point, label) in labels {
        let root = nodes.find(point);
        match names.get(&root) {
            Some(existing) if existing != label => {
                log::warn!("Node labelled both '{existing}' and '{label}', keeping '{existing}'");
            }
            Some(_) => {}
            None => {
                names.insert(root, label.to_string());
            }
        }
    }
    for (inst, pins) in instances.iter().zip(&pins) {
        if inst.is_ground() {
            for &pin in pins {
                let root = nodes.find(pin);
                names.insert(root, GROUND_NODE.to_string());
            }
        }
    }

    let mut next_net = 0;
    for (inst, pins) in instances.iter_mut().zip(&pins) {
        let connections = pins
            .iter()
            .map(|&pin| {
                let root = nodes.find(pin);
                if nodes.attachments[root] < 2 {
                    return None;
                }
                let name = names.entry(root).or_insert_with(|| {
                    let name = format!("_net{next_net}");
                    next_net += 1;
                    name
                });
                Some(name.clone())
            })
            .collect();
        inst.set_connections(connections);
    }
}
