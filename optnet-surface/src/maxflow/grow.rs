//! Tree growth and path augmentation

use crate::capacity::Capacity;
use crate::network::{sister, ArcId, NodeId};

use super::{BkMaxflow, Parent};

impl<C: Capacity> BkMaxflow<C> {
    /// Expand the tree of active node `i` across its non-saturated arcs
    ///
    /// Returns the arc joining the two trees, oriented from the source-tree
    /// endpoint to the sink-tree endpoint, or `None` once `i` is exhausted.
    pub(super) fn grow(&mut self, i: NodeId) -> Option<ArcId> {
        let me = self.nodes[i as usize];
        let range = self.net.out_range(i);

        for idx in range {
            let a = self.net.out_arcs[idx];
            // Residual in the direction the tree grows
            let cap = if me.sink {
                self.net.residual[sister(a) as usize]
            } else {
                self.net.residual[a as usize]
            };
            if !cap.is_positive() {
                continue;
            }

            let j = self.net.heads[a as usize];
            let other = &mut self.nodes[j as usize];

            if other.parent == Parent::None {
                other.sink = me.sink;
                other.parent = Parent::Arc(sister(a));
                other.ts = me.ts;
                other.dist = me.dist + 1;
                self.set_active(j);
            } else if other.sink != me.sink {
                return Some(if me.sink { sister(a) } else { a });
            } else if other.ts <= me.ts && other.dist > me.dist {
                // Shorter path to the terminal through i
                other.parent = Parent::Arc(sister(a));
                other.ts = me.ts;
                other.dist = me.dist + 1;
            }
        }
        None
    }

    /// Push the bottleneck along S -> ... -> tail(mid) -> head(mid) -> ... -> T
    pub(super) fn augment(&mut self, mid: ArcId) {
        let net = &self.net;

        // Bottleneck: middle arc, source half, sink half
        let mut bottleneck = net.residual[mid as usize];

        let mut u = net.tail(mid);
        while let Parent::Arc(a) = self.nodes[u as usize].parent {
            bottleneck = bottleneck.min_of(net.residual[sister(a) as usize]);
            u = net.heads[a as usize];
        }
        bottleneck = bottleneck.min_of(net.tr_cap[u as usize]);

        let mut u = net.head(mid);
        while let Parent::Arc(a) = self.nodes[u as usize].parent {
            bottleneck = bottleneck.min_of(net.residual[a as usize]);
            u = net.heads[a as usize];
        }
        bottleneck = bottleneck.min_of(-net.tr_cap[u as usize]);

        // Middle arc
        self.net.residual[sister(mid) as usize] += bottleneck;
        self.net.residual[mid as usize] -= bottleneck;

        // Source half: flow runs parent -> child
        let mut u = self.net.tail(mid);
        while let Parent::Arc(a) = self.nodes[u as usize].parent {
            self.net.residual[a as usize] += bottleneck;
            self.net.residual[sister(a) as usize] -= bottleneck;
            if !self.net.residual[sister(a) as usize].is_positive() {
                self.set_orphan_front(u);
            }
            u = self.net.heads[a as usize];
        }
        self.net.tr_cap[u as usize] -= bottleneck;
        if !self.net.tr_cap[u as usize].is_positive() {
            self.set_orphan_front(u);
        }

        // Sink half: flow runs child -> parent
        let mut u = self.net.head(mid);
        while let Parent::Arc(a) = self.nodes[u as usize].parent {
            self.net.residual[sister(a) as usize] += bottleneck;
            self.net.residual[a as usize] -= bottleneck;
            if !self.net.residual[a as usize].is_positive() {
                self.set_orphan_front(u);
            }
            u = self.net.heads[a as usize];
        }
        self.net.tr_cap[u as usize] += bottleneck;
        if self.net.tr_cap[u as usize] >= C::ZERO {
            self.set_orphan_front(u);
        }

        self.flow += bottleneck;
        self.stats.augmentations += 1;
        tracing::trace!(
            bottleneck = ?bottleneck,
            flow = ?self.flow,
            "augmented path"
        );
    }
}
