//! Orphan adoption
//!
//! An orphan looks for a neighbour of its own tree, connected through a
//! non-saturated arc, whose parent chain still reaches the terminal. Among
//! valid candidates the one closest to the terminal wins. Without one the
//! orphan is freed: its children become orphans and neighbours that could
//! reclaim it are re-activated.

use crate::capacity::Capacity;
use crate::network::{sister, NodeId};

use super::{BkMaxflow, Parent};

impl<C: Capacity> BkMaxflow<C> {
    #[inline(always)]
    pub(super) fn set_orphan_front(&mut self, u: NodeId) {
        self.nodes[u as usize].parent = Parent::Orphan;
        self.orphans.push_front(u);
    }

    #[inline(always)]
    fn set_orphan_rear(&mut self, u: NodeId) {
        self.nodes[u as usize].parent = Parent::Orphan;
        self.orphans.push_back(u);
    }

    pub(super) fn adopt_orphans(&mut self) {
        while let Some(i) = self.orphans.pop_front() {
            self.stats.orphans += 1;
            self.process_orphan(i);
        }
    }

    /// Distance from `j` to its tree's terminal, or `None` if the chain
    /// runs into an orphan
    fn origin_distance(&mut self, mut j: NodeId) -> Option<u32> {
        let time = self.time;
        let mut d = 0u32;
        loop {
            let s = &mut self.nodes[j as usize];
            if s.ts == time {
                return Some(d + s.dist);
            }
            d += 1;
            match s.parent {
                Parent::Terminal => {
                    s.ts = time;
                    s.dist = 1;
                    return Some(d);
                }
                Parent::Arc(a) => j = self.net.heads[a as usize],
                Parent::Orphan | Parent::None => return None,
            }
        }
    }

    fn process_orphan(&mut self, i: NodeId) {
        let sink = self.nodes[i as usize].sink;
        let time = self.time;
        let mut best: Option<(u32, u32)> = None;

        for idx in self.net.out_range(i) {
            let a0 = self.net.out_arcs[idx];
            // Residual from the candidate parent's side toward the orphan's tree
            let cap = if sink {
                self.net.residual[a0 as usize]
            } else {
                self.net.residual[sister(a0) as usize]
            };
            if !cap.is_positive() {
                continue;
            }

            let j = self.net.heads[a0 as usize];
            let cand = self.nodes[j as usize];
            if cand.sink != sink || cand.parent == Parent::None {
                continue;
            }

            if let Some(mut d) = self.origin_distance(j) {
                if best.map_or(true, |(_, d_min)| d < d_min) {
                    best = Some((a0, d));
                }
                // Cache distances along the checked path
                let mut k = j;
                while self.nodes[k as usize].ts != time {
                    let s = &mut self.nodes[k as usize];
                    s.ts = time;
                    s.dist = d;
                    d -= 1;
                    match s.parent {
                        Parent::Arc(a) => k = self.net.heads[a as usize],
                        _ => break,
                    }
                }
            }
        }

        if let Some((a0, d_min)) = best {
            let s = &mut self.nodes[i as usize];
            s.parent = Parent::Arc(a0);
            s.ts = time;
            s.dist = d_min + 1;
            return;
        }

        // No parent: free i
        self.nodes[i as usize].parent = Parent::None;
        for idx in self.net.out_range(i) {
            let a0 = self.net.out_arcs[idx];
            let j = self.net.heads[a0 as usize];
            let nb = self.nodes[j as usize];
            if nb.sink != sink || nb.parent == Parent::None {
                continue;
            }

            let cap = if sink {
                self.net.residual[a0 as usize]
            } else {
                self.net.residual[sister(a0) as usize]
            };
            if cap.is_positive() {
                self.set_active(j);
            }
            if let Parent::Arc(a) = nb.parent {
                if self.net.heads[a as usize] == i {
                    self.set_orphan_rear(j);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::maxflow::BkMaxflow;
    use crate::network::FlowNetwork;

    #[test]
    fn test_orphans_are_adopted_or_freed() {
        // 0,1 fed by S; 4,5 drain to T; 2,3 in the middle
        let mut net = FlowNetwork::<i64>::with_capacity(6, 7).unwrap();
        net.add_tweights(0, 5, 0);
        net.add_tweights(1, 5, 0);
        net.add_tweights(4, 0, 5);
        net.add_tweights(5, 0, 5);
        net.add_edge(0, 2, 3, 0).unwrap();
        net.add_edge(1, 2, 3, 0).unwrap();
        net.add_edge(1, 3, 2, 0).unwrap();
        net.add_edge(2, 4, 4, 0).unwrap();
        net.add_edge(2, 5, 1, 0).unwrap();
        net.add_edge(3, 5, 5, 0).unwrap();
        net.add_edge(2, 3, 1, 0).unwrap();

        let mut mf = BkMaxflow::new(net).unwrap();
        let flow = mf.solve(None).unwrap();
        // Min cut {S, 0, 1}: 3 + 3 + 2
        assert_eq!(flow, 8);
        // S -> 0 keeps residual capacity, S -> 1 is saturated
        assert!(mf.is_source_side(0));
        assert!(!mf.is_source_side(1));
        assert!(!mf.is_source_side(4));
        assert!(mf.stats().orphans > 0);
    }
}
