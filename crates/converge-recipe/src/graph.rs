/// Notification graph over step indices, for validation and inspection.
#[derive(Debug, Clone)]
pub struct NotificationGraph {
  /// step -> steps it notifies.
  downstream: Vec<Vec<usize>>,
  /// step -> steps that notify it.
  upstream: Vec<Vec<usize>>,
}

impl NotificationGraph {
  /// Build a graph from a step count and `(notifier, target)` edges.
  pub fn new(step_count: usize, edges: &[(usize, usize)]) -> Self {
    let mut downstream = vec![Vec::new(); step_count];
    let mut upstream = vec![Vec::new(); step_count];

    for &(from, to) in edges {
      if !downstream[from].contains(&to) {
        downstream[from].push(to);
        upstream[to].push(from);
      }
    }

    Self {
      downstream,
      upstream,
    }
  }

  /// Steps notified by `step`.
  pub fn targets(&self, step: usize) -> &[usize] {
    self
      .downstream
      .get(step)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Steps that notify `step`.
  pub fn notifiers(&self, step: usize) -> &[usize] {
    self
      .upstream
      .get(step)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Find a notification cycle, returned as the path of step indices with the
  /// first step repeated at the end.
  pub fn find_cycle(&self) -> Option<Vec<usize>> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
      Unvisited,
      InProgress,
      Done,
    }

    fn visit(
      node: usize,
      downstream: &[Vec<usize>],
      marks: &mut [Mark],
      stack: &mut Vec<usize>,
    ) -> Option<Vec<usize>> {
      marks[node] = Mark::InProgress;
      stack.push(node);

      for &next in &downstream[node] {
        match marks[next] {
          // Back edge
          Mark::InProgress => {
            let start = stack.iter().position(|&n| n == next).unwrap_or(0);
            let mut cycle = stack[start..].to_vec();
            cycle.push(next);
            return Some(cycle);
          }
          Mark::Unvisited => {
            if let Some(cycle) = visit(next, downstream, marks, stack) {
              return Some(cycle);
            }
          }
          Mark::Done => {}
        }
      }

      stack.pop();
      marks[node] = Mark::Done;
      None
    }

    let mut marks = vec![Mark::Unvisited; self.downstream.len()];
    let mut stack = Vec::new();

    for node in 0..self.downstream.len() {
      if marks[node] == Mark::Unvisited {
        if let Some(cycle) = visit(node, &self.downstream, &mut marks, &mut stack) {
          return Some(cycle);
        }
      }
    }

    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_adjacency() {
    let graph = NotificationGraph::new(3, &[(0, 1), (2, 1), (0, 1)]);

    assert_eq!(graph.targets(0), &[1]);
    assert_eq!(graph.notifiers(1), &[0, 2]);
    assert!(graph.targets(1).is_empty());
    assert!(graph.notifiers(7).is_empty());
  }

  #[test]
  fn test_acyclic_graph_has_no_cycle() {
    let graph = NotificationGraph::new(4, &[(0, 1), (1, 2), (0, 2), (3, 2)]);
    assert_eq!(graph.find_cycle(), None);
  }

  #[test]
  fn test_cycle_path() {
    let graph = NotificationGraph::new(4, &[(0, 1), (1, 2), (2, 3), (3, 1)]);
    assert_eq!(graph.find_cycle(), Some(vec![1, 2, 3, 1]));
  }

  #[test]
  fn test_self_notification_is_a_cycle() {
    let graph = NotificationGraph::new(2, &[(1, 1)]);
    assert_eq!(graph.find_cycle(), Some(vec![1, 1]));
  }
}
