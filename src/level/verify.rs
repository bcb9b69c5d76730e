//! Static solvability check
//!
//! Ignores the sliding layer entirely: the question is only whether the exit
//! topology as laid out connects the faucet to the goal.

use petgraph::graphmap::UnGraphMap;
use petgraph::visit::Bfs;

use super::codec::decode;
use crate::sim::{Direction, Endpoint, Exits};

type Cell = (usize, usize);

/// Undirected graph of reciprocal connections between orthogonal neighbors
fn connection_graph(width: usize, height: usize, topology: &[Exits]) -> UnGraphMap<Cell, ()> {
    let mut graph = UnGraphMap::with_capacity(
        width * height,
        (width - 1) * height + (height - 1) * width,
    );

    for y in 0..height {
        for x in 0..width {
            let here = topology[y * width + x];
            graph.add_node((x, y));
            // add edges down and to the right, if both pieces agree
            if x + 1 < width && here.contains(Direction::Right) {
                let right = topology[y * width + x + 1];
                if right.contains(Direction::Left) {
                    graph.add_edge((x, y), (x + 1, y), ());
                }
            }
            if y + 1 < height && here.contains(Direction::Down) {
                let below = topology[(y + 1) * width + x];
                if below.contains(Direction::Up) {
                    graph.add_edge((x, y), (x, y + 1), ());
                }
            }
        }
    }
    graph
}

/// Whether water could travel from the faucet to the goal through connected
/// exits, given per-cell exit sets in row-major order. Malformed input is
/// simply not traversable.
pub fn is_traversable(
    width: usize,
    height: usize,
    topology: &[Exits],
    faucet: &Endpoint,
    goal: &Endpoint,
) -> bool {
    if width == 0 || height == 0 || width.checked_mul(height) != Some(topology.len()) {
        return false;
    }
    if !faucet.in_bounds(width, height) || !goal.in_bounds(width, height) {
        return false;
    }

    let start = (faucet.x as usize, faucet.y as usize);
    let target = (goal.x as usize, goal.y as usize);
    let at = |(x, y): Cell| topology[y * width + x];
    if !at(start).contains(faucet.side) || !at(target).contains(goal.side) {
        return false;
    }

    let graph = connection_graph(width, height, topology);
    let mut bfs = Bfs::new(&graph, start);
    while let Some(cell) = bfs.next(&graph) {
        if cell == target {
            return true;
        }
    }
    false
}

/// Decode and check a level string; undecodable strings are unsolvable
pub fn is_level_string_solvable(input: &str) -> bool {
    match decode(input) {
        Ok(level) => level.is_solvable(),
        Err(e) => {
            log::debug!("level rejected before solvability check: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topology(bits: &[u8]) -> Vec<Exits> {
        bits.iter().map(|&b| Exits::from_bits(b).unwrap()).collect()
    }

    fn left(y: i32) -> Endpoint {
        Endpoint { x: 0, y, side: Direction::Left }
    }

    fn right(x: i32, y: i32) -> Endpoint {
        Endpoint { x, y, side: Direction::Right }
    }

    #[test]
    fn test_decodable_level_without_route() {
        // faucet piece A turns up off the board, goal piece 9 has no right exit
        assert!(decode("3 3 0 0 2 0 A 6 9 3 5 3 0 9 A").is_ok());
        assert!(!is_level_string_solvable("3 3 0 0 2 0 A 6 9 3 5 3 0 9 A"));
        // same frame with a connected top row
        assert!(is_level_string_solvable("3 3 0 0 2 0 C C C 3 5 3 0 9 A"));
    }

    #[test]
    fn test_undecodable_strings_are_unsolvable() {
        assert!(!is_level_string_solvable("3 3 0 0 0 9 6 3 0"));
        assert!(!is_level_string_solvable("8"));
        assert!(!is_level_string_solvable(""));
        assert!(!is_level_string_solvable("9999999999999 9999999999999 0 0 C 0"));
        assert!(!is_level_string_solvable(&format!("{} 2 0 0 C 0", usize::MAX)));
    }

    #[test]
    fn test_straight_row_connects() {
        let topo = topology(&[0xC, 0xC, 0x3, 0x0]);
        assert!(is_traversable(2, 2, &topo, &left(0), &right(1, 0)));
    }

    #[test]
    fn test_missing_reciprocal_exit_blocks() {
        // right piece is open left but the left piece is vertical
        let topo = topology(&[0x3, 0xC, 0x3, 0x0]);
        assert!(!is_traversable(2, 2, &topo, &left(0), &right(1, 0)));
        let topo = topology(&[0xC, 0x3, 0x3, 0x0]);
        assert!(!is_traversable(2, 2, &topo, &left(0), &right(1, 0)));
    }

    #[test]
    fn test_goal_side_exit_required() {
        // path reaches the goal cell but the goal piece turns down, not right
        let topo = topology(&[0xC, 0x9, 0x3, 0x3]);
        assert!(!is_traversable(2, 2, &topo, &left(0), &right(1, 0)));
    }

    #[test]
    fn test_path_around_a_corner() {
        // left faucet row 0 -> down -> right along row 1 -> goal on right of row 1
        let topo = topology(&[0x9, 0x0, 0x6, 0xC]);
        assert!(is_traversable(2, 2, &topo, &left(0), &right(1, 1)));
        assert!(!is_traversable(2, 2, &topo, &left(0), &right(1, 0)));
    }

    #[test]
    fn test_malformed_input_is_false() {
        let topo = topology(&[0xC, 0xC]);
        assert!(!is_traversable(2, 2, &topo, &left(0), &right(1, 0)));
        assert!(!is_traversable(0, 0, &[], &left(0), &right(1, 0)));
        assert!(!is_traversable(usize::MAX, 2, &[], &left(0), &right(1, 0)));
        let topo = topology(&[0xC, 0xC, 0x3, 0x0]);
        assert!(!is_traversable(2, 2, &topo, &left(5), &right(1, 0)));
        assert!(!is_traversable(2, 2, &topo, &left(0), &right(-1, 0)));
    }
}
