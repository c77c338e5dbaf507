// [[file:../mace.note::*imports][imports:1]]
use crate::cell::Cell;
use crate::core::*;
use crate::shifts::Edges;
use crate::species::NodeAttributes;
// imports:1 ends here

// [[file:../mace.note::1e9b7c08][1e9b7c08]]
/// Everything a model needs for one single-graph evaluation, in model units.
#[derive(Debug, Clone)]
pub struct GraphInput {
    pub node_attrs: NodeAttributes,
    pub positions: Vec<[f64; 3]>,
    pub edge_index: [Vec<usize>; 2],
    pub shifts: Vec<[f64; 3]>,
    pub unit_shifts: Vec<[i64; 3]>,
    pub cell: Option<[[f64; 3]; 3]>,
    /// graph id of every node; always zero
    pub batch: Vec<usize>,
    /// node offsets of each graph: `[0, n]`
    pub ptr: Vec<usize>,
    pub pbc: [bool; 3],
}

impl GraphInput {
    pub fn num_nodes(&self) -> usize {
        self.positions.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edge_index[0].len()
    }
}

/// Joins cached per-topology data with per-call geometry.
#[derive(Debug, Clone)]
pub struct GraphAssembler {
    node_attrs: NodeAttributes,
    batch: Vec<usize>,
    ptr: Vec<usize>,
    pbc: [bool; 3],
}

impl GraphAssembler {
    pub fn new(node_attrs: NodeAttributes, periodic: bool) -> Self {
        let n = node_attrs.nrows();
        Self {
            node_attrs,
            batch: vec![0; n],
            ptr: vec![0, n],
            pbc: [periodic; 3],
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.node_attrs.nrows()
    }

    pub fn node_attrs(&self) -> &NodeAttributes {
        &self.node_attrs
    }

    pub fn pbc(&self) -> [bool; 3] {
        self.pbc
    }

    pub fn assemble(&self, positions: Vec<[f64; 3]>, edges: Edges, cell: Option<&Cell>) -> Result<GraphInput> {
        if positions.len() != self.num_nodes() {
            bail!(
                "graph has {} nodes, but {} positions were given",
                self.num_nodes(),
                positions.len()
            );
        }

        Ok(GraphInput {
            node_attrs: self.node_attrs.clone(),
            positions,
            edge_index: edges.edge_index,
            shifts: edges.shifts,
            unit_shifts: edges.unit_shifts,
            cell: cell.map(|c| c.vectors()),
            batch: self.batch.clone(),
            ptr: self.ptr.clone(),
            pbc: self.pbc,
        })
    }
}
// 1e9b7c08 ends here

// [[file:../mace.note::*test][test:1]]
#[test]
fn test_graph_assembler() -> Result<()> {
    use crate::species::{SpeciesEncoder, SpeciesTable};

    let attrs = SpeciesEncoder::new(SpeciesTable::new(vec![1, 8])).encode(&[8, 1, 1])?;
    let assembler = GraphAssembler::new(attrs, true);
    let positions = vec![[0.0; 3], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]];
    let graph = assembler.assemble(positions, Edges::default(), None)?;
    assert_eq!(graph.num_nodes(), 3);
    assert_eq!(graph.num_edges(), 0);
    assert_eq!(graph.ptr, vec![0, 3]);
    assert_eq!(graph.batch, vec![0, 0, 0]);
    assert_eq!(graph.pbc, [true; 3]);

    assert!(assembler.assemble(vec![[0.0; 3]], Edges::default(), None).is_err());

    Ok(())
}
// test:1 ends here
