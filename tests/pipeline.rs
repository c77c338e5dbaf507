// [[file:../mace.note::*imports][imports:1]]
use gosh_mace::*;

use approx::*;
use gut::prelude::*;
// imports:1 ends here

// [[file:../mace.note::*base][base:1]]
// A model reaching exactly 1 nm, so host and model cutoffs agree.
fn model() -> LennardJones {
    let mut lj = LennardJones::default();
    lj.r_max = 10.0;
    lj
}

fn adapter(numbers: Vec<usize>, options: AdapterOptions) -> Result<PotentialAdapter> {
    PotentialAdapter::new(Box::new(model()), &Topology::new(numbers), &options)
}
// base:1 ends here

// [[file:../mace.note::*scenarios][scenarios:1]]
#[test]
fn test_dimer_non_periodic() -> Result<()> {
    let adapter = adapter(vec![8, 1], AdapterOptions::default())?;
    let positions = [[0.0, 0.0, 0.0], [0.0, 0.0, 0.9]];
    let graph = adapter.build_graph(&positions, None)?;

    assert_eq!(graph.num_edges(), 2);
    assert_eq!(graph.edge_index, [vec![0, 1], vec![1, 0]]);
    assert!(graph.shifts.iter().all(|s| s == &[0.0; 3]));
    assert_eq!(graph.pbc, [false; 3]);
    assert!(graph.cell.is_none());

    Ok(())
}

#[test]
fn test_dimer_periodic_image() -> Result<()> {
    let topology = Topology::new(vec![8, 1]).with_box_vectors([[10.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]]);
    let adapter = PotentialAdapter::new(Box::new(model()), &topology, &AdapterOptions::default())?;

    // in nm; the finder works in Å
    let box_vectors = [[10.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]];
    let positions = [[0.0, 0.0, 0.0], [0.0, 0.0, 9.9]];
    let graph = adapter.build_graph(&positions, Some(box_vectors))?;

    assert_eq!(graph.pbc, [true; 3]);
    assert_eq!(graph.num_edges(), 2);
    assert_eq!(graph.edge_index[0][0], 0);
    assert_eq!(graph.edge_index[1][0], 1);
    // wrapped displacement is (0, 0, -0.1) nm and the shift (0, 0, 10) nm
    assert_relative_eq!(graph.shifts[0][2], 100.0, epsilon = 1e-9);
    assert_relative_eq!(graph.shifts[1][2], -100.0, epsilon = 1e-9);
    assert_eq!(graph.unit_shifts[0], [0, 0, 1]);
    let wrapped = graph.positions[1][2] - graph.positions[0][2] - graph.shifts[0][2];
    assert_relative_eq!(wrapped, -1.0, epsilon = 1e-9);

    Ok(())
}

#[test]
fn test_energy_kinds_differ() -> Result<()> {
    let positions = [[0.0, 0.0, 0.0], [0.0, 0.0, 0.35], [0.0, 0.33, 0.0]];
    let total = adapter(vec![8, 1, 1], AdapterOptions::default())?.evaluate(&positions, None)?;
    let options = AdapterOptions {
        return_energy_type: "interaction_energy".into(),
        ..Default::default()
    };
    let interaction = adapter(vec![8, 1, 1], options)?.evaluate(&positions, None)?;

    assert_ne!(total, interaction);
    let self_energy = (-2041.84 - 2.0 * 13.57) * 96.4853;
    assert_relative_eq!(total - interaction, self_energy, epsilon = 1e-6);

    Ok(())
}

#[test]
fn test_region_subset_order() -> Result<()> {
    let numbers = vec![6, 8, 1, 7, 1];
    let positions = [
        [0.0, 0.0, 0.0],
        [0.2, 0.0, 0.0],
        [0.0, 0.2, 0.0],
        [0.0, 0.0, 0.2],
        [0.2, 0.2, 0.2],
    ];
    let options = AdapterOptions {
        atoms: Some(vec![4, 1, 3]),
        ..Default::default()
    };
    let adapter = adapter(numbers, options)?;
    let graph = adapter.build_graph(&positions, None)?;

    assert_eq!(graph.num_nodes(), 3);
    assert_eq!(graph.ptr, vec![0, 3]);
    let species = adapter.species().numbers();
    let elements: Vec<usize> = (0..3)
        .map(|i| species[graph.node_attrs.species_index(i).expect("one-hot row")])
        .collect();
    assert_eq!(elements, vec![8, 7, 1]);
    assert_relative_eq!(graph.positions[0][0], 2.0, epsilon = 1e-12);
    for row in graph.node_attrs.rows() {
        assert_eq!(row.iter().sum::<f64>(), 1.0);
    }

    Ok(())
}

#[test]
fn test_positions_outside_cell() -> Result<()> {
    // the same configuration with atoms displaced by whole box vectors
    let box_vectors = [[1.2, 0.0, 0.0], [0.0, 1.2, 0.0], [0.1, 0.0, 1.2]];
    let positions = [[0.05, 0.05, 0.05], [1.15, 0.1, 0.05], [0.6, 0.6, 0.6], [0.05, 1.1, 1.15]];
    let displaced = [
        [0.05 + 1.2, 0.05, 0.05],
        [1.15 - 2.4, 0.1, 0.05],
        [0.6 + 0.1, 0.6 + 1.2, 0.6 + 1.2],
        [0.05 - 0.1, 1.1, 1.15 - 1.2],
    ];
    let topology = Topology::new(vec![8, 1, 1, 6]).with_box_vectors(box_vectors);
    let mut lj = model();
    lj.r_max = 5.0;
    let adapter = PotentialAdapter::new(Box::new(lj), &topology, &AdapterOptions::default())?;

    let e0 = adapter.evaluate(&positions, Some(box_vectors))?;
    let e1 = adapter.evaluate(&displaced, Some(box_vectors))?;
    assert_relative_eq!(e0, e1, epsilon = 1e-6, max_relative = 1e-9);

    let graph = adapter.build_graph(&displaced, Some(box_vectors))?;
    assert_eq!(graph.num_edges() % 2, 0);
    for (k, (&s, &t)) in graph.edge_index[0].iter().zip(&graph.edge_index[1]).enumerate() {
        let mut r2 = 0.0;
        for x in 0..3 {
            let d = graph.positions[t][x] - graph.positions[s][x] - graph.shifts[k][x];
            r2 += d * d;
        }
        assert!(r2.sqrt() <= adapter.cutoff());
        assert_ne!(s, t);
    }

    Ok(())
}
// scenarios:1 ends here
