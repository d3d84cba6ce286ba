use criterion::{criterion_group, criterion_main, Criterion};
use msc_core::{NodeId, RngHandle};
use msc_mcmc::{CoordinatedExponential, CoordinatedExponentialConfig};
use msc_tree::{TaxonMap, TreeBuilder, TreeImpl};

/// Caterpillar tree over `taxa`, oldest join last.
fn caterpillar(taxa: &[String]) -> TreeImpl {
    let mut builder = TreeBuilder::new();
    let mut tips = taxa.iter().map(|taxon| builder.leaf(taxon.clone(), 0.0));
    let first: NodeId = tips.next().unwrap();
    let rest: Vec<NodeId> = tips.collect();
    let mut current = first;
    for (i, tip) in rest.into_iter().enumerate() {
        current = builder.join(current, tip, (i + 1) as f64).unwrap();
    }
    builder.build().unwrap()
}

fn bench_proposal(c: &mut Criterion) {
    let species_names: Vec<String> = (0..8).map(|i| format!("S{i}")).collect();
    let mut pairs = Vec::new();
    for name in &species_names {
        for j in 0..4 {
            pairs.push((name.clone(), format!("{name}_{j}")));
        }
    }
    let taxa = TaxonMap::from_pairs(pairs.clone()).unwrap();
    let taxon_names: Vec<String> = pairs.into_iter().map(|(_, taxon)| taxon).collect();

    let mut species = caterpillar(&species_names);
    let mut genes: Vec<TreeImpl> = (0..50).map(|_| caterpillar(&taxon_names)).collect();
    let operator = CoordinatedExponential::new(&CoordinatedExponentialConfig::default()).unwrap();
    let mut rng = RngHandle::from_seed(42);

    c.bench_function("coordinated_propose_revert", |b| {
        b.iter(|| {
            let proposal = operator
                .propose(&mut species, &mut genes, &taxa, &mut rng)
                .unwrap();
            proposal.revert(&mut species, &mut genes);
        })
    });
}

criterion_group!(benches, bench_proposal);
criterion_main!(benches);
