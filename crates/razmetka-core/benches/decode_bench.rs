use criterion::{black_box, criterion_group, criterion_main, Criterion};
use razmetka_core::states::{ExceptionLexicon, FinderStrategy, PossibleStateFinder};
use razmetka_core::{Chain, ChainTransformer, CrfApplier, CrfModel};

const TAGS: [&str; 6] = ["S@ЕД@ИМ", "S@МН@ИМ", "V@НАСТ", "A@ЕД@ИМ", "PR", "CONJ"];

fn model() -> CrfModel {
    let mut model = CrfModel::new();
    for tag in TAGS {
        let label = model.register_label(tag);
        let feature = model.register_feature(tag);
        model.add_state_weight(label, feature, 1.0);
    }
    for pos in ["POS_S", "POS_V", "POS_A", "POS_PR", "POS_CONJ"] {
        model.register_label(pos);
    }
    let labels = model.num_labels();
    for prev in 0..labels {
        for next in 0..labels {
            model.add_transition_weight(prev, next, ((prev * 7 + next * 3) % 5) as f64 * 0.1);
        }
    }
    model
}

fn sentence(len: usize) -> Chain {
    let tokens = (0..len).map(|i| format!("w{i}")).collect();
    let features = (0..len)
        .map(|i| {
            vec![
                TAGS[i % TAGS.len()].to_string(),
                TAGS[(i + 2) % TAGS.len()].to_string(),
                format!("suffix={}", i % 3),
            ]
        })
        .collect();
    Chain::unlabeled(tokens, features).unwrap()
}

fn bench_apply(c: &mut Criterion) {
    let model = model();
    let tags = TAGS.iter().map(|t| t.to_string());
    let finder =
        PossibleStateFinder::new(FinderStrategy::FullMorphology, tags, ExceptionLexicon::new())
            .unwrap();
    let applier = CrfApplier::new(&model, ChainTransformer::FullMorphology, finder).unwrap();

    let short = sentence(8);
    let long = sentence(60);

    c.bench_function("apply_doubled_8", |b| {
        b.iter(|| applier.apply(black_box(&short)).unwrap());
    });

    c.bench_function("apply_doubled_60", |b| {
        b.iter(|| applier.apply(black_box(&long)).unwrap());
    });

    c.bench_function("forward_transform_60", |b| {
        b.iter(|| ChainTransformer::FullMorphology.forward(black_box(&long)));
    });
}

criterion_group!(benches, bench_apply);
criterion_main!(benches);
