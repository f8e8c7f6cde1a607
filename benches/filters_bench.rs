use criterion::{black_box, criterion_group, criterion_main, Criterion};

use alphabet::{Alphabet, Background, DigitalSeq};
use filters::{backward_filter, forward_filter, msv_filter, ssv_filter, viterbi_filter};
use profile::{sample_model, FilterMatrix, GenericProfile, Mode, OptimizedProfile, SimdWidth};

/// The conventional benchmark shape: M=145 against L=200 targets.
fn fixture() -> (OptimizedProfile, Vec<DigitalSeq>) {
    let mut rng = fastrand::Rng::with_seed(0);
    let hmm = sample_model(Alphabet::Dna, 145, &mut rng);
    let bg = Background::new(Alphabet::Dna);
    let mut gp = GenericProfile::config(&hmm, &bg, Mode::Dual, 500).unwrap();
    gp.set_length(200);
    let om = OptimizedProfile::build(&gp, SimdWidth::W16).unwrap();
    let seqs = (0..16)
        .map(|_| DigitalSeq::random(Alphabet::Dna, 200, &mut rng))
        .collect();
    (om, seqs)
}

fn bench_filters(c: &mut Criterion) {
    let (om, seqs) = fixture();
    let mut fx = FilterMatrix::new();

    c.bench_function("msv_filter_m145_l200", |b| {
        b.iter(|| {
            for dsq in &seqs {
                black_box(msv_filter(dsq, &om, &mut fx));
            }
        })
    });

    c.bench_function("ssv_filter_m145_l200", |b| {
        b.iter(|| {
            for dsq in &seqs {
                black_box(ssv_filter(dsq, &om, &mut fx));
            }
        })
    });

    c.bench_function("viterbi_filter_m145_l200", |b| {
        b.iter(|| {
            for dsq in &seqs {
                black_box(viterbi_filter(dsq, &om, &mut fx));
            }
        })
    });

    c.bench_function("forward_filter_m145_l200", |b| {
        b.iter(|| {
            for dsq in &seqs {
                black_box(forward_filter(dsq, &om, &mut fx));
            }
        })
    });

    c.bench_function("forward_backward_mask_m145_l200", |b| {
        b.iter(|| {
            for dsq in &seqs {
                let fwd = forward_filter(dsq, &om, &mut fx);
                black_box(backward_filter(dsq, &om, &mut fx, fwd, 1e-4));
            }
        })
    });
}

criterion_group!(benches, bench_filters);
criterion_main!(benches);
