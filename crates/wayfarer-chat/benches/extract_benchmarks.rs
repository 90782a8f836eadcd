//! Benchmarks for command extraction and date normalization.
//!
//! Both run once per finalized assistant reply, on replies of a few
//! hundred words. Extraction must stay well under a millisecond so the
//! reply can be finalized without a visible pause.

use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use wayfarer_chat::{CommandExtractor, DateNormalizer};

/// A typical assistant reply (~120 words) with an embedded command.
fn reply_with_command(index: usize) -> String {
    let mode = ["walk", "train", "bus", "car"][index % 4];
    format!(
        "Great, I've noted everything down. Nishiki Market is a narrow \
         shopping street in central Kyoto with more than a hundred shops and \
         restaurants. It is best visited in the late morning, before the \
         lunch crowds, and most stalls close around six in the evening. Try \
         the tamagoyaki, the pickles, and the fresh soy milk doughnuts.\n\
         AI_ADD_SPOT::name=Nishiki Market {index};;description=Food market; \
         try the tamagoyaki;;dateTime=2024-07-1{}T11:30;;transportMode={mode}\n\
         Understood. I'm now instructing the app to add Nishiki Market to \
         your itinerary. Let me know if you'd like restaurant suggestions \
         nearby for dinner afterwards.",
        index % 10
    )
}

/// The same reply with no command (baseline).
fn plain_reply(index: usize) -> String {
    format!(
        "Nishiki Market is a narrow shopping street in central Kyoto with \
         more than a hundred shops and restaurants. It is best visited in the \
         late morning, before the lunch crowds, and most stalls close around \
         six in the evening. Try the tamagoyaki, the pickles, and the fresh \
         soy milk doughnuts. AI_ADD_SPOT is what I would use to add it, but \
         only once you confirm. Reference {index}."
    )
}

fn bench_extraction(c: &mut Criterion) {
    let with_command: Vec<String> = (0..1000).map(reply_with_command).collect();
    let plain: Vec<String> = (0..1000).map(plain_reply).collect();

    let mut group = c.benchmark_group("command_extraction");
    group.sample_size(200);
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("reply_with_command", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let extraction = CommandExtractor::extract(&with_command[idx % with_command.len()]);
            idx += 1;
            extraction
        });
    });

    group.bench_function("plain_reply", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let extraction = CommandExtractor::extract(&plain[idx % plain.len()]);
            idx += 1;
            extraction
        });
    });

    group.finish();
}

fn bench_normalization(c: &mut Criterion) {
    let inputs = [
        "2024-07-15T14:30",
        "DATETIME_UNSPECIFIED",
        "2024-07-15 14:30:00",
        "2024-07-20T10:00Z",
        "July 15, 2024 2:30 PM",
        "tomorrow afternoon",
    ];

    let mut group = c.benchmark_group("date_normalization");
    for raw in inputs {
        group.bench_function(raw, |b| b.iter(|| DateNormalizer::normalize(raw)));
    }
    group.finish();
}

criterion_group!(benches, bench_extraction, bench_normalization);
criterion_main!(benches);
